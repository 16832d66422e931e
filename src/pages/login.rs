#![allow(non_snake_case)]

use dioxus::{logger::tracing::warn, prelude::*};

use crate::{
  components::icons::AlertCircle,
  utils::{session::{SessionContext, SignUpOutcome}, supabase::Services},
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum AuthMode {
  SignIn,
  SignUp,
}

#[component]
pub fn AuthForm() -> Element {
  let services = use_context::<Services>();
  let session = use_context::<SessionContext>();
  let mut email = use_signal(String::new);
  let mut password = use_signal(String::new);
  let mut mode = use_signal(|| AuthMode::SignIn);
  let mut auth_error = use_signal(|| None::<String>);
  let mut notice = use_signal(|| None::<String>);
  let mut pending = use_signal(|| false);

  let on_submit = move |evt: FormEvent| {
    evt.prevent_default();
    let auth = services.auth.clone();
    async move {
      auth_error.set(None);
      notice.set(None);
      pending.set(true);
      let (address, secret) = (email(), password());
      let signed_in = match mode() {
        AuthMode::SignIn => auth.sign_in(address, secret).await.map(Some),
        AuthMode::SignUp => match auth.sign_up(address, secret).await {
          Ok(SignUpOutcome::SignedIn(created)) => Ok(Some(created)),
          Ok(SignUpOutcome::ConfirmationRequired) => {
            notice.set(Some("Check your email to confirm your account, then sign in".to_string()));
            mode.set(AuthMode::SignIn);
            Ok(None)
          },
          Err(e) => Err(e),
        },
      };
      pending.set(false);
      match signed_in {
        Ok(Some(created)) => session.sign_in(created),
        Ok(None) => {},
        Err(e) => {
          warn!("authentication failed: {}", e);
          auth_error.set(Some(e.to_string()));
        }
      }
    }
  };

  let (title, submit_label, toggle_label) = match mode() {
    AuthMode::SignIn => ("Sign In", "Sign In", "Don't have an account? Sign up"),
    AuthMode::SignUp => ("Create Account", "Sign Up", "Already have an account? Sign in"),
  };

  rsx! {
    div {
      class: "auth-page",
      div {
        class: "auth-card",
        h1 { "Argentine Capital Market System" },
        h2 { "{title}" },
        form {
          onsubmit: on_submit,
          div {
            class: "field",
            label { r#for: "email", "Email" },
            input {
              id: "email",
              r#type: "email",
              required: true,
              value: "{email}",
              oninput: move |evt| email.set(evt.value())
            }
          },
          div {
            class: "field",
            label { r#for: "password", "Password" },
            input {
              id: "password",
              r#type: "password",
              required: true,
              value: "{password}",
              oninput: move |evt| password.set(evt.value())
            }
          },
          if let Some(message) = auth_error() {
            div {
              class: "inline-error",
              AlertCircle {},
              span { "{message}" }
            }
          },
          if let Some(message) = notice() {
            p { class: "notice", "{message}" }
          },
          button {
            class: "submit-button",
            r#type: "submit",
            disabled: pending(),
            "{submit_label}"
          }
        },
        button {
          class: "link-button",
          r#type: "button",
          onclick: move |_| {
            auth_error.set(None);
            let next = match mode() {
              AuthMode::SignIn => AuthMode::SignUp,
              AuthMode::SignUp => AuthMode::SignIn,
            };
            mode.set(next);
          },
          "{toggle_label}"
        }
      }
    }
  }
}
