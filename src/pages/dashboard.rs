#![allow(non_snake_case)]

use dioxus::{logger::tracing::info, prelude::*};

use crate::{
  components::{
    icons::LogOut, instruction_form::InstructionForm, instruction_tracker::InstructionTracker,
    loading::Spinner, market_data::MarketDataView,
  },
  pages::login::AuthForm,
  utils::{session::{end_session, SessionContext, SessionState}, supabase::Services},
};

/// What the gate shows for a session state.
#[derive(Debug, Clone, PartialEq)]
enum Gate {
  Pending,
  Credentials,
  Desk { email: String },
}

impl Gate {
  fn for_state(state: &SessionState) -> Self {
    match state {
      SessionState::Loading => Gate::Pending,
      SessionState::SignedOut => Gate::Credentials,
      SessionState::SignedIn(_) => Gate::Desk {
        email: state.user().and_then(|u| u.email.clone()).unwrap_or_default(),
      },
    }
  }
}

/// Session gate: nothing below it mounts until the session is resolved.
#[component]
pub fn Home() -> Element {
  static CSS: Asset = asset!("assets/dashboard.css");
  let session = use_context::<SessionContext>();

  let body = match Gate::for_state(&session.state()) {
    Gate::Pending => rsx! { Spinner {} },
    Gate::Credentials => rsx! { AuthForm {} },
    Gate::Desk { email } => rsx! { Dashboard { email } },
  };

  rsx! {
    document::Stylesheet {href: CSS},
    {body}
  }
}

#[component]
fn Dashboard(email: String) -> Element {
  let services = use_context::<Services>();
  let session = use_context::<SessionContext>();

  let sign_out = move |_: MouseEvent| {
    let auth = services.auth.clone();
    async move {
      let signed_out = end_session(&*auth, &session.peek()).await;
      info!("signed out");
      session.resolve(signed_out);
    }
  };

  rsx! {
    div {
      class: "dashboard",
      header {
        class: "dashboard-header",
        h1 { "Argentine Capital Market System" },
        div {
          class: "account",
          span { class: "email", "{email}" },
          button {
            class: "signout-button",
            r#type: "button",
            onclick: sign_out,
            LogOut {},
            "Sign Out"
          }
        }
      },
      main {
        class: "dashboard-main",
        MarketDataView {},
        div {
          class: "dashboard-grid",
          InstructionForm {},
          InstructionTracker {}
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::models::{AuthSession, User};
  use uuid::Uuid;

  fn signed_in(email: Option<&str>) -> SessionState {
    SessionState::SignedIn(AuthSession {
      access_token: "jwt".into(),
      refresh_token: "refresh".into(),
      expires_in: Some(3600),
      expires_at: None,
      user: User { id: Uuid::from_u128(3), email: email.map(String::from) },
    })
  }

  #[test]
  fn gate_waits_while_the_session_resolves() {
    assert_eq!(Gate::for_state(&SessionState::Loading), Gate::Pending);
  }

  #[test]
  fn gate_follows_sign_in_and_sign_out() {
    assert_eq!(Gate::for_state(&signed_in(Some("trader@example.com"))), Gate::Desk { email: "trader@example.com".into() });
    assert_eq!(Gate::for_state(&SessionState::SignedOut), Gate::Credentials);
  }

  #[test]
  fn desk_without_email_shows_blank_address() {
    assert_eq!(Gate::for_state(&signed_in(None)), Gate::Desk { email: String::new() });
  }
}
