#![allow(non_snake_case)]
mod pages;
mod components;
mod utils;

use std::time::Duration;
use chrono::Utc;
use dioxus::{logger::tracing::{debug, info, Level}, prelude::*};
use pages::dashboard::Home;
use utils::{
    config::SupabaseConfig,
    session::{refresh_delay, renew_session, resolve_session, BrowserStorage, SessionContext, SessionState, SessionStore},
    supabase::Services,
};

/// How often the refresher looks again while nobody is signed in.
const SIGNED_OUT_POLL: Duration = Duration::from_secs(5);

#[derive(Routable, PartialEq, Clone)]
enum Route {
    #[route("/")]
    Home {},
    #[route("/:..route")]
    PageNotFound { route: Vec<String> }
}

fn main() {
    // launch falls back to its own default subscriber if this one is refused
    let _ = dioxus::logger::init(Level::INFO);
    dioxus::launch(App);
}

fn App() -> Element {
    let services = use_context_provider(|| Services::supabase(SupabaseConfig::from_env()));
    let state = use_signal(|| SessionState::Loading);
    let session = use_context_provider(|| SessionContext::new(state));

    let auth = services.auth.clone();
    use_future(move || {
        let auth = auth.clone();
        async move {
            let resolved = resolve_session(&*auth, BrowserStorage.load()).await;
            info!("session resolved: signed in = {}", resolved.session().is_some());
            session.resolve(resolved);
        }
    });

    // Keeps the access token fresh for as long as the app is open.
    use_future(move || {
        let auth = services.auth.clone();
        async move {
            loop {
                let Some(current) = session.peek().session().cloned() else {
                    async_std::task::sleep(SIGNED_OUT_POLL).await;
                    continue;
                };
                let delay = refresh_delay(&current, Utc::now());
                debug!("next session refresh in {}s", delay.as_secs());
                async_std::task::sleep(delay).await;
                // signed out or replaced while waiting
                if session.access_token().as_deref() != Some(current.access_token.as_str()) {
                    continue;
                }
                session.resolve(renew_session(&*auth, &current).await);
            }
        }
    });

    rsx! { Router::<Route> {} }
}

#[component]
fn PageNotFound(route: Vec<String>) -> Element {
    rsx! {
        h1 { "Page not found" }
        p { "We are terribly sorry, but the page you requested doesn't exist." }
        pre { color: "red", "log:\nattemped to navigate to: {route:?}" }
    }
}
