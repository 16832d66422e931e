use std::time::Duration;
use chrono::{DateTime, Utc};
use dioxus::{logger::tracing::{info, warn}, prelude::*};
use futures::future::LocalBoxFuture;
use web_sys::{window, Storage};

use super::{error::AppError, models::{AuthSession, User}};

const SESSION_STORAGE_KEY: &str = "market-desk.session";
/// Renew this long before the access token lapses.
const REFRESH_MARGIN_SECS: i64 = 60;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
  SignedIn(AuthSession),
  ConfirmationRequired,
}

/// Identity provider seam.
pub trait AuthClient {
  fn current_user(&self, access_token: String) -> LocalBoxFuture<'_, Result<User, AppError>>;
  fn refresh(&self, refresh_token: String) -> LocalBoxFuture<'_, Result<AuthSession, AppError>>;
  fn sign_in(&self, email: String, password: String) -> LocalBoxFuture<'_, Result<AuthSession, AppError>>;
  fn sign_up(&self, email: String, password: String) -> LocalBoxFuture<'_, Result<SignUpOutcome, AppError>>;
  fn sign_out(&self, access_token: String) -> LocalBoxFuture<'_, Result<(), AppError>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
  Loading,
  SignedIn(AuthSession),
  SignedOut,
}

impl SessionState {
  pub fn session(&self) -> Option<&AuthSession> {
    match self {
      SessionState::SignedIn(session) => Some(session),
      _ => None,
    }
  }

  pub fn user(&self) -> Option<&User> {
    self.session().map(|s| &s.user)
  }

  pub fn access_token(&self) -> Option<String> {
    self.session().map(|s| s.access_token.clone())
  }
}

/// Resolves the session persisted by a previous visit.
/// A rejected access token is exchanged once through the refresh token.
pub async fn resolve_session(auth: &dyn AuthClient, stored: Option<AuthSession>) -> SessionState {
  let Some(stored) = stored else {
    return SessionState::SignedOut;
  };

  match auth.current_user(stored.access_token.clone()).await {
    Ok(user) => SessionState::SignedIn(AuthSession { user, ..stored }),
    Err(e) => {
      info!("stored session rejected ({}), trying refresh", e);
      renew_session(auth, &stored).await
    }
  }
}

/// Exchanges the refresh token for a new session; any failure signs out.
pub async fn renew_session(auth: &dyn AuthClient, current: &AuthSession) -> SessionState {
  match auth.refresh(current.refresh_token.clone()).await {
    Ok(session) => {
      info!("session renewed for {}", session.user.id);
      SessionState::SignedIn(session)
    },
    Err(e) => {
      warn!("session refresh failed: {}", e);
      SessionState::SignedOut
    }
  }
}

/// Logs out at the provider. The local outcome is `SignedOut` even when that call fails.
pub async fn end_session(auth: &dyn AuthClient, current: &SessionState) -> SessionState {
  if let Some(token) = current.access_token() {
    if let Err(e) = auth.sign_out(token).await {
      warn!("sign-out request failed: {}", e);
    }
  }
  SessionState::SignedOut
}

/// How long to wait before renewing `session`, measured from `now`.
pub fn refresh_delay(session: &AuthSession, now: DateTime<Utc>) -> Duration {
  let remaining = match (session.expires_at, session.expires_in) {
    (Some(expires_at), _) => expires_at - now.timestamp(),
    (None, Some(expires_in)) => i64::try_from(expires_in).unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
    (None, None) => DEFAULT_TOKEN_LIFETIME_SECS,
  };
  Duration::from_secs(u64::try_from(remaining - REFRESH_MARGIN_SECS).unwrap_or(0))
}

/// Where the current session survives page reloads.
pub trait SessionStore {
  fn load(&self) -> Option<AuthSession>;
  fn save(&self, session: &AuthSession) -> Result<(), AppError>;
  fn clear(&self) -> Result<(), AppError>;
}

/// Persists a signed-in state and forgets anything else.
pub fn record(store: &dyn SessionStore, state: &SessionState) {
  match state.session() {
    Some(session) => {
      if let Err(e) = store.save(session) {
        warn!("could not persist session: {}", e);
      }
    },
    None => {
      if let Err(e) = store.clear() {
        warn!("could not clear stored session: {}", e);
      }
    }
  }
}

/// Browser local storage slot holding the current session.
pub struct BrowserStorage;

impl BrowserStorage {
  fn storage() -> Result<Storage, AppError> {
    window()
      .ok_or_else(|| AppError::Wasm("global window should exist!".to_string()))?
      .local_storage()
      .map_err(AppError::from_js)?
      .ok_or_else(|| AppError::Wasm("local storage unavailable".to_string()))
  }
}

impl SessionStore for BrowserStorage {
  fn load(&self) -> Option<AuthSession> {
    let raw = Self::storage().ok()?.get_item(SESSION_STORAGE_KEY).ok()??;
    match serde_json::from_str(&raw) {
      Ok(session) => Some(session),
      Err(e) => {
        warn!("discarding unreadable stored session: {}", e);
        None
      }
    }
  }

  fn save(&self, session: &AuthSession) -> Result<(), AppError> {
    let raw = serde_json::to_string(session)?;
    Self::storage()?.set_item(SESSION_STORAGE_KEY, &raw).map_err(AppError::from_js)
  }

  fn clear(&self) -> Result<(), AppError> {
    Self::storage()?.remove_item(SESSION_STORAGE_KEY).map_err(AppError::from_js)
  }
}

/// Explicit session context provided at the root of the app.
/// Writes to the inner signal are the session-changed notification.
#[derive(Clone, Copy)]
pub struct SessionContext {
  state: Signal<SessionState>,
}

impl SessionContext {
  pub fn new(state: Signal<SessionState>) -> Self {
    Self { state }
  }

  /// Current state, subscribing the caller to changes.
  pub fn state(&self) -> SessionState {
    self.state.read().clone()
  }

  /// Current state without subscribing.
  pub fn peek(&self) -> SessionState {
    self.state.peek().clone()
  }

  pub fn access_token(&self) -> Option<String> {
    self.state.peek().access_token()
  }

  pub fn resolve(mut self, resolved: SessionState) {
    record(&BrowserStorage, &resolved);
    self.state.set(resolved);
  }

  pub fn sign_in(self, session: AuthSession) {
    info!("signed in as {}", session.user.id);
    self.resolve(SessionState::SignedIn(session));
  }
}
