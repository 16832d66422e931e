//! Error type shared by every operation of the dashboard.
//!
//! Store and auth failures carry the backend's message verbatim so views can
//! render it inline without reformatting.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
  /// An operation that needs a signed-in user was attempted without one.
  #[error("You must be logged in to create instructions")]
  AuthenticationRequired,

  /// Client-side validation or payload decoding failed.
  #[error("{0}")]
  Validation(String),

  /// The table store rejected a read or write.
  #[error("{0}")]
  StoreOperationFailed(String),

  /// The auth service rejected the credentials or token.
  #[error("{0}")]
  AuthFailed(String),

  #[error("Realtime connection error: {0}")]
  Realtime(String),

  #[error("Wasm error: {0}")]
  Wasm(String),
}

impl From<serde_json::Error> for AppError {
  fn from(err: serde_json::Error) -> Self {
    AppError::Validation(format!("unexpected payload shape: {}", err))
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    AppError::StoreOperationFailed(err.to_string())
  }
}

impl AppError {
  /// Maps a JS exception (web-sys calls) into a [`AppError::Wasm`].
  pub fn from_js(value: js_sys::wasm_bindgen::JsValue) -> Self {
    AppError::Wasm(format!("{:?}", value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_message_is_rendered_verbatim() {
    let err = AppError::StoreOperationFailed("new row violates row-level security policy".into());
    assert_eq!(err.to_string(), "new row violates row-level security policy");
  }

  #[test]
  fn decode_failures_become_validation_errors() {
    let json_err = serde_json::from_str::<u32>("\"abc\"").unwrap_err();
    let err: AppError = json_err.into();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.starts_with("unexpected payload shape")));
  }
}
