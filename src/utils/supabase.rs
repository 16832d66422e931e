use std::rc::Rc;
use dioxus::logger::tracing::{debug, info};
use futures::{future::LocalBoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};

use super::{
  config::SupabaseConfig,
  error::AppError,
  models::{AuthSession, Instruction, NewInstructionRow, Quote, User, INSTRUCTIONS_TABLE, QUOTES_TABLE},
  realtime::{ChangeFeed, RealtimeFeed},
  session::{AuthClient, SignUpOutcome},
};

/// Reads and writes against the hosted table store.
pub trait TableStore {
  fn select_quotes(&self, access_token: Option<String>) -> LocalBoxFuture<'_, Result<Vec<Quote>, AppError>>;
  fn select_instructions(&self, access_token: Option<String>) -> LocalBoxFuture<'_, Result<Vec<Instruction>, AppError>>;
  fn insert_instruction(&self, row: NewInstructionRow, access_token: String) -> LocalBoxFuture<'_, Result<Instruction, AppError>>;
}

/// Collaborators shared with every view through the root context.
#[derive(Clone)]
pub struct Services {
  pub store: Rc<dyn TableStore>,
  pub auth: Rc<dyn AuthClient>,
  pub feed: Rc<dyn ChangeFeed>,
}

impl Services {
  pub fn supabase(config: SupabaseConfig) -> Self {
    let client = Rc::new(SupabaseClient::new(reqwest::Client::new(), config.clone()));
    Self {
      store: client.clone(),
      auth: client,
      feed: Rc::new(RealtimeFeed::new(&config)),
    }
  }
}

/// Error bodies of both the REST and the auth services.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
  msg: Option<String>,
  error_description: Option<String>,
  message: Option<String>,
}

/// Picks the human-readable message out of a failed response body.
pub fn error_message(status: u16, reason: Option<&str>, body: &str) -> String {
  let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
  parsed.message
    .or(parsed.msg)
    .or(parsed.error_description)
    .unwrap_or_else(|| match reason {
      Some(reason) => format!("{} {}", status, reason),
      None => status.to_string(),
    })
}

async fn read_body(resp: reqwest::Response, into_err: fn(String) -> AppError) -> Result<String, AppError> {
  let status = resp.status();
  let body = resp.text().await.map_err(|e| into_err(e.to_string()))?;
  if status.is_success() {
    Ok(body)
  } else {
    Err(into_err(error_message(status.as_u16(), status.canonical_reason(), &body)))
  }
}

pub struct SupabaseClient {
  http: reqwest::Client,
  config: SupabaseConfig,
}

impl SupabaseClient {
  pub fn new(http: reqwest::Client, config: SupabaseConfig) -> Self {
    Self { http, config }
  }

  fn bearer(&self, access_token: Option<&str>) -> String {
    format!("Bearer {}", access_token.unwrap_or(self.config.anon_key()))
  }

  async fn select<R: DeserializeOwned>(&self, table: &str, order: &str, access_token: Option<String>) -> Result<Vec<R>, AppError> {
    let resp = self.http
      .get(self.config.rest_url(table))
      .query(&[("select", "*"), ("order", order)])
      .header("apikey", self.config.anon_key())
      .header("Authorization", self.bearer(access_token.as_deref()))
      .send()
      .await?;
    let body = read_body(resp, AppError::StoreOperationFailed).await?;
    let rows = serde_json::from_str::<Vec<R>>(&body)?;
    debug!("bulk read of {} returned {} rows", table, rows.len());
    Ok(rows)
  }

  async fn auth_post(&self, path: &str, access_token: Option<&str>, body: Value) -> Result<String, AppError> {
    let resp = self.http
      .post(self.config.auth_url(path))
      .header("apikey", self.config.anon_key())
      .header("Authorization", self.bearer(access_token))
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::AuthFailed(e.to_string()))?;
    read_body(resp, AppError::AuthFailed).await
  }
}

impl TableStore for SupabaseClient {
  fn select_quotes(&self, access_token: Option<String>) -> LocalBoxFuture<'_, Result<Vec<Quote>, AppError>> {
    self.select(QUOTES_TABLE, "symbol.asc", access_token).boxed_local()
  }

  fn select_instructions(&self, access_token: Option<String>) -> LocalBoxFuture<'_, Result<Vec<Instruction>, AppError>> {
    self.select(INSTRUCTIONS_TABLE, "timestamp.desc", access_token).boxed_local()
  }

  fn insert_instruction(&self, row: NewInstructionRow, access_token: String) -> LocalBoxFuture<'_, Result<Instruction, AppError>> {
    async move {
      let resp = self.http
        .post(self.config.rest_url(INSTRUCTIONS_TABLE))
        .header("apikey", self.config.anon_key())
        .header("Authorization", self.bearer(Some(&access_token)))
        .header("Prefer", "return=representation")
        .json(&[&row])
        .send()
        .await?;
      let body = read_body(resp, AppError::StoreOperationFailed).await?;
      let stored = serde_json::from_str::<Vec<Instruction>>(&body)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::StoreOperationFailed("insert returned no row".to_string()))?;
      info!("instruction {} stored for {}", stored.id, stored.symbol);
      Ok(stored)
    }.boxed_local()
  }
}

impl AuthClient for SupabaseClient {
  fn current_user(&self, access_token: String) -> LocalBoxFuture<'_, Result<User, AppError>> {
    async move {
      let resp = self.http
        .get(self.config.auth_url("user"))
        .header("apikey", self.config.anon_key())
        .header("Authorization", self.bearer(Some(&access_token)))
        .send()
        .await
        .map_err(|e| AppError::AuthFailed(e.to_string()))?;
      let body = read_body(resp, AppError::AuthFailed).await?;
      Ok(serde_json::from_str::<User>(&body)?)
    }.boxed_local()
  }

  fn refresh(&self, refresh_token: String) -> LocalBoxFuture<'_, Result<AuthSession, AppError>> {
    async move {
      let body = self.auth_post("token?grant_type=refresh_token", None, json!({ "refresh_token": refresh_token })).await?;
      Ok(serde_json::from_str::<AuthSession>(&body)?)
    }.boxed_local()
  }

  fn sign_in(&self, email: String, password: String) -> LocalBoxFuture<'_, Result<AuthSession, AppError>> {
    async move {
      let body = self.auth_post("token?grant_type=password", None, json!({ "email": email, "password": password })).await?;
      Ok(serde_json::from_str::<AuthSession>(&body)?)
    }.boxed_local()
  }

  fn sign_up(&self, email: String, password: String) -> LocalBoxFuture<'_, Result<SignUpOutcome, AppError>> {
    async move {
      let body = self.auth_post("signup", None, json!({ "email": email, "password": password })).await?;
      parse_sign_up(&body)
    }.boxed_local()
  }

  fn sign_out(&self, access_token: String) -> LocalBoxFuture<'_, Result<(), AppError>> {
    async move {
      self.auth_post("logout", Some(&access_token), json!({})).await?;
      Ok(())
    }.boxed_local()
  }
}

/// Sign-up answers with a session when confirmation is disabled, otherwise with the bare user.
pub fn parse_sign_up(body: &str) -> Result<SignUpOutcome, AppError> {
  let value = serde_json::from_str::<Value>(body)?;
  if value.get("access_token").is_some() {
    Ok(SignUpOutcome::SignedIn(serde_json::from_value(value)?))
  } else {
    Ok(SignUpOutcome::ConfirmationRequired)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn store_errors_surface_the_message_field() {
    let body = r#"{"code":"42501","details":null,"hint":null,"message":"new row violates row-level security policy for table \"instructions\""}"#;
    assert_eq!(error_message(403, Some("Forbidden"), body), "new row violates row-level security policy for table \"instructions\"");
  }

  #[test]
  fn auth_errors_surface_msg_or_description() {
    assert_eq!(error_message(400, None, r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#), "Invalid login credentials");
    assert_eq!(error_message(400, None, r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#), "Invalid Refresh Token");
  }

  #[test]
  fn unreadable_error_bodies_fall_back_to_status() {
    assert_eq!(error_message(502, Some("Bad Gateway"), "<html>upstream</html>"), "502 Bad Gateway");
    assert_eq!(error_message(599, None, ""), "599");
  }

  #[test]
  fn sign_up_with_session_signs_in() {
    let body = r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer",
      "user":{"id":"0b5f6a44-1111-4c3a-8e1e-2f0d5c9b7a10","email":"u@example.com","aud":"authenticated"}}"#;
    match parse_sign_up(body).unwrap() {
      SignUpOutcome::SignedIn(session) => {
        assert_eq!(session.access_token, "a");
        assert_eq!(session.user.email.as_deref(), Some("u@example.com"));
      },
      SignUpOutcome::ConfirmationRequired => panic!("expected a session"),
    }
  }

  #[test]
  fn sign_up_without_session_needs_confirmation() {
    let body = r#"{"id":"0b5f6a44-1111-4c3a-8e1e-2f0d5c9b7a10","email":"u@example.com","confirmation_sent_at":"2024-03-01T10:00:00Z"}"#;
    assert_eq!(parse_sign_up(body).unwrap(), SignUpOutcome::ConfirmationRequired);
  }
}
