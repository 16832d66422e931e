use std::{cmp::Ordering, fmt, str::FromStr};
use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{error::AppError, live_table::LiveRow};

pub const QUOTES_TABLE: &str = "market_data";
pub const INSTRUCTIONS_TABLE: &str = "instructions";

/* Table rows */
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
  pub symbol: String,
  pub price: Decimal,
  pub change: Decimal,
  pub volume: u64,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuotePatch {
  pub symbol: String,
  pub price: Option<Decimal>,
  pub change: Option<Decimal>,
  pub volume: Option<u64>,
  #[serde(default, deserialize_with = "timestamp::deserialize_option")]
  pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Instruction {
  pub id: Uuid,
  pub symbol: String,
  #[serde(rename = "type")]
  pub side: Side,
  pub quantity: u32,
  pub price: Decimal,
  pub status: InstructionStatus,
  #[serde(deserialize_with = "timestamp::deserialize")]
  pub timestamp: DateTime<Utc>,
  pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstructionPatch {
  pub id: Uuid,
  pub symbol: Option<String>,
  #[serde(rename = "type")]
  pub side: Option<Side>,
  pub quantity: Option<u32>,
  pub price: Option<Decimal>,
  pub status: Option<InstructionStatus>,
  #[serde(default, deserialize_with = "timestamp::deserialize_option")]
  pub timestamp: Option<DateTime<Utc>>,
  pub user_id: Option<Uuid>,
}

/// Insert payload for the `instructions` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInstructionRow {
  pub symbol: String,
  #[serde(rename = "type")]
  pub side: Side,
  pub quantity: u32,
  #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
  pub price: Decimal,
  pub user_id: Uuid,
  pub status: InstructionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
  Buy,
  Sell,
}

impl fmt::Display for Side {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Buy => write!(f, "BUY"),
      Self::Sell => write!(f, "SELL"),
    }
  }
}

impl FromStr for Side {
  type Err = AppError;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "BUY" => Ok(Side::Buy),
      "SELL" => Ok(Side::Sell),
      _ => Err(AppError::Validation(format!("Invalid side: {}", s)))
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstructionStatus {
  Pending,
  Executed,
  Cancelled,
}

impl fmt::Display for InstructionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Pending => write!(f, "PENDING"),
      Self::Executed => write!(f, "EXECUTED"),
      Self::Cancelled => write!(f, "CANCELLED"),
    }
  }
}

/* Auth */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: Uuid,
  #[serde(default)]
  pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
  pub access_token: String,
  pub refresh_token: String,
  #[serde(default)]
  pub expires_in: Option<u64>,
  /// Unix seconds.
  #[serde(default)]
  pub expires_at: Option<i64>,
  pub user: User,
}

/* Reconciliation keys and ordering */
impl LiveRow for Quote {
  type Key = String;
  type Patch = QuotePatch;

  fn key(&self) -> &String {
    &self.symbol
  }

  fn patch_key(patch: &QuotePatch) -> &String {
    &patch.symbol
  }

  fn merge(&mut self, patch: QuotePatch) {
    if let Some(price) = patch.price { self.price = price; }
    if let Some(change) = patch.change { self.change = change; }
    if let Some(volume) = patch.volume { self.volume = volume; }
    if let Some(last_update) = patch.last_update { self.last_update = last_update; }
  }

  // symbol ascending
  fn sort_order(a: &Self, b: &Self) -> Ordering {
    a.symbol.cmp(&b.symbol)
  }
}

impl LiveRow for Instruction {
  type Key = Uuid;
  type Patch = InstructionPatch;

  fn key(&self) -> &Uuid {
    &self.id
  }

  fn patch_key(patch: &InstructionPatch) -> &Uuid {
    &patch.id
  }

  fn merge(&mut self, patch: InstructionPatch) {
    if let Some(symbol) = patch.symbol { self.symbol = symbol; }
    if let Some(side) = patch.side { self.side = side; }
    if let Some(quantity) = patch.quantity { self.quantity = quantity; }
    if let Some(price) = patch.price { self.price = price; }
    if let Some(status) = patch.status { self.status = status; }
    if let Some(timestamp) = patch.timestamp { self.timestamp = timestamp; }
    if let Some(user_id) = patch.user_id { self.user_id = user_id; }
  }

  // newest first
  fn sort_order(a: &Self, b: &Self) -> Ordering {
    b.timestamp.cmp(&a.timestamp)
  }
}

/* Display helpers */
pub fn format_price(price: Decimal) -> String {
  format!("${:.2}", price)
}

pub fn format_volume(volume: u64) -> String {
  let digits = volume.to_string();
  let mut out = String::with_capacity(digits.len() + digits.len() / 3);
  for (idx, ch) in digits.chars().enumerate() {
    if idx > 0 && (digits.len() - idx) % 3 == 0 {
      out.push(',');
    }
    out.push(ch);
  }
  out
}

pub fn format_local_time(ts: DateTime<Utc>) -> String {
  ts.with_timezone(&Local).format("%H:%M:%S").to_string()
}

pub fn format_local_datetime(ts: DateTime<Utc>) -> String {
  ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamp decoding for both REST and realtime payloads.
/// Accepts RFC 3339 with offset, Postgres text output (`2024-01-02 10:00:00+00`)
/// and naive ISO 8601 which is taken as UTC.
pub(crate) mod timestamp {
  use chrono::{DateTime, NaiveDateTime, Utc};
  use serde::{de, Deserialize, Deserializer};

  pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
      return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
      return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
      if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Ok(naive.and_utc());
      }
    }
    Err(format!("invalid timestamp: {}", raw))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(de::Error::custom)
  }

  pub fn deserialize_option<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    Option::<String>::deserialize(deserializer)?
      .map(|raw| parse(&raw))
      .transpose()
      .map_err(de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;
  use rust_decimal_macros::dec;
  use serde_json::json;

  #[test]
  fn decodes_quote_row_from_rest_payload() {
    let quote: Quote = serde_json::from_value(json!({
      "symbol": "YPF",
      "price": 100.25,
      "change": -1.5,
      "volume": 1200,
      "last_update": "2024-03-01T14:30:00.123456+00:00"
    })).unwrap();

    assert_eq!(quote.symbol, "YPF");
    assert_eq!(quote.price, dec!(100.25));
    assert_eq!(quote.change, dec!(-1.5));
    assert_eq!(quote.last_update.timestamp(), Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap().timestamp());
  }

  #[test]
  fn missing_column_fails_loudly() {
    let result = serde_json::from_value::<Quote>(json!({ "symbol": "YPF", "price": 1 }));
    assert!(result.is_err());
  }

  #[test]
  fn decodes_instruction_with_side_under_type_column() {
    let row: Instruction = serde_json::from_value(json!({
      "id": "6f1c8a3e-9a57-4b0e-9c55-0d6c7a2f4e11",
      "symbol": "GGAL",
      "type": "SELL",
      "quantity": 10,
      "price": 15.5,
      "status": "EXECUTED",
      "timestamp": "2024-03-01 14:30:00+00",
      "user_id": "0b5f6a44-1111-4c3a-8e1e-2f0d5c9b7a10"
    })).unwrap();

    assert_eq!(row.side, Side::Sell);
    assert_eq!(row.status, InstructionStatus::Executed);
    assert_eq!(row.price, dec!(15.5));
  }

  #[test]
  fn unknown_status_is_rejected() {
    let result = serde_json::from_value::<InstructionPatch>(json!({
      "id": "6f1c8a3e-9a57-4b0e-9c55-0d6c7a2f4e11",
      "status": "FILLED"
    }));
    assert!(result.is_err());
  }

  #[test]
  fn patch_without_optional_columns_decodes() {
    let patch: QuotePatch = serde_json::from_value(json!({ "symbol": "YPF", "price": 105 })).unwrap();
    assert_eq!(patch.price, Some(dec!(105)));
    assert_eq!(patch.volume, None);
    assert_eq!(patch.last_update, None);
  }

  #[test]
  fn naive_timestamps_are_read_as_utc() {
    let ts = timestamp::parse("2024-03-01T14:30:00.5").unwrap();
    assert_eq!(ts.timestamp(), Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap().timestamp());
    assert!(timestamp::parse("yesterday").is_err());
  }

  #[test]
  fn insert_row_serializes_store_column_names() {
    let row = NewInstructionRow {
      symbol: "GGAL".into(),
      side: Side::Buy,
      quantity: 10,
      price: dec!(15.50),
      user_id: Uuid::nil(),
      status: InstructionStatus::Pending,
    };
    let value = serde_json::to_value(&row).unwrap();
    assert_eq!(value["type"], "BUY");
    assert_eq!(value["status"], "PENDING");
    assert_eq!(value["price"], 15.5);
    assert_eq!(value["user_id"], "00000000-0000-0000-0000-000000000000");
  }

  #[test]
  fn side_parses_case_insensitively() {
    assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
    assert!("hold".parse::<Side>().is_err());
  }

  #[test]
  fn formats_prices_and_volumes() {
    assert_eq!(format_price(dec!(15.5)), "$15.50");
    assert_eq!(format_volume(0), "0");
    assert_eq!(format_volume(999), "999");
    assert_eq!(format_volume(1_500_000), "1,500,000");
  }
}
