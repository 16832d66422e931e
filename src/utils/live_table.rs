use std::{cmp::Ordering, fmt::Debug};
use dioxus::logger::tracing::{debug, warn};
use serde::de::DeserializeOwned;

use super::{error::AppError, realtime::{ChangeKind, RawChange}};

/// A table row that can be mirrored locally and patched by change events.
pub trait LiveRow: Clone + PartialEq + Debug + DeserializeOwned {
  type Key: PartialEq + Debug;
  type Patch: Clone + PartialEq + Debug + DeserializeOwned;

  fn key(&self) -> &Self::Key;
  fn patch_key(patch: &Self::Patch) -> &Self::Key;
  /// Overwrites the fields present in `patch`, leaving the rest untouched.
  fn merge(&mut self, patch: Self::Patch);
  /// Order the store reports rows in.
  fn sort_order(a: &Self, b: &Self) -> Ordering;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change<R: LiveRow> {
  Inserted(R),
  Updated(R::Patch),
}

impl<R: LiveRow> Change<R> {
  /// Decodes the row image of a raw feed event into this table's schema.
  pub fn decode(raw: RawChange) -> Result<Self, AppError> {
    match raw.kind {
      ChangeKind::Inserted => Ok(Change::Inserted(serde_json::from_value(raw.record)?)),
      ChangeKind::Updated => Ok(Change::Updated(serde_json::from_value(raw.record)?)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
  /// New key, prepended.
  Inserted,
  /// Insert for a key already present; entry replaced in place.
  Replaced,
  Merged,
  /// Patch carried nothing new (replayed or duplicate delivery).
  Unchanged,
  /// Update for a key not present locally; dropped.
  Ignored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveTable<R: LiveRow> {
  rows: Vec<R>,
}

impl<R: LiveRow> Default for LiveTable<R> {
  fn default() -> Self {
    Self { rows: Vec::new() }
  }
}

impl<R: LiveRow> LiveTable<R> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn rows(&self) -> &[R] {
    &self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  fn position(&self, key: &R::Key) -> Option<usize> {
    self.rows.iter().position(|row| row.key() == key)
  }

  /// Replaces everything with the bulk-read snapshot.
  pub fn load(&mut self, mut snapshot: Vec<R>) {
    snapshot.sort_by(R::sort_order);
    self.rows = snapshot;
  }

  pub fn apply(&mut self, change: Change<R>) -> Applied {
    match change {
      Change::Inserted(row) => match self.position(row.key()) {
        Some(idx) if self.rows[idx] == row => Applied::Unchanged,
        Some(idx) => {
          debug!("insert for existing key {:?}, replacing", row.key());
          self.rows[idx] = row;
          Applied::Replaced
        },
        None => {
          self.rows.insert(0, row);
          Applied::Inserted
        }
      },
      Change::Updated(patch) => {
        let Some(idx) = self.position(R::patch_key(&patch)) else {
          // TODO: buffer updates that arrive before the snapshot instead of dropping them
          warn!("update for unknown key {:?} ignored", R::patch_key(&patch));
          return Applied::Ignored;
        };
        let mut merged = self.rows[idx].clone();
        merged.merge(patch);
        if merged == self.rows[idx] {
          Applied::Unchanged
        } else {
          self.rows[idx] = merged;
          Applied::Merged
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::models::{Instruction, InstructionPatch, InstructionStatus, Quote, QuotePatch, Side};
  use chrono::{TimeZone, Utc};
  use rust_decimal_macros::dec;
  use serde_json::json;
  use uuid::Uuid;

  fn quote(symbol: &str, price: rust_decimal::Decimal) -> Quote {
    Quote {
      symbol: symbol.into(),
      price,
      change: dec!(0.5),
      volume: 1_000,
      last_update: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    }
  }

  fn price_patch(symbol: &str, price: rust_decimal::Decimal) -> QuotePatch {
    QuotePatch { symbol: symbol.into(), price: Some(price), change: None, volume: None, last_update: None }
  }

  fn instruction(n: u128, minute: u32) -> Instruction {
    Instruction {
      id: Uuid::from_u128(n),
      symbol: "GGAL".into(),
      side: Side::Buy,
      quantity: 10,
      price: dec!(15.5),
      status: InstructionStatus::Pending,
      timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
      user_id: Uuid::from_u128(99),
    }
  }

  fn status_patch(n: u128, status: InstructionStatus) -> InstructionPatch {
    InstructionPatch {
      id: Uuid::from_u128(n),
      symbol: None,
      side: None,
      quantity: None,
      price: None,
      status: Some(status),
      timestamp: None,
      user_id: None,
    }
  }

  #[test]
  fn load_sorts_quotes_by_symbol() {
    let mut table = LiveTable::new();
    table.load(vec![quote("YPF", dec!(1)), quote("ALUA", dec!(2)), quote("GGAL", dec!(3))]);
    let symbols: Vec<_> = table.rows().iter().map(|q| q.symbol.as_str()).collect();
    assert_eq!(symbols, ["ALUA", "GGAL", "YPF"]);
  }

  #[test]
  fn load_sorts_instructions_newest_first() {
    let mut table = LiveTable::new();
    table.load(vec![instruction(1, 0), instruction(2, 30), instruction(3, 15)]);
    let ids: Vec<_> = table.rows().iter().map(|i| i.id.as_u128()).collect();
    assert_eq!(ids, [2, 3, 1]);
  }

  #[test]
  fn update_overwrites_only_present_fields() {
    let mut table = LiveTable::new();
    table.load(vec![quote("YPF", dec!(100))]);

    assert_eq!(table.apply(Change::Updated(price_patch("YPF", dec!(105)))), Applied::Merged);

    let ypf = &table.rows()[0];
    assert_eq!(ypf.price, dec!(105));
    assert_eq!(ypf.change, dec!(0.5));
    assert_eq!(ypf.volume, 1_000);
    assert_eq!(ypf.last_update, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
  }

  #[test]
  fn replayed_update_is_a_no_op() {
    let mut table = LiveTable::new();
    table.load(vec![quote("YPF", dec!(100))]);
    table.apply(Change::Updated(price_patch("YPF", dec!(105))));
    let before = table.clone();

    assert_eq!(table.apply(Change::Updated(price_patch("YPF", dec!(105)))), Applied::Unchanged);
    assert_eq!(table, before);
  }

  #[test]
  fn update_for_unknown_key_is_ignored() {
    let mut table = LiveTable::new();
    table.load(vec![quote("YPF", dec!(100))]);
    let before = table.clone();

    assert_eq!(table.apply(Change::Updated(price_patch("PAMP", dec!(7)))), Applied::Ignored);
    assert_eq!(table, before);

    let mut empty: LiveTable<Quote> = LiveTable::new();
    assert_eq!(empty.apply(Change::Updated(price_patch("YPF", dec!(7)))), Applied::Ignored);
    assert!(empty.is_empty());
  }

  #[test]
  fn inserts_are_prepended() {
    let mut table = LiveTable::new();
    table.load(vec![instruction(1, 0)]);

    assert_eq!(table.apply(Change::Inserted(instruction(2, 5))), Applied::Inserted);
    assert_eq!(table.rows()[0].id, Uuid::from_u128(2));
    assert_eq!(table.len(), 2);
  }

  #[test]
  fn duplicate_insert_never_duplicates_a_key() {
    let mut table = LiveTable::new();
    table.load(vec![instruction(1, 0)]);

    assert_eq!(table.apply(Change::Inserted(instruction(1, 0))), Applied::Unchanged);
    let mut executed = instruction(1, 0);
    executed.status = InstructionStatus::Executed;
    assert_eq!(table.apply(Change::Inserted(executed)), Applied::Replaced);

    assert_eq!(table.len(), 1);
    assert_eq!(table.rows()[0].status, InstructionStatus::Executed);
  }

  #[test]
  fn keys_are_snapshot_union_inserts_and_fields_follow_last_patch() {
    let mut table = LiveTable::new();
    table.load(vec![instruction(1, 0), instruction(2, 1)]);

    let events = vec![
      Change::Inserted(instruction(3, 2)),
      Change::Updated(status_patch(1, InstructionStatus::Executed)),
      Change::Updated(status_patch(4, InstructionStatus::Cancelled)),
      Change::Updated(status_patch(3, InstructionStatus::Cancelled)),
      Change::Inserted(instruction(3, 2)),
      Change::Updated(status_patch(3, InstructionStatus::Cancelled)),
    ];
    for event in events.clone() {
      table.apply(event);
    }
    let once = table.clone();
    for event in events.into_iter().filter(|e| matches!(e, Change::Updated(_))) {
      table.apply(event);
    }
    assert_eq!(table, once);

    let mut ids: Vec<_> = table.rows().iter().map(|i| i.id.as_u128()).collect();
    ids.sort();
    assert_eq!(ids, [1, 2, 3]);

    let status_of = |n: u128| table.rows().iter().find(|i| i.id.as_u128() == n).map(|i| i.status);
    assert_eq!(status_of(1), Some(InstructionStatus::Executed));
    assert_eq!(status_of(2), Some(InstructionStatus::Pending));
    assert_eq!(status_of(3), Some(InstructionStatus::Cancelled));
  }

  #[test]
  fn decodes_raw_feed_events_per_table_schema() {
    let raw = RawChange {
      kind: ChangeKind::Updated,
      table: "market_data".into(),
      record: json!({ "symbol": "YPF", "price": 105, "change": 0.5, "volume": 1000, "last_update": "2024-03-01T10:00:00+00:00" }),
    };
    let change = Change::<Quote>::decode(raw).unwrap();
    assert!(matches!(change, Change::Updated(ref p) if p.price == Some(dec!(105))));

    let bad = RawChange { kind: ChangeKind::Inserted, table: "market_data".into(), record: json!({ "symbol": "YPF" }) };
    assert!(matches!(Change::<Quote>::decode(bad), Err(AppError::Validation(_))));
  }
}
