use std::{rc::Rc, time::Duration};
use dioxus::{logger::tracing::{debug, error, info, warn}, prelude::*};
use tokio::sync::mpsc::UnboundedReceiver;

use super::{
  live_table::{Change, LiveRow, LiveTable},
  realtime::{ChangeFeed, ChannelSpec, RawChange},
  session::SessionContext,
};

/// Waits between resubscription attempts; the last one repeats.
const RETRY_DELAYS: [Duration; 4] = [
  Duration::from_secs(1),
  Duration::from_secs(2),
  Duration::from_secs(5),
  Duration::from_secs(10),
];

#[derive(Debug, Clone, Default)]
pub struct Backoff {
  attempt: usize,
}

impl Backoff {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_delay(&mut self) -> Duration {
    let delay = RETRY_DELAYS[self.attempt.min(RETRY_DELAYS.len() - 1)];
    self.attempt += 1;
    delay
  }

  pub fn reset(&mut self) {
    self.attempt = 0;
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
  Connecting,
  Live,
  Down(String),
}

impl FeedStatus {
  /// Text to show inline while live updates are unavailable.
  pub fn problem(&self) -> Option<String> {
    match self {
      FeedStatus::Down(reason) => Some(format!("Live updates unavailable: {}. Reconnecting...", reason)),
      _ => None,
    }
  }
}

/// Decodes and hands over changes until the feed ends. Returns how many were delivered.
pub async fn pump_changes<R: LiveRow>(changes: &mut UnboundedReceiver<RawChange>, mut deliver: impl FnMut(Change<R>)) -> usize {
  let mut delivered = 0;
  while let Some(raw) = changes.recv().await {
    let table = raw.table.clone();
    match Change::<R>::decode(raw) {
      Ok(change) => {
        deliver(change);
        delivered += 1;
      },
      Err(e) => error!("skipping undecodable {} event: {}", table, e),
    }
  }
  delivered
}

/// Mirrors `spec` into `rows` for as long as the calling task lives, resubscribing
/// with backoff whenever the feed fails or closes.
pub async fn follow<R: LiveRow + 'static>(
  feed: Rc<dyn ChangeFeed>,
  spec: ChannelSpec,
  session: SessionContext,
  mut rows: Signal<LiveTable<R>>,
  mut status: Signal<FeedStatus>,
) {
  let mut backoff = Backoff::new();
  loop {
    match feed.subscribe(spec.clone(), session.access_token()).await {
      Ok((subscription, mut changes)) => {
        info!("following {}", subscription.topic());
        status.set(FeedStatus::Live);
        let delivered = pump_changes::<R>(&mut changes, |change| {
          let outcome = rows.write().apply(change);
          debug!("{} change: {:?}", spec.table, outcome);
        }).await;
        if delivered > 0 {
          backoff.reset();
        }
        warn!("feed {} closed after {} changes, {} rows held", subscription.topic(), delivered, rows.peek().len());
        status.set(FeedStatus::Down("connection closed".to_string()));
      },
      Err(e) => {
        error!("{} feed unavailable: {}", spec.table, e);
        status.set(FeedStatus::Down(e.to_string()));
      }
    }
    async_std::task::sleep(backoff.next_delay()).await;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::utils::{models::{Quote, QuotePatch}, realtime::ChangeKind};
  use futures::executor::block_on;
  use rust_decimal_macros::dec;
  use serde_json::json;
  use tokio::sync::mpsc;

  #[test]
  fn backoff_grows_then_holds_at_the_cap() {
    let mut backoff = Backoff::new();
    let delays: Vec<_> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
    assert_eq!(delays, [1, 2, 5, 10, 10, 10]);

    backoff.reset();
    assert_eq!(backoff.next_delay(), Duration::from_secs(1));
  }

  #[test]
  fn only_a_down_feed_reports_a_problem() {
    assert_eq!(FeedStatus::Connecting.problem(), None);
    assert_eq!(FeedStatus::Live.problem(), None);
    let shown = FeedStatus::Down("connection closed".into()).problem().unwrap();
    assert!(shown.contains("connection closed"));
  }

  #[test]
  fn pump_delivers_decodable_changes_until_the_feed_ends() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tx.send(RawChange { kind: ChangeKind::Updated, table: "market_data".into(), record: json!({ "symbol": "YPF", "price": 105 }) }).unwrap();
    tx.send(RawChange { kind: ChangeKind::Inserted, table: "market_data".into(), record: json!({ "symbol": "YPF" }) }).unwrap();
    tx.send(RawChange { kind: ChangeKind::Updated, table: "market_data".into(), record: json!({ "symbol": "GGAL", "volume": 7 }) }).unwrap();
    drop(tx);

    let mut seen: Vec<Change<Quote>> = Vec::new();
    let delivered = block_on(pump_changes(&mut rx, |change| seen.push(change)));

    assert_eq!(delivered, 2);
    assert_eq!(seen, vec![
      Change::Updated(QuotePatch { symbol: "YPF".into(), price: Some(dec!(105)), change: None, volume: None, last_update: None }),
      Change::Updated(QuotePatch { symbol: "GGAL".into(), price: None, change: None, volume: Some(7), last_update: None }),
    ]);
  }

  #[test]
  fn pump_returns_immediately_on_a_closed_feed() {
    let (tx, mut rx) = mpsc::unbounded_channel::<RawChange>();
    drop(tx);
    assert_eq!(block_on(pump_changes::<Quote>(&mut rx, |_| panic!("nothing to deliver"))), 0);
  }
}
