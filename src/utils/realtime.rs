use std::{cell::Cell, rc::Rc, time::Duration};
use dioxus::logger::tracing::{debug, error, info, warn};
use futures::{future::LocalBoxFuture, FutureExt, SinkExt};
use futures_util::StreamExt;
use gloo_net::websocket::{futures::WebSocket, Message};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use wasm_bindgen_futures::spawn_local;

use super::{config::SupabaseConfig, error::AppError};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const JOIN_REF: &str = "1";
const PHOENIX_TOPIC: &str = "phoenix";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  Inserted,
  Updated,
}

/// One row change as delivered by the feed, before table-specific decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
  pub kind: ChangeKind,
  pub table: String,
  pub record: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
  All,
  Updates,
}

impl EventFilter {
  fn as_str(&self) -> &'static str {
    match self {
      EventFilter::All => "*",
      EventFilter::Updates => "UPDATE",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSpec {
  pub name: String,
  pub table: String,
  pub events: EventFilter,
}

impl ChannelSpec {
  pub fn new(name: &str, table: &str, events: EventFilter) -> Self {
    Self { name: name.to_string(), table: table.to_string(), events }
  }

  pub fn topic(&self) -> String {
    format!("realtime:{}", self.name)
  }
}

/// Handle to a live feed. Released exactly once, by `close` or on drop.
pub struct Subscription {
  topic: String,
  release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
  pub fn new(topic: impl Into<String>, release: impl FnOnce() + 'static) -> Self {
    Self { topic: topic.into(), release: Some(Box::new(release)) }
  }

  pub fn topic(&self) -> &str {
    &self.topic
  }

  pub fn close(&mut self) {
    if let Some(release) = self.release.take() {
      info!("releasing subscription {}", self.topic);
      release();
    }
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.close();
  }
}

pub trait ChangeFeed {
  fn subscribe(&self, spec: ChannelSpec, access_token: Option<String>)
    -> LocalBoxFuture<'_, Result<(Subscription, UnboundedReceiver<RawChange>), AppError>>;
}

/* Phoenix channel wire format */
#[derive(Debug, Serialize, Deserialize)]
struct PhoenixFrame {
  topic: String,
  event: String,
  payload: Value,
  #[serde(rename = "ref")]
  reference: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  join_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
  #[serde(rename = "type")]
  kind: String,
  table: String,
  #[serde(default)]
  record: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
  Change(RawChange),
  Reply { reference: Option<String>, ok: bool, detail: String },
  System { ok: bool, message: String },
  Closed(String),
  Other,
}

fn encode(frame: &PhoenixFrame) -> String {
  // a struct of strings and json values always serializes
  serde_json::to_string(frame).unwrap_or_default()
}

pub fn join_frame(spec: &ChannelSpec, access_token: &str) -> String {
  encode(&PhoenixFrame {
    topic: spec.topic(),
    event: "phx_join".to_string(),
    payload: json!({
      "config": {
        "broadcast": { "ack": false, "self": false },
        "presence": { "key": "" },
        "postgres_changes": [{ "event": spec.events.as_str(), "schema": "public", "table": spec.table }],
        "private": false
      },
      "access_token": access_token
    }),
    reference: Some(JOIN_REF.to_string()),
    join_ref: Some(JOIN_REF.to_string()),
  })
}

pub fn heartbeat_frame(reference: &str) -> String {
  encode(&PhoenixFrame {
    topic: PHOENIX_TOPIC.to_string(),
    event: "heartbeat".to_string(),
    payload: json!({}),
    reference: Some(reference.to_string()),
    join_ref: None,
  })
}

pub fn leave_frame(spec: &ChannelSpec, reference: &str) -> String {
  encode(&PhoenixFrame {
    topic: spec.topic(),
    event: "phx_leave".to_string(),
    payload: json!({}),
    reference: Some(reference.to_string()),
    join_ref: Some(JOIN_REF.to_string()),
  })
}

pub fn parse_frame(text: &str) -> Result<Incoming, AppError> {
  let frame = serde_json::from_str::<PhoenixFrame>(text)?;
  let incoming = match frame.event.as_str() {
    "postgres_changes" => {
      let data = serde_json::from_value::<ChangeData>(frame.payload["data"].clone())?;
      let kind = match data.kind.as_str() {
        "INSERT" => ChangeKind::Inserted,
        "UPDATE" => ChangeKind::Updated,
        other => {
          debug!("skipping {} change on {}", other, data.table);
          return Ok(Incoming::Other);
        }
      };
      Incoming::Change(RawChange { kind, table: data.table, record: data.record })
    },
    "phx_reply" => Incoming::Reply {
      reference: frame.reference,
      ok: frame.payload["status"] == "ok",
      detail: frame.payload["response"].to_string(),
    },
    "system" => Incoming::System {
      ok: frame.payload["status"] == "ok",
      message: frame.payload["message"].as_str().unwrap_or_default().to_string(),
    },
    "phx_error" | "phx_close" => Incoming::Closed(frame.event),
    _ => Incoming::Other,
  };
  Ok(incoming)
}

fn next_ref(counter: &Cell<u64>) -> String {
  let next = counter.get() + 1;
  counter.set(next);
  next.to_string()
}

enum Outbound {
  Frame(String),
  Close,
}

/// Realtime client over one websocket per subscription.
pub struct RealtimeFeed {
  url: String,
  anon_key: String,
}

impl RealtimeFeed {
  pub fn new(config: &SupabaseConfig) -> Self {
    Self { url: config.realtime_url(), anon_key: config.anon_key().to_string() }
  }
}

impl ChangeFeed for RealtimeFeed {
  fn subscribe(&self, spec: ChannelSpec, access_token: Option<String>)
    -> LocalBoxFuture<'_, Result<(Subscription, UnboundedReceiver<RawChange>), AppError>> {
    async move {
      let ws = WebSocket::open(&self.url).map_err(|e| AppError::Realtime(e.to_string()))?;
      let (mut write, mut read) = ws.split();

      let token = access_token.unwrap_or_else(|| self.anon_key.clone());
      write.send(Message::Text(join_frame(&spec, &token))).await.map_err(|e| AppError::Realtime(e.to_string()))?;
      info!("join sent for {}", spec.topic());

      let refs = Rc::new(Cell::new(1u64));
      let closed = Rc::new(Cell::new(false));
      let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
      let (event_tx, event_rx) = mpsc::unbounded_channel::<RawChange>();

      // writer: sole owner of the sink
      spawn_local(async move {
        while let Some(outbound) = out_rx.recv().await {
          match outbound {
            Outbound::Frame(frame) => {
              if let Err(e) = write.send(Message::Text(frame)).await {
                warn!("realtime send failed: {}", e);
                break;
              }
            },
            Outbound::Close => break,
          }
        }
        if let Err(e) = write.close().await {
          debug!("realtime socket close: {}", e);
        }
      });

      spawn_local({
        let out_tx = out_tx.clone();
        let closed = closed.clone();
        let refs = refs.clone();
        async move {
          loop {
            async_std::task::sleep(HEARTBEAT_INTERVAL).await;
            if closed.get() || out_tx.send(Outbound::Frame(heartbeat_frame(&next_ref(&refs)))).is_err() {
              break;
            }
          }
        }
      });

      spawn_local({
        let closed = closed.clone();
        let topic = spec.topic();
        async move {
          while let Some(msg) = read.next().await {
            if closed.get() {
              break;
            }
            let text = match msg {
              Ok(Message::Text(text)) => text,
              Ok(Message::Bytes(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
              Err(e) => {
                warn!("realtime read failed on {}: {}", topic, e);
                break;
              }
            };
            match parse_frame(&text) {
              Ok(Incoming::Change(change)) => {
                if event_tx.send(change).is_err() {
                  break;
                }
              },
              Ok(Incoming::Reply { reference, ok, detail }) if reference.as_deref() == Some(JOIN_REF) => {
                if ok {
                  info!("joined {}", topic);
                } else {
                  error!("join rejected for {}: {}", topic, detail);
                  break;
                }
              },
              Ok(Incoming::System { ok: false, message }) => warn!("realtime system error on {}: {}", topic, message),
              Ok(Incoming::Closed(reason)) => {
                warn!("channel {} closed by server: {}", topic, reason);
                break;
              },
              Ok(_) => {},
              Err(e) => error!("undecodable realtime frame on {}: {}", topic, e),
            }
          }
          debug!("realtime reader stopped for {}", topic);
        }
      });

      let leave = leave_frame(&spec, &next_ref(&refs));
      let subscription = Subscription::new(spec.topic(), move || {
        closed.set(true);
        if out_tx.send(Outbound::Frame(leave)).is_err() || out_tx.send(Outbound::Close).is_err() {
          debug!("realtime writer already stopped");
        }
      });

      Ok((subscription, event_rx))
    }.boxed_local()
  }
}
