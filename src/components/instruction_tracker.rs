#![allow(non_snake_case)]

use dioxus::{logger::tracing::{error, info}, prelude::*};

use crate::{
  components::{icons::{AlertCircle, CheckCircle, Clock, XCircle}, loading::TableSkeleton},
  utils::{
    live_feed::{follow, FeedStatus},
    live_table::LiveTable,
    models::{format_local_datetime, format_price, Instruction, InstructionStatus, Side, INSTRUCTIONS_TABLE},
    realtime::{ChannelSpec, EventFilter},
    session::SessionContext,
    supabase::Services,
  },
};

const INSTRUCTIONS_CHANNEL: &str = "instruction_changes";

#[component]
pub fn InstructionTracker() -> Element {
  let services = use_context::<Services>();
  let session = use_context::<SessionContext>();
  let mut instructions = use_signal(LiveTable::<Instruction>::new);
  let mut loading = use_signal(|| true);
  let mut load_error = use_signal(|| None::<String>);
  let feed_status = use_signal(|| FeedStatus::Connecting);

  let store = services.store.clone();
  use_future(move || {
    let store = store.clone();
    async move {
      match store.select_instructions(session.access_token()).await {
        Ok(rows) => {
          info!("loaded {} instructions", rows.len());
          instructions.write().load(rows);
        },
        Err(e) => {
          error!("error fetching instructions: {}", e);
          load_error.set(Some(e.to_string()));
        }
      }
      loading.set(false);
    }
  });

  // Subscribed alongside the bulk read; updates for rows not loaded yet are dropped.
  use_future(move || {
    let feed = services.feed.clone();
    follow::<Instruction>(feed, ChannelSpec::new(INSTRUCTIONS_CHANNEL, INSTRUCTIONS_TABLE, EventFilter::All), session, instructions, feed_status)
  });

  let rows = instructions.read().rows().to_vec();

  rsx! {
    section {
      class: "panel instruction-tracker",
      h2 { "Instruction Tracker" },
      if let Some(problem) = feed_status.read().problem() {
        div {
          class: "feed-warning",
          AlertCircle {},
          span { "{problem}" }
        }
      },
      if let Some(message) = load_error() {
        div {
          class: "inline-error",
          AlertCircle {},
          span { "{message}" }
        }
      } else if loading() {
        TableSkeleton { rows: 4 }
      } else if instructions.read().is_empty() {
        p { class: "empty", "No instructions yet" }
      } else {
        table {
          class: "instructions-table",
          thead {
            tr {
              th { scope: "col", "ID" },
              th { scope: "col", "Symbol" },
              th { scope: "col", "Type" },
              th { scope: "col", "Quantity" },
              th { scope: "col", "Price" },
              th { scope: "col", "Status" },
              th { scope: "col", "Time" },
            }
          }
          tbody {
            for instruction in rows {
              InstructionRow { key: "{instruction.id}", instruction: instruction.clone() }
            }
          }
        }
      }
    }
  }
}

#[component]
fn InstructionRow(instruction: Instruction) -> Element {
  let side_class = match instruction.side {
    Side::Buy => "side buy",
    Side::Sell => "side sell",
  };
  let price = format_price(instruction.price);
  let placed = format_local_datetime(instruction.timestamp);

  rsx! {
    tr {
      td { class: "instruction-id", "{instruction.id}" },
      td { class: "symbol", "{instruction.symbol}" },
      td { class: side_class, "{instruction.side}" },
      td { "{instruction.quantity}" },
      td { "{price}" },
      td { StatusBadge { status: instruction.status } },
      td { "{placed}" },
    }
  }
}

#[component]
fn StatusBadge(status: InstructionStatus) -> Element {
  let class = format!("status-badge {}", status.to_string().to_lowercase());
  rsx! {
    span {
      class: "{class}",
      {match status {
        InstructionStatus::Executed => rsx! { CheckCircle {} },
        InstructionStatus::Pending => rsx! { Clock {} },
        InstructionStatus::Cancelled => rsx! { XCircle {} },
      }},
      "{status}"
    }
  }
}
