#![allow(non_snake_case)]

use dioxus::{logger::tracing::{error, info}, prelude::*};
use rust_decimal::Decimal;

use crate::{
  components::{icons::{AlertCircle, TrendingDown, TrendingUp}, loading::TableSkeleton},
  utils::{
    live_feed::{follow, FeedStatus},
    live_table::LiveTable,
    models::{format_local_time, format_price, format_volume, Quote, QUOTES_TABLE},
    realtime::{ChannelSpec, EventFilter},
    session::SessionContext,
    supabase::Services,
  },
};

const QUOTES_CHANNEL: &str = "market_data_changes";

#[component]
pub fn MarketDataView() -> Element {
  let services = use_context::<Services>();
  let session = use_context::<SessionContext>();
  let mut quotes = use_signal(LiveTable::<Quote>::new);
  let mut loading = use_signal(|| true);
  let mut load_error = use_signal(|| None::<String>);
  let feed_status = use_signal(|| FeedStatus::Connecting);

  let mut bulk_read = use_resource({
    let services = services.clone();
    move || {
      let store = services.store.clone();
      async move {
        loading.set(true);
        load_error.set(None);
        match store.select_quotes(session.access_token()).await {
          Ok(rows) => {
            info!("loaded {} quotes", rows.len());
            quotes.write().load(rows);
          },
          Err(e) => {
            error!("error fetching market data: {}", e);
            load_error.set(Some(e.to_string()));
          }
        }
        loading.set(false);
      }
    }
  });

  // Subscribed alongside the bulk read; updates for rows not loaded yet are dropped.
  use_future(move || {
    let feed = services.feed.clone();
    follow::<Quote>(feed, ChannelSpec::new(QUOTES_CHANNEL, QUOTES_TABLE, EventFilter::Updates), session, quotes, feed_status)
  });

  let rows = quotes.read().rows().to_vec();

  rsx! {
    section {
      class: "panel market-data",
      h2 { "Market Data" },
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
          span { "{message}" },
          button {
            class: "retry-button",
            r#type: "button",
            onclick: move |_| bulk_read.restart(),
            "Retry"
          }
        }
      } else if loading() {
        TableSkeleton { rows: 5 }
      } else {
        table {
          class: "quotes-table",
          thead {
            tr {
              th { scope: "col", "Symbol" },
              th { scope: "col", "Price" },
              th { scope: "col", "Change" },
              th { scope: "col", "Volume" },
              th { scope: "col", "Last Update" },
            }
          }
          tbody {
            for quote in rows {
              QuoteRow { key: "{quote.symbol}", quote: quote.clone() }
            }
          }
        }
      }
    }
  }
}

#[component]
fn QuoteRow(quote: Quote) -> Element {
  let rising = quote.change >= Decimal::ZERO;
  let change_class = if rising { "change positive" } else { "change negative" };
  let price = format_price(quote.price);
  let volume = format_volume(quote.volume);
  let updated = format_local_time(quote.last_update);

  rsx! {
    tr {
      td { class: "symbol", "{quote.symbol}" },
      td { "{price}" },
      td {
        class: change_class,
        if rising { TrendingUp {} } else { TrendingDown {} }
        span { "{quote.change:.2}%" }
      },
      td { "{volume}" },
      td { "{updated}" },
    }
  }
}
