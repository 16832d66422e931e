#![allow(non_snake_case)]

use dioxus::prelude::*;

#[component]
pub fn Spinner() -> Element {
  rsx! {
    div {
      class: "spinner-container",
      div { class: "spinner" }
    }
  }
}

/// Placeholder rows shown while a bulk read is in flight.
#[component]
pub fn TableSkeleton(rows: usize) -> Element {
  rsx! {
    div {
      class: "skeleton",
      for idx in 0..rows {
        div { key: "skeleton-row{idx}", class: "skeleton-row" }
      }
    }
  }
}
