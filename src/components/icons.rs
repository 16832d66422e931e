#![allow(non_snake_case)]

use dioxus::prelude::*;

#[component]
fn Icon(class: String, children: Element) -> Element {
  rsx! {
    svg {
      class: "icon {class}",
      view_box: "0 0 24 24",
      width: "20",
      height: "20",
      fill: "none",
      stroke: "currentcolor",
      stroke_linecap: "round",
      stroke_linejoin: "round",
      stroke_width: "2",
      {children}
    }
  }
}

#[component]
pub fn TrendingUp() -> Element {
  rsx! {
    Icon { class: "trend-up",
      polyline { points: "22 7 13.5 15.5 8.5 10.5 2 17" }
      polyline { points: "16 7 22 7 22 13" }
    }
  }
}

#[component]
pub fn TrendingDown() -> Element {
  rsx! {
    Icon { class: "trend-down",
      polyline { points: "22 17 13.5 8.5 8.5 13.5 2 7" }
      polyline { points: "16 17 22 17 22 11" }
    }
  }
}

#[component]
pub fn CheckCircle() -> Element {
  rsx! {
    Icon { class: "status-executed",
      path { d: "M22 11.08V12a10 10 0 1 1-5.93-9.14" }
      polyline { points: "22 4 12 14.01 9 11.01" }
    }
  }
}

#[component]
pub fn Clock() -> Element {
  rsx! {
    Icon { class: "status-pending",
      circle { cx: "12", cy: "12", r: "10" }
      polyline { points: "12 6 12 12 16 14" }
    }
  }
}

#[component]
pub fn XCircle() -> Element {
  rsx! {
    Icon { class: "status-cancelled",
      circle { cx: "12", cy: "12", r: "10" }
      line { x1: "15", y1: "9", x2: "9", y2: "15" }
      line { x1: "9", y1: "9", x2: "15", y2: "15" }
    }
  }
}

#[component]
pub fn AlertCircle() -> Element {
  rsx! {
    Icon { class: "alert",
      circle { cx: "12", cy: "12", r: "10" }
      line { x1: "12", y1: "8", x2: "12", y2: "12" }
      line { x1: "12", y1: "16", x2: "12.01", y2: "16" }
    }
  }
}

#[component]
pub fn LogOut() -> Element {
  rsx! {
    Icon { class: "logout",
      path { d: "M9 21H5a2 2 0 0 1-2-2V5a2 2 0 0 1 2-2h4" }
      polyline { points: "16 17 21 12 16 7" }
      line { x1: "21", y1: "12", x2: "9", y2: "12" }
    }
  }
}
