#![allow(non_snake_case)]

use dioxus::{logger::tracing::error, prelude::*};

use crate::{
  components::icons::AlertCircle,
  utils::{
    models::{Instruction, Side},
    session::SessionContext,
    submission::{submit_instruction, FormState},
    supabase::Services,
  },
};

#[component]
pub fn InstructionForm(on_created: Option<EventHandler<Instruction>>) -> Element {
  let services = use_context::<Services>();
  let session = use_context::<SessionContext>();
  let mut entry = use_signal(FormState::default);
  let mut submitting = use_signal(|| false);

  let on_submit = move |evt: FormEvent| {
    evt.prevent_default();
    let store = services.store.clone();
    async move {
      entry.write().error = None;
      submitting.set(true);
      let draft = entry.peek().draft.clone();
      let result = submit_instruction(&session.peek(), &*store, &draft).await;
      if let Err(e) = &result {
        error!("error creating instruction: {}", e);
      }
      // settle a copy so the callback runs without the signal borrowed
      let mut next = entry.peek().clone();
      next.settle(result, |stored| {
        if let Some(handler) = on_created {
          handler.call(stored);
        }
      });
      entry.set(next);
      submitting.set(false);
    }
  };

  let FormState { draft, error: submit_error } = entry();

  rsx! {
    section {
      class: "panel instruction-form",
      h2 { "New Instruction" },
      form {
        onsubmit: on_submit,
        div {
          class: "field",
          label { r#for: "symbol", "Symbol" },
          input {
            id: "symbol",
            r#type: "text",
            placeholder: "GGAL",
            required: true,
            value: "{draft.symbol}",
            oninput: move |evt| entry.write().draft.symbol = evt.value()
          }
        },
        div {
          class: "field",
          label { r#for: "side", "Type" },
          select {
            id: "side",
            value: "{draft.side}",
            onchange: move |evt| {
              if let Ok(parsed) = evt.value().parse::<Side>() {
                entry.write().draft.side = parsed;
              }
            },
            option { value: "BUY", "Buy" },
            option { value: "SELL", "Sell" }
          }
        },
        div {
          class: "field",
          label { r#for: "quantity", "Quantity" },
          input {
            id: "quantity",
            r#type: "number",
            min: "1",
            step: "1",
            required: true,
            value: "{draft.quantity}",
            oninput: move |evt| entry.write().draft.quantity = evt.value()
          }
        },
        div {
          class: "field",
          label { r#for: "price", "Price" },
          input {
            id: "price",
            r#type: "number",
            min: "0.01",
            step: "0.01",
            required: true,
            value: "{draft.price}",
            oninput: move |evt| entry.write().draft.price = evt.value()
          }
        },
        if let Some(message) = submit_error {
          div {
            class: "inline-error",
            AlertCircle {},
            span { "{message}" }
          }
        },
        button {
          class: "submit-button",
          r#type: "submit",
          disabled: submitting(),
          if submitting() { "Submitting..." } else { "Create Instruction" }
        }
      }
    }
  }
}
