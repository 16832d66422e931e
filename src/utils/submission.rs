use std::str::FromStr;
use dioxus::logger::tracing::info;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
  error::AppError,
  models::{Instruction, InstructionStatus, NewInstructionRow, Side},
  session::SessionState,
  supabase::TableStore,
};

const PRICE_SCALE: u32 = 2;

fn min_price() -> Decimal {
  Decimal::new(1, PRICE_SCALE)
}

/// Raw contents of the instruction form.
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionDraft {
  pub symbol: String,
  pub side: Side,
  pub quantity: String,
  pub price: String,
}

impl Default for InstructionDraft {
  fn default() -> Self {
    Self { symbol: String::new(), side: Side::Buy, quantity: String::new(), price: String::new() }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidInstruction {
  pub symbol: String,
  pub side: Side,
  pub quantity: u32,
  pub price: Decimal,
}

impl ValidInstruction {
  pub fn into_row(self, user_id: Uuid) -> NewInstructionRow {
    NewInstructionRow {
      symbol: self.symbol,
      side: self.side,
      quantity: self.quantity,
      price: self.price,
      user_id,
      status: InstructionStatus::Pending,
    }
  }
}

impl InstructionDraft {
  /// Normalizes the raw fields. Prices must be plain decimals: exponent forms such as
  /// `1e2`, which number inputs may emit, are rejected rather than expanded.
  pub fn validate(&self) -> Result<ValidInstruction, AppError> {
    let symbol = self.symbol.trim().to_uppercase();
    if symbol.is_empty() {
      return Err(AppError::Validation("Symbol is required".to_string()));
    }

    let quantity = self.quantity.trim().parse::<u32>()
      .ok()
      .filter(|q| *q >= 1)
      .ok_or_else(|| AppError::Validation("Quantity must be a whole number of at least 1".to_string()))?;

    let raw_price = self.price.trim();
    if raw_price.contains(['e', 'E']) {
      return Err(AppError::Validation("Price must be written as a plain decimal".to_string()));
    }
    let price = Decimal::from_str(raw_price)
      .map_err(|_| AppError::Validation("Price must be a number".to_string()))?
      .normalize();
    if price < min_price() {
      return Err(AppError::Validation("Price must be at least 0.01".to_string()));
    }
    if price.scale() > PRICE_SCALE {
      return Err(AppError::Validation("Price supports at most two decimal places".to_string()));
    }

    Ok(ValidInstruction { symbol, side: self.side, quantity, price })
  }
}

/// What the instruction form holds between keystrokes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
  pub draft: InstructionDraft,
  pub error: Option<String>,
}

impl FormState {
  /// Applies a submission result. Success clears every field (side back to BUY) and
  /// passes the stored row to `on_created`; failure keeps the draft and shows the message.
  pub fn settle(&mut self, result: Result<Instruction, AppError>, on_created: impl FnOnce(Instruction)) {
    match result {
      Ok(stored) => {
        *self = FormState::default();
        on_created(stored);
      },
      Err(e) => self.error = Some(e.to_string()),
    }
  }
}

/// Inserts one PENDING instruction owned by the signed-in user.
/// Nothing reaches the store unless the session and the draft are both valid.
pub async fn submit_instruction(session: &SessionState, store: &dyn TableStore, draft: &InstructionDraft) -> Result<Instruction, AppError> {
  let session = session.session().ok_or(AppError::AuthenticationRequired)?;
  let row = draft.validate()?.into_row(session.user.id);
  info!("submitting {} {} x{} @ {}", row.side, row.symbol, row.quantity, row.price);
  store.insert_instruction(row, session.access_token.clone()).await
}
