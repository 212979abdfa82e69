use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// The single currency this platform charges in.
pub const CURRENCY: &str = "ETB";

/// A payment attempt against a booking. `transaction_id` is the reference
/// the gateway correlates on (`tx-<uuid>`), unique across all payments.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub checkout_url: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `pending -> {completed, failed}`; completed and failed are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

impl Payment {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed.as_str()
    }
}

/// Fresh gateway correlation reference.
pub fn new_tx_ref() -> String {
    format!("tx-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_ref_has_expected_shape() {
        let tx_ref = new_tx_ref();
        let suffix = tx_ref.strip_prefix("tx-").expect("tx- prefix");
        assert!(Uuid::parse_str(suffix).is_ok());
    }

    #[test]
    fn tx_refs_are_unique() {
        assert_ne!(new_tx_ref(), new_tx_ref());
    }

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Completed.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
    }
}
