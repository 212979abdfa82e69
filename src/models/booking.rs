use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Booking lifecycle. `pending` on creation, `confirmed` once a payment
/// completes, `cancelled` when the owner abandons it. `total_price` is fixed
/// at creation and never recomputed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub user_id: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub total_price: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        assert_eq!(BookingStatus::Pending.as_str(), "pending");
        assert_eq!(BookingStatus::Confirmed.as_str(), "confirmed");
        assert_eq!(BookingStatus::Cancelled.as_str(), "cancelled");
    }
}
