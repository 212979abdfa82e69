//! Booking ledger: owns booking rows and their status transitions. All
//! booking mutation goes through here; the reconciler drives confirmation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{Booking, BookingStatus, Listing};
use crate::AppState;

pub struct BookingLedger {
    state: Arc<AppState>,
}

/// Parameters for a new booking, already validated at the request boundary.
#[derive(Debug)]
pub struct NewBooking {
    pub listing_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
}

/// `price_per_night * guests`. No date-range proration.
pub fn compute_total_price(price_per_night: Decimal, guests: i32) -> Decimal {
    price_per_night * Decimal::from(guests)
}

impl BookingLedger {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn create_booking(&self, user_id: i64, new: NewBooking) -> ApiResult<Booking> {
        if new.check_out <= new.check_in {
            return Err(ApiError::InvalidRequest(
                "check_out must be after check_in".to_string(),
            ));
        }

        let listing = Listing::find_by_id(new.listing_id, &self.state.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))?;

        let total_price = compute_total_price(listing.price_per_night, new.guests);

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (booking_id, listing_id, user_id, check_in, check_out, guests, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(listing.listing_id)
        .bind(user_id)
        .bind(new.check_in)
        .bind(new.check_out)
        .bind(new.guests)
        .bind(total_price)
        .bind(BookingStatus::Pending.as_str())
        .fetch_one(&self.state.db.pool)
        .await?;

        info!(
            "Booking {} created: listing={}, total_price={}",
            booking.booking_id, booking.listing_id, booking.total_price
        );
        Ok(booking)
    }

    /// Look up a booking, optionally requiring it to belong to `owner`. An
    /// ownership mismatch is indistinguishable from a missing booking.
    pub async fn find_booking(&self, booking_id: Uuid, owner: Option<i64>) -> ApiResult<Booking> {
        let booking = match owner {
            Some(user_id) => {
                sqlx::query_as::<_, Booking>(
                    "SELECT * FROM bookings WHERE booking_id = $1 AND user_id = $2",
                )
                .bind(booking_id)
                .bind(user_id)
                .fetch_optional(&self.state.db.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
                    .bind(booking_id)
                    .fetch_optional(&self.state.db.pool)
                    .await?
            }
        };

        booking.ok_or_else(|| ApiError::NotFound("Booking not found".to_string()))
    }

    pub async fn list_bookings(&self, user_id: i64) -> ApiResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.state.db.pool)
        .await?;
        Ok(bookings)
    }

    /// Idempotent: confirming an already-confirmed booking is a no-op.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> ApiResult<()> {
        sqlx::query(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE booking_id = $1",
        )
        .bind(booking_id)
        .bind(BookingStatus::Confirmed.as_str())
        .execute(&self.state.db.pool)
        .await?;
        Ok(())
    }

    /// Only a pending booking can be cancelled, and only by its owner.
    pub async fn cancel_booking(&self, booking_id: Uuid, owner: i64) -> ApiResult<()> {
        let cancelled = sqlx::query(
            r#"
            UPDATE bookings SET status = $3, updated_at = NOW()
            WHERE booking_id = $1 AND user_id = $2 AND status = $4
            "#,
        )
        .bind(booking_id)
        .bind(owner)
        .bind(BookingStatus::Cancelled.as_str())
        .bind(BookingStatus::Pending.as_str())
        .execute(&self.state.db.pool)
        .await?
        .rows_affected()
            > 0;

        if cancelled {
            info!("Booking {} cancelled", booking_id);
            return Ok(());
        }

        // Distinguish "not yours / missing" from "wrong state".
        let booking = self.find_booking(booking_id, Some(owner)).await?;
        Err(ApiError::InvalidRequest(format!(
            "Booking in status '{}' cannot be cancelled",
            booking.status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn total_price_is_rate_times_guests() {
        assert_eq!(compute_total_price(dec!(100), 2), dec!(200));
        assert_eq!(compute_total_price(dec!(99.50), 3), dec!(298.50));
        assert_eq!(compute_total_price(dec!(0.01), 1), dec!(0.01));
    }

    proptest! {
        #[test]
        fn total_price_scales_linearly(cents in 1i64..10_000_000, guests in 1i32..100) {
            let rate = Decimal::new(cents, 2);
            let total = compute_total_price(rate, guests);
            prop_assert_eq!(total, rate * Decimal::from(guests));
            // one extra guest always adds exactly one nightly rate
            prop_assert_eq!(compute_total_price(rate, guests + 1) - total, rate);
        }
    }
}
