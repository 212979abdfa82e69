use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{patch, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    services::ledger::{BookingLedger, NewBooking},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/cancel", patch(cancel_booking))
}

// POST /api/bookings
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1, message = "guests must be at least 1"))]
    #[serde(default = "default_guests")]
    pub guests: i32,
}

fn default_guests() -> i32 {
    1
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let booking = BookingLedger::new(state)
        .create_booking(
            user.user_id,
            NewBooking {
                listing_id: req.listing_id,
                check_in: req.check_in,
                check_out: req.check_out,
                guests: req.guests,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Booking created successfully",
            "booking_id": booking.booking_id,
            "total_price": booking.total_price
        })),
    ))
}

// GET /api/bookings
async fn list_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let bookings = BookingLedger::new(state).list_bookings(user.user_id).await?;
    Ok((StatusCode::OK, Json(bookings)))
}

// PATCH /api/bookings/cancel
#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub booking_id: Uuid,
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CancelBookingRequest>,
) -> ApiResult<impl IntoResponse> {
    BookingLedger::new(state)
        .cancel_booking(req.booking_id, user.user_id)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "message": "Booking cancelled successfully" })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(guests: i32) -> CreateBookingRequest {
        CreateBookingRequest {
            listing_id: Uuid::new_v4(),
            check_in: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            guests,
        }
    }

    #[test]
    fn guests_below_one_is_rejected() {
        assert!(request(0).validate().is_err());
        assert!(request(-3).validate().is_err());
        assert!(request(1).validate().is_ok());
    }

    #[test]
    fn guests_defaults_to_one() {
        let req: CreateBookingRequest = serde_json::from_value(json!({
            "listing_id": "11111111-2222-3333-4444-555555555555",
            "check_in": "2025-06-01",
            "check_out": "2025-06-04"
        }))
        .unwrap();
        assert_eq!(req.guests, 1);
    }
}
