use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    middleware::AuthUser,
    services::reconciler::{PaymentReconciler, VerificationOutcome},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments/initiate", post(initiate_payment))
        .route(
            "/payments/verify",
            get(verify_payment_get).post(verify_payment_post),
        )
        .route("/payments/{payment_id}/status", get(payment_status))
}

// POST /api/payments/initiate
#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    pub booking_id: Uuid,
}

async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<InitiatePaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    let initiated = PaymentReconciler::new(state)
        .initiate_payment(req.booking_id, &user)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Payment initiated successfully",
            "payment_id": initiated.payment_id,
            "checkout_url": initiated.checkout_url,
            "transaction_reference": initiated.transaction_reference
        })),
    ))
}

// GET|POST /api/payments/verify
// Unauthenticated gateway callback. The reference arrives as a query
// parameter or in the JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyParams {
    pub tx_ref: Option<String>,
}

async fn verify_payment_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VerifyParams>,
) -> ApiResult<Response> {
    verify_payment(state, params.tx_ref).await
}

async fn verify_payment_post(
    State(state): State<Arc<AppState>>,
    body: Option<Json<VerifyParams>>,
) -> ApiResult<Response> {
    verify_payment(state, body.and_then(|Json(params)| params.tx_ref)).await
}

async fn verify_payment(state: Arc<AppState>, tx_ref: Option<String>) -> ApiResult<Response> {
    match PaymentReconciler::new(state).verify_payment(tx_ref).await? {
        VerificationOutcome::Completed { booking_id, amount } => Ok((
            StatusCode::OK,
            Json(json!({
                "message": "Payment verified and completed successfully",
                "payment_status": "completed",
                "booking_id": booking_id,
                "amount": amount
            })),
        )
            .into_response()),
        VerificationOutcome::Failed { details } => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Payment verification failed",
                "payment_status": "failed",
                "details": details
            })),
        )
            .into_response()),
    }
}

// GET /api/payments/{payment_id}/status
async fn payment_status(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<Uuid>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let payment = PaymentReconciler::new(state)
        .get_payment_status(payment_id, &user)
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "payment_id": payment.payment_id,
            "booking_id": payment.booking_id,
            "amount": payment.amount,
            "currency": payment.currency,
            "status": payment.status,
            "transaction_id": payment.transaction_id,
            "created_at": payment.created_at,
            "updated_at": payment.updated_at
        })),
    ))
}
