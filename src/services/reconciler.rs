//! Payment reconciler: the state machine tying bookings, gateway
//! transactions and notifications together.
//!
//! Initiation is exactly-once-in-flight per booking: the check-then-create
//! sequence runs under a row lock on the booking, and a partial unique index
//! (at most one non-failed payment per booking) backs it at the storage
//! layer. Verification transitions are compare-and-swap updates on the
//! payment row; only the caller that wins the `pending -> completed` swap
//! confirms the booking and enqueues the confirmation job.

use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::payment::{new_tx_ref, CURRENCY};
use crate::models::{Payment, PaymentStatus};
use crate::services::gateway::{
    Customization, InitializePayment, PaymentGatewayClient, TransactionStatus,
};
use crate::services::ledger::BookingLedger;
use crate::services::notifications::{ConfirmationJob, NotificationDispatcher};
use crate::AppState;

pub struct PaymentReconciler {
    state: Arc<AppState>,
    gateway: PaymentGatewayClient,
    dispatcher: NotificationDispatcher,
}

/// What the caller needs to continue checkout.
#[derive(Debug)]
pub struct InitiatedPayment {
    pub payment_id: Uuid,
    pub checkout_url: String,
    pub transaction_reference: String,
}

/// Result of reconciling a gateway verification.
#[derive(Debug)]
pub enum VerificationOutcome {
    Completed {
        booking_id: Uuid,
        amount: Decimal,
    },
    Failed {
        /// Raw gateway transaction payload for diagnostics.
        details: Value,
    },
}

impl PaymentReconciler {
    pub fn new(state: Arc<AppState>) -> Self {
        let gateway = PaymentGatewayClient::from_config(&state.config.payment);
        let dispatcher = NotificationDispatcher::new(state.broker.clone());
        Self {
            state,
            gateway,
            dispatcher,
        }
    }

    /// Start a payment attempt for a booking owned by `user`.
    ///
    /// The booking row is locked for the duration of the gateway call so
    /// concurrent attempts for the same booking serialize here; whichever
    /// request reaches the guard second sees the first one's payment row.
    /// Nothing is persisted when the gateway declines.
    pub async fn initiate_payment(
        &self,
        booking_id: Uuid,
        user: &AuthUser,
    ) -> ApiResult<InitiatedPayment> {
        let ledger = BookingLedger::new(self.state.clone());
        let booking = ledger.find_booking(booking_id, Some(user.user_id)).await?;

        let mut tx = self.state.db.pool.begin().await?;

        sqlx::query("SELECT booking_id FROM bookings WHERE booking_id = $1 FOR UPDATE")
            .bind(booking.booking_id)
            .execute(&mut *tx)
            .await?;

        let has_completed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE booking_id = $1 AND status = $2)",
        )
        .bind(booking.booking_id)
        .bind(PaymentStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if has_completed {
            return Err(ApiError::DuplicatePayment(
                "This booking already has a completed payment".to_string(),
            ));
        }

        let tx_ref = new_tx_ref();
        let session = self
            .gateway
            .initialize(&InitializePayment {
                amount: booking.total_price.to_string(),
                currency: CURRENCY.to_string(),
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                tx_ref: tx_ref.clone(),
                callback_url: self.state.config.payment.callback_url.clone(),
                return_url: self.state.config.payment.return_url.clone(),
                customization: Customization {
                    title: "Travel Booking Payment".to_string(),
                    description: format!("Payment for booking {}", booking.booking_id),
                },
            })
            .await?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (payment_id, booking_id, transaction_id, amount, currency, status, checkout_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.booking_id)
        .bind(&tx_ref)
        .bind(booking.total_price)
        .bind(CURRENCY)
        .bind(PaymentStatus::Pending.as_str())
        .bind(&session.checkout_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => ApiError::DuplicatePayment(
                "A payment for this booking is already in progress".to_string(),
            ),
            _ => ApiError::from(e),
        })?;

        tx.commit().await?;

        info!(
            "Payment {} initiated for booking {}: tx_ref={}, amount={}",
            payment.payment_id, booking.booking_id, tx_ref, payment.amount
        );

        Ok(InitiatedPayment {
            payment_id: payment.payment_id,
            checkout_url: session.checkout_url,
            transaction_reference: tx_ref,
        })
    }

    /// Reconcile a gateway verification callback or query for `tx_ref`.
    ///
    /// An already-completed payment short-circuits before the gateway call
    /// and performs no side effects, so duplicate webhook deliveries cannot
    /// enqueue a second confirmation.
    pub async fn verify_payment(&self, tx_ref: Option<String>) -> ApiResult<VerificationOutcome> {
        let tx_ref = require_tx_ref(tx_ref)?;

        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE transaction_id = $1",
        )
        .bind(&tx_ref)
        .fetch_optional(&self.state.db.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment record not found".to_string()))?;

        if payment.is_completed() {
            info!("Payment {} already completed, skipping re-verification", tx_ref);
            return Ok(VerificationOutcome::Completed {
                booking_id: payment.booking_id,
                amount: payment.amount,
            });
        }

        let verified = self.gateway.verify(&tx_ref).await?;

        match verified.status {
            TransactionStatus::Success => {
                let won = sqlx::query(
                    r#"
                    UPDATE payments SET status = $2, payment_method = $3, updated_at = NOW()
                    WHERE transaction_id = $1 AND status = $4
                    "#,
                )
                .bind(&tx_ref)
                .bind(PaymentStatus::Completed.as_str())
                .bind(&verified.payment_method)
                .bind(PaymentStatus::Pending.as_str())
                .execute(&self.state.db.pool)
                .await?
                .rows_affected()
                    > 0;

                if won {
                    let ledger = BookingLedger::new(self.state.clone());
                    ledger.confirm_booking(payment.booking_id).await?;

                    let user_email: String = sqlx::query_scalar(
                        r#"
                        SELECT u.email FROM users u
                        JOIN bookings b ON b.user_id = u.user_id
                        WHERE b.booking_id = $1
                        "#,
                    )
                    .bind(payment.booking_id)
                    .fetch_one(&self.state.db.pool)
                    .await?;

                    self.dispatcher
                        .enqueue_confirmation(ConfirmationJob {
                            user_email,
                            booking_id: payment.booking_id,
                            amount: payment.amount,
                        })
                        .await;

                    info!(
                        "Payment {} completed, booking {} confirmed",
                        tx_ref, payment.booking_id
                    );
                    return Ok(VerificationOutcome::Completed {
                        booking_id: payment.booking_id,
                        amount: payment.amount,
                    });
                }

                // Lost a concurrent verification race, or the payment had
                // already reached a terminal state. Report whatever stands.
                let current: String =
                    sqlx::query_scalar("SELECT status FROM payments WHERE transaction_id = $1")
                        .bind(&tx_ref)
                        .fetch_one(&self.state.db.pool)
                        .await?;

                if current == PaymentStatus::Completed.as_str() {
                    Ok(VerificationOutcome::Completed {
                        booking_id: payment.booking_id,
                        amount: payment.amount,
                    })
                } else {
                    Ok(VerificationOutcome::Failed {
                        details: verified.raw,
                    })
                }
            }
            TransactionStatus::Failed(gateway_status) => {
                // A completed payment is never demoted; only pending moves.
                sqlx::query(
                    r#"
                    UPDATE payments SET status = $2, updated_at = NOW()
                    WHERE transaction_id = $1 AND status = $3
                    "#,
                )
                .bind(&tx_ref)
                .bind(PaymentStatus::Failed.as_str())
                .bind(PaymentStatus::Pending.as_str())
                .execute(&self.state.db.pool)
                .await?;

                warn!(
                    "Payment {} failed verification: gateway status '{}'",
                    tx_ref, gateway_status
                );
                Ok(VerificationOutcome::Failed {
                    details: verified.raw,
                })
            }
        }
    }

    /// Read-only projection of a payment, restricted to the booking owner.
    pub async fn get_payment_status(
        &self,
        payment_id: Uuid,
        user: &AuthUser,
    ) -> ApiResult<Payment> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = $1")
                .bind(payment_id)
                .fetch_optional(&self.state.db.pool)
                .await?
                .ok_or_else(|| ApiError::NotFound("Payment not found".to_string()))?;

        let owner_id: i64 =
            sqlx::query_scalar("SELECT user_id FROM bookings WHERE booking_id = $1")
                .bind(payment.booking_id)
                .fetch_one(&self.state.db.pool)
                .await?;

        if owner_id != user.user_id {
            return Err(ApiError::Unauthorized);
        }

        Ok(payment)
    }
}

/// A verification request is meaningless without a reference; reject before
/// touching the gateway or the store.
fn require_tx_ref(tx_ref: Option<String>) -> ApiResult<String> {
    tx_ref
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("Transaction reference is required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tx_ref_is_invalid() {
        assert!(matches!(
            require_tx_ref(None),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(
            require_tx_ref(Some(String::new())),
            Err(ApiError::InvalidRequest(_))
        ));
        assert!(matches!(
            require_tx_ref(Some("   ".to_string())),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn tx_ref_is_trimmed() {
        assert_eq!(
            require_tx_ref(Some("  tx-abc  ".to_string())).unwrap(),
            "tx-abc"
        );
    }
}
