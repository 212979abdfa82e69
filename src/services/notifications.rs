//! Asynchronous confirmation delivery. The request path only enqueues a job
//! onto the Redis broker; a separate worker loop pops jobs and sends the
//! confirmation email. Nothing in here is allowed to fail a booking or
//! payment request.

use anyhow::{anyhow, Context};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EmailConfig;
use crate::redis_client::RedisClient;
use crate::AppState;

/// Broker list the confirmation jobs travel through.
pub const CONFIRMATION_QUEUE: &str = "notifications:confirmations";

/// How long the worker blocks waiting for a job before looping.
const POP_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfirmationJob {
    pub user_email: String,
    pub booking_id: Uuid,
    pub amount: Decimal,
}

/// Handle the reconciler uses to hand off a confirmation. Fire-and-forget:
/// broker trouble is logged and swallowed.
#[derive(Clone)]
pub struct NotificationDispatcher {
    broker: RedisClient,
}

impl NotificationDispatcher {
    pub fn new(broker: RedisClient) -> Self {
        Self { broker }
    }

    pub async fn enqueue_confirmation(&self, job: ConfirmationJob) {
        let payload = match serde_json::to_string(&job) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize confirmation job: {}", e);
                return;
            }
        };

        match self.broker.push_job(CONFIRMATION_QUEUE, &payload).await {
            Ok(()) => info!(
                "Confirmation for booking {} queued for {}",
                job.booking_id, job.user_email
            ),
            Err(e) => warn!(
                "Broker unreachable, confirmation for booking {} dropped: {}",
                job.booking_id, e
            ),
        }
    }
}

/// SMTP sender used by the worker.
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn from_config(config: &EmailConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn build_transport(&self) -> anyhow::Result<SmtpTransport> {
        Ok(SmtpTransport::relay(&self.config.host)
            .context("SMTP relay error")?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .build())
    }

    /// Fixed confirmation template.
    fn confirmation_message(job: &ConfirmationJob) -> (String, String) {
        let subject = "Payment Confirmation - Your Booking is Confirmed!".to_string();
        let body = format!(
            "Dear Customer,\n\n\
             Thank you for your payment!\n\n\
             Your booking (ID: {}) has been confirmed.\n\
             Amount Paid: ETB {}\n\n\
             We look forward to hosting you!\n\n\
             Best regards,\n\
             The Travel Booking Team\n",
            job.booking_id, job.amount
        );
        (subject, body)
    }

    pub async fn send_confirmation(&self, job: &ConfirmationJob) -> anyhow::Result<()> {
        let (subject, body) = Self::confirmation_message(job);

        let email = Message::builder()
            .from(self.config.from.parse().context("Invalid from address")?)
            .to(job.user_email.parse().context("Invalid to address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("Failed to build email")?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| anyhow!("Email task failed: {}", e))?
            .context("Failed to send email")?;

        Ok(())
    }
}

/// Worker loop: consume confirmation jobs from the broker and deliver them.
/// Delivery failures are logged, never re-raised into the booking flow.
pub async fn run_worker(state: Arc<AppState>) {
    let mailer = Mailer::from_config(&state.config.email);
    info!("Notification worker started, consuming {}", CONFIRMATION_QUEUE);

    loop {
        let payload = match state.broker.pop_job(CONFIRMATION_QUEUE, POP_TIMEOUT_SECS).await {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                error!("Broker poll failed: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let job: ConfirmationJob = match serde_json::from_str(&payload) {
            Ok(job) => job,
            Err(e) => {
                error!("Discarding malformed confirmation job: {}", e);
                continue;
            }
        };

        match mailer.send_confirmation(&job).await {
            Ok(()) => info!(
                "Confirmation email sent to {} for booking {}",
                job.user_email, job.booking_id
            ),
            Err(e) => error!(
                "Failed to send confirmation to {} for booking {}: {}",
                job.user_email, job.booking_id, e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn job() -> ConfirmationJob {
        ConfirmationJob {
            user_email: "guest@example.com".to_string(),
            booking_id: Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap(),
            amount: dec!(200),
        }
    }

    #[test]
    fn job_round_trips_through_json() {
        let payload = serde_json::to_string(&job()).unwrap();
        let decoded: ConfirmationJob = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, job());
    }

    #[test]
    fn confirmation_template_mentions_booking_and_amount() {
        let (subject, body) = Mailer::confirmation_message(&job());
        assert_eq!(subject, "Payment Confirmation - Your Booking is Confirmed!");
        assert!(body.contains("11111111-2222-3333-4444-555555555555"));
        assert!(body.contains("ETB 200"));
    }
}
