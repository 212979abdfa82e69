use serde::Deserialize;
use std::env;

// Top-level configuration container. Built once at startup from the
// environment and handed to the components that need it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub payment: PaymentConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Task queue broker (Redis). Confirmation jobs are pushed here and consumed
// by the notification worker.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub url: String,
}

// Payment gateway settings. The callback URL is where the gateway reports
// verification results; the return URL is where the customer lands after
// checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub secret_key: String,
    pub base_url: String,
    pub callback_url: String,
    pub return_url: String,
}

// Outbound mail transport (SMTP).
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "travel_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            broker: BrokerConfig {
                url: env::var("BROKER_URL")
                    .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
            },
            payment: PaymentConfig {
                secret_key: env::var("CHAPA_SECRET_KEY").expect("CHAPA_SECRET_KEY must be set"),
                base_url: env::var("CHAPA_BASE_URL")
                    .unwrap_or_else(|_| "https://api.chapa.co/v1".to_string()),
                callback_url: env::var("PAYMENT_CALLBACK_URL")
                    .unwrap_or_else(|_| "http://localhost:8000/api/payments/verify".to_string()),
                return_url: env::var("PAYMENT_RETURN_URL")
                    .unwrap_or_else(|_| "http://localhost:8000/api/bookings".to_string()),
            },
            email: EmailConfig {
                host: env::var("EMAIL_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: env::var("EMAIL_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .expect("EMAIL_PORT must be a valid number"),
                username: env::var("EMAIL_HOST_USER").unwrap_or_default(),
                password: env::var("EMAIL_HOST_PASSWORD").unwrap_or_default(),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| "Travel Booking <noreply@localhost>".to_string()),
            },
        }
    }
}
