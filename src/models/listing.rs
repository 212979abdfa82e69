use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Listing {
    pub listing_id: Uuid,
    pub title: String,
    pub price_per_night: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub async fn find_by_id(
        listing_id: Uuid,
        db: &crate::database::Database,
    ) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            "SELECT listing_id, title, price_per_night, created_at
             FROM listings
             WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_optional(&db.pool)
        .await
    }
}
