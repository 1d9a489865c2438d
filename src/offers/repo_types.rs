use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Offer record in the database.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}
