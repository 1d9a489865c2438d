use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::offers::repo_types::Offer;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Offer> for OfferResponse {
    fn from(o: Offer) -> Self {
        Self {
            id: o.id,
            title: o.title,
            description: o.description,
            price: o.price,
            duration: o.duration,
            category: o.category,
            image_url: o.image_url,
            is_active: o.is_active,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}
