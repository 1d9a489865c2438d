//! Sample catalog inserted on first start.

use tracing::info;

use crate::{
    db::Store,
    error::AppResult,
    offers::repo_types::NewOffer,
};

fn sample(title: &str, description: &str, price: f64, duration: &str, category: &str) -> NewOffer {
    NewOffer {
        title: title.to_string(),
        description: Some(description.to_string()),
        price,
        duration: Some(duration.to_string()),
        category: Some(category.to_string()),
        image_url: Some(format!(
            "https://via.placeholder.com/300x200?text={}",
            title.replace(" & ", "+").replace(' ', "+")
        )),
    }
}

pub fn sample_offers() -> Vec<NewOffer> {
    vec![
        sample("Hair Styling", "Professional hair styling services", 50.00, "1 hour", "hair"),
        sample("Manicure & Pedicure", "Complete nail care services", 35.00, "45 minutes", "nails"),
        sample("Facial Treatment", "Rejuvenating facial treatment", 75.00, "1.5 hours", "facial"),
        sample(
            "Makeup Application",
            "Professional makeup for special occasions",
            60.00,
            "1 hour",
            "makeup",
        ),
    ]
}

/// Inserts the sample offers unless the catalog already has rows.
/// Returns how many were inserted.
pub async fn seed_offers(store: &dyn Store) -> AppResult<u64> {
    let existing = store.count_offers().await?;
    if existing > 0 {
        info!(existing, "offers already present, skipping seed");
        return Ok(0);
    }
    let inserted = store.insert_offers(sample_offers()).await?;
    info!(inserted, "seeded sample offers");
    Ok(inserted)
}
