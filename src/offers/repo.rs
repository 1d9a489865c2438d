use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::PgStore,
    error::AppResult,
    offers::repo_types::{NewOffer, Offer},
};

#[async_trait]
pub trait OfferRepo: Send + Sync {
    /// Active offers, newest first, ties broken by title.
    async fn list_active_offers(&self) -> AppResult<Vec<Offer>>;
    async fn find_active_offer(&self, id: Uuid) -> AppResult<Option<Offer>>;
    /// Counts every offer, active or not.
    async fn count_offers(&self) -> AppResult<i64>;
    /// Inserts all offers or none.
    async fn insert_offers(&self, offers: Vec<NewOffer>) -> AppResult<u64>;
}

const OFFER_COLUMNS: &str = "id, title, description, price, duration, category, image_url, \
                             is_active, created_at, updated_at";

#[async_trait]
impl OfferRepo for PgStore {
    async fn list_active_offers(&self) -> AppResult<Vec<Offer>> {
        let sql = format!(
            r#"
            SELECT {OFFER_COLUMNS}
              FROM offers
             WHERE is_active = TRUE
             ORDER BY created_at DESC, title
            "#
        );
        let offers = sqlx::query_as::<_, Offer>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(offers)
    }

    async fn find_active_offer(&self, id: Uuid) -> AppResult<Option<Offer>> {
        let sql = format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1 AND is_active = TRUE");
        let offer = sqlx::query_as::<_, Offer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(offer)
    }

    async fn count_offers(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM offers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_offers(&self, offers: Vec<NewOffer>) -> AppResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for offer in &offers {
            let result = sqlx::query(
                r#"
                INSERT INTO offers (id, title, description, price, duration, category, image_url)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&offer.title)
            .bind(&offer.description)
            .bind(offer.price)
            .bind(&offer.duration)
            .bind(&offer.category)
            .bind(&offer.image_url)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers::seed::sample_offers;
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    async fn rows_from_one_seed_are_ordered_by_title(pool: PgPool) {
        let store = PgStore { pool };
        assert_eq!(store.insert_offers(sample_offers()).await.unwrap(), 4);

        let titles: Vec<_> = store
            .list_active_offers()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "Facial Treatment",
                "Hair Styling",
                "Makeup Application",
                "Manicure & Pedicure",
            ]
        );
        assert_eq!(store.count_offers().await.unwrap(), 4);
    }
}
