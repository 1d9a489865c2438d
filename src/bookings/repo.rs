use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    bookings::repo_types::{Booking, BookingPatch, BookingRow, BookingStatus, NewBooking},
    db::PgStore,
    error::AppResult,
};

#[async_trait]
pub trait BookingRepo: Send + Sync {
    async fn insert_booking(&self, user_id: Uuid, new: NewBooking) -> AppResult<Booking>;
    /// Newest first.
    async fn list_bookings(&self, user_id: Uuid) -> AppResult<Vec<Booking>>;
    /// Ownership check and write in one step; `None` when the booking does
    /// not exist or belongs to someone else.
    async fn update_booking(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: BookingPatch,
    ) -> AppResult<Option<Booking>>;
    /// Same ownership rule as `update_booking`; returns whether a row went away.
    async fn delete_booking(&self, id: Uuid, user_id: Uuid) -> AppResult<bool>;
}

const BOOKING_COLUMNS: &str = "id, user_id, service_type, date, time, location, description, \
                               price, status, created_at, updated_at";

#[async_trait]
impl BookingRepo for PgStore {
    async fn insert_booking(&self, user_id: Uuid, new: NewBooking) -> AppResult<Booking> {
        let sql = format!(
            r#"
            INSERT INTO bookings (id, user_id, service_type, date, time, location, description, price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&new.service_type)
            .bind(new.date)
            .bind(new.time)
            .bind(&new.location)
            .bind(&new.description)
            .bind(new.price)
            .bind(BookingStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn list_bookings(&self, user_id: Uuid) -> AppResult<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {BOOKING_COLUMNS}
              FROM bookings
             WHERE user_id = $1
             ORDER BY created_at DESC
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Booking::try_from)
            .collect()
    }

    async fn update_booking(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: BookingPatch,
    ) -> AppResult<Option<Booking>> {
        let sql = format!(
            r#"
            UPDATE bookings
               SET service_type = COALESCE($1, service_type),
                   date = COALESCE($2, date),
                   time = COALESCE($3, time),
                   location = COALESCE($4, location),
                   description = COALESCE($5, description),
                   price = COALESCE($6, price),
                   status = COALESCE($7, status),
                   updated_at = NOW()
             WHERE id = $8 AND user_id = $9
            RETURNING {BOOKING_COLUMNS}
            "#
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(patch.service_type)
            .bind(patch.date)
            .bind(patch.time)
            .bind(patch.location)
            .bind(patch.description)
            .bind(patch.price)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Booking::try_from)
            .transpose()
    }

    async fn delete_booking(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
