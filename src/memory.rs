//! In-memory `Store` for tests.
//!
//! One mutex guards all tables, so uniqueness and ownership checks happen
//! atomically with the write, like the constraints and single statements
//! of the Postgres store.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{TokenRepo, UserRepo},
        repo_types::{AuthTokenRecord, NewUser, ProfilePatch, Role, User},
    },
    bookings::{
        repo::BookingRepo,
        repo_types::{Booking, BookingPatch, BookingStatus, NewBooking},
    },
    db::Store,
    error::{AppError, AppResult},
    offers::{
        repo::OfferRepo,
        repo_types::{NewOffer, Offer},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tokens: Vec<AuthTokenRecord>,
    bookings: Vec<Booking>,
    offers: Vec<Offer>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

/// Insertion order reversed, then newest `created_at` first.
fn newest_first<T>(rows: impl DoubleEndedIterator<Item = T>, created: fn(&T) -> OffsetDateTime) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    /// Inserts a customer with an unusable password hash.
    pub fn seed_user(&self, email: &str) -> Uuid {
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "!".into(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            phone: None,
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        self.lock().users.push(user);
        id
    }

    /// Drops the user row but leaves its tokens behind.
    pub fn remove_user_only(&self, id: Uuid) {
        self.lock().users.retain(|u| u.id != id);
    }

    /// Deletes a user and everything that references it.
    pub fn delete_user(&self, id: Uuid) {
        let mut t = self.lock();
        t.users.retain(|u| u.id != id);
        t.tokens.retain(|r| r.user_id != id);
        t.bookings.retain(|b| b.user_id != id);
    }

    pub fn booking_count(&self) -> usize {
        self.lock().bookings.len()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let mut t = self.lock();
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict("User already exists"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            phone: new.phone,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> AppResult<Option<User>> {
        let mut t = self.lock();
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn insert_token(&self, record: AuthTokenRecord) -> AppResult<()> {
        let mut t = self.lock();
        if !t.users.iter().any(|u| u.id == record.user_id) {
            return Err(anyhow::anyhow!("token references missing user {}", record.user_id).into());
        }
        if t.tokens.iter().any(|r| r.token == record.token) {
            return Err(anyhow::anyhow!("duplicate token").into());
        }
        t.tokens.push(record);
        Ok(())
    }

    async fn find_token(&self, token: &str) -> AppResult<Option<AuthTokenRecord>> {
        Ok(self.lock().tokens.iter().find(|r| r.token == token).cloned())
    }

    async fn delete_token(&self, token: &str) -> AppResult<bool> {
        let mut t = self.lock();
        let before = t.tokens.len();
        t.tokens.retain(|r| r.token != token);
        Ok(t.tokens.len() < before)
    }

    async fn delete_expired_tokens(&self, now: OffsetDateTime) -> AppResult<u64> {
        let mut t = self.lock();
        let before = t.tokens.len();
        t.tokens.retain(|r| r.expires_at >= now);
        Ok((before - t.tokens.len()) as u64)
    }
}

#[async_trait]
impl BookingRepo for MemoryStore {
    async fn insert_booking(&self, user_id: Uuid, new: NewBooking) -> AppResult<Booking> {
        let mut t = self.lock();
        if !t.users.iter().any(|u| u.id == user_id) {
            return Err(anyhow::anyhow!("booking references missing user {user_id}").into());
        }
        let now = OffsetDateTime::now_utc();
        let booking = Booking {
            id: Uuid::new_v4(),
            user_id,
            service_type: new.service_type,
            date: new.date,
            time: new.time,
            location: new.location,
            description: new.description,
            price: new.price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn list_bookings(&self, user_id: Uuid) -> AppResult<Vec<Booking>> {
        let t = self.lock();
        Ok(newest_first(
            t.bookings.iter().filter(|b| b.user_id == user_id).cloned(),
            |b: &Booking| b.created_at,
        ))
    }

    async fn update_booking(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: BookingPatch,
    ) -> AppResult<Option<Booking>> {
        let mut t = self.lock();
        let Some(b) = t
            .bookings
            .iter_mut()
            .find(|b| b.id == id && b.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(v) = patch.service_type {
            b.service_type = v;
        }
        if let Some(v) = patch.date {
            b.date = v;
        }
        if let Some(v) = patch.time {
            b.time = v;
        }
        if let Some(v) = patch.location {
            b.location = v;
        }
        if let Some(v) = patch.description {
            b.description = Some(v);
        }
        if let Some(v) = patch.price {
            b.price = v;
        }
        if let Some(v) = patch.status {
            b.status = v;
        }
        b.updated_at = OffsetDateTime::now_utc();
        Ok(Some(b.clone()))
    }

    async fn delete_booking(&self, id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut t = self.lock();
        let before = t.bookings.len();
        t.bookings.retain(|b| !(b.id == id && b.user_id == user_id));
        Ok(t.bookings.len() < before)
    }
}

#[async_trait]
impl OfferRepo for MemoryStore {
    async fn list_active_offers(&self) -> AppResult<Vec<Offer>> {
        let mut offers: Vec<Offer> = self
            .lock()
            .offers
            .iter()
            .filter(|o| o.is_active)
            .cloned()
            .collect();
        offers.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.title.cmp(&b.title))
        });
        Ok(offers)
    }

    async fn find_active_offer(&self, id: Uuid) -> AppResult<Option<Offer>> {
        Ok(self
            .lock()
            .offers
            .iter()
            .find(|o| o.id == id && o.is_active)
            .cloned())
    }

    async fn count_offers(&self) -> AppResult<i64> {
        Ok(self.lock().offers.len() as i64)
    }

    async fn insert_offers(&self, offers: Vec<NewOffer>) -> AppResult<u64> {
        let mut t = self.lock();
        let now = OffsetDateTime::now_utc();
        let inserted = offers.len() as u64;
        t.offers.extend(offers.into_iter().map(|o| Offer {
            id: Uuid::new_v4(),
            title: o.title,
            description: o.description,
            price: o.price,
            duration: o.duration,
            category: o.category,
            image_url: o.image_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        }));
        Ok(inserted)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time};

    fn booking() -> NewBooking {
        NewBooking {
            service_type: "Hair".into(),
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
            location: "Home".into(),
            description: None,
            price: 10.0,
        }
    }

    #[tokio::test]
    async fn deleting_user_cascades() {
        let store = MemoryStore::default();
        let id = store.seed_user("a@example.com");
        store.insert_booking(id, booking()).await.unwrap();
        let now = OffsetDateTime::now_utc();
        store
            .insert_token(AuthTokenRecord {
                token: "t".into(),
                user_id: id,
                expires_at: now,
                created_at: now,
            })
            .await
            .unwrap();

        store.delete_user(id);
        assert_eq!(store.booking_count(), 0);
        assert!(store.find_token("t").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_rows_for_unknown_user() {
        let store = MemoryStore::default();
        assert!(store.insert_booking(Uuid::new_v4(), booking()).await.is_err());
    }
}
