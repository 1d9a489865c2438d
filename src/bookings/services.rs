use time::{macros::format_description, Date, Time};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    bookings::{
        dto::{CreateBookingRequest, DashboardStats, UpdateBookingRequest},
        repo_types::{Booking, BookingPatch, BookingStatus, NewBooking},
    },
    db::Store,
    error::{AppError, AppResult},
};

pub const RECENT_BOOKINGS: usize = 5;

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_date(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("Invalid date, expected YYYY-MM-DD"))
}

fn parse_time(raw: &str) -> AppResult<Time> {
    let raw = raw.trim();
    Time::parse(raw, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]:[second]")))
        .map_err(|_| AppError::validation("Invalid time, expected HH:MM"))
}

fn check_price(price: f64) -> AppResult<f64> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(AppError::validation("Price must be a non-negative number"))
    }
}

#[instrument(skip(store, req))]
pub async fn create(store: &dyn Store, user_id: Uuid, req: CreateBookingRequest) -> AppResult<Booking> {
    let (Some(service_type), Some(date), Some(time), Some(location)) = (
        non_blank(req.service_type),
        non_blank(req.date),
        non_blank(req.time),
        non_blank(req.location),
    ) else {
        warn!("booking missing required fields");
        return Err(AppError::validation(
            "Service type, date, time, and location are required",
        ));
    };

    let new = NewBooking {
        service_type,
        date: parse_date(&date)?,
        time: parse_time(&time)?,
        location,
        description: non_blank(req.description),
        price: check_price(req.price.unwrap_or(0.0))?,
    };
    let booking = store.insert_booking(user_id, new).await?;
    info!(booking_id = %booking.id, "booking created");
    Ok(booking)
}

pub async fn list(store: &dyn Store, user_id: Uuid) -> AppResult<Vec<Booking>> {
    store.list_bookings(user_id).await
}

#[instrument(skip(store, req))]
pub async fn update(
    store: &dyn Store,
    id: Uuid,
    user_id: Uuid,
    req: UpdateBookingRequest,
) -> AppResult<Booking> {
    let blank = |v: &Option<String>| matches!(v, Some(s) if s.trim().is_empty());
    if blank(&req.service_type) || blank(&req.location) {
        return Err(AppError::validation("Service type and location cannot be empty"));
    }

    let patch = BookingPatch {
        service_type: non_blank(req.service_type),
        date: req.date.as_deref().map(parse_date).transpose()?,
        time: req.time.as_deref().map(parse_time).transpose()?,
        location: non_blank(req.location),
        description: req.description,
        price: req.price.map(check_price).transpose()?,
        status: req.status,
    };

    let booking = store
        .update_booking(id, user_id, patch)
        .await?
        .ok_or(AppError::NotFound("Booking not found"))?;
    info!(booking_id = %booking.id, status = booking.status.as_str(), "booking updated");
    Ok(booking)
}

#[instrument(skip(store))]
pub async fn delete(store: &dyn Store, id: Uuid, user_id: Uuid) -> AppResult<()> {
    if !store.delete_booking(id, user_id).await? {
        return Err(AppError::NotFound("Booking not found"));
    }
    info!(booking_id = %id, "booking deleted");
    Ok(())
}

/// Aggregates over exactly the bookings `list` returns.
pub fn summarize(bookings: Vec<Booking>) -> DashboardStats {
    let count = |status: BookingStatus| bookings.iter().filter(|b| b.status == status).count();
    DashboardStats {
        total_bookings: bookings.len(),
        pending_bookings: count(BookingStatus::Pending),
        completed_bookings: count(BookingStatus::Completed),
        total_spent: bookings.iter().map(|b| b.price).sum(),
        recent_bookings: bookings
            .iter()
            .take(RECENT_BOOKINGS)
            .cloned()
            .map(Into::into)
            .collect(),
    }
}

pub async fn stats(store: &dyn Store, user_id: Uuid) -> AppResult<DashboardStats> {
    Ok(summarize(list(store, user_id).await?))
}
