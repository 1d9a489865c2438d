use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::bookings::repo_types::{Booking, BookingStatus};

time::serde::format_description!(booking_date, Date, "[year]-[month]-[day]");
time::serde::format_description!(booking_time, Time, "[hour]:[minute]");

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub service_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    pub service_type: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: String,
    #[serde(with = "booking_date")]
    pub date: Date,
    #[serde(with = "booking_time")]
    pub time: Time,
    pub location: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: BookingStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            service_type: b.service_type,
            date: b.date,
            time: b.time,
            location: b.location,
            description: b.description,
            price: b.price,
            status: b.status,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingEnvelope {
    pub message: &'static str,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookings: usize,
    pub pending_bookings: usize,
    pub completed_bookings: usize,
    pub total_spent: f64,
    pub recent_bookings: Vec<BookingResponse>,
}
