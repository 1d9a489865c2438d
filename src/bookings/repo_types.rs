use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(AppError::validation(format!("Unknown booking status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BookingRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: String,
    pub date: Date,
    pub time: Time,
    pub location: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: String,
    pub date: Date,
    pub time: Time,
    pub location: String,
    pub description: Option<String>,
    pub price: f64,
    pub status: BookingStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        let status = r
            .status
            .parse()
            .map_err(|_| anyhow::anyhow!("booking {} has unknown status {:?}", r.id, r.status))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            service_type: r.service_type,
            date: r.date,
            time: r.time,
            location: r.location,
            description: r.description,
            price: r.price,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated input for a new booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub service_type: String,
    pub date: Date,
    pub time: Time,
    pub location: String,
    pub description: Option<String>,
    pub price: f64,
}

/// Fields to change on a booking; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BookingPatch {
    pub service_type: Option<String>,
    pub date: Option<Date>,
    pub time: Option<Time>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<BookingStatus>,
}
