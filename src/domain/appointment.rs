use sqlx::FromRow;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use crate::ApiError;

/// An `appointments` row. `patient_id` is nullable twice over: a slot can be
/// created unbooked, and deleting a patient detaches their bookings.
#[derive(Debug, Clone, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Option<Uuid>,
    pub date: Date,
    pub time: Time,
    pub title: String,
    pub notes: Option<String>,
    pub price: Option<f64>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Strict `YYYY-MM-DD`. Unpadded, reordered, or whitespace-padded components
/// are rejected, never coerced.
pub fn parse_date(raw: &str) -> Result<Date, ApiError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map_err(|_| ApiError::Validation("Invalid date format. Use 'YYYY-MM-DD'".into()))
}

/// Strict `HH:MM`. Seconds are not accepted on input.
pub fn parse_time(raw: &str) -> Result<Time, ApiError> {
    let format = format_description!("[hour]:[minute]");
    Time::parse(raw, &format)
        .map_err(|_| ApiError::Validation("Invalid time format. Use 'HH:MM'".into()))
}

/// Responses always render dates as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Responses always render times as `HH:MM`, dropping any seconds a stored
/// value may carry.
pub fn format_time(time: Time) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
