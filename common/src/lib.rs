// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Distinguishes "field absent" from "field present but null" in partial
/// update payloads: an absent field keeps the stored value, an explicit
/// null clears it.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Status of an appointment. Transitions are performed by the admin;
/// a cancelled appointment is kept for history but excluded from
/// conflict checks and availability computation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// A bookable service offered by the studio.
///
/// Services are soft-deleted (`active = false`) rather than removed, so
/// historical appointments always keep a valid reference.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Service {
    #[sqlx(rename = "id")]
    pub id: i64,

    #[sqlx(rename = "name")]
    pub name: String,

    #[sqlx(rename = "description")]
    pub description: String,

    // Always positive; validated at creation and update time.
    #[sqlx(rename = "duration_minutes")]
    pub duration_minutes: i64,

    #[sqlx(rename = "price")]
    pub price: f64,

    #[sqlx(rename = "color")]
    pub color: String,

    #[sqlx(rename = "active")]
    pub active: bool,
}

/// A booked (or requested) studio session.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `Debug`: Enables displaying the structure for debugging.
/// - `Clone`: Allows creating copies of the object.
/// - `sqlx::FromRow`: Allows `sqlx` to create an `Appointment` instance
///    directly from a database result row.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Appointment {
    #[sqlx(rename = "id")]
    pub id: i64,

    #[sqlx(rename = "client_name")]
    pub client_name: String,

    #[sqlx(rename = "client_email")]
    pub client_email: String,

    #[sqlx(rename = "client_phone")]
    pub client_phone: String,

    #[sqlx(rename = "service_id")]
    pub service_id: i64,

    // We use NaiveDate because appointments are anchored to a calendar
    // day, without a timezone.
    #[sqlx(rename = "date")]
    pub date: NaiveDate,

    // Local wall-clock start time, minute precision.
    #[sqlx(rename = "time")]
    pub time: NaiveTime,

    #[sqlx(rename = "status")]
    pub status: AppointmentStatus,

    #[sqlx(rename = "notes")]
    pub notes: Option<String>,

    #[sqlx(rename = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// The daily opening window, uniform across all days of the week.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Studio-wide configuration driving slot generation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StudioSettings {
    pub business_hours: BusinessHours,
    pub slot_granularity_minutes: i64,
    pub unavailable_dates: Vec<NaiveDate>,
}

/// Structure used to receive booking data from the API.
/// It's a good practice to separate database models (`Appointment`)
/// from API models (`BookingPayload`), as they may have different fields.
#[derive(Deserialize, Debug)]
pub struct BookingPayload {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub service_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: Option<String>,
}

/// Payload for creating a service. The color is optional; when absent a
/// color from the default palette is assigned server-side.
#[derive(Deserialize, Debug)]
pub struct CreateServicePayload {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    pub color: Option<String>,
}

/// Partial service update; only the provided fields change.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateServicePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub color: Option<String>,
}

/// Admin-side appointment update: status transition and/or notes edit.
/// Omitting `notes` keeps the stored notes; sending `"notes": null`
/// clears them.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateAppointmentPayload {
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/// Partial settings update; omitted fields keep their current value.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateSettingsPayload {
    pub business_hours: Option<BusinessHours>,
    pub slot_granularity_minutes: Option<i64>,
}

/// Payload for blocking a date entirely.
#[derive(Deserialize, Debug)]
pub struct BlockDatePayload {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

/// Kind of portfolio entry shown on the public site.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PortfolioKind {
    Music,
    Video,
}

/// A published work shown on the marketing pages.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct PortfolioItem {
    pub id: i64,
    pub title: String,
    pub artist: Option<String>,
    pub description: String,
    pub kind: PortfolioKind,
    pub image_url: String,
    pub audio_url: Option<String>, // For music items
    pub video_url: Option<String>, // For video items
    pub genre: Option<String>,     // For music items
    pub duration: Option<String>,  // Display length, for video items
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a portfolio item.
#[derive(Deserialize, Debug)]
pub struct CreatePortfolioItemPayload {
    pub title: String,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub kind: PortfolioKind,
    pub image_url: String,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub genre: Option<String>,
    pub duration: Option<String>,
}

/// Partial portfolio update. The nullable fields use the double-`Option`
/// convention: absent keeps the stored value, explicit null clears it.
#[derive(Deserialize, Debug, Default)]
pub struct UpdatePortfolioItemPayload {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub artist: Option<Option<String>>,
    pub description: Option<String>,
    pub kind: Option<PortfolioKind>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub audio_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration: Option<Option<String>>,
}
