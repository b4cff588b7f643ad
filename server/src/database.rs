// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::availability::{minutes_since_midnight, FALLBACK_SERVICE_DURATION_MIN};
use crate::palette;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, Utc};
use common::{
    Appointment, AppointmentStatus, BookingPayload, BusinessHours, CreatePortfolioItemPayload,
    CreateServicePayload, PortfolioItem, Service, StudioSettings, UpdateAppointmentPayload,
    UpdatePortfolioItemPayload, UpdateServicePayload, UpdateSettingsPayload,
};
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool}; // Added MigrateDatabase for database_exists/create_database
use tracing::{debug, info};

const DEFAULT_OPEN: &str = "09:00:00";
const DEFAULT_CLOSE: &str = "18:00:00";
const DEFAULT_GRANULARITY_MIN: i64 = 15;

/// Establishes the database connection pool.
/// If the database does not exist, it creates it.
/// It also ensures all tables have the correct schema.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let pool = SqlitePool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    create_schema(&pool).await?;

    info!("Database schema is ready.");

    Ok(pool)
}

/// Creates all tables if they do not exist yet. Shared with the test
/// setup so the in-memory schema never drifts from the real one.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL,
            price REAL NOT NULL,
            color TEXT NOT NULL,
            active BOOLEAN NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'services' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            client_name TEXT NOT NULL,
            client_email TEXT NOT NULL,
            client_phone TEXT NOT NULL,
            service_id INTEGER NOT NULL,
            date DATE NOT NULL,
            time TIME NOT NULL,
            status TEXT NOT NULL,
            notes TEXT NULL,
            created_at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'appointments' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS studio_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            open_time TIME NOT NULL,
            close_time TIME NOT NULL,
            slot_granularity_minutes INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'studio_settings' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unavailable_dates (
            date DATE PRIMARY KEY,
            reason TEXT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'unavailable_dates' table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS portfolio (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NULL,
            description TEXT NOT NULL,
            kind TEXT NOT NULL,
            image_url TEXT NOT NULL,
            audio_url TEXT NULL,
            video_url TEXT NULL,
            genre TEXT NULL,
            duration TEXT NULL,
            created_at TIMESTAMP NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create 'portfolio' table")?;

    Ok(())
}

// --- Services ---

/// Retrieves services, active ones only unless `include_inactive` is set.
pub async fn list_services_from_db(
    pool: &SqlitePool,
    include_inactive: bool,
) -> Result<Vec<Service>> {
    let query = if include_inactive {
        "SELECT * FROM services ORDER BY name ASC;"
    } else {
        "SELECT * FROM services WHERE active = 1 ORDER BY name ASC;"
    };

    let services = sqlx::query_as::<_, Service>(query)
        .fetch_all(pool)
        .await
        .context("Failed to retrieve services from DB")?;

    Ok(services)
}

/// Retrieves a single service by id, active or not. Historical
/// appointments may reference soft-deleted services.
pub async fn get_service_from_db(pool: &SqlitePool, service_id: i64) -> Result<Option<Service>> {
    let service = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = ?;")
        .bind(service_id)
        .fetch_optional(pool)
        .await
        .context("Failed to retrieve service from DB")?;

    Ok(service)
}

/// Inserts a new service. When no color is supplied, one is assigned
/// from the default palette.
pub async fn create_service_in_db(
    pool: &SqlitePool,
    payload: CreateServicePayload,
) -> Result<Service> {
    let color = payload
        .color
        .unwrap_or_else(|| palette::get_or_assign_service_color(&payload.name));
    let description = payload.description.unwrap_or_default();

    debug!(
        "Insert values: name={}, duration_minutes={}, price={}, color={}",
        payload.name, payload.duration_minutes, payload.price, color
    );

    let id = sqlx::query(
        "INSERT INTO services (name, description, duration_minutes, price, color, active) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(&payload.name)
    .bind(&description)
    .bind(payload.duration_minutes)
    .bind(payload.price)
    .bind(&color)
    .execute(pool)
    .await
    .context("Failed to insert service into DB")?
    .last_insert_rowid();

    Ok(Service {
        id,
        name: payload.name,
        description,
        duration_minutes: payload.duration_minutes,
        price: payload.price,
        color,
        active: true,
    })
}

/// Applies a partial update to a service. Returns `None` if no service
/// with the given id exists.
pub async fn update_service_in_db(
    pool: &SqlitePool,
    service_id: i64,
    payload: UpdateServicePayload,
) -> Result<Option<Service>> {
    let Some(current) = get_service_from_db(pool, service_id).await? else {
        return Ok(None);
    };

    let updated = Service {
        id: current.id,
        name: payload.name.unwrap_or(current.name),
        description: payload.description.unwrap_or(current.description),
        duration_minutes: payload.duration_minutes.unwrap_or(current.duration_minutes),
        price: payload.price.unwrap_or(current.price),
        color: payload.color.unwrap_or(current.color),
        active: current.active,
    };

    sqlx::query(
        "UPDATE services SET name = ?, description = ?, duration_minutes = ?, price = ?, color = ? WHERE id = ?",
    )
    .bind(&updated.name)
    .bind(&updated.description)
    .bind(updated.duration_minutes)
    .bind(updated.price)
    .bind(&updated.color)
    .bind(service_id)
    .execute(pool)
    .await
    .context(format!("Failed to update service with ID: {}", service_id))?;

    Ok(Some(updated))
}

/// Soft deletes a service by clearing its `active` flag.
/// Returns true if a service was updated, false if no active service
/// with the given ID was found.
pub async fn soft_delete_service_in_db(pool: &SqlitePool, service_id: i64) -> Result<bool> {
    debug!("Attempting to soft delete service with ID: {}", service_id);
    let result = sqlx::query(
        "UPDATE services SET active = 0 WHERE id = ? AND active = 1", // Only update if still active
    )
    .bind(service_id)
    .execute(pool)
    .await
    .context(format!(
        "Failed to soft delete service with ID: {}",
        service_id
    ))?;

    let rows_affected = result.rows_affected();
    info!(
        "Soft deleted {} rows for service ID: {}",
        rows_affected, service_id
    );

    Ok(rows_affected > 0)
}

// --- Appointments ---

/// Retrieves every appointment, newest first. Used by the admin panel.
pub async fn list_appointments_from_db(pool: &SqlitePool) -> Result<Vec<Appointment>> {
    let appointments =
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments ORDER BY created_at DESC;")
            .fetch_all(pool)
            .await
            .context("Failed to retrieve appointments from DB")?;

    Ok(appointments)
}

/// Retrieves the non-cancelled appointments for one date, in start-time
/// order. This is the input set for conflict checks and availability.
pub async fn get_appointments_for_date_from_db(
    pool: &SqlitePool,
    date: NaiveDate,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE date = ? AND status != 'cancelled' ORDER BY time ASC;",
    )
    .bind(date)
    .fetch_all(pool)
    .await
    .context("Failed to retrieve appointments for date from DB")?;

    Ok(appointments)
}

/// Inserts a booking request, but only if its occupied interval does not
/// overlap any existing non-cancelled appointment on the same date.
///
/// The check and the insert are a single SQL statement, so two
/// concurrent requests for overlapping intervals cannot both succeed:
/// SQLite serializes the writes and the second one sees the first row.
/// Returns `None` when the slot was already taken.
///
/// Minute arithmetic mirrors the availability module: times are reduced
/// to minutes since midnight, truncating seconds, and overlap is
/// half-open (touching endpoints are legal).
pub async fn create_appointment_in_db(
    pool: &SqlitePool,
    payload: BookingPayload,
    service_duration_min: i64,
) -> Result<Option<Appointment>> {
    let created_at = Utc::now();
    let new_start_min = minutes_since_midnight(payload.time);
    let new_end_min = new_start_min + service_duration_min;

    debug!(
        "Insert values: client_name={}, service_id={}, date={}, time={}, interval=[{}, {})",
        payload.client_name, payload.service_id, payload.date, payload.time, new_start_min, new_end_min
    );

    let result = sqlx::query(
        r#"
        INSERT INTO appointments
            (client_name, client_email, client_phone, service_id, date, time, status, notes, created_at)
        SELECT ?, ?, ?, ?, ?, ?, 'pending', ?, ?
        WHERE NOT EXISTS (
            SELECT 1
            FROM appointments a
            LEFT JOIN services s ON s.id = a.service_id
            WHERE a.date = ?
              AND a.status != 'cancelled'
              AND ? < (CAST(substr(a.time, 1, 2) AS INTEGER) * 60
                       + CAST(substr(a.time, 4, 2) AS INTEGER))
                      + COALESCE(s.duration_minutes, ?)
              AND ? > (CAST(substr(a.time, 1, 2) AS INTEGER) * 60
                       + CAST(substr(a.time, 4, 2) AS INTEGER))
        );
        "#,
    )
    .bind(&payload.client_name)
    .bind(&payload.client_email)
    .bind(&payload.client_phone)
    .bind(payload.service_id)
    .bind(payload.date)
    .bind(payload.time)
    .bind(&payload.notes)
    .bind(created_at)
    .bind(payload.date)
    .bind(new_start_min)
    .bind(FALLBACK_SERVICE_DURATION_MIN)
    .bind(new_end_min)
    .execute(pool)
    .await
    .context("Failed to insert appointment into DB")?;

    if result.rows_affected() == 0 {
        info!(
            "Slot conflict on {} at {}: appointment not created.",
            payload.date, payload.time
        );
        return Ok(None);
    }

    let new_appointment = Appointment {
        id: result.last_insert_rowid(),
        client_name: payload.client_name,
        client_email: payload.client_email,
        client_phone: payload.client_phone,
        service_id: payload.service_id,
        date: payload.date,
        time: payload.time,
        status: AppointmentStatus::Pending,
        notes: payload.notes,
        created_at,
    };

    Ok(Some(new_appointment))
}

/// Outcome of an admin appointment update.
#[derive(Debug)]
pub enum AppointmentUpdateOutcome {
    Updated(Appointment),
    /// The appointment exists, but restoring it would overlap another
    /// non-cancelled appointment on the same date.
    SlotConflict,
    NotFound,
}

/// Applies an admin update (status transition and/or notes) to an
/// appointment.
///
/// A status transition out of `cancelled` re-enters the conflict
/// domain: the slot may have been rebooked since the cancellation, so
/// the update runs the same conditional-write overlap guard as the
/// initial insert and reports `SlotConflict` when it loses.
///
/// For notes, an absent field keeps the stored value and an explicit
/// null clears it.
pub async fn update_appointment_in_db(
    pool: &SqlitePool,
    appointment_id: i64,
    payload: UpdateAppointmentPayload,
) -> Result<AppointmentUpdateOutcome> {
    let current =
        sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?;")
            .bind(appointment_id)
            .fetch_optional(pool)
            .await
            .context("Failed to retrieve appointment from DB")?;

    let Some(current) = current else {
        return Ok(AppointmentUpdateOutcome::NotFound);
    };

    let new_status = payload.status.unwrap_or(current.status);
    let new_notes = match payload.notes {
        Some(notes) => notes,
        None => current.notes.clone(),
    };

    let leaving_cancelled = current.status == AppointmentStatus::Cancelled
        && new_status != AppointmentStatus::Cancelled;

    if leaving_cancelled {
        let duration_min = get_service_from_db(pool, current.service_id)
            .await?
            .map(|svc| svc.duration_minutes)
            .unwrap_or(FALLBACK_SERVICE_DURATION_MIN);
        let start_min = minutes_since_midnight(current.time);
        let end_min = start_min + duration_min;

        debug!(
            "Restoring appointment {}: re-checking interval [{}, {}) on {}",
            appointment_id, start_min, end_min, current.date
        );

        let result = sqlx::query(
            r#"
            UPDATE appointments SET status = ?, notes = ?
            WHERE id = ?
              AND NOT EXISTS (
                SELECT 1
                FROM appointments a
                LEFT JOIN services s ON s.id = a.service_id
                WHERE a.date = ?
                  AND a.id != ?
                  AND a.status != 'cancelled'
                  AND ? < (CAST(substr(a.time, 1, 2) AS INTEGER) * 60
                           + CAST(substr(a.time, 4, 2) AS INTEGER))
                          + COALESCE(s.duration_minutes, ?)
                  AND ? > (CAST(substr(a.time, 1, 2) AS INTEGER) * 60
                           + CAST(substr(a.time, 4, 2) AS INTEGER))
              );
            "#,
        )
        .bind(new_status)
        .bind(&new_notes)
        .bind(appointment_id)
        .bind(current.date)
        .bind(appointment_id)
        .bind(start_min)
        .bind(FALLBACK_SERVICE_DURATION_MIN)
        .bind(end_min)
        .execute(pool)
        .await
        .context(format!(
            "Failed to restore appointment with ID: {}",
            appointment_id
        ))?;

        if result.rows_affected() == 0 {
            info!(
                "Slot conflict restoring appointment {}: update rejected.",
                appointment_id
            );
            return Ok(AppointmentUpdateOutcome::SlotConflict);
        }
    } else {
        sqlx::query("UPDATE appointments SET status = ?, notes = ? WHERE id = ?")
            .bind(new_status)
            .bind(&new_notes)
            .bind(appointment_id)
            .execute(pool)
            .await
            .context(format!(
                "Failed to update appointment with ID: {}",
                appointment_id
            ))?;
    }

    Ok(AppointmentUpdateOutcome::Updated(Appointment {
        status: new_status,
        notes: new_notes,
        ..current
    }))
}

/// Hard deletes an appointment (admin cleanup). Cancellations should go
/// through a status update instead, so the history is preserved.
pub async fn delete_appointment_from_db(pool: &SqlitePool, appointment_id: i64) -> Result<bool> {
    debug!("Attempting to delete appointment with ID: {}", appointment_id);
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(appointment_id)
        .execute(pool)
        .await
        .context(format!(
            "Failed to delete appointment with ID: {}",
            appointment_id
        ))?;

    Ok(result.rows_affected() > 0)
}

/// Marks confirmed appointments on past dates as completed. Run daily by
/// the background maintenance task and exposed as an admin endpoint.
pub async fn complete_past_appointments_in_db(pool: &SqlitePool) -> Result<usize> {
    let today = Utc::now().date_naive();

    debug!("Completing confirmed appointments before {}", today);

    let result =
        sqlx::query("UPDATE appointments SET status = 'completed' WHERE date < ? AND status = 'confirmed'")
            .bind(today)
            .execute(pool)
            .await
            .context("Failed to complete past appointments in DB")?;

    let num_completed = result.rows_affected() as usize;
    info!("Marked {} past appointments as completed.", num_completed);

    Ok(num_completed)
}

// --- Settings ---

/// Retrieves the studio settings, creating the default row on first
/// access (09:00-18:00, 15-minute granularity).
pub async fn get_settings_from_db(pool: &SqlitePool) -> Result<StudioSettings> {
    let row = sqlx::query_as::<_, (NaiveTime, NaiveTime, i64)>(
        "SELECT open_time, close_time, slot_granularity_minutes FROM studio_settings WHERE id = 1;",
    )
    .fetch_optional(pool)
    .await
    .context("Failed to retrieve studio settings from DB")?;

    let (open_time, close_time, granularity) = match row {
        Some(row) => row,
        None => {
            info!("No studio settings found, inserting defaults.");
            sqlx::query(
                "INSERT INTO studio_settings (id, open_time, close_time, slot_granularity_minutes) VALUES (1, ?, ?, ?)",
            )
            .bind(DEFAULT_OPEN)
            .bind(DEFAULT_CLOSE)
            .bind(DEFAULT_GRANULARITY_MIN)
            .execute(pool)
            .await
            .context("Failed to insert default studio settings")?;

            let open = NaiveTime::parse_from_str(DEFAULT_OPEN, "%H:%M:%S")
                .context("Invalid default open time")?;
            let close = NaiveTime::parse_from_str(DEFAULT_CLOSE, "%H:%M:%S")
                .context("Invalid default close time")?;
            (open, close, DEFAULT_GRANULARITY_MIN)
        }
    };

    let unavailable_dates = list_unavailable_dates_from_db(pool).await?;

    Ok(StudioSettings {
        business_hours: BusinessHours {
            start: open_time,
            end: close_time,
        },
        slot_granularity_minutes: granularity,
        unavailable_dates,
    })
}

/// Applies a partial settings update and returns the merged settings.
pub async fn update_settings_in_db(
    pool: &SqlitePool,
    payload: UpdateSettingsPayload,
) -> Result<StudioSettings> {
    // Ensures the settings row exists before updating it.
    let current = get_settings_from_db(pool).await?;

    let business_hours = payload.business_hours.unwrap_or(current.business_hours);
    let granularity = payload
        .slot_granularity_minutes
        .unwrap_or(current.slot_granularity_minutes);

    sqlx::query(
        "UPDATE studio_settings SET open_time = ?, close_time = ?, slot_granularity_minutes = ? WHERE id = 1",
    )
    .bind(business_hours.start)
    .bind(business_hours.end)
    .bind(granularity)
    .execute(pool)
    .await
    .context("Failed to update studio settings in DB")?;

    Ok(StudioSettings {
        business_hours,
        slot_granularity_minutes: granularity,
        unavailable_dates: current.unavailable_dates,
    })
}

// --- Unavailable dates ---

/// Retrieves all fully blocked dates in ascending order.
pub async fn list_unavailable_dates_from_db(pool: &SqlitePool) -> Result<Vec<NaiveDate>> {
    let rows = sqlx::query_as::<_, (NaiveDate,)>(
        "SELECT date FROM unavailable_dates ORDER BY date ASC;",
    )
    .fetch_all(pool)
    .await
    .context("Failed to retrieve unavailable dates from DB")?;

    Ok(rows.into_iter().map(|(date,)| date).collect())
}

/// Checks whether a single date is blocked.
pub async fn is_date_unavailable_in_db(pool: &SqlitePool, date: NaiveDate) -> Result<bool> {
    let row = sqlx::query_as::<_, (NaiveDate,)>("SELECT date FROM unavailable_dates WHERE date = ?;")
        .bind(date)
        .fetch_optional(pool)
        .await
        .context("Failed to check unavailable date in DB")?;

    Ok(row.is_some())
}

/// Blocks a date. Blocking an already-blocked date is a no-op, matching
/// the idempotent behavior the admin calendar expects.
pub async fn block_date_in_db(
    pool: &SqlitePool,
    date: NaiveDate,
    reason: Option<String>,
) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO unavailable_dates (date, reason) VALUES (?, ?)")
        .bind(date)
        .bind(reason)
        .execute(pool)
        .await
        .context(format!("Failed to block date: {}", date))?;

    info!("Date {} is now blocked.", date);

    Ok(())
}

/// Unblocks a date. Returns false if the date was not blocked.
pub async fn unblock_date_in_db(pool: &SqlitePool, date: NaiveDate) -> Result<bool> {
    let result = sqlx::query("DELETE FROM unavailable_dates WHERE date = ?")
        .bind(date)
        .execute(pool)
        .await
        .context(format!("Failed to unblock date: {}", date))?;

    Ok(result.rows_affected() > 0)
}

// --- Portfolio ---

/// Retrieves every portfolio item, newest first.
pub async fn list_portfolio_from_db(pool: &SqlitePool) -> Result<Vec<PortfolioItem>> {
    let items =
        sqlx::query_as::<_, PortfolioItem>("SELECT * FROM portfolio ORDER BY created_at DESC;")
            .fetch_all(pool)
            .await
            .context("Failed to retrieve portfolio items from DB")?;

    Ok(items)
}

/// Retrieves a single portfolio item by id.
pub async fn get_portfolio_item_from_db(
    pool: &SqlitePool,
    item_id: i64,
) -> Result<Option<PortfolioItem>> {
    let item = sqlx::query_as::<_, PortfolioItem>("SELECT * FROM portfolio WHERE id = ?;")
        .bind(item_id)
        .fetch_optional(pool)
        .await
        .context("Failed to retrieve portfolio item from DB")?;

    Ok(item)
}

/// Inserts a new portfolio item.
pub async fn create_portfolio_item_in_db(
    pool: &SqlitePool,
    payload: CreatePortfolioItemPayload,
) -> Result<PortfolioItem> {
    let description = payload.description.unwrap_or_default();
    let created_at = Utc::now();

    debug!("Insert values: title={}, kind={:?}", payload.title, payload.kind);

    let id = sqlx::query(
        "INSERT INTO portfolio (title, artist, description, kind, image_url, audio_url, video_url, genre, duration, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&payload.title)
    .bind(&payload.artist)
    .bind(&description)
    .bind(payload.kind)
    .bind(&payload.image_url)
    .bind(&payload.audio_url)
    .bind(&payload.video_url)
    .bind(&payload.genre)
    .bind(&payload.duration)
    .bind(created_at)
    .execute(pool)
    .await
    .context("Failed to insert portfolio item into DB")?
    .last_insert_rowid();

    Ok(PortfolioItem {
        id,
        title: payload.title,
        artist: payload.artist,
        description,
        kind: payload.kind,
        image_url: payload.image_url,
        audio_url: payload.audio_url,
        video_url: payload.video_url,
        genre: payload.genre,
        duration: payload.duration,
        created_at,
    })
}

/// Applies a partial update to a portfolio item. Returns `None` if no
/// item with the given id exists. Nullable fields follow the
/// double-`Option` convention of the payload.
pub async fn update_portfolio_item_in_db(
    pool: &SqlitePool,
    item_id: i64,
    payload: UpdatePortfolioItemPayload,
) -> Result<Option<PortfolioItem>> {
    let Some(current) = get_portfolio_item_from_db(pool, item_id).await? else {
        return Ok(None);
    };

    let updated = PortfolioItem {
        id: current.id,
        title: payload.title.unwrap_or(current.title),
        artist: payload.artist.unwrap_or(current.artist),
        description: payload.description.unwrap_or(current.description),
        kind: payload.kind.unwrap_or(current.kind),
        image_url: payload.image_url.unwrap_or(current.image_url),
        audio_url: payload.audio_url.unwrap_or(current.audio_url),
        video_url: payload.video_url.unwrap_or(current.video_url),
        genre: payload.genre.unwrap_or(current.genre),
        duration: payload.duration.unwrap_or(current.duration),
        created_at: current.created_at,
    };

    sqlx::query(
        "UPDATE portfolio SET title = ?, artist = ?, description = ?, kind = ?, image_url = ?, audio_url = ?, video_url = ?, genre = ?, duration = ? WHERE id = ?",
    )
    .bind(&updated.title)
    .bind(&updated.artist)
    .bind(&updated.description)
    .bind(updated.kind)
    .bind(&updated.image_url)
    .bind(&updated.audio_url)
    .bind(&updated.video_url)
    .bind(&updated.genre)
    .bind(&updated.duration)
    .bind(item_id)
    .execute(pool)
    .await
    .context(format!("Failed to update portfolio item with ID: {}", item_id))?;

    Ok(Some(updated))
}

/// Deletes a portfolio item. Returns false if no item with the given ID
/// was found.
pub async fn delete_portfolio_item_from_db(pool: &SqlitePool, item_id: i64) -> Result<bool> {
    debug!("Attempting to delete portfolio item with ID: {}", item_id);
    let result = sqlx::query("DELETE FROM portfolio WHERE id = ?")
        .bind(item_id)
        .execute(pool)
        .await
        .context(format!(
            "Failed to delete portfolio item with ID: {}",
            item_id
        ))?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Helper function to set up an in-memory SQLite database for testing.
    /// This creates a fresh, empty database for each test, ensuring they are isolated.
    async fn setup_test_db() -> Result<SqlitePool> {
        // Use :memory: to create an in-memory database
        let pool = SqlitePool::connect("sqlite::memory:").await?;

        // Run the same schema creation as the main application
        create_schema(&pool).await?;

        Ok(pool)
    }

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    async fn insert_service(pool: &SqlitePool, name: &str, duration_minutes: i64) -> Service {
        create_service_in_db(
            pool,
            CreateServicePayload {
                name: name.to_string(),
                description: Some("Test service".to_string()),
                duration_minutes,
                price: 80.0,
                color: Some("#1f77b4".to_string()),
            },
        )
        .await
        .unwrap()
    }

    fn booking(service_id: i64, date: NaiveDate, time: NaiveTime) -> BookingPayload {
        BookingPayload {
            client_name: "Test Client".to_string(),
            client_email: "client@example.com".to_string(),
            client_phone: "555-0100".to_string(),
            service_id,
            date,
            time,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_appointment() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        // Act: Create a new appointment in the test database
        let created = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");

        // Assert: The created appointment has the correct data
        assert_eq!(created.client_name, "Test Client");
        assert_eq!(created.date, date);
        assert_eq!(created.time, t(10, 0));
        assert_eq!(created.status, AppointmentStatus::Pending);
        assert!(created.id > 0); // Should have been assigned an ID by the DB

        // Act: Retrieve appointments for the date
        let day = get_appointments_for_date_from_db(&pool, date).await.unwrap();

        // Assert: The newly created appointment is in the list
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, created.id);
        assert_eq!(day[0].service_id, service.id);
    }

    #[tokio::test]
    async fn test_overlapping_booking_is_rejected_at_write_time() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        // First booking takes 10:00-11:00.
        let first = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap();
        assert!(first.is_some());

        // A second booking at 10:30 would occupy 10:30-11:30 and must be
        // rejected by the conditional insert, not by a prior read.
        let second = create_appointment_in_db(&pool, booking(service.id, date, t(10, 30)), 60)
            .await
            .unwrap();
        assert!(second.is_none());

        // Only the first row exists.
        let day = get_appointments_for_date_from_db(&pool, date).await.unwrap();
        assert_eq!(day.len(), 1);
    }

    #[tokio::test]
    async fn test_touching_booking_is_accepted() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");

        // 11:00 starts exactly when the existing booking ends.
        let touching = create_appointment_in_db(&pool, booking(service.id, date, t(11, 0)), 30)
            .await
            .unwrap();
        assert!(touching.is_some());
    }

    #[tokio::test]
    async fn test_cancelled_appointment_frees_the_slot() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        let first = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");

        // Cancel it; the slot becomes bookable again.
        let outcome = update_appointment_in_db(
            &pool,
            first.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Cancelled),
                notes: None,
            },
        )
        .await
        .unwrap();
        let AppointmentUpdateOutcome::Updated(updated) = outcome else {
            panic!("expected the update to succeed");
        };
        assert_eq!(updated.status, AppointmentStatus::Cancelled);

        let rebooked = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap();
        assert!(rebooked.is_some());

        // The cancelled row is kept for history.
        let all = list_appointments_from_db(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_restoring_cancelled_appointment_into_taken_slot_is_rejected() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        // Book 10:00-11:00, then cancel it.
        let first = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");
        update_appointment_in_db(
            &pool,
            first.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Cancelled),
                notes: None,
            },
        )
        .await
        .unwrap();

        // The freed slot gets rebooked at 10:30-11:30.
        let second = create_appointment_in_db(&pool, booking(service.id, date, t(10, 30)), 60)
            .await
            .unwrap()
            .expect("slot should be free after cancellation");

        // Restoring the first appointment would recreate the overlap
        // and must be rejected.
        let outcome = update_appointment_in_db(
            &pool,
            first.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Confirmed),
                notes: None,
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, AppointmentUpdateOutcome::SlotConflict));

        // Only one non-cancelled appointment remains on the day.
        let day = get_appointments_for_date_from_db(&pool, date).await.unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].id, second.id);

        // After the rebooking is gone, restoring succeeds.
        assert!(delete_appointment_from_db(&pool, second.id).await.unwrap());
        let outcome = update_appointment_in_db(
            &pool,
            first.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Confirmed),
                notes: None,
            },
        )
        .await
        .unwrap();
        let AppointmentUpdateOutcome::Updated(restored) = outcome else {
            panic!("expected the restore to succeed");
        };
        assert_eq!(restored.status, AppointmentStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_notes_cleared_with_null_and_kept_when_absent() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        let created = create_appointment_in_db(&pool, booking(service.id, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");

        // Set the notes.
        let outcome = update_appointment_in_db(
            &pool,
            created.id,
            UpdateAppointmentPayload {
                status: None,
                notes: Some(Some("Bring the stems".to_string())),
            },
        )
        .await
        .unwrap();
        let AppointmentUpdateOutcome::Updated(updated) = outcome else {
            panic!("expected the update to succeed");
        };
        assert_eq!(updated.notes.as_deref(), Some("Bring the stems"));

        // An update without a notes field keeps them. The payload is
        // deserialized from JSON to exercise the absent-vs-null
        // distinction the API relies on.
        let payload: UpdateAppointmentPayload =
            serde_json::from_str(r#"{ "status": "confirmed" }"#).unwrap();
        let outcome = update_appointment_in_db(&pool, created.id, payload).await.unwrap();
        let AppointmentUpdateOutcome::Updated(updated) = outcome else {
            panic!("expected the update to succeed");
        };
        assert_eq!(updated.status, AppointmentStatus::Confirmed);
        assert_eq!(updated.notes.as_deref(), Some("Bring the stems"));

        // An explicit null clears them.
        let payload: UpdateAppointmentPayload =
            serde_json::from_str(r#"{ "notes": null }"#).unwrap();
        let outcome = update_appointment_in_db(&pool, created.id, payload).await.unwrap();
        let AppointmentUpdateOutcome::Updated(updated) = outcome else {
            panic!("expected the update to succeed");
        };
        assert_eq!(updated.notes, None);
    }

    #[tokio::test]
    async fn test_portfolio_crud_roundtrip() {
        let pool = setup_test_db().await.unwrap();

        let created = create_portfolio_item_in_db(
            &pool,
            common::CreatePortfolioItemPayload {
                title: "Midnight Sessions".to_string(),
                artist: Some("The Echoes".to_string()),
                description: Some("Debut EP recorded here".to_string()),
                kind: common::PortfolioKind::Music,
                image_url: "https://example.com/cover.jpg".to_string(),
                audio_url: Some("https://example.com/track.mp3".to_string()),
                video_url: None,
                genre: Some("Indie".to_string()),
                duration: None,
            },
        )
        .await
        .unwrap();
        assert!(created.id > 0);

        let items = list_portfolio_from_db(&pool).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Midnight Sessions");

        // Partial update: rename, and clear the artist with an explicit
        // null while leaving the genre untouched.
        let payload: UpdatePortfolioItemPayload = serde_json::from_str(
            r#"{ "title": "Midnight Sessions (Remastered)", "artist": null }"#,
        )
        .unwrap();
        let updated = update_portfolio_item_in_db(&pool, created.id, payload)
            .await
            .unwrap()
            .expect("item should exist");
        assert_eq!(updated.title, "Midnight Sessions (Remastered)");
        assert_eq!(updated.artist, None);
        assert_eq!(updated.genre.as_deref(), Some("Indie"));

        // Delete removes the row.
        assert!(delete_portfolio_item_from_db(&pool, created.id).await.unwrap());
        assert!(!delete_portfolio_item_from_db(&pool, created.id).await.unwrap());
        assert!(list_portfolio_from_db(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_uses_fallback_duration_for_unknown_service() {
        let pool = setup_test_db().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 7, 7).unwrap();

        // Appointment referencing a service id that was never created.
        create_appointment_in_db(&pool, booking(999, date, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");

        let service = insert_service(&pool, "Mixing", 30).await;

        // 10:30 falls inside the assumed 10:00-11:00 fallback window.
        let inside = create_appointment_in_db(&pool, booking(service.id, date, t(10, 30)), 30)
            .await
            .unwrap();
        assert!(inside.is_none());

        // 11:00 touches the fallback window and is accepted.
        let after = create_appointment_in_db(&pool, booking(service.id, date, t(11, 0)), 30)
            .await
            .unwrap();
        assert!(after.is_some());
    }

    #[tokio::test]
    async fn test_soft_delete_service_keeps_row() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Mastering", 45).await;

        let was_deleted = soft_delete_service_in_db(&pool, service.id).await.unwrap();
        assert!(was_deleted);

        // A second soft delete is a no-op.
        let again = soft_delete_service_in_db(&pool, service.id).await.unwrap();
        assert!(!again);

        // The service is gone from the active list but still resolvable.
        let active = list_services_from_db(&pool, false).await.unwrap();
        assert!(active.is_empty());
        let fetched = get_service_from_db(&pool, service.id).await.unwrap().unwrap();
        assert!(!fetched.active);
    }

    #[tokio::test]
    async fn test_settings_defaults_then_update() {
        let pool = setup_test_db().await.unwrap();

        let settings = get_settings_from_db(&pool).await.unwrap();
        assert_eq!(settings.business_hours.start, t(9, 0));
        assert_eq!(settings.business_hours.end, t(18, 0));
        assert_eq!(settings.slot_granularity_minutes, 15);
        assert!(settings.unavailable_dates.is_empty());

        let updated = update_settings_in_db(
            &pool,
            UpdateSettingsPayload {
                business_hours: Some(BusinessHours {
                    start: t(10, 0),
                    end: t(19, 0),
                }),
                slot_granularity_minutes: Some(30),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.business_hours.start, t(10, 0));
        assert_eq!(updated.slot_granularity_minutes, 30);

        // Partial update keeps the untouched fields.
        let partial = update_settings_in_db(
            &pool,
            UpdateSettingsPayload {
                business_hours: None,
                slot_granularity_minutes: Some(20),
            },
        )
        .await
        .unwrap();
        assert_eq!(partial.business_hours.end, t(19, 0));
        assert_eq!(partial.slot_granularity_minutes, 20);
    }

    #[tokio::test]
    async fn test_block_and_unblock_date() {
        let pool = setup_test_db().await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 12, 24).unwrap();

        block_date_in_db(&pool, date, Some("Holiday".to_string()))
            .await
            .unwrap();
        // Blocking twice is idempotent.
        block_date_in_db(&pool, date, None).await.unwrap();

        assert!(is_date_unavailable_in_db(&pool, date).await.unwrap());
        assert_eq!(list_unavailable_dates_from_db(&pool).await.unwrap(), vec![date]);

        let removed = unblock_date_in_db(&pool, date).await.unwrap();
        assert!(removed);
        assert!(!is_date_unavailable_in_db(&pool, date).await.unwrap());

        let removed_again = unblock_date_in_db(&pool, date).await.unwrap();
        assert!(!removed_again);
    }

    #[tokio::test]
    async fn test_complete_past_appointments() {
        let pool = setup_test_db().await.unwrap();
        let service = insert_service(&pool, "Recording Session", 60).await;
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        let past = create_appointment_in_db(&pool, booking(service.id, yesterday, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");
        update_appointment_in_db(
            &pool,
            past.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Confirmed),
                notes: None,
            },
        )
        .await
        .unwrap();

        // A confirmed appointment today must not be touched.
        let current = create_appointment_in_db(&pool, booking(service.id, today, t(10, 0)), 60)
            .await
            .unwrap()
            .expect("slot should be free");
        update_appointment_in_db(
            &pool,
            current.id,
            UpdateAppointmentPayload {
                status: Some(AppointmentStatus::Confirmed),
                notes: None,
            },
        )
        .await
        .unwrap();

        let num_completed = complete_past_appointments_in_db(&pool).await.unwrap();
        assert_eq!(num_completed, 1);

        let all = list_appointments_from_db(&pool).await.unwrap();
        let past_row = all.iter().find(|a| a.id == past.id).unwrap();
        let current_row = all.iter().find(|a| a.id == current.id).unwrap();
        assert_eq!(past_row.status, AppointmentStatus::Completed);
        assert_eq!(current_row.status, AppointmentStatus::Confirmed);
    }
}
