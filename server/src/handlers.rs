// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::availability;
use crate::database;
use crate::database::AppointmentUpdateOutcome;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use common::{
    Appointment, BlockDatePayload, BookingPayload, CreatePortfolioItemPayload,
    CreateServicePayload, PortfolioItem, Service, StudioSettings, UpdateAppointmentPayload,
    UpdatePortfolioItemPayload, UpdateServicePayload, UpdateSettingsPayload,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

// --- Services ---

#[derive(Deserialize, Debug, Default)]
pub struct ListServicesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// Handler for listing services. The public site lists active services
/// only; the admin panel passes `include_inactive=true`.
pub async fn list_services(
    State(pool): State<SqlitePool>, // State injection (DB pool)
    Query(query): Query<ListServicesQuery>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = database::list_services_from_db(&pool, query.include_inactive).await?;
    info!("Successfully retrieved {} services.", services.len());
    Ok(Json(services))
}

/// Handler for creating a new service.
pub async fn create_service(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateServicePayload>, // Extracting the request body as JSON
) -> Result<(StatusCode, Json<Service>), AppError> {
    debug!("Received request to create service: {}", payload.name);

    if payload.name.is_empty() {
        error!("Validation failed: Service name is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Service name cannot be empty.",
        ));
    }
    if payload.duration_minutes <= 0 {
        error!("Validation failed: Service duration must be positive.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Service duration must be a positive number of minutes.",
        ));
    }
    if payload.price < 0.0 {
        error!("Validation failed: Service price is negative.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Service price cannot be negative.",
        ));
    }

    let new_service = database::create_service_in_db(&pool, payload).await?;

    info!("Service created successfully with ID: {}", new_service.id);

    Ok((StatusCode::CREATED, Json(new_service)))
}

/// Handler for partially updating a service.
pub async fn update_service(
    State(pool): State<SqlitePool>,
    Path(service_id): Path<i64>,
    Json(payload): Json<UpdateServicePayload>,
) -> Result<Json<Service>, AppError> {
    if matches!(payload.name.as_deref(), Some("")) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Service name cannot be empty.",
        ));
    }
    if matches!(payload.duration_minutes, Some(d) if d <= 0) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Service duration must be a positive number of minutes.",
        ));
    }

    match database::update_service_in_db(&pool, service_id, payload).await? {
        Some(service) => {
            info!("Service with ID {} updated successfully.", service_id);
            Ok(Json(service))
        }
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Service with ID {} not found.", service_id),
        )),
    }
}

/// Handler for soft deleting a service. The row stays so historical
/// appointments keep a valid reference.
pub async fn delete_service(
    State(pool): State<SqlitePool>,
    Path(service_id): Path<i64>, // Extract service ID from the URL path
) -> Result<StatusCode, AppError> {
    debug!("Attempting to soft delete service with ID: {}", service_id);

    let deleted = database::soft_delete_service_in_db(&pool, service_id).await?;

    if deleted {
        info!("Service with ID {} deactivated successfully.", service_id);
        Ok(StatusCode::NO_CONTENT) // 204 No Content for successful deletion
    } else {
        error!("Service with ID {} not found for deletion.", service_id);
        Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Service with ID {} not found for deletion.", service_id),
        ))
    }
}

// --- Appointments ---

#[derive(Deserialize, Debug, Default)]
pub struct ListAppointmentsQuery {
    pub date: Option<NaiveDate>,
}

/// Handler for listing appointments. Without a filter, every
/// appointment is returned newest first (admin view). With `?date=`,
/// only the non-cancelled appointments of that day are returned, which
/// is the set that drives conflict checks.
pub async fn list_appointments(
    State(pool): State<SqlitePool>,
    Query(query): Query<ListAppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = match query.date {
        Some(date) => database::get_appointments_for_date_from_db(&pool, date).await?,
        None => database::list_appointments_from_db(&pool).await?,
    };
    info!("Successfully retrieved {} appointments.", appointments.len());
    Ok(Json(appointments))
}

/// Handler for creating a booking request.
///
/// Validation happens here at the boundary: client fields must be
/// filled, the service must exist and be active, and the date must not
/// be blocked. The overlap check itself happens atomically inside the
/// insert; losing that race yields a 409 so the UI can offer a retry.
pub async fn create_appointment(
    State(pool): State<SqlitePool>,
    Json(payload): Json<BookingPayload>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    debug!(
        "Received booking request from {} for service {} on {} at {}",
        payload.client_name, payload.service_id, payload.date, payload.time
    );

    if payload.client_name.is_empty() || payload.client_email.is_empty() {
        error!("Validation failed: Client name or email is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Client name and email cannot be empty.",
        ));
    }

    let service = match database::get_service_from_db(&pool, payload.service_id).await? {
        Some(service) if service.active => service,
        _ => {
            error!(
                "Validation failed: Service {} not found or inactive.",
                payload.service_id
            );
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                &format!("Service {} not found or inactive.", payload.service_id),
            ));
        }
    };

    if database::is_date_unavailable_in_db(&pool, payload.date).await? {
        return Err(AppError::new(
            StatusCode::CONFLICT,
            &format!("The studio is closed on {}.", payload.date),
        ));
    }

    match database::create_appointment_in_db(&pool, payload, service.duration_minutes).await? {
        Some(appointment) => {
            info!("Appointment created successfully with ID: {}", appointment.id);
            Ok((StatusCode::CREATED, Json(appointment)))
        }
        None => Err(AppError::new(
            StatusCode::CONFLICT,
            "This slot is no longer available, please pick another.",
        )),
    }
}

/// Handler for admin updates to an appointment (status transition,
/// notes). Restoring a cancelled appointment can lose against a
/// rebooked slot, which surfaces as a 409.
pub async fn update_appointment(
    State(pool): State<SqlitePool>,
    Path(appointment_id): Path<i64>,
    Json(payload): Json<UpdateAppointmentPayload>,
) -> Result<Json<Appointment>, AppError> {
    match database::update_appointment_in_db(&pool, appointment_id, payload).await? {
        AppointmentUpdateOutcome::Updated(appointment) => {
            info!("Appointment with ID {} updated successfully.", appointment_id);
            Ok(Json(appointment))
        }
        AppointmentUpdateOutcome::SlotConflict => Err(AppError::new(
            StatusCode::CONFLICT,
            "This appointment cannot be restored: its slot has been rebooked.",
        )),
        AppointmentUpdateOutcome::NotFound => Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Appointment with ID {} not found.", appointment_id),
        )),
    }
}

/// Handler for hard deleting an appointment by ID.
pub async fn delete_appointment(
    State(pool): State<SqlitePool>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Attempting to delete appointment with ID: {}", appointment_id);

    let deleted = database::delete_appointment_from_db(&pool, appointment_id).await?;

    if deleted {
        info!("Appointment with ID {} deleted successfully.", appointment_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        error!("Appointment with ID {} not found for deletion.", appointment_id);
        Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Appointment with ID {} not found for deletion.", appointment_id),
        ))
    }
}

/// Handler for marking confirmed appointments on past dates as
/// completed.
pub async fn complete_past_appointments(
    State(pool): State<SqlitePool>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Return JSON for message/count
    debug!("Received request to complete past appointments.");

    let num_completed = database::complete_past_appointments_in_db(&pool).await?;

    info!("Successfully completed {} past appointments.", num_completed);

    Ok(Json(serde_json::json!({
        "message": format!("Successfully completed {} past appointments.", num_completed),
        "appointments_completed": num_completed
    })))
}

// --- Availability ---

#[derive(Deserialize, Debug)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub service_id: i64,
}

/// Handler for computing the bookable start times of one day.
///
/// A blocked date short-circuits to an empty list before any slot
/// generation. Otherwise the pure calculator runs over the day's
/// non-cancelled appointments, with durations resolved from the full
/// catalog (inactive services included, since history may reference
/// them).
pub async fn get_availability(
    State(pool): State<SqlitePool>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let service = match database::get_service_from_db(&pool, query.service_id).await? {
        Some(service) if service.active => service,
        _ => {
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                &format!("Service {} not found or inactive.", query.service_id),
            ));
        }
    };

    if database::is_date_unavailable_in_db(&pool, query.date).await? {
        info!("Date {} is blocked, returning no slots.", query.date);
        return Ok(Json(Vec::new()));
    }

    let settings = database::get_settings_from_db(&pool).await?;
    let appointments = database::get_appointments_for_date_from_db(&pool, query.date).await?;
    let services = database::list_services_from_db(&pool, true).await?;

    let booked = availability::booked_intervals(&appointments, &services);
    let slots = availability::available_slots(
        &settings.business_hours,
        settings.slot_granularity_minutes,
        service.duration_minutes,
        &booked,
    );

    info!(
        "Computed {} available slots on {} for service {}.",
        slots.len(),
        query.date,
        query.service_id
    );

    Ok(Json(
        slots.iter().map(|t| t.format("%H:%M").to_string()).collect(),
    ))
}

// --- Settings ---

/// Handler for reading the studio settings (business hours, slot
/// granularity, blocked dates).
pub async fn get_settings(
    State(pool): State<SqlitePool>,
) -> Result<Json<StudioSettings>, AppError> {
    let settings = database::get_settings_from_db(&pool).await?;
    Ok(Json(settings))
}

/// Handler for updating the studio settings. Invalid hours or
/// granularity are rejected here, before anything reaches the
/// calculator.
pub async fn update_settings(
    State(pool): State<SqlitePool>,
    Json(payload): Json<UpdateSettingsPayload>,
) -> Result<Json<StudioSettings>, AppError> {
    if let Some(hours) = &payload.business_hours {
        if hours.start >= hours.end {
            error!("Validation failed: opening time is not before closing time.");
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                "Opening time must be before closing time.",
            ));
        }
    }
    if matches!(payload.slot_granularity_minutes, Some(g) if g <= 0) {
        error!("Validation failed: slot granularity must be positive.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Slot granularity must be a positive number of minutes.",
        ));
    }

    let settings = database::update_settings_in_db(&pool, payload).await?;
    info!("Studio settings updated successfully.");
    Ok(Json(settings))
}

// --- Unavailable dates ---

/// Handler for listing blocked dates.
pub async fn list_unavailable_dates(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<NaiveDate>>, AppError> {
    let dates = database::list_unavailable_dates_from_db(&pool).await?;
    Ok(Json(dates))
}

/// Handler for blocking a date entirely. Blocking twice is a no-op.
pub async fn block_date(
    State(pool): State<SqlitePool>,
    Json(payload): Json<BlockDatePayload>,
) -> Result<StatusCode, AppError> {
    database::block_date_in_db(&pool, payload.date, payload.reason).await?;
    Ok(StatusCode::CREATED)
}

/// Handler for unblocking a date.
pub async fn unblock_date(
    State(pool): State<SqlitePool>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, AppError> {
    let removed = database::unblock_date_in_db(&pool, date).await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Date {} was not blocked.", date),
        ))
    }
}

// --- Portfolio ---

/// Handler for listing portfolio items, newest first.
pub async fn list_portfolio(
    State(pool): State<SqlitePool>,
) -> Result<Json<Vec<PortfolioItem>>, AppError> {
    let items = database::list_portfolio_from_db(&pool).await?;
    info!("Successfully retrieved {} portfolio items.", items.len());
    Ok(Json(items))
}

/// Handler for creating a portfolio item.
pub async fn create_portfolio_item(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreatePortfolioItemPayload>,
) -> Result<(StatusCode, Json<PortfolioItem>), AppError> {
    debug!("Received request to create portfolio item: {}", payload.title);

    if payload.title.is_empty() || payload.image_url.is_empty() {
        error!("Validation failed: portfolio title or image URL is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Portfolio title and image URL cannot be empty.",
        ));
    }

    let new_item = database::create_portfolio_item_in_db(&pool, payload).await?;

    info!("Portfolio item created successfully with ID: {}", new_item.id);

    Ok((StatusCode::CREATED, Json(new_item)))
}

/// Handler for partially updating a portfolio item.
pub async fn update_portfolio_item(
    State(pool): State<SqlitePool>,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdatePortfolioItemPayload>,
) -> Result<Json<PortfolioItem>, AppError> {
    if matches!(payload.title.as_deref(), Some("")) {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Portfolio title cannot be empty.",
        ));
    }

    match database::update_portfolio_item_in_db(&pool, item_id, payload).await? {
        Some(item) => {
            info!("Portfolio item with ID {} updated successfully.", item_id);
            Ok(Json(item))
        }
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Portfolio item with ID {} not found.", item_id),
        )),
    }
}

/// Handler for deleting a portfolio item by ID.
pub async fn delete_portfolio_item(
    State(pool): State<SqlitePool>,
    Path(item_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Attempting to delete portfolio item with ID: {}", item_id);

    let deleted = database::delete_portfolio_item_from_db(&pool, item_id).await?;

    if deleted {
        info!("Portfolio item with ID {} deleted successfully.", item_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        error!("Portfolio item with ID {} not found for deletion.", item_id);
        Err(AppError::new(
            StatusCode::NOT_FOUND,
            &format!("Portfolio item with ID {} not found for deletion.", item_id),
        ))
    }
}

// --- Custom Error Handling ---
// This is a good practice for transforming our internal errors
// (e.g., from the database) into appropriate HTTP responses.

/// Our custom error type for the application.
pub struct AppError {
    code: StatusCode,
    message: String,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }
}

/// Allows converting an `anyhow::Error` (coming from `database.rs`)
/// into our `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Log the internal error for debugging.
        tracing::error!("Internal server error: {:?}", err);
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred.".to_string(),
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        (
            self.code,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
