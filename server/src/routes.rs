// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::SqlitePool;

/// Creates and configures the application router.
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // Service catalog
        .route("/api/services", get(handlers::list_services))
        .route("/api/services", post(handlers::create_service))
        .route("/api/services/{id}", patch(handlers::update_service))
        .route("/api/services/{id}", delete(handlers::delete_service))
        // Appointment store
        .route("/api/appointments", get(handlers::list_appointments))
        .route("/api/appointments", post(handlers::create_appointment))
        .route("/api/appointments/{id}", patch(handlers::update_appointment))
        .route("/api/appointments/{id}", delete(handlers::delete_appointment))
        // Static segment takes precedence over the `{id}` capture above
        .route(
            "/api/appointments/complete-past",
            patch(handlers::complete_past_appointments),
        )
        // Availability calculator
        .route("/api/availability", get(handlers::get_availability))
        // Portfolio
        .route("/api/portfolio", get(handlers::list_portfolio))
        .route("/api/portfolio", post(handlers::create_portfolio_item))
        .route("/api/portfolio/{id}", patch(handlers::update_portfolio_item))
        .route("/api/portfolio/{id}", delete(handlers::delete_portfolio_item))
        // Settings store
        .route("/api/settings", get(handlers::get_settings))
        .route("/api/settings", patch(handlers::update_settings))
        .route(
            "/api/unavailable-dates",
            get(handlers::list_unavailable_dates),
        )
        .route("/api/unavailable-dates", post(handlers::block_date))
        .route(
            "/api/unavailable-dates/{date}",
            delete(handlers::unblock_date),
        )
        // Adds the database pool to the application state
        .with_state(pool)
}
