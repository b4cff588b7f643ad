// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use axum::http::HeaderName;
use chrono::Utc;
use server::{database, routes};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{self, Duration};
use tower_http::cors::{Any, CorsLayer};

// Define the DB_URL here for the main application's use.
const MAIN_DB_URL: &str = "sqlite://database/sqlite.db";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting up the server...");

    let db_pool = match database::establish_connection_pool(MAIN_DB_URL).await {
        Ok(pool) => {
            tracing::info!("Database connection was made successfully.");
            pool
        }
        Err(e) => {
            tracing::error!("Failed to connect with the database: {:?}", e);
            std::process::exit(1);
        }
    };

    let maintenance_pool = db_pool.clone(); // Clone the pool for the maintenance task
    let last_maintenance_date = Arc::new(Mutex::new(Utc::now().date_naive())); // Store last date maintenance happened

    tokio::spawn(async move {
        // Set an interval for checking.
        // For testing, you might use `Duration::from_secs(60)` for every minute.
        let mut interval = time::interval(Duration::from_secs(5 * 60)); // Check every 5 minutes

        // The first tick completes immediately. Skip it to wait for the first interval.
        interval.tick().await;

        loop {
            interval.tick().await; // Wait for the next interval tick

            let current_date = Utc::now().date_naive();
            let mut last_date_guard = last_maintenance_date.lock().await;

            if *last_date_guard < current_date {
                // If the current date is greater than the last date we ran
                // maintenance for, a new day has started: confirmed
                // appointments on past dates can be marked completed.
                tracing::info!(
                    "New day detected: {}, completing past appointments.",
                    current_date
                );
                match database::complete_past_appointments_in_db(&maintenance_pool).await {
                    Ok(count) => {
                        tracing::info!(
                            "Successfully completed {} past appointments for {}.",
                            count,
                            current_date
                        );
                        *last_date_guard = current_date; // Update the last processed date
                    }
                    Err(e) => {
                        tracing::error!("Error during automatic appointment maintenance: {:?}", e);
                    }
                }
            } else {
                tracing::debug!(
                    "No new day yet. Current date: {}. Last maintenance date: {}.",
                    current_date,
                    *last_date_guard
                );
            }
        }
    });

    let app_routes = routes::create_router(db_pool);

    // Configure CORS here, applying it globally to the router
    let cors = CorsLayer::new()
        .allow_methods(Any) // Allow all HTTP methods
        // Explicit list of the headers the frontend may send. Without
        // token authentication, 'authorization' is not needed.
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("accept"),
        ])
        .allow_origin(Any); // Allow all origins

    let app = app_routes.layer(cors); // Apply the CORS layer

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("The server listens on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
