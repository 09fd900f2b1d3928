#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod db;
mod env;
mod error;
mod models;
mod plan;
mod progress;
mod telemetry;
mod validation;
#[cfg(test)]
mod test;

use api::{
    api_change_password, api_create_assignment, api_create_notification, api_create_workout,
    api_delete_assignment, api_delete_user, api_get_all_users, api_get_all_workouts,
    api_get_assignment, api_get_assignment_breakdown, api_get_athlete,
    api_get_athlete_assignments, api_get_athletes, api_get_notifications, api_get_workout,
    api_login, api_logout, api_mark_all_notifications_read, api_mark_notification_read, api_me,
    api_me_unauthorized, api_register_user, api_reset_assignment_progress,
    api_update_assignment_progress, api_update_profile, api_update_user, api_update_workout,
    health,
};
use auth::unauthorized_api;
use chrono::Utc;
use db::{clean_expired_sessions, mark_overdue_assignments};
use once_cell::sync::Lazy;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, tokio};
use std::sync::Mutex;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing};

use sqlx::SqlitePool;
use tracing::{error, info};

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[launch]
async fn rocket() -> _ {
    if let Err(e) = env::load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    init_tracing();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_default();

    let pool = SqlitePool::connect(&database_url)
        .await
        .expect("Failed to connect to SQLite database");

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            match mark_overdue_assignments(&pool_clone, Utc::now().date_naive()).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Marked {} assignments as overdue", count);
                    }
                }
                Err(e) => {
                    error!("Failed to mark overdue assignments: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(_) => info!("Migrations completed successfully"),
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            panic!("Database migration failed: {}", e);
        }
    }

    init_rocket(pool).await
}

pub async fn init_rocket(pool: SqlitePool) -> Rocket<Build> {
    info!("Starting training tracker");

    rocket::build()
        .manage(pool)
        .mount(
            "/api",
            routes![
                api_login,
                api_me,
                api_me_unauthorized,
                api_logout,
                api_create_assignment,
                api_get_assignment,
                api_get_athlete_assignments,
                api_update_assignment_progress,
                api_reset_assignment_progress,
                api_delete_assignment,
                api_get_assignment_breakdown,
                api_create_workout,
                api_get_all_workouts,
                api_get_workout,
                api_update_workout,
                api_get_notifications,
                api_mark_notification_read,
                api_mark_all_notifications_read,
                api_create_notification,
                api_get_athletes,
                api_get_athlete,
                api_register_user,
                api_change_password,
                api_update_profile,
                api_update_user,
                api_delete_user,
                api_get_all_users,
            ],
        )
        .register("/api", catchers![unauthorized_api])
        .mount("/api", routes![health])
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async {
                telemetry::shutdown_telemetry();
            })
        }))
}
