use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use schedulr::config::AppConfig;
use schedulr::db;
use schedulr::handlers;
use schedulr::services::{events, waitlist};
use schedulr::state::AppState;
use schedulr::time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    config.validate()?;
    config.business_hours().validate()?;
    config.reconcile_policy().validate()?;

    let conn = db::init_db(&config.database_url)?;
    let state = Arc::new(AppState::new(conn, config.clone()));

    tokio::spawn(sweep_waitlist(
        state.clone(),
        Duration::from_secs(config.sweep_interval_secs.max(1)),
    ));

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Drops waitlist notifications nobody acted on and hands the slot to the
/// next person in line.
async fn sweep_waitlist(state: Arc<AppState>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    let timeout = state.config.waitlist_timeout();

    loop {
        interval.tick().await;

        let report = {
            let db = state.db();
            waitlist::expire_stale(&db, time::now(), timeout)
        };
        match report {
            Ok(report) => {
                for entry in &report.notified {
                    events::publish(&state.events_tx, events::waitlist_slot_available(entry));
                }
            }
            Err(e) => tracing::error!(error = %e, "waitlist sweep failed"),
        }
    }
}
