use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::models::DomainEvent;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub events_tx: broadcast::Sender<DomainEvent>,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            db: Arc::new(Mutex::new(conn)),
            config,
            events_tx,
        }
    }

    /// A poisoned lock still guards a usable connection; recover it.
    pub fn db(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
