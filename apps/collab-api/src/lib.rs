pub mod collab;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use collab::{CollabCoordinator, ConnectionTable};
use config::Config;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub connections: Arc<ConnectionTable>,
    pub coordinator: Arc<CollabCoordinator>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let connections = Arc::new(ConnectionTable::new(config.outbound_queue_capacity));
        let coordinator = Arc::new(CollabCoordinator::new(
            connections.clone(),
            config.session_timeout,
        ));
        Self {
            config: Arc::new(config),
            connections,
            coordinator,
        }
    }
}
