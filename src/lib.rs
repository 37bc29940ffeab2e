pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod events;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use events::TicketEvents;
use mailer::Mailer;

// DatabaseConnection is only Clone without the mock feature, so the shared
// handle lives behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Config,
    pub events: Arc<TicketEvents>,
    pub mailer: Arc<dyn Mailer>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mailer::LogMailer;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn app_state_can_be_cloned_for_router_layers() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let state = AppState {
            db,
            config: Config {
                database_url: String::new(),
                jwt_secret: "secret".to_string(),
                jwt_expiration_hours: 24,
                server_host: "127.0.0.1".to_string(),
                server_port: 3000,
                smtp: None,
            },
            events: Arc::new(TicketEvents::new()),
            mailer: Arc::new(LogMailer),
        };

        let copy = state.clone();
        assert!(copy.config.server_addr().ends_with(":3000"));
    }
}
