//! Application state shared across handlers.

use coursevault_services::FileAccessService;
use sqlx::PgPool;

pub struct AppState {
    pub pool: PgPool,
    pub facade: FileAccessService,
}
