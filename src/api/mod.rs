/// API routes and handlers
pub mod auth;
pub mod middleware;
pub mod response;
pub mod sessions;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(sessions::routes())
        .merge(users::routes())
}
