//! # unbound-server
//!
//! HTTP/JSON binding for the Unbound command policy gateway.
//!
//! All API routes live under `/api` and authenticate with the `X-API-Key`
//! header:
//!
//! | Method | Path | Who |
//! |---|---|---|
//! | POST | `/api/auth/verify` | any |
//! | GET, POST | `/api/users` | admin |
//! | PUT | `/api/users/:id/credits` | admin |
//! | DELETE | `/api/users/:id` | admin |
//! | GET | `/api/rules` | any |
//! | POST | `/api/rules` | admin |
//! | PUT, DELETE | `/api/rules/:id` | admin |
//! | POST | `/api/commands/execute` | any |
//! | GET | `/api/commands/history?admin_view=&limit=` | any (`admin_view`: admin) |
//!
//! `GET /health` is unauthenticated.

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod settings;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};

use unbound_core::Gateway;

pub use bootstrap::{build, Bootstrapped};
pub use error::{ApiError, ApiResult};
pub use settings::Settings;

/// The full application router.
pub fn router(gateway: Arc<Gateway>) -> Router {
    let api = Router::new()
        .route("/auth/verify", post(handlers::verify))
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/users/:id/credits", put(handlers::set_credits))
        .route("/users/:id", axum::routing::delete(handlers::delete_user))
        .route("/rules", get(handlers::list_rules).post(handlers::create_rule))
        .route(
            "/rules/:id",
            put(handlers::update_rule).delete(handlers::delete_rule),
        )
        .route("/commands/execute", post(handlers::execute))
        .route("/commands/history", get(handlers::history));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .with_state(gateway)
}
