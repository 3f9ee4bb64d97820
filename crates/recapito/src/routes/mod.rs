//! HTTP route handlers.

pub mod contact;
pub mod health;
pub mod helpers;

use axum::Router;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;

use crate::session::create_session_layer;
use crate::state::AppState;

/// Build the application router with session and trace layers applied.
pub fn app(state: AppState, same_site: SameSite) -> Router {
    Router::new()
        .merge(contact::router())
        .merge(health::router())
        .layer(create_session_layer(same_site))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
