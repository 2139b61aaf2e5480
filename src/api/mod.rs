// HTTP adapter over the device cache

mod capability;
mod devices;
mod error;
mod login;
mod websocket;

pub use error::ApiError;

use crate::auth::{self, SessionRegistry};
use crate::cache::DeviceCache;
use crate::subscription::Subscriptions;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Everything the HTTP layer needs.
pub struct ApiState {
    pub cache: Arc<DeviceCache>,
    pub subscriptions: Arc<Subscriptions>,
    pub sessions: Arc<SessionRegistry>,
    pub auth_enabled: bool,
}

/// Builds the full API router: login stays open, queries and capability
/// triggering sit behind the bearer check, the WebSocket subscription
/// carries its own token layer.
pub fn create_api_router(state: ApiState) -> Router {
    let state = Arc::new(state);

    let protected = Router::new()
        .merge(devices::router())
        .merge(capability::router())
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_bearer,
        ));

    Router::new()
        .merge(login::router())
        .merge(protected)
        .merge(websocket::router(Arc::clone(&state)))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bearer validation middleware for the HTTP routes. A no-op when auth is
/// disabled in configuration.
async fn require_bearer(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Response {
    if state.auth_enabled {
        let token = match auth::bearer_token(req.headers()) {
            Ok(token) => token,
            Err(e) => return ApiError::Unauthorized(e.to_string()).into_response(),
        };
        if let Err(e) = state.sessions.validate(&token) {
            return ApiError::Unauthorized(e.to_string()).into_response();
        }
    }
    next.run(req).await
}
