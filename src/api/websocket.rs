use crate::api::ApiState;
use crate::subscription::ConnectionManager;
use axum::{
    extract::{ws::WebSocketUpgrade, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Query parameters for the WebSocket upgrade.
#[derive(Deserialize)]
struct WsQuery {
    token: Option<String>,
}

/// Token check as a tower layer BEFORE WebSocket upgrade extraction, so a
/// 401 comes back as a plain HTTP response rather than a failed handshake.
async fn ws_auth(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<WsQuery>,
    req: Request,
    next: Next,
) -> Response {
    if state.auth_enabled {
        let valid = params
            .token
            .as_deref()
            .map(|token| state.sessions.validate(token).is_ok())
            .unwrap_or(false);
        if !valid {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }
    next.run(req).await
}

/// Create the subscription router with its auth layer applied.
pub fn router(state: Arc<ApiState>) -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/subscribe", get(subscribe_handler))
        .route_layer(middleware::from_fn_with_state(state, ws_auth))
}

/// GET /api/subscribe - WebSocket upgrade onto the live update stream.
async fn subscribe_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ApiState>>,
) -> Response {
    info!("WebSocket upgrade request received");
    let subscription = state.subscriptions.subscribe();
    ws.on_upgrade(move |socket| ConnectionManager::new().handle(socket, subscription))
}
