use crate::api::error::ApiError;
use crate::api::ApiState;
use crate::device::{CapabilityArgument, CapabilityKey, DeviceId};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use std::sync::Arc;
use tracing::info;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route(
        "/api/devices/:id/capabilities/:key",
        post(trigger_capability),
    )
}

/// POST /api/devices/:id/capabilities/:key - Invoke a device capability on
/// the upstream hub.
///
/// The request body is the capability argument; an empty body means no
/// argument.
async fn trigger_capability(
    State(state): State<Arc<ApiState>>,
    Path((id, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let argument = if body.is_empty() {
        CapabilityArgument::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("malformed capability argument: {}", e)))?
    };

    info!(device = %id, capability = %key, "Triggering capability");

    state
        .cache
        .trigger_capability(&DeviceId::from(id), &CapabilityKey::from(key), argument)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
