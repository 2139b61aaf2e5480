use crate::api::error::ApiError;
use crate::api::ApiState;
use crate::device::{DeviceId, DeviceSpec};
use crate::filter::AttributeFilter;
use axum::{
    extract::{Path, RawQuery, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn router() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/devices", get(list_devices))
        .route("/api/devices/:id", get(get_device))
}

/// Parses every `filter` query fragment — each a JSON array of filter
/// objects — and concatenates them into one AND-combined set.
fn parse_filters(query: &str) -> Result<Vec<AttributeFilter>, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| ApiError::BadRequest(format!("malformed query string: {}", e)))?;

    let mut filters = Vec::new();
    for (key, value) in pairs {
        if key != "filter" {
            continue;
        }
        let fragment: Vec<AttributeFilter> = serde_json::from_str(&value)
            .map_err(|e| ApiError::BadRequest(format!("malformed filter '{}': {}", value, e)))?;
        filters.extend(fragment);
    }
    Ok(filters)
}

/// GET /api/devices - List devices, optionally narrowed by `filter`
/// parameters.
async fn list_devices(
    State(state): State<Arc<ApiState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<DeviceSpec>>, ApiError> {
    let filters = parse_filters(query.as_deref().unwrap_or(""))?;
    let devices = state.cache.devices(&filters)?;
    Ok(Json(devices))
}

/// GET /api/devices/:id - Point lookup by device id.
async fn get_device(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceSpec>, ApiError> {
    let device = state.cache.device(&DeviceId::from(id))?;
    Ok(Json(device))
}
