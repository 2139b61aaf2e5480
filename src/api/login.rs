use crate::api::error::ApiError;
use crate::api::ApiState;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub user: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

pub fn router() -> Router<Arc<ApiState>> {
    Router::new().route("/api/auth/login", post(login))
}

/// POST /api/auth/login - Exchange credentials for a session token.
async fn login(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = state
        .sessions
        .login(&request.user, &request.password)
        .map_err(|e| ApiError::Forbidden(e.to_string()))?;

    info!(user = %request.user, "Issued session token");
    Ok(Json(LoginResponse { token }))
}
