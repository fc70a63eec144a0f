//! Login, logout, and per-user device resolution.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, require_session};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    username: String,
    password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    let authenticated = {
        let users = state.users.lock().await;
        users.verify(&body.username, &body.password)
    };
    if !authenticated {
        tracing::info!("failed login for {}", body.username);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state.auth.issue(&body.username).await;
    tracing::info!("{} logged in", body.username);
    Ok((
        [(header::SET_COOKIE, auth::session_cookie(&token))],
        Json(json!({ "status": "success", "message": "Login successful" })),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let username = require_session(&state.auth, &headers).await?;
    if let Some(token) = auth::session_token(&headers) {
        state.auth.revoke(&token).await;
    }
    tracing::info!("{} logged out", username);
    Ok((
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Json(json!({ "status": "success", "message": "Logout successful" })),
    )
        .into_response())
}

/// The caller's granted devices, resolved against the inventory. Grants
/// pointing at deleted devices are skipped rather than erroring.
pub async fn user_devices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let username = require_session(&state.auth, &headers).await?;
    let ids = {
        let users = state.users.lock().await;
        users.device_ids(&username)
    }
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    let devices = state.devices.lock().await;
    let resolved: Vec<Value> = ids
        .iter()
        .filter_map(|id| {
            devices.get(id).map(|record| {
                json!({ "id": id, "name": record.name, "rtsp_url": record.rtsp_url })
            })
        })
        .collect();
    Ok(Json(json!(resolved)))
}
