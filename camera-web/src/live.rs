//! Broadcast relay control endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LiveStartBody {
    address: Option<String>,
    password: Option<String>,
    stream_url: String,
    stream_key: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveControlBody {
    address: Option<String>,
    password: Option<String>,
}

/// Resolve the controller address/password, falling back to the config.
fn relay_target(
    state: &AppState,
    address: Option<String>,
    password: Option<String>,
) -> Result<(String, String), ApiError> {
    let address = address
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| state.config.relay.address.clone());
    if address.is_empty() {
        return Err(ApiError::bad_request("no relay address configured"));
    }
    let password = password.unwrap_or_else(|| state.config.relay.password.clone());
    Ok((address, password))
}

pub async fn start(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LiveStartBody>,
) -> Result<Json<Value>, ApiError> {
    let (address, password) = relay_target(&state, body.address, body.password)?;
    state
        .relay
        .start(&address, &password, &body.stream_url, &body.stream_key)
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Live streaming started",
    })))
}

pub async fn stop(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LiveControlBody>,
) -> Result<Json<Value>, ApiError> {
    let (address, password) = relay_target(&state, body.address, body.password)?;
    state.relay.stop(&address, &password).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Live streaming stopped",
    })))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let (address, password) = relay_target(&state, None, None)?;
    let relay_status = state.relay.status(&address, &password).await?;
    Ok(Json(json!({
        "status": "success",
        "streaming": relay_status.streaming,
    })))
}
