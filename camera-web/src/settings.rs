//! UI settings endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Value> {
    let settings = state.settings.lock().await;
    Json(Value::Object(settings.all()))
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(updates): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let mut settings = state.settings.lock().await;
    settings.merge(updates).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Settings updated",
    })))
}
