use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

pub mod articles;
pub mod auth;
pub mod brand_voices;
pub mod distribute;
pub mod process;
pub mod ws;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "newsroom",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage.backend_name(),
        "agent": state.agent.name(),
    }))
}
