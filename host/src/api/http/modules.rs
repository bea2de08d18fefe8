//! Module HTTP handlers

use axum::{extract::State, Json};
use webui_bridge::Module;

use crate::{AppState, Result};

/// List installed modules that ship a web UI
pub async fn list_modules(State(state): State<AppState>) -> Result<Json<Vec<Module>>> {
    let modules = state.modules.list().await?;
    Ok(Json(modules))
}
