//! Module web root serving

use axum::{
    extract::{Path, Request, State},
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use webui_bridge::Error;

use crate::{AppState, Result};

/// `/webui/{id}` → `/webui/{id}/` so relative asset paths resolve
pub async fn redirect_to_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect> {
    state.modules.module_dir(&id).await?;
    Ok(Redirect::permanent(&format!("/webui/{}/", id)))
}

pub async fn serve_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Response> {
    serve_webroot(&state, &id, request).await
}

pub async fn serve_asset(
    State(state): State<AppState>,
    Path((id, _path)): Path<(String, String)>,
    request: Request,
) -> Result<Response> {
    serve_webroot(&state, &id, request).await
}

async fn serve_webroot(state: &AppState, id: &str, mut request: Request) -> Result<Response> {
    let webroot = state.modules.webroot(id).await?;

    // Re-root the request at the module's web root: /webui/<id>/a/b -> /a/b
    let uri = request.uri();
    let rest = uri
        .path()
        .strip_prefix("/webui/")
        .and_then(|path| path.find('/').map(|i| path[i..].to_string()))
        .unwrap_or_else(|| "/".to_string());
    let target = match uri.query() {
        Some(query) => format!("{}?{}", rest, query),
        None => rest,
    };
    *request.uri_mut() = target
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("bad asset path: {}", target)))?;

    let response = ServeDir::new(webroot)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.into_response())
}
