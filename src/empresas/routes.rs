//! REST endpoints for empresas and their obrigações acessórias.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{OriginalUri, Path, State};
use axum::response::{IntoResponse, Redirect};
use axum::routing::{any, get, post};
use axum::{Json, Router};

use super::error::{ApiError, EMPRESA_NOT_FOUND, OBRIGACAO_NOT_FOUND};
use super::model::{DeleteMessage, Empresa, NewEmpresa, NewObrigacao, Obrigacao};
use crate::store::Database;

/// Shared state for empresa routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
}

type PathId = Result<Path<i64>, PathRejection>;

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "empresa-gerencia"
    }))
}

// ── Empresas ────────────────────────────────────────────────────────────

/// POST /empresas/
async fn create_empresa(
    State(state): State<AppState>,
    payload: Result<Json<NewEmpresa>, JsonRejection>,
) -> Result<Json<Empresa>, ApiError> {
    let Json(input) = payload?;
    let empresa = state.db.create_empresa(&input).await?;
    Ok(Json(empresa))
}

/// GET /empresas/
async fn list_empresas(State(state): State<AppState>) -> Result<Json<Vec<Empresa>>, ApiError> {
    Ok(Json(state.db.list_empresas().await?))
}

/// GET /empresas/{id}/
async fn get_empresa(
    State(state): State<AppState>,
    id: PathId,
) -> Result<Json<Empresa>, ApiError> {
    let Path(id) = id?;
    state
        .db
        .get_empresa(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(EMPRESA_NOT_FOUND))
}

/// PUT /empresas/{id}/
///
/// Full replacement of the mutable attributes; id and obrigações are kept.
async fn update_empresa(
    State(state): State<AppState>,
    id: PathId,
    payload: Result<Json<NewEmpresa>, JsonRejection>,
) -> Result<Json<Empresa>, ApiError> {
    let Path(id) = id?;
    let Json(input) = payload?;
    state
        .db
        .update_empresa(id, &input)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(EMPRESA_NOT_FOUND))
}

/// DELETE /empresas/{id}/
async fn delete_empresa(
    State(state): State<AppState>,
    id: PathId,
) -> Result<Json<DeleteMessage>, ApiError> {
    let Path(id) = id?;
    if !state.db.delete_empresa(id).await? {
        return Err(ApiError::NotFound(EMPRESA_NOT_FOUND));
    }
    Ok(Json(DeleteMessage::new("Empresa deletada com sucesso")))
}

// ── Obrigações ──────────────────────────────────────────────────────────

/// POST /empresas/{id}/obrigacoes/
async fn create_obrigacao(
    State(state): State<AppState>,
    empresa_id: PathId,
    payload: Result<Json<NewObrigacao>, JsonRejection>,
) -> Result<Json<Obrigacao>, ApiError> {
    let Path(empresa_id) = empresa_id?;
    let Json(input) = payload?;
    state
        .db
        .create_obrigacao(empresa_id, &input)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(EMPRESA_NOT_FOUND))
}

/// GET /obrigacoes/{id}/
async fn get_obrigacao(
    State(state): State<AppState>,
    id: PathId,
) -> Result<Json<Obrigacao>, ApiError> {
    let Path(id) = id?;
    state
        .db
        .get_obrigacao(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(OBRIGACAO_NOT_FOUND))
}

/// DELETE /obrigacoes/{id}/
async fn delete_obrigacao(
    State(state): State<AppState>,
    id: PathId,
) -> Result<Json<DeleteMessage>, ApiError> {
    let Path(id) = id?;
    if !state.db.delete_obrigacao(id).await? {
        return Err(ApiError::NotFound(OBRIGACAO_NOT_FOUND));
    }
    Ok(Json(DeleteMessage::new("Obrigação deletada com sucesso")))
}

/// Answer a path missing its trailing slash with a 307 to the slashed form.
async fn redirect_with_slash(OriginalUri(uri): OriginalUri) -> Redirect {
    let target = match uri.query() {
        Some(query) => format!("{}/?{query}", uri.path()),
        None => format!("{}/", uri.path()),
    };
    Redirect::temporary(&target)
}

/// Build the Axum router with every empresa and obrigação route.
pub fn empresa_routes(db: Arc<dyn Database>) -> Router {
    let state = AppState { db };

    Router::new()
        .route("/health", get(health))
        .route("/empresas/", post(create_empresa).get(list_empresas))
        .route(
            "/empresas/{id}/",
            get(get_empresa).put(update_empresa).delete(delete_empresa),
        )
        .route("/empresas/{id}/obrigacoes/", post(create_obrigacao))
        .route(
            "/obrigacoes/{id}/",
            get(get_obrigacao).delete(delete_obrigacao),
        )
        .route("/empresas", any(redirect_with_slash))
        .route("/empresas/{id}", any(redirect_with_slash))
        .route("/empresas/{id}/obrigacoes", any(redirect_with_slash))
        .route("/obrigacoes/{id}", any(redirect_with_slash))
        .with_state(state)
}
