//! API Handlers
//!
//! HTTP request handlers for each admin endpoint. They parse the category at
//! the boundary and delegate to the shared `CacheService`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::cache::{CacheService, Category};
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, GetResponse, HealthResponse, InvalidateRequest, InvalidateResponse,
    NamespaceQuery, SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheService>,
}

impl AppState {
    pub fn new(cache: CacheService) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }
}

/// Handler for `PUT /cache/:category/:identifier`
pub async fn set_handler(
    State(state): State<AppState>,
    Path((category, identifier)): Path<(String, String)>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let category: Category = category.parse()?;
    let (value, options) = req.into_parts();

    let key = state
        .cache
        .key_for(category, &identifier, options.namespace.as_deref());
    let ttl = state.cache.ttl_for(category, options.ttl);
    state.cache.set(category, &identifier, value, options).await?;

    Ok(Json(SetResponse::new(key, ttl)))
}

/// Handler for `GET /cache/:category/:identifier`
///
/// A miss, including one caused by an unavailable store, is a 404.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((category, identifier)): Path<(String, String)>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<GetResponse>> {
    let category: Category = category.parse()?;
    let namespace = query.namespace.as_deref();

    let key = state.cache.key_for(category, &identifier, namespace);
    match state.cache.get(category, &identifier, namespace).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for `DELETE /cache/:category/:identifier`
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((category, identifier)): Path<(String, String)>,
    Query(query): Query<NamespaceQuery>,
) -> Result<Json<DeleteResponse>> {
    let category: Category = category.parse()?;
    let namespace = query.namespace.as_deref();

    let key = state.cache.key_for(category, &identifier, namespace);
    let removed = state.cache.delete(category, &identifier, namespace).await;

    Ok(Json(DeleteResponse::new(key, removed)))
}

/// Handler for `POST /invalidate`
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    let deleted = state.cache.invalidate_pattern(&req.pattern).await?;
    Ok(Json(InvalidateResponse {
        pattern: req.pattern,
        deleted,
    }))
}

/// Handler for `GET /stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let circuit = state.cache.circuit_state().await;
    Json(StatsResponse::new(
        state.cache.stats(),
        circuit,
        state.cache.gateway().backend(),
    ))
}

/// Handler for `GET /health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_circuit(state.cache.circuit_state().await))
}
