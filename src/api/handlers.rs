use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::recommendation::BucketViews;
use crate::models::{Domain, ItemView, RecommendationRequest, RecommendationResponse};
use crate::services::discover::discover as discover_lists;
use crate::services::providers::TrackArtwork;
use crate::services::search::search as search_catalog;
use crate::services::SearchSettings;

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackDetailsRequest {
    #[serde(default)]
    pub track_ids: Vec<String>,
}

fn parse_domain(raw: &str) -> AppResult<Domain> {
    raw.parse()
        .map_err(|_| AppError::DomainUnavailable(raw.to_string()))
}

// Handlers

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "domains": state.domains(),
    }))
}

/// Search one domain's catalog
pub async fn search(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<ItemView>>> {
    let domain = parse_domain(&domain)?;
    let recommender = state.recommender(domain)?;
    let results = search_catalog(
        recommender.store(),
        &SearchSettings::for_domain(domain),
        &params.q,
    );
    Ok(Json(results))
}

/// Browse lists for the landing page
pub async fn discover(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<BucketViews>> {
    let domain = parse_domain(&domain)?;
    let recommender = state.recommender(domain)?;
    let mut rng = state.display_rng();
    let lists = discover_lists(domain, recommender.store(), Utc::now().year(), &mut rng);
    Ok(Json(lists))
}

/// Tag vocabulary of one domain
pub async fn genres(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    let domain = parse_domain(&domain)?;
    let recommender = state.recommender(domain)?;
    Ok(Json(recommender.store().tags().to_vec()))
}

/// Run the recommendation pipeline on the blocking pool, bounded by the request timeout.
///
/// On timeout the blocking job is told to stop at its next stage boundary.
pub async fn recommend(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let domain = parse_domain(&domain)?;
    let Json(request) = payload?;
    let recommender = state.recommender(domain)?;
    let mut rng = state.display_rng();
    let timeout = state.request_timeout();

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    let task = tokio::task::spawn_blocking(move || {
        recommender.recommend_until(&request, &mut rng, &flag)
    });

    let joined = match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined,
        Err(_) => {
            cancelled.store(true, Ordering::Relaxed);
            tracing::warn!(
                domain = %domain,
                timeout_ms = timeout.as_millis() as u64,
                "Recommendation timed out"
            );
            return Err(AppError::Timeout(timeout.as_millis() as u64));
        }
    };
    let response = joined
        .map_err(|e| AppError::Internal(format!("Recommendation task failed: {}", e)))??;

    Ok(Json(response))
}

/// Artwork for music tracks; empty when no provider is configured
pub async fn track_details(
    State(state): State<AppState>,
    payload: Result<Json<TrackDetailsRequest>, JsonRejection>,
) -> AppResult<Json<HashMap<String, TrackArtwork>>> {
    let Json(request) = payload?;
    let provider = match state.artwork() {
        Some(provider) if !request.track_ids.is_empty() => provider,
        _ => return Ok(Json(HashMap::new())),
    };

    let details = provider.track_artwork(&request.track_ids).await?;
    Ok(Json(details))
}
