//! REST API handlers for banner lookup, banner management and operational endpoints.

use crate::auth;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use banner_core::{Banner, BannerError, BannerFilter, BannerPayload};
use banner_store::{BannerRepository, TokenRepository};
use banner_sync::BannerResolver;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<BannerResolver>,
    pub banners: Arc<dyn BannerRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub node_id: String,
    pub start_time: Instant,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub banner_id: u64,
}

pub fn api_error(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            message: message.into(),
        }),
    )
}

/// Map a domain error onto an HTTP response. Store details stay in the logs.
fn from_banner_error(err: BannerError) -> ApiError {
    match err {
        BannerError::NotFound => api_error(StatusCode::NOT_FOUND, "not_found", "Banner not found"),
        BannerError::Validation(msg) => {
            metrics::counter!("api.validation_errors").increment(1);
            api_error(StatusCode::BAD_REQUEST, "invalid_banner", msg)
        }
        other => {
            error!(error = %other, "Banner request failed");
            metrics::counter!("api.errors").increment(1);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal processing error",
            )
        }
    }
}

fn bad_request(msg: &str) -> ApiError {
    metrics::counter!("api.validation_errors").increment(1);
    api_error(StatusCode::BAD_REQUEST, "invalid_request", msg)
}

/// Parse an optional query value; empty counts as absent.
fn parse_param<T: FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| bad_request(&format!("invalid {name}"))),
    }
}

/// Parse an optional boolean flag. Accepts `1`, `t`, `T`, `true`, `TRUE`,
/// `True` and their false counterparts `0`, `f`, `F`, `false`, `FALSE`, `False`.
fn parse_flag(raw: Option<&str>, name: &str) -> Result<Option<bool>, ApiError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some("1" | "t" | "T" | "true" | "TRUE" | "True") => Ok(Some(true)),
        Some("0" | "f" | "F" | "false" | "FALSE" | "False") => Ok(Some(false)),
        Some(_) => Err(bad_request(&format!("invalid {name}"))),
    }
}

fn parse_id(raw: Option<&str>, name: &str) -> Result<Option<i64>, ApiError> {
    match parse_param::<i64>(raw, name)? {
        Some(id) if id <= 0 => Err(bad_request(&format!("{name} must be a positive integer"))),
        other => Ok(other),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UserBannerQuery {
    pub tag_id: Option<String>,
    pub feature_id: Option<String>,
    pub use_last_revision: Option<String>,
}

/// GET /user_banner — banner for a `(feature, tag)` pair.
///
/// `use_last_revision=true` lets the answer come from the cache, which can
/// lag the record store by one refresh interval.
pub async fn get_user_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserBannerQuery>,
) -> Result<Json<Banner>, ApiError> {
    let access = auth::authenticate(state.tokens.as_ref(), &headers).await?;

    let tag_id = parse_id(query.tag_id.as_deref(), "tag_id")?
        .ok_or_else(|| bad_request("tag_id is required"))?;
    let feature_id = parse_id(query.feature_id.as_deref(), "feature_id")?
        .ok_or_else(|| bad_request("feature_id is required"))?;
    let use_last_revision =
        parse_flag(query.use_last_revision.as_deref(), "use_last_revision")?.unwrap_or(false);

    metrics::counter!("api.user_banner.requests").increment(1);

    state
        .resolver
        .resolve(feature_id, tag_id, access.is_admin, use_last_revision)
        .await
        .map(Json)
        .map_err(from_banner_error)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListBannersQuery {
    pub feature_id: Option<String>,
    pub tag_id: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// GET /banner — admin listing with optional filters and paging.
pub async fn list_banners(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListBannersQuery>,
) -> Result<Json<Vec<Banner>>, ApiError> {
    auth::require_admin(state.tokens.as_ref(), &headers).await?;

    let filter = BannerFilter {
        feature_id: parse_id(query.feature_id.as_deref(), "feature_id")?,
        tag_id: parse_id(query.tag_id.as_deref(), "tag_id")?,
        active_only: false,
        // Zero means "no limit".
        limit: parse_param::<usize>(query.limit.as_deref(), "limit")?.filter(|&l| l > 0),
        offset: parse_param::<usize>(query.offset.as_deref(), "offset")?.unwrap_or(0),
    };

    state
        .banners
        .find(&filter)
        .await
        .map(Json)
        .map_err(from_banner_error)
}

/// POST /banner — create a banner.
pub async fn create_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<BannerPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let access = auth::require_admin(state.tokens.as_ref(), &headers).await?;
    let Json(payload) = body.map_err(|e| bad_request(&e.body_text()))?;

    let banner = state
        .banners
        .create(payload)
        .await
        .map_err(from_banner_error)?;

    info!(banner_id = banner.id, admin = access.id, "Banner created");
    metrics::counter!("api.banners.created").increment(1);
    Ok((StatusCode::CREATED, Json(CreatedResponse { banner_id: banner.id })))
}

/// PATCH /banner/:id — replace every field of a banner.
pub async fn update_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<BannerPayload>, JsonRejection>,
) -> Result<Json<Banner>, ApiError> {
    let access = auth::require_admin(state.tokens.as_ref(), &headers).await?;
    let id = parse_banner_id(&id)?;
    let Json(payload) = body.map_err(|e| bad_request(&e.body_text()))?;

    let banner = state
        .banners
        .update(id, payload)
        .await
        .map_err(from_banner_error)?;

    info!(banner_id = id, admin = access.id, is_active = banner.is_active, "Banner updated");
    metrics::counter!("api.banners.updated").increment(1);
    Ok(Json(banner))
}

/// DELETE /banner/:id
pub async fn delete_banner(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let access = auth::require_admin(state.tokens.as_ref(), &headers).await?;
    let id = parse_banner_id(&id)?;

    state.banners.delete(id).await.map_err(from_banner_error)?;

    info!(banner_id = id, admin = access.id, "Banner deleted");
    metrics::counter!("api.banners.deleted").increment(1);
    Ok(StatusCode::NO_CONTENT)
}

fn parse_banner_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>().ok().filter(|&id| id > 0).ok_or_else(|| {
        warn!(id = raw, "Invalid banner id in path");
        bad_request("invalid banner id")
    })
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe. Ready once the record store answers.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let probe = BannerFilter {
        limit: Some(1),
        ..Default::default()
    };
    match state.banners.find(&probe).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// GET /live — Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag_accepts_short_spellings() {
        for raw in ["1", "t", "T", "true", "TRUE", "True", " true "] {
            assert_eq!(parse_flag(Some(raw), "flag").unwrap(), Some(true), "{raw:?}");
        }
        for raw in ["0", "f", "F", "false", "FALSE", "False"] {
            assert_eq!(parse_flag(Some(raw), "flag").unwrap(), Some(false), "{raw:?}");
        }
        assert_eq!(parse_flag(None, "flag").unwrap(), None);
        assert_eq!(parse_flag(Some(""), "flag").unwrap(), None);
    }

    #[test]
    fn test_parse_flag_rejects_other_values() {
        for raw in ["yes", "no", "2", "tRuE", "on"] {
            let (status, body) = parse_flag(Some(raw), "use_last_revision").unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST, "{raw:?}");
            assert_eq!(body.0.message, "invalid use_last_revision");
        }
    }
}
