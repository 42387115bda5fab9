//! Token authentication for the banner endpoints.
//!
//! Every request carries its access token in the `token` header. Any known
//! token may read banners; listing and all writes need an admin token.

use crate::rest::{api_error, ApiError};
use axum::http::{HeaderMap, StatusCode};
use banner_core::AccessToken;
use banner_store::TokenRepository;
use tracing::{error, warn};

pub const TOKEN_HEADER: &str = "token";

/// Resolve the request's token to a known access token.
pub async fn authenticate(
    tokens: &dyn TokenRepository,
    headers: &HeaderMap,
) -> Result<AccessToken, ApiError> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            api_error(
                StatusCode::UNAUTHORIZED,
                "missing_token",
                "token header required",
            )
        })?;

    match tokens.find_by_token(token).await {
        Ok(Some(access)) => Ok(access),
        Ok(None) => {
            warn!("Rejected unknown access token");
            Err(api_error(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Unknown access token",
            ))
        }
        Err(e) => {
            error!(error = %e, "Token lookup failed");
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal processing error",
            ))
        }
    }
}

/// Like [`authenticate`], but only admin tokens pass.
pub async fn require_admin(
    tokens: &dyn TokenRepository,
    headers: &HeaderMap,
) -> Result<AccessToken, ApiError> {
    let access = authenticate(tokens, headers).await?;
    if !access.is_admin {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "not_admin",
            "Admin token required",
        ));
    }
    Ok(access)
}
