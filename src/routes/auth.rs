/// Token Routes
///
/// Issues token pairs and refreshes access tokens.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::TokenService;
use crate::error::{AppError, ErrorContext};
use crate::validators::{is_valid_refresh_token, is_valid_user_id};

/// Token pair request
#[derive(Deserialize)]
pub struct TokenRequest {
    pub user_id: String,
}

/// Access token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub user_id: String,
    pub refresh_token: String,
}

/// Response with both tokens
#[derive(Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Response with a fresh access token
#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// TCP peer address of the caller
fn client_ip(req: &HttpRequest) -> Result<String, AppError> {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .ok_or_else(|| AppError::Internal("Peer address unavailable".to_string()))
}

/// POST /api/auth/token
///
/// Issue an access token and a refresh token for `user_id`.
///
/// # Errors
/// - 400: `user_id` missing or not a UUID v4
/// - 500: Signing, entropy, hashing or storage failure
pub async fn issue_tokens(
    req: HttpRequest,
    body: web::Json<TokenRequest>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let user_id = is_valid_user_id(&body.user_id)?;
    let context = ErrorContext::new("token_issue").with_user_id(user_id.clone());
    let client_ip = client_ip(&req)?;

    let pair = service
        .issue_pair(&user_id, &client_ip)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        client_ip = %client_ip,
        "Token pair issued"
    );

    Ok(HttpResponse::Ok().json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: service.issuer().expiry_seconds(),
    }))
}

/// POST /api/auth/refresh
///
/// Consume a refresh token and return a new access token.
/// The refresh token is single-use: presenting it again is rejected.
///
/// # Errors
/// - 400: Malformed `user_id` or `refresh_token`
/// - 401: Unknown, mismatched or already used refresh token
/// - 500: Signing, hashing or storage failure
pub async fn refresh(
    req: HttpRequest,
    body: web::Json<RefreshRequest>,
    service: web::Data<TokenService>,
) -> Result<HttpResponse, AppError> {
    let user_id = is_valid_user_id(&body.user_id)?;
    let presented = is_valid_refresh_token(&body.refresh_token)?;
    let context = ErrorContext::new("token_refresh").with_user_id(user_id.clone());
    let client_ip = client_ip(&req)?;

    let access_token = service
        .refresh(&user_id, presented, &client_ip)
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(AccessTokenResponse {
        access_token: access_token.token,
        token_type: "Bearer".to_string(),
        expires_in: service.issuer().expiry_seconds(),
    }))
}
