use axum::{
    Extension, Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::AdminProfile;
use crate::services::{AuthError, LoginOutcome, Registration, SessionAdmin};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub otp_code: Option<String>,
}

#[derive(Serialize)]
pub struct RegisteredAdmin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Session { token: String, admin: SessionAdmin },
    Challenge { requires_2fa: bool, email: String },
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated { token, admin } => Self::Session { token, admin },
            LoginOutcome::ChallengeIssued { email } => Self::Challenge {
                requires_2fa: true,
                email,
            },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::ValidationError(errors),
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::InvalidCredentials
            | AuthError::InvalidOtp
            | AuthError::OtpExpired
            | AuthError::MissingToken => Self::Unauthorized(err.to_string()),
            AuthError::SessionNotFound => Self::NotFound(err.to_string()),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Resolves `Authorization: Bearer <token>` to an admin and makes the
/// [`AdminProfile`] available to handlers as a request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers);

    match state.auth_service().resolve(token).await {
        Ok(admin) => {
            tracing::Span::current().record("user_id", admin.id.as_str());
            request.extensions_mut().insert(admin);
            Ok(next.run(request).await)
        }
        Err(AuthError::MissingToken | AuthError::SessionNotFound) => {
            Err(ApiError::unauthorized("Unauthenticated"))
        }
        Err(e) => Err(e.into()),
    }
}

/// Extract the token from an `Authorization: Bearer` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /admin/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let admin = state
        .auth_service()
        .register(Registration {
            name: payload.name,
            email: payload.email,
            password: payload.password,
            password_confirmation: payload.password_confirmation,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(RegisteredAdmin {
            id: admin.id,
            name: admin.name,
            email: admin.email,
            created_at: admin.created_at,
        })),
    ))
}

/// POST /admin/login
/// Password login. Accounts with 2FA get a passcode challenge first.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state
        .auth_service()
        .login(
            &payload.email,
            &payload.password,
            payload.otp_code.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(outcome.into())))
}

/// POST /admin/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth_service().logout(bearer_token(&headers)).await?;

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Logged out",
    ))))
}

/// GET /admin/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<SessionAdmin>>, ApiError> {
    let admin = state
        .auth_service()
        .resolve(bearer_token(&headers))
        .await?;

    Ok(Json(ApiResponse::success(admin.into())))
}

#[derive(Serialize)]
pub struct TwoFactorStatus {
    pub two_factor_enabled: bool,
}

/// POST /admin/2fa/enable
pub async fn enable_two_factor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
) -> Result<Json<ApiResponse<TwoFactorStatus>>, ApiError> {
    let admin = state
        .auth_service()
        .set_two_factor(&admin.id, true)
        .await?;

    Ok(Json(ApiResponse::success(TwoFactorStatus {
        two_factor_enabled: admin.two_factor_enabled,
    })))
}

/// POST /admin/2fa/disable
pub async fn disable_two_factor(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminProfile>,
) -> Result<Json<ApiResponse<TwoFactorStatus>>, ApiError> {
    let admin = state
        .auth_service()
        .set_two_factor(&admin.id, false)
        .await?;

    Ok(Json(ApiResponse::success(TwoFactorStatus {
        two_factor_enabled: admin.two_factor_enabled,
    })))
}

/// GET /admin/2fa/status
pub async fn two_factor_status(
    Extension(admin): Extension<AdminProfile>,
) -> Json<ApiResponse<TwoFactorStatus>> {
    Json(ApiResponse::success(TwoFactorStatus {
        two_factor_enabled: admin.two_factor_enabled,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
        assert_eq!(bearer_token(&headers("Basic abc123")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_login_response_shapes() {
        let challenge = LoginResponse::from(LoginOutcome::ChallengeIssued {
            email: "a@b.co".to_string(),
        });
        let json = serde_json::to_value(challenge).unwrap();
        assert_eq!(json, serde_json::json!({ "requires_2fa": true, "email": "a@b.co" }));
    }
}
