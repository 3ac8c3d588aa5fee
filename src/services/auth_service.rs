//! Domain service for administrator authentication.
//!
//! Covers registration, password login with the optional emailed passcode
//! step, bearer session resolution and logout, and the 2FA toggle.

use serde::Serialize;
use thiserror::Error;

use crate::domain::AdminProfile;
use crate::domain::validation::FieldErrors;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("The email has already been taken.")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid OTP")]
    InvalidOtp,

    #[error("OTP expired")]
    OtpExpired,

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Admin not found")]
    SessionNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Registration input as received from the client.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Administrator fields exposed after login.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAdmin {
    pub id: String,
    pub name: String,
    pub email: String,
    pub two_factor_enabled: bool,
}

impl From<AdminProfile> for SessionAdmin {
    fn from(profile: AdminProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            two_factor_enabled: profile.two_factor_enabled,
        }
    }
}

/// Result of a login attempt that did not fail.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// A session was issued. `token` is the only copy of the bearer secret.
    Authenticated { token: String, admin: SessionAdmin },

    /// A passcode was emailed; the client must repeat the login with it.
    ChallengeIssued { email: String },
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an administrator account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] with every failing field, or
    /// [`AuthError::EmailTaken`] when the address is registered already.
    async fn register(&self, input: Registration) -> Result<AdminProfile, AuthError>;

    /// Verifies credentials and, when 2FA is on, the emailed passcode.
    ///
    /// Without `otp_code` a 2FA account receives a fresh passcode and the
    /// call returns [`LoginOutcome::ChallengeIssued`].
    async fn login(
        &self,
        email: &str,
        password: &str,
        otp_code: Option<&str>,
    ) -> Result<LoginOutcome, AuthError>;

    /// Ends the session behind `token`. Unknown or absent tokens succeed.
    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError>;

    /// Resolves a bearer token to the administrator that owns it.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingToken`] without a token, [`AuthError::SessionNotFound`]
    /// when no live session matches.
    async fn resolve(&self, token: Option<&str>) -> Result<AdminProfile, AuthError>;

    /// Turns emailed 2FA on or off. Discards any pending passcode.
    async fn set_two_factor(&self, admin_id: &str, enabled: bool)
    -> Result<AdminProfile, AuthError>;
}
