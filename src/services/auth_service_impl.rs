//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SecurityConfig;
use crate::db::{self, AdminCredentials, Store};
use crate::domain::AdminProfile;
use crate::domain::events::{NotificationEvent, OtpCode};
use crate::domain::validation::{ADMIN_NAME_MAX, FieldErrors, PASSWORD_MIN};
use crate::security;
use crate::services::Notifier;
use crate::services::auth_service::{AuthError, AuthService, LoginOutcome, Registration};

pub struct SeaOrmAuthService {
    store: Store,
    notifier: Notifier,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, notifier: Notifier, security: SecurityConfig) -> Self {
        Self {
            store,
            notifier,
            security,
        }
    }

    async fn issue_challenge(&self, admin: &AdminProfile) -> Result<LoginOutcome, AuthError> {
        let code = security::generate_otp();
        let code_hash = security::hash_secret_blocking(&code, &self.security).await?;
        let expires_at = expiry_after(
            Utc::now(),
            Duration::from_secs(self.security.otp_ttl_seconds),
        )?;

        self.store
            .store_pending_otp(&admin.id, code_hash, expires_at)
            .await?;

        self.notifier.enqueue(NotificationEvent::OtpIssued {
            name: admin.name.clone(),
            email: admin.email.clone(),
            code: OtpCode::new(code),
            valid_minutes: self.security.otp_ttl_seconds.div_ceil(60),
        });

        metrics::counter!("auth_otp_challenges_total").increment(1);
        info!(admin_id = %admin.id, "Login passcode issued");

        Ok(LoginOutcome::ChallengeIssued {
            email: admin.email.clone(),
        })
    }

    /// Checks the submitted passcode, then clears it.
    ///
    /// Equality is checked before expiry, so a wrong code is reported as
    /// invalid even after the pending one expired.
    async fn consume_otp(&self, credentials: &AdminCredentials, code: &str) -> Result<(), AuthError> {
        let Some(pending) = &credentials.pending_otp else {
            return Err(AuthError::InvalidOtp);
        };

        if !security::verify_secret_blocking(code, &pending.hash).await? {
            return Err(AuthError::InvalidOtp);
        }

        if Utc::now() > pending.expires_at {
            return Err(AuthError::OtpExpired);
        }

        self.store.clear_pending_otp(&credentials.profile.id).await?;
        Ok(())
    }

    async fn issue_session(&self, admin: AdminProfile) -> Result<LoginOutcome, AuthError> {
        let now = Utc::now();
        let token = security::generate_session_token();
        let token_hash = security::token_digest(&token);

        if self.security.single_session {
            let revoked = self.store.revoke_admin_sessions(&admin.id).await?;
            if revoked > 0 {
                debug!(admin_id = %admin.id, revoked, "Revoked previous sessions");
            }
        }

        let purged = self.store.purge_expired_sessions(now).await?;
        if purged > 0 {
            debug!(purged, "Purged expired sessions");
        }

        let expires_at = expiry_after(
            now,
            Duration::from_secs(self.security.session_ttl_hours.saturating_mul(3600)),
        )?;
        self.store
            .create_session(&token_hash, &admin.id, expires_at)
            .await?;

        self.notifier.enqueue(NotificationEvent::AdminLoggedIn {
            name: admin.name.clone(),
            email: admin.email.clone(),
            logged_in_at: db::format_timestamp(now),
        });

        info!(admin_id = %admin.id, "Admin logged in");

        Ok(LoginOutcome::Authenticated {
            token,
            admin: admin.into(),
        })
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AuthError::Internal("Expiry is out of range".to_string()))
}

fn non_empty_token(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|t| !t.is_empty())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, input: Registration) -> Result<AdminProfile, AuthError> {
        let name = input.name.trim();
        let email = input.email.trim();

        let mut errors = FieldErrors::new();
        if errors.required("name", name) {
            errors.max_chars("name", name, ADMIN_NAME_MAX);
        }
        if errors.required("email", email) {
            errors.email("email", email);
        }
        if errors.required("password", &input.password) {
            errors.min_chars("password", &input.password, PASSWORD_MIN);
            if input.password != input.password_confirmation {
                errors.add("password", "The password confirmation does not match.");
            }
        }
        errors.into_result()?;

        if self.store.admin_email_exists(email).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = security::hash_secret_blocking(&input.password, &self.security).await?;

        let admin = match self.store.create_admin(name, email, password_hash).await {
            Ok(admin) => admin,
            Err(e) if db::is_unique_violation(&e) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        self.notifier.enqueue(NotificationEvent::AdminRegistered {
            name: admin.name.clone(),
            email: admin.email.clone(),
            created_at: admin.created_at.clone(),
        });

        metrics::counter!("admin_registrations_total").increment(1);
        info!(admin_id = %admin.id, "Admin registered");

        Ok(admin)
    }

    async fn login(
        &self,
        email: &str,
        password: &str,
        otp_code: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let email = email.trim();
        let otp_code = otp_code.map(str::trim).filter(|c| !c.is_empty());

        let mut errors = FieldErrors::new();
        if errors.required("email", email) {
            errors.email("email", email);
        }
        errors.required("password", password);
        if let Some(code) = otp_code
            && !security::is_otp_format(code)
        {
            errors.add(
                "otp_code",
                format!("The otp code must be {} digits.", security::OTP_DIGITS),
            );
        }
        errors.into_result()?;

        let Some(credentials) = self.store.get_admin_credentials(email).await? else {
            metrics::counter!("auth_logins_total", "outcome" => "invalid_credentials").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        if !security::verify_secret_blocking(password, &credentials.password_hash).await? {
            metrics::counter!("auth_logins_total", "outcome" => "invalid_credentials").increment(1);
            warn!(admin_id = %credentials.profile.id, "Password mismatch on login");
            return Err(AuthError::InvalidCredentials);
        }

        if credentials.profile.two_factor_enabled {
            let Some(code) = otp_code else {
                return self.issue_challenge(&credentials.profile).await;
            };

            if let Err(e) = self.consume_otp(&credentials, code).await {
                metrics::counter!("auth_logins_total", "outcome" => "invalid_otp").increment(1);
                return Err(e);
            }
        }

        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);
        self.issue_session(credentials.profile).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), AuthError> {
        if let Some(token) = non_empty_token(token) {
            let removed = self
                .store
                .delete_session(&security::token_digest(token))
                .await?;
            if removed {
                info!("Admin logged out");
            }
        }
        Ok(())
    }

    async fn resolve(&self, token: Option<&str>) -> Result<AdminProfile, AuthError> {
        let token = non_empty_token(token).ok_or(AuthError::MissingToken)?;
        let token_hash = security::token_digest(token);
        let now = Utc::now();

        let session = self
            .store
            .find_live_session(&token_hash, now)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        let admin = self
            .store
            .get_admin(&session.admin_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        self.store.touch_session(&token_hash, now).await?;

        Ok(admin)
    }

    async fn set_two_factor(
        &self,
        admin_id: &str,
        enabled: bool,
    ) -> Result<AdminProfile, AuthError> {
        let admin = self
            .store
            .set_two_factor(admin_id, enabled)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        info!(admin_id = %admin.id, enabled, "Two-factor setting changed");
        Ok(admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_after_adds_ttl() {
        let now = Utc::now();
        let later = expiry_after(now, Duration::from_secs(300)).unwrap();
        assert_eq!((later - now).num_seconds(), 300);
    }

    #[test]
    fn test_expiry_after_rejects_overflow() {
        assert!(expiry_after(Utc::now(), Duration::from_secs(u64::MAX)).is_err());
    }

    #[test]
    fn test_non_empty_token() {
        assert_eq!(non_empty_token(Some(" abc ")), Some("abc"));
        assert_eq!(non_empty_token(Some("   ")), None);
        assert_eq!(non_empty_token(None), None);
    }
}
