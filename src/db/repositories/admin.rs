use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::warn;

use crate::db::{format_timestamp, parse_timestamp};
use crate::domain::AdminProfile;
use crate::entities::{admins, prelude::*};

impl From<admins::Model> for AdminProfile {
    fn from(model: admins::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            two_factor_enabled: model.two_factor_enabled,
            created_at: model.created_at,
        }
    }
}

/// A login passcode awaiting use.
#[derive(Debug, Clone)]
pub struct PendingOtp {
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Admin row including the secrets needed to authenticate it.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub profile: AdminProfile,
    pub password_hash: String,
    pub pending_otp: Option<PendingOtp>,
}

impl From<admins::Model> for AdminCredentials {
    fn from(model: admins::Model) -> Self {
        let pending_otp = match (&model.otp_hash, &model.otp_expires_at) {
            (Some(hash), Some(raw_expiry)) => match parse_timestamp(raw_expiry) {
                Some(expires_at) => Some(PendingOtp {
                    hash: hash.clone(),
                    expires_at,
                }),
                None => {
                    warn!(
                        admin_id = %model.id,
                        otp_expires_at = %raw_expiry,
                        "Unreadable OTP expiry, treating as no pending code"
                    );
                    None
                }
            },
            _ => None,
        };
        let password_hash = model.password_hash.clone();

        Self {
            profile: AdminProfile::from(model),
            password_hash,
            pending_otp,
        }
    }
}

pub struct AdminRepository {
    conn: DatabaseConnection,
}

impl AdminRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<AdminProfile> {
        let now = format_timestamp(Utc::now());

        let active = admins::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            two_factor_enabled: Set(false),
            otp_hash: Set(None),
            otp_expires_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin")?;

        Ok(AdminProfile::from(model))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let admin = Admins::find()
            .filter(admins::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query admin by email")?;

        Ok(admin.is_some())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<AdminProfile>> {
        let admin = Admins::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query admin by ID")?;

        Ok(admin.map(AdminProfile::from))
    }

    /// Get admin by email together with password hash and pending passcode
    pub async fn get_credentials_by_email(&self, email: &str) -> Result<Option<AdminCredentials>> {
        let admin = Admins::find()
            .filter(admins::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query admin credentials")?;

        Ok(admin.map(AdminCredentials::from))
    }

    /// Store a passcode hash and its expiry in a single statement.
    pub async fn store_pending_otp(
        &self,
        id: &str,
        otp_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        Admins::update_many()
            .col_expr(admins::Column::OtpHash, Expr::value(Some(otp_hash)))
            .col_expr(
                admins::Column::OtpExpiresAt,
                Expr::value(Some(format_timestamp(expires_at))),
            )
            .col_expr(
                admins::Column::UpdatedAt,
                Expr::value(format_timestamp(Utc::now())),
            )
            .filter(admins::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to store pending OTP")?;

        Ok(())
    }

    /// Clear both passcode columns together.
    pub async fn clear_pending_otp(&self, id: &str) -> Result<()> {
        Admins::update_many()
            .col_expr(admins::Column::OtpHash, Expr::value(Option::<String>::None))
            .col_expr(
                admins::Column::OtpExpiresAt,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                admins::Column::UpdatedAt,
                Expr::value(format_timestamp(Utc::now())),
            )
            .filter(admins::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to clear pending OTP")?;

        Ok(())
    }

    /// Toggle email 2FA. Any pending passcode is discarded either way.
    pub async fn set_two_factor(&self, id: &str, enabled: bool) -> Result<Option<AdminProfile>> {
        let Some(admin) = Admins::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query admin for 2FA update")?
        else {
            return Ok(None);
        };

        let mut active: admins::ActiveModel = admin.into();
        active.two_factor_enabled = Set(enabled);
        active.otp_hash = Set(None);
        active.otp_expires_at = Set(None);
        active.updated_at = Set(format_timestamp(Utc::now()));
        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update admin 2FA flag")?;

        Ok(Some(AdminProfile::from(model)))
    }
}
