use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::domain::{AdminProfile, Member, MemberId};
use crate::entities::admin_sessions;

pub mod migrator;
pub mod repositories;

pub use repositories::admin::{AdminCredentials, PendingOtp};
pub use repositories::member::{MemberPatch, NewMember};

/// Fixed-width UTC timestamp so stored values compare correctly as text.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when the error chain holds a unique constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sea_orm::DbErr>()
        .and_then(sea_orm::DbErr::sql_err)
        .is_some_and(|e| matches!(e, sea_orm::SqlErr::UniqueConstraintViolation(_)))
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn admin_repo(&self) -> repositories::admin::AdminRepository {
        repositories::admin::AdminRepository::new(self.conn.clone())
    }

    fn session_repo(&self) -> repositories::session::SessionRepository {
        repositories::session::SessionRepository::new(self.conn.clone())
    }

    fn member_repo(&self) -> repositories::member::MemberRepository {
        repositories::member::MemberRepository::new(self.conn.clone())
    }

    // Admins

    pub async fn create_admin(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
    ) -> Result<AdminProfile> {
        self.admin_repo().insert(name, email, password_hash).await
    }

    pub async fn admin_email_exists(&self, email: &str) -> Result<bool> {
        self.admin_repo().email_exists(email).await
    }

    pub async fn get_admin(&self, id: &str) -> Result<Option<AdminProfile>> {
        self.admin_repo().get_by_id(id).await
    }

    pub async fn get_admin_credentials(&self, email: &str) -> Result<Option<AdminCredentials>> {
        self.admin_repo().get_credentials_by_email(email).await
    }

    pub async fn store_pending_otp(
        &self,
        admin_id: &str,
        otp_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.admin_repo()
            .store_pending_otp(admin_id, otp_hash, expires_at)
            .await
    }

    pub async fn clear_pending_otp(&self, admin_id: &str) -> Result<()> {
        self.admin_repo().clear_pending_otp(admin_id).await
    }

    pub async fn set_two_factor(&self, admin_id: &str, enabled: bool) -> Result<Option<AdminProfile>> {
        self.admin_repo().set_two_factor(admin_id, enabled).await
    }

    // Sessions

    pub async fn create_session(
        &self,
        token_hash: &str,
        admin_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        self.session_repo()
            .create(token_hash, admin_id, expires_at)
            .await
    }

    pub async fn find_live_session(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<admin_sessions::Model>> {
        self.session_repo().find_live(token_hash, now).await
    }

    pub async fn touch_session(&self, token_hash: &str, now: DateTime<Utc>) -> Result<()> {
        self.session_repo().touch(token_hash, now).await
    }

    pub async fn delete_session(&self, token_hash: &str) -> Result<bool> {
        self.session_repo().delete(token_hash).await
    }

    pub async fn revoke_admin_sessions(&self, admin_id: &str) -> Result<u64> {
        self.session_repo().delete_for_admin(admin_id).await
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        self.session_repo().purge_expired(now).await
    }

    // Members

    pub async fn list_members(&self) -> Result<Vec<Member>> {
        self.member_repo().list().await
    }

    pub async fn get_member(&self, id: &MemberId) -> Result<Option<Member>> {
        self.member_repo().get(id).await
    }

    pub async fn get_member_by_email(&self, email: &str) -> Result<Option<Member>> {
        self.member_repo().get_by_email(email).await
    }

    pub async fn create_member(&self, new_member: NewMember) -> Result<Member> {
        self.member_repo().insert(new_member).await
    }

    pub async fn update_member(&self, id: &MemberId, patch: MemberPatch) -> Result<Option<Member>> {
        self.member_repo().update(id, patch).await
    }

    pub async fn delete_member(&self, id: &MemberId) -> Result<bool> {
        self.member_repo().delete(id).await
    }
}
