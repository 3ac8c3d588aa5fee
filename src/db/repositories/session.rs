use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::format_timestamp;
use crate::entities::{admin_sessions, prelude::*};

pub struct SessionRepository {
    conn: DatabaseConnection,
}

impl SessionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        token_hash: &str,
        admin_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let now = format_timestamp(Utc::now());

        let active = admin_sessions::ActiveModel {
            token_hash: Set(token_hash.to_string()),
            admin_id: Set(admin_id.to_string()),
            created_at: Set(now.clone()),
            expires_at: Set(format_timestamp(expires_at)),
            last_seen_at: Set(now),
        };

        AdminSessions::insert(active)
            .exec(&self.conn)
            .await
            .context("Failed to insert session")?;

        Ok(())
    }

    /// Find a session that has not expired at `now`.
    pub async fn find_live(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<admin_sessions::Model>> {
        let session = AdminSessions::find_by_id(token_hash.to_string())
            .filter(admin_sessions::Column::ExpiresAt.gt(format_timestamp(now)))
            .one(&self.conn)
            .await
            .context("Failed to query session")?;

        Ok(session)
    }

    pub async fn touch(&self, token_hash: &str, now: DateTime<Utc>) -> Result<()> {
        AdminSessions::update_many()
            .col_expr(
                admin_sessions::Column::LastSeenAt,
                Expr::value(format_timestamp(now)),
            )
            .filter(admin_sessions::Column::TokenHash.eq(token_hash))
            .exec(&self.conn)
            .await
            .context("Failed to touch session")?;

        Ok(())
    }

    /// Returns whether a session was removed.
    pub async fn delete(&self, token_hash: &str) -> Result<bool> {
        let result = AdminSessions::delete_by_id(token_hash.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete session")?;

        Ok(result.rows_affected > 0)
    }

    pub async fn delete_for_admin(&self, admin_id: &str) -> Result<u64> {
        let result = AdminSessions::delete_many()
            .filter(admin_sessions::Column::AdminId.eq(admin_id))
            .exec(&self.conn)
            .await
            .context("Failed to revoke admin sessions")?;

        Ok(result.rows_affected)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = AdminSessions::delete_many()
            .filter(admin_sessions::Column::ExpiresAt.lte(format_timestamp(now)))
            .exec(&self.conn)
            .await
            .context("Failed to purge expired sessions")?;

        Ok(result.rows_affected)
    }
}
