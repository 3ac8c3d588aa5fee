use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::db::format_timestamp;
use crate::domain::{Member, MemberId};
use crate::entities::{members, prelude::*};

impl From<members::Model> for Member {
    fn from(model: members::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            image: model.image,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub image: Option<String>,
}

/// Column changes for a partial update. `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct MemberPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub image: Option<Option<String>>,
}

pub struct MemberRepository {
    conn: DatabaseConnection,
}

impl MemberRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self) -> Result<Vec<Member>> {
        let rows = Members::find()
            .order_by_asc(members::Column::CreatedAt)
            .order_by_asc(members::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list members")?;

        Ok(rows.into_iter().map(Member::from).collect())
    }

    pub async fn get(&self, id: &MemberId) -> Result<Option<Member>> {
        let member = Members::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query member by ID")?;

        Ok(member.map(Member::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Member>> {
        let member = Members::find()
            .filter(members::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query member by email")?;

        Ok(member.map(Member::from))
    }

    pub async fn insert(&self, new_member: NewMember) -> Result<Member> {
        let now = format_timestamp(Utc::now());

        let active = members::ActiveModel {
            id: Set(MemberId::generate().to_string()),
            username: Set(new_member.username),
            email: Set(new_member.email),
            password_hash: Set(new_member.password_hash),
            image: Set(new_member.image),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert member")?;

        Ok(Member::from(model))
    }

    /// Apply a partial update. Returns `None` when the member does not exist.
    pub async fn update(&self, id: &MemberId, patch: MemberPatch) -> Result<Option<Member>> {
        let Some(existing) = Members::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .context("Failed to query member for update")?
        else {
            return Ok(None);
        };

        let mut active: members::ActiveModel = existing.into();
        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(password_hash) = patch.password_hash {
            active.password_hash = Set(password_hash);
        }
        if let Some(image) = patch.image {
            active.image = Set(image);
        }
        active.updated_at = Set(format_timestamp(Utc::now()));

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update member")?;

        Ok(Some(Member::from(model)))
    }

    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &MemberId) -> Result<bool> {
        let result = Members::delete_by_id(id.to_string())
            .exec(&self.conn)
            .await
            .context("Failed to delete member")?;

        Ok(result.rows_affected > 0)
    }
}
