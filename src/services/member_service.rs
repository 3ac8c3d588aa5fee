//! Domain service for member records.

use thiserror::Error;

use crate::domain::Member;
use crate::domain::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("Member not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("The email has already been taken.")]
    EmailTaken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for MemberError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for MemberError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{err:#}"))
    }
}

impl From<FieldErrors> for MemberError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateMember {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

/// Partial update. Only fields that are `Some` are validated and applied.
///
/// `image: Some(None)` clears the stored image.
#[derive(Debug, Clone, Default)]
pub struct UpdateMember {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<Option<String>>,
}

#[async_trait::async_trait]
pub trait MemberService: Send + Sync {
    async fn list(&self) -> Result<Vec<Member>, MemberError>;

    /// # Errors
    ///
    /// [`MemberError::NotFound`] when `id` does not name a member, including
    /// ids that are not UUIDs.
    async fn get(&self, id: &str) -> Result<Member, MemberError>;

    async fn create(&self, input: CreateMember) -> Result<Member, MemberError>;

    async fn update(&self, id: &str, input: UpdateMember) -> Result<Member, MemberError>;

    async fn delete(&self, id: &str) -> Result<(), MemberError>;

    /// Every member rendered as CSV.
    async fn export_csv(&self) -> Result<String, MemberError>;
}
