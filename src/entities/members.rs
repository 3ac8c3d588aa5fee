use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash, write-only
    pub password_hash: String,

    /// Opaque image reference (URL or data URL)
    #[sea_orm(column_type = "Text", nullable)]
    pub image: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
