//! Post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Post category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum PostCategory {
    #[default]
    #[sea_orm(string_value = "general")]
    General,
    #[sea_orm(string_value = "announcement")]
    Announcement,
    #[sea_orm(string_value = "question")]
    Question,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub author_id: String,

    /// At most 280 characters
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Public URL of the attached image
    #[sea_orm(nullable)]
    pub image_url: Option<String>,

    pub category: PostCategory,

    /// Denormalized count of like rows
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Denormalized count of active comments
    #[sea_orm(default_value = 0)]
    pub comment_count: i32,

    #[sea_orm(default_value = true)]
    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::AuthorId",
        to = "super::profile::Column::Id"
    )]
    Author,

    #[sea_orm(has_many = "super::notification::Entity")]
    Notifications,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
