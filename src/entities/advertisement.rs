//! Advertisement entity - Cafe promotions attached to order summaries.

use super::sea_orm_active_enums::AdStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Advertisement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cafe_advertisements")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Advertising cafe
    pub cafe_id: i64,
    /// Headline
    pub title: String,
    /// Creative
    pub image_url: Option<String>,
    /// Start of the display window
    pub starts_at: DateTimeUtc,
    /// End of the display window
    pub ends_at: DateTimeUtc,
    /// Active or Inactive
    pub status: AdStatus,
    /// Creation time; newest wins when windows overlap
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
