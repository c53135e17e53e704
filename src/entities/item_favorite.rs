//! Item favorite entity - Menu items a diner has hearted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item favorite database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_favorites")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Diner
    pub user_id: i64,
    /// Cafe
    pub cafe_id: i64,
    /// Favorited menu item
    pub item_id: i64,
    /// When it was favorited
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
