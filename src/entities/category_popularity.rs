//! Category popularity entity - Add-to-cart counters used to order the menu.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category popularity database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category_popularity")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Cafe
    pub cafe_id: i64,
    /// Menu category
    pub category: String,
    /// Number of lines added from this category
    pub hits: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
