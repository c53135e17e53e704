//! Menu item entity - Read-only view of the cafe menu.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Menu item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "menu_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning cafe
    pub cafe_id: i64,
    /// Menu category (e.g. "Beverages")
    pub category: String,
    /// Display name
    pub name: String,
    /// Base price
    pub price: f64,
    /// Image shown on the menu
    pub image_url: Option<String>,
    /// Whether customizations can be chosen
    pub is_customizable: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
