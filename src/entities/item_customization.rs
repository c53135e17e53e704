//! Item customization entity - Options such as "Oat milk" or "Extra shot".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item customization database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_customizations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Menu item the option applies to
    pub menu_item_id: i64,
    /// Option group (e.g. "Milk")
    pub customization_type: String,
    /// Option label
    pub option_name: String,
    /// Surcharge
    pub additional_cost: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
