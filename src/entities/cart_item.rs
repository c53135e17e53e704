//! Cart item entity - One line in a cart.
//!
//! `customization_ids` and `cross_sell_item_ids` are JSON arrays of ids that are
//! always replaced wholesale.

use super::sea_orm_active_enums::{AddedVia, CartItemStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    /// Opaque line identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub cart_item_id: String,
    /// Parent cart
    pub cart_id: String,
    /// Menu item on this line
    pub item_id: i64,
    /// Number of units; zero only once canceled
    pub quantity: i32,
    /// Unit price including customizations
    pub price: f64,
    /// Active, Ordered or Canceled
    pub status: CartItemStatus,
    /// Acquisition channel
    pub added_via: AddedVia,
    /// Free-text note for the kitchen
    pub special_request: Option<String>,
    /// JSON array of customization ids
    pub customization_ids: Json,
    /// JSON array of cross-sell menu item ids
    pub cross_sell_item_ids: Json,
    /// When the line was added
    pub added_at: DateTimeUtc,
    /// Last mutation time
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `CartItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one cart
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::CartId"
    )]
    Cart,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
