//! Cart entity - The shared basket of a session.
//!
//! Carts are never deleted; they move from Active to Ordered when an order is placed.

use super::sea_orm_active_enums::CartStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    /// Opaque cart identifier, possibly chosen by the client
    #[sea_orm(primary_key, auto_increment = false)]
    pub cart_id: String,
    /// Session the cart belongs to
    pub session_id: String,
    /// Diner who created the cart
    pub user_id: i64,
    /// Cafe the cart belongs to
    pub cafe_id: i64,
    /// Active or Ordered
    pub status: CartStatus,
    /// Sum of unit price x quantity over active lines
    pub total_amount: f64,
    /// Discount declared by the client
    pub discount_amount: f64,
    /// Creation time
    pub created_at: DateTimeUtc,
    /// Last mutation time
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Cart and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One cart has many lines
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
    /// One cart can be ordered (more than once, see `core::order`)
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
