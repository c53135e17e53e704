//! Order entity - An immutable record of a placed cart.

use super::sea_orm_active_enums::{OrderStatus, PaymentStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Opaque order identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    /// Cafe the order was placed at
    pub cafe_id: i64,
    /// Cart that was ordered
    pub cart_id: String,
    /// Session the order was placed in
    pub session_id: String,
    /// Diner who placed the order
    pub user_id: i64,
    /// Note for the kitchen
    pub special_request: Option<String>,
    /// Placed, Confirmed or Cancelled
    pub status: OrderStatus,
    /// Pending, Paid or Failed
    pub payment_status: PaymentStatus,
    /// Amount declared at placement
    pub total_amount: f64,
    /// Placement time
    pub order_time: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one cart
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
