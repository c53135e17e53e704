//! Discount entity - One ledger row per successfully placed order.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "discounts")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Diner the discount is attributed to
    pub user_id: i64,
    /// Cafe that granted it
    pub cafe_id: i64,
    /// Order it applies to
    pub order_id: String,
    /// Discount amount
    pub discount_value: f64,
    /// Order total the discount was taken from
    pub total_cost: f64,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
