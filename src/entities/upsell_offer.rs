//! Upsell offer entity - "Spend a little more" offers made on a cart.
//!
//! A cart may collect several offers; the one with the highest `id` is authoritative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upsell offer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upsell_data")]
pub struct Model {
    /// Insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Public offer identifier
    #[sea_orm(unique)]
    pub upsell_id: String,
    /// Cart the offer was made on
    pub cart_id: String,
    /// Cafe making the offer
    pub cafe_id: i64,
    /// Cart total when the offer was made
    pub current_amount: f64,
    /// Distance to the next full hundred
    pub target_amount: f64,
    /// Bonus credited when the offer is met
    pub mustaches_to_give: i64,
    /// Set once an order redeemed the offer
    pub offer_accepted: bool,
    /// Creation time
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
