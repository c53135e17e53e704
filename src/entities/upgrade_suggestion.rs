//! Upgrade suggestion entity - Items proposed by the cart-upgrade recommender.
//!
//! Rows are written by the recommendation service; the engine only flips
//! `user_action` when the suggested item is added.

use super::sea_orm_active_enums::SuggestionAction;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Upgrade suggestion database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "upgrade_suggestions")]
pub struct Model {
    /// Insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Cart the suggestion was made for
    pub cart_id: String,
    /// Suggested menu item
    pub suggested_item_id: i64,
    /// Pending, Added or Dismissed
    pub user_action: SuggestionAction,
    /// When the suggestion was made
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
