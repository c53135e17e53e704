//! Reward transaction entity - Append-only loyalty ledger.

use super::sea_orm_active_enums::RewardType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reward transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reward_transactions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Diner whose balance changes
    pub user_id: i64,
    /// Cafe where the mustaches were earned
    pub cafe_id: i64,
    /// Session the entry belongs to
    pub session_id: String,
    /// Credited or Debited
    pub transaction_type: RewardType,
    /// Signed mustache amount
    pub mustaches: i64,
    /// When the entry was written
    pub earned_date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
