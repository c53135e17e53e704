//! Cafe entity - A venue operating the dine-in workflow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cafe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cafes")]
pub struct Model {
    /// Cafe identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Whether the cafe runs its whole floor through the app ("complete POS").
    /// Otherwise order summaries are scoped to the caller and to today.
    pub complete_pos: bool,
}

/// `Cafe` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
