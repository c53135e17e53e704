//! Dining table entity - Tables a diner can check into.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Dining table database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dining_tables")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning cafe
    pub cafe_id: i64,
    /// Table label printed on the QR code (e.g. "T4")
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
