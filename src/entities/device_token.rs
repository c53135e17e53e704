//! Device token entity - Staff devices that receive order pushes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Device token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device_tokens")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Cafe the device serves
    pub cafe_id: i64,
    /// Push token
    pub token: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
