//! Session entity - A table's ordering window.
//!
//! At most one session per (`cafe_id`, `table_name`) may be active; the schema
//! backs this with a partial unique index.

use super::sea_orm_active_enums::SessionStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    /// Opaque session identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    /// Cafe the table belongs to
    pub cafe_id: i64,
    /// Table label
    pub table_name: String,
    /// 4-digit code guests use to prove they are at the table
    pub table_code: Option<String>,
    /// Active or Inactive
    pub status: SessionStatus,
    /// User who opened the session
    pub created_by: i64,
    /// When the session was opened
    pub start_time: DateTimeUtc,
    /// When the session was closed
    pub end_time: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
