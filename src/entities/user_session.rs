//! User session entity - Join record between a diner and a session.

use super::sea_orm_active_enums::{MembershipStatus, SessionRole};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User session database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_sessions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Joined session
    pub session_id: String,
    /// Joining diner
    pub user_id: i64,
    /// Host if the diner opened the session, Guest otherwise
    pub role: SessionRole,
    /// Open or closed
    pub status: MembershipStatus,
    /// When the diner joined
    pub joined_at: DateTimeUtc,
    /// When the diner left; `None` while the join is open
    pub left_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
