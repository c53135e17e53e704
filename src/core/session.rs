//! Session business logic - Table check-in and the Active/Inactive session lifecycle.
//!
//! A table has at most one active session at a time. The first diner to check
//! in opens it and becomes Host; everyone after joins as Guest until the session
//! is invalidated. Each diner's presence is tracked by a join record.

use crate::{
    config::Settings,
    entities::{
        DiningTable, Session, UserSession, dining_table, session,
        sea_orm_active_enums::{MembershipStatus, SessionRole, SessionStatus},
        user_session,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{QueryOrder, Set, SqlErr, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument, warn};

/// Result of a check-in.
#[derive(Debug, Clone)]
pub struct CheckIn {
    /// The table's active session
    pub session: session::Model,
    /// Host if this call opened the session, Guest otherwise
    pub role: SessionRole,
    /// Code guests use to verify they sit at the table
    pub table_code: String,
}

/// Generates a 4-digit numeric table code. Codes are not unique across tables.
#[must_use]
pub fn generate_table_code() -> String {
    format!("{:04}", rand::rng().random_range(0..10_000))
}

/// Finds the active session for a table, if any.
pub async fn find_active_session<C>(
    db: &C,
    cafe_id: i64,
    table_name: &str,
) -> Result<Option<session::Model>>
where
    C: ConnectionTrait,
{
    Session::find()
        .filter(session::Column::CafeId.eq(cafe_id))
        .filter(session::Column::TableName.eq(table_name))
        .filter(session::Column::Status.eq(SessionStatus::Active))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a session and requires it to be active.
///
/// Returns `NotFound` when the session does not exist and `Conflict` when it
/// has been invalidated.
pub async fn require_active_session<C>(db: &C, session_id: &str) -> Result<session::Model>
where
    C: ConnectionTrait,
{
    let session = Session::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("session", session_id))?;

    match session.status {
        SessionStatus::Active => Ok(session),
        SessionStatus::Inactive => Err(Error::conflict(format!(
            "Session {session_id} is inactive"
        ))),
    }
}

/// Checks a diner into a table.
///
/// Joins the table's active session as Guest, or opens a new one as Host when
/// the table is free. A table code is generated lazily if the session has none.
/// If two diners race to open the same table, the store's unique index lets
/// only one insert win and the loser joins the winner's session.
#[instrument(skip(db, settings))]
pub async fn check_in(
    db: &DatabaseConnection,
    settings: &Settings,
    table_name: &str,
    cafe_id: i64,
    user_id: i64,
) -> Result<CheckIn> {
    if table_name.trim().is_empty() {
        return Err(Error::validation("table_id is required"));
    }
    if user_id == 0 {
        return Err(Error::validation("user is not authenticated"));
    }

    if settings.validate_tables {
        DiningTable::find()
            .filter(dining_table::Column::CafeId.eq(cafe_id))
            .filter(dining_table::Column::Name.eq(table_name))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("table", format!("{table_name} at cafe {cafe_id}")))?;
    }

    let (mut session, role) = match find_active_session(db, cafe_id, table_name).await? {
        Some(existing) => (existing, SessionRole::Guest),
        None => open_session(db, cafe_id, table_name, user_id).await?,
    };

    let table_code = match session.table_code.clone() {
        Some(code) => code,
        None => {
            let code = generate_table_code();
            Session::update_many()
                .col_expr(session::Column::TableCode, Expr::value(code.clone()))
                .filter(session::Column::SessionId.eq(session.session_id.as_str()))
                .exec(db)
                .await?;
            session.table_code = Some(code.clone());
            code
        }
    };

    record_membership(db, &session.session_id, user_id, role).await?;

    info!(
        session_id = %session.session_id,
        ?role,
        "Diner {} checked into table {}",
        user_id,
        table_name
    );
    Ok(CheckIn {
        session,
        role,
        table_code,
    })
}

async fn open_session(
    db: &DatabaseConnection,
    cafe_id: i64,
    table_name: &str,
    user_id: i64,
) -> Result<(session::Model, SessionRole)> {
    let new_session = session::ActiveModel {
        session_id: Set(uuid::Uuid::new_v4().to_string()),
        cafe_id: Set(cafe_id),
        table_name: Set(table_name.to_string()),
        table_code: Set(Some(generate_table_code())),
        status: Set(SessionStatus::Active),
        created_by: Set(user_id),
        start_time: Set(Utc::now()),
        end_time: Set(None),
    };

    match new_session.insert(db).await {
        Ok(created) => {
            debug!(session_id = %created.session_id, "Opened new session");
            Ok((created, SessionRole::Host))
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            warn!("Lost race opening table {}, joining existing session", table_name);
            let existing = find_active_session(db, cafe_id, table_name)
                .await?
                .ok_or(Error::Database(err))?;
            Ok((existing, SessionRole::Guest))
        }
        Err(err) => Err(err.into()),
    }
}

/// Writes a join record unless the diner already has an open one for the session.
async fn record_membership(
    db: &DatabaseConnection,
    session_id: &str,
    user_id: i64,
    role: SessionRole,
) -> Result<()> {
    let open = UserSession::find()
        .filter(user_session::Column::SessionId.eq(session_id))
        .filter(user_session::Column::UserId.eq(user_id))
        .filter(user_session::Column::LeftAt.is_null())
        .one(db)
        .await?;
    if open.is_some() {
        return Ok(());
    }

    user_session::ActiveModel {
        session_id: Set(session_id.to_string()),
        user_id: Set(user_id),
        role: Set(role),
        status: Set(MembershipStatus::Active),
        joined_at: Set(Utc::now()),
        left_at: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Closes the session and every open join record.
///
/// The session update and the join cascade are separate writes. If the cascade
/// fails the session stays Inactive and `PartialFailure` is returned; calling
/// `invalidate` again re-runs only the cascade.
#[instrument(skip(db))]
pub async fn invalidate(db: &DatabaseConnection, session_id: &str) -> Result<()> {
    let session = Session::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("session", session_id))?;

    let now = Utc::now();
    if session.status == SessionStatus::Active {
        Session::update_many()
            .col_expr(session::Column::Status, Expr::value(SessionStatus::Inactive))
            .col_expr(session::Column::EndTime, Expr::value(now))
            .filter(session::Column::SessionId.eq(session_id))
            .exec(db)
            .await?;
    } else {
        debug!("Session {} already inactive, re-running join cascade", session_id);
    }

    let closed = close_open_memberships(db, session_id, now)
        .await
        .map_err(|e| Error::PartialFailure {
            operation: "invalidate_session",
            committed: format!("session {session_id} marked inactive"),
            failed: format!("closing open joins: {e}"),
        })?;

    info!("Invalidated session {} and closed {} joins", session_id, closed);
    Ok(())
}

/// Closes every open join record of a session. Returns how many were closed.
pub async fn close_open_memberships<C>(
    db: &C,
    session_id: &str,
    left_at: DateTime<Utc>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = UserSession::update_many()
        .col_expr(user_session::Column::LeftAt, Expr::value(left_at))
        .col_expr(
            user_session::Column::Status,
            Expr::value(MembershipStatus::Inactive),
        )
        .filter(user_session::Column::SessionId.eq(session_id))
        .filter(user_session::Column::LeftAt.is_null())
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Closes one diner's open join record.
pub async fn leave(db: &DatabaseConnection, session_id: &str, user_id: i64) -> Result<()> {
    let result = UserSession::update_many()
        .col_expr(user_session::Column::LeftAt, Expr::value(Utc::now()))
        .col_expr(
            user_session::Column::Status,
            Expr::value(MembershipStatus::Inactive),
        )
        .filter(user_session::Column::SessionId.eq(session_id))
        .filter(user_session::Column::UserId.eq(user_id))
        .filter(user_session::Column::LeftAt.is_null())
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found(
            "session membership",
            format!("user {user_id} in {session_id}"),
        ));
    }
    Ok(())
}

/// True iff the session exists and is active. A missing session is `false`.
pub async fn check_status(db: &DatabaseConnection, session_id: &str) -> Result<bool> {
    let session = Session::find_by_id(session_id).one(db).await?;
    Ok(session.is_some_and(|s| s.status == SessionStatus::Active))
}

/// Verifies the code a guest typed against the active session's table code.
pub async fn verify_table_code(
    db: &DatabaseConnection,
    session_id: &str,
    table_code: &str,
) -> Result<session::Model> {
    Session::find()
        .filter(session::Column::SessionId.eq(session_id))
        .filter(session::Column::TableCode.eq(table_code))
        .filter(session::Column::Status.eq(SessionStatus::Active))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("session with table code", session_id))
}

/// Join records of a session, oldest first.
pub async fn members(db: &DatabaseConnection, session_id: &str) -> Result<Vec<user_session::Model>> {
    UserSession::find()
        .filter(user_session::Column::SessionId.eq(session_id))
        .order_by_asc(user_session::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
