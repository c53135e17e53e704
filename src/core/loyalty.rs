//! Loyalty ledger - Mustache balances, tiers and monthly earnings.
//!
//! The ledger is append-only. A diner's balance is the sum of their credited
//! entries; the tier is derived from the balance whenever it is displayed.

use crate::{
    config::Settings,
    entities::{
        Order, RewardTransaction, User, order,
        reward_transaction,
        sea_orm_active_enums::{PaymentStatus, RewardType},
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use sea_orm::{PaginatorTrait, prelude::*};
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// Loyalty bracket shown on a diner's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Tier {
    /// Balance below 100
    Dripstarter,
    /// Balance from 100 to 299
    BrewBuddy,
    /// Balance from 300 to 699
    BeanBoss,
    /// Balance of 700 and above
    CaffeineRoyalty,
}

impl Tier {
    /// Balance at which this tier starts.
    #[must_use]
    pub const fn threshold(self) -> i64 {
        match self {
            Self::Dripstarter => 0,
            Self::BrewBuddy => 100,
            Self::BeanBoss => 300,
            Self::CaffeineRoyalty => 700,
        }
    }

    /// Tier for a mustache balance.
    #[must_use]
    pub const fn for_balance(balance: i64) -> Self {
        if balance >= Self::CaffeineRoyalty.threshold() {
            Self::CaffeineRoyalty
        } else if balance >= Self::BeanBoss.threshold() {
            Self::BeanBoss
        } else if balance >= Self::BrewBuddy.threshold() {
            Self::BrewBuddy
        } else {
            Self::Dripstarter
        }
    }

    /// The tier above, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Dripstarter => Some(Self::BrewBuddy),
            Self::BrewBuddy => Some(Self::BeanBoss),
            Self::BeanBoss => Some(Self::CaffeineRoyalty),
            Self::CaffeineRoyalty => None,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dripstarter => "Dripstarter",
            Self::BrewBuddy => "Brew Buddy",
            Self::BeanBoss => "Bean Boss",
            Self::CaffeineRoyalty => "Caffeine Royalty",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a balance sits in the tier ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierStanding {
    /// Current tier
    pub tier: Tier,
    /// Tier to reach next, `None` at the top
    pub next_tier: Option<Tier>,
    /// Mustaches missing for the next tier, 0 at the top
    pub due_for_next_level: i64,
}

/// Places a balance in the tier ladder.
#[must_use]
pub const fn standing(balance: i64) -> TierStanding {
    let tier = Tier::for_balance(balance);
    let next_tier = tier.next();
    let due_for_next_level = match next_tier {
        Some(next) => next.threshold() - balance,
        None => 0,
    };
    TierStanding {
        tier,
        next_tier,
        due_for_next_level,
    }
}

/// Mustaches earned by an order without an upsell: one per 50 spent.
#[must_use]
pub fn base_mustaches(total: f64) -> i64 {
    if !total.is_finite() || total <= 0.0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let mustaches = (total / 50.0).floor() as i64;
    mustaches
}

/// Sum of credited mustaches earned at or after `since`.
pub async fn earned_since<C>(db: &C, user_id: i64, since: Option<DateTime<Utc>>) -> Result<i64>
where
    C: ConnectionTrait,
{
    let mut query = RewardTransaction::find()
        .filter(reward_transaction::Column::UserId.eq(user_id))
        .filter(reward_transaction::Column::TransactionType.eq(RewardType::Credited));
    if let Some(since) = since {
        query = query.filter(reward_transaction::Column::EarnedDate.gte(since));
    }
    let entries = query.all(db).await?;
    Ok(entries.iter().map(|entry| entry.mustaches).sum())
}

/// A diner's mustache balance.
pub async fn balance<C>(db: &C, user_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    earned_since(db, user_id, None).await
}

/// First instant of the café-local month containing `now`.
pub fn start_of_month(now: DateTime<Utc>, offset: FixedOffset) -> Result<DateTime<Utc>> {
    let local = now.with_timezone(&offset);
    NaiveDate::from_ymd_opt(local.year(), local.month(), 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|start| start.with_timezone(&Utc))
        .ok_or_else(|| Error::validation(format!("cannot compute month start for {now}")))
}

/// Mustaches credited since the start of the current café-local month.
pub async fn monthly_earned<C>(
    db: &C,
    settings: &Settings,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<i64>
where
    C: ConnectionTrait,
{
    let since = start_of_month(now, settings.local_offset()?)?;
    earned_since(db, user_id, Some(since)).await
}

/// Everything the profile screen shows about a diner's loyalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoyaltyProfile {
    /// Diner name
    pub name: String,
    /// Diner phone number
    pub phone: String,
    /// Registration date in café time, e.g. "2 Jan 2026"
    pub joined_on: String,
    /// Current balance
    pub balance: i64,
    /// Tier ladder position
    pub standing: TierStanding,
    /// Credited this café-local month
    pub earned_this_month: i64,
    /// Number of paid orders
    pub total_orders: u64,
}

/// Builds a diner's loyalty profile as of `now`.
#[instrument(skip(db, settings))]
pub async fn profile(
    db: &DatabaseConnection,
    settings: &Settings,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<LoyaltyProfile> {
    let paid_orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .count(db);

    let (user, balance, earned_this_month, total_orders) = tokio::try_join!(
        async {
            User::find_by_id(user_id)
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("user", user_id.to_string()))
        },
        balance(db, user_id),
        monthly_earned(db, settings, user_id, now),
        async { paid_orders.await.map_err(Error::from) },
    )?;

    Ok(LoyaltyProfile {
        name: user.name,
        phone: user.phone,
        joined_on: settings.to_local(user.created_at)?.format("%-d %b %Y").to_string(),
        balance,
        standing: standing(balance),
        earned_this_month,
        total_orders,
    })
}
