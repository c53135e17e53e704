//! Closed status and tag enums shared by the entities.
//!
//! Every status column is stored as a short lowercase string and read back into
//! one of these enums, so transition sites can match exhaustively.

use crate::errors::{Error, Result};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::str::FromStr;

/// Lifecycle of a table session
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SessionStatus {
    /// Table is open for ordering
    #[sea_orm(string_value = "active")]
    Active,
    /// Session was closed
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// How a diner is attached to a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SessionRole {
    /// Opened the session
    #[sea_orm(string_value = "host")]
    Host,
    /// Joined an already open session
    #[sea_orm(string_value = "guest")]
    Guest,
}

/// Whether a join record is still open
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MembershipStatus {
    /// Diner is at the table
    #[sea_orm(string_value = "active")]
    Active,
    /// Diner left or the session closed
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

/// Lifecycle of a cart
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CartStatus {
    /// Items can still be added
    #[sea_orm(string_value = "active")]
    Active,
    /// An order was placed for this cart
    #[sea_orm(string_value = "ordered")]
    Ordered,
}

/// Lifecycle of a single cart line
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CartItemStatus {
    /// In the cart, editable
    #[sea_orm(string_value = "active")]
    Active,
    /// Sent to the kitchen with an order
    #[sea_orm(string_value = "ordered")]
    Ordered,
    /// Removed by setting quantity to zero
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

impl CartItemStatus {
    /// Whether a line in this status may move to `next`.
    ///
    /// Only active lines change; ordered and canceled lines are final.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Active, Self::Active | Self::Ordered | Self::Canceled) => true,
            (Self::Ordered | Self::Canceled, _) => false,
        }
    }
}

/// Channel through which an item entered the cart.
///
/// Deserialization goes through [`FromStr`], so unknown channels are rejected
/// as invalid input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AddedVia {
    /// Picked from the menu
    #[sea_orm(string_value = "direct")]
    Direct,
    /// Came with a curated cart
    #[sea_orm(string_value = "from_curated_cart")]
    FromCuratedCart,
    /// Cross-sell shown on an item page
    #[sea_orm(string_value = "cross_sell_focus")]
    CrossSellFocus,
    /// Top picks carousel
    #[sea_orm(string_value = "top_picks")]
    TopPicks,
    /// Accepted an upgrade-cart suggestion
    #[sea_orm(string_value = "upgrade_cart_ai")]
    UpgradeCartAi,
    /// Cross-sell shown at checkout
    #[sea_orm(string_value = "cross_sell_checkout")]
    CrossSellCheckout,
}

impl FromStr for AddedVia {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "direct" => Ok(Self::Direct),
            "from_curated_cart" => Ok(Self::FromCuratedCart),
            "cross_sell_focus" => Ok(Self::CrossSellFocus),
            "top_picks" => Ok(Self::TopPicks),
            "upgrade_cart_ai" => Ok(Self::UpgradeCartAi),
            "cross_sell_checkout" => Ok(Self::CrossSellCheckout),
            other => Err(Error::validation(format!("unknown added_via value: {other:?}"))),
        }
    }
}

impl<'de> Deserialize<'de> for AddedVia {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

/// Lifecycle of an order as far as this engine is concerned
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderStatus {
    /// Placed by the diner
    #[sea_orm(string_value = "placed")]
    Placed,
    /// Accepted by the kitchen
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Withdrawn
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Placed -> Cancelled is the only transition owned by the engine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Placed, Self::Cancelled) => true,
            (Self::Placed, Self::Placed | Self::Confirmed)
            | (Self::Confirmed | Self::Cancelled, _) => false,
        }
    }
}

/// Payment state of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentStatus {
    /// Not paid yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Settled
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Payment attempt failed
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Direction of a loyalty ledger entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RewardType {
    /// Mustaches earned
    #[sea_orm(string_value = "credited")]
    Credited,
    /// Mustaches spent
    #[sea_orm(string_value = "debited")]
    Debited,
}

/// What the diner did with an upgrade-cart suggestion
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SuggestionAction {
    /// Shown, no reaction yet
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Item was added to the cart
    #[sea_orm(string_value = "added")]
    Added,
    /// Diner dismissed it
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

/// Whether an advertisement may be shown
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum AdStatus {
    /// Eligible within its time window
    #[sea_orm(string_value = "active")]
    Active,
    /// Switched off
    #[sea_orm(string_value = "inactive")]
    Inactive,
}
