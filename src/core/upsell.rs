//! Upsell calculation - "Spend a little more" offers on a cart.
//!
//! The offer always targets the next full hundred above the current total and
//! rewards 10 mustaches per 50 of the upsell amount.

use crate::{
    entities::{Cart, UpsellOffer, upsell_offer},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Bucket size the offer rounds up to
const BUCKET: i64 = 100;
/// Mustaches granted per step of the upsell amount
const MUSTACHES_PER_STEP: i64 = 10;
/// Upsell amount per mustache step
const STEP: i64 = 50;

/// Arithmetic of an upsell offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsellQuote {
    /// Distance from the current total to the next full hundred
    pub next_hundred: i64,
    /// `next_hundred` plus one more bucket
    pub upsell_amount: i64,
    /// Bonus for reaching the target
    pub mustaches_to_give: i64,
}

/// Computes the offer for a cart total.
///
/// Only the integer part of the total is used. A total that is already a
/// multiple of 100 targets the following hundred, so `next_hundred` is never 0.
pub fn quote(current_total: f64) -> Result<UpsellQuote> {
    if !current_total.is_finite() || current_total < 0.0 {
        return Err(Error::validation(
            "current total must be a non-negative number",
        ));
    }

    #[allow(clippy::cast_possible_truncation)]
    let whole = current_total.trunc() as i64;
    let next_hundred = (whole / BUCKET + 1) * BUCKET - whole;
    let upsell_amount = next_hundred + BUCKET;
    Ok(UpsellQuote {
        next_hundred,
        upsell_amount,
        mustaches_to_give: (upsell_amount / STEP) * MUSTACHES_PER_STEP,
    })
}

/// Computes an offer for `current_total` and records it against the cart.
///
/// Repeated calls add new offers; the newest one is used when an order is placed.
#[instrument(skip(db))]
pub async fn compute_upsell(
    db: &DatabaseConnection,
    cart_id: &str,
    cafe_id: i64,
    current_total: f64,
) -> Result<upsell_offer::Model> {
    if cart_id.trim().is_empty() {
        return Err(Error::validation("cart_id is required"));
    }
    let quote = quote(current_total)?;

    #[allow(clippy::cast_precision_loss)]
    let offer = upsell_offer::ActiveModel {
        upsell_id: Set(uuid::Uuid::new_v4().to_string()),
        cart_id: Set(cart_id.to_string()),
        cafe_id: Set(cafe_id),
        current_amount: Set(current_total),
        target_amount: Set(quote.next_hundred as f64),
        mustaches_to_give: Set(quote.mustaches_to_give),
        offer_accepted: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        "Upsell for cart {}: spend {} more for {} mustaches",
        cart_id, quote.next_hundred, quote.mustaches_to_give
    );
    Ok(offer)
}

/// Like [`compute_upsell`], using the total stored on the cart.
pub async fn compute_upsell_for_cart(
    db: &DatabaseConnection,
    cart_id: &str,
    cafe_id: i64,
) -> Result<upsell_offer::Model> {
    let cart = Cart::find_by_id(cart_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("cart", cart_id))?;
    compute_upsell(db, cart_id, cafe_id, cart.total_amount).await
}

/// The authoritative (most recently created) offer for a cart.
pub async fn latest_offer<C>(db: &C, cart_id: &str) -> Result<Option<upsell_offer::Model>>
where
    C: ConnectionTrait,
{
    UpsellOffer::find()
        .filter(upsell_offer::Column::CartId.eq(cart_id))
        .order_by_desc(upsell_offer::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}
