//! Order placement - Turning a session's cart into an order.
//!
//! Placement is a sequence of separately committed steps:
//!
//! 1. The order row is inserted and committed.
//! 2. Settlement closes the cart, closes its lines and writes the discount
//!    ledger row. The three writes run concurrently on one store transaction
//!    and commit or roll back together.
//! 3. Rewards are resolved against the cart's latest upsell offer and credited.
//! 4. Staff devices are notified.
//!
//! Steps 2 and 3 run under the placement deadline; step 1 does not, so an
//! expired deadline always finds a durable order. A failure or expiry in
//! step 2 or 3 leaves the order from step 1 in place and is reported as
//! [`Error::PartialFailure`]. Step 4 never fails the call.
//! Placement has no idempotency key: calling it twice creates two orders.

use crate::{
    config::Settings,
    core::{
        cart::{CustomizationName, id_list, resolve_customizations},
        loyalty::base_mustaches,
        notify::Notifier,
        session::require_active_session,
        upsell::latest_offer,
    },
    entities::{
        Advertisement, Cafe, Cart, CartItem, DeviceToken, Discount, MenuItem, Order, Session,
        User, advertisement, cart, cart_item, device_token, discount, order, reward_transaction,
        sea_orm_active_enums::{
            AdStatus, CartItemStatus, CartStatus, OrderStatus, PaymentStatus, RewardType,
        },
        upsell_offer,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use futures::future::try_join_all;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::{collections::BTreeMap, future::Future, time::Duration};
use tracing::{debug, info, instrument, warn};

/// Title of the staff push sent for every new order
pub const ORDER_PUSH_TITLE: &str = "Order Update";

/// Input of [`place_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrderRequest {
    /// Cart to order
    pub cart_id: String,
    /// Session the cart belongs to
    pub session_id: String,
    /// Diner placing the order
    pub user_id: i64,
    /// Cafe taking the order
    pub cafe_id: i64,
    /// Amount charged for the order
    pub total_amount: f64,
    /// Discount granted on the order
    pub discount: f64,
    /// Note for the kitchen
    pub special_request: Option<String>,
}

/// Result of [`place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    /// New order id
    pub order_id: String,
    /// Mustaches credited for the order
    pub rewards_earned: i64,
    /// Upsell offer redeemed by this order, if any
    pub accepted_upsell: Option<String>,
    /// Staff notification problems; the order stands regardless
    pub notification_warnings: Vec<String>,
}

/// How many mustaches an order earns and which offer it redeems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardDecision {
    /// Mustaches to credit
    pub mustaches: i64,
    /// Row id of the redeemed upsell offer
    pub redeemed_offer: Option<i64>,
}

/// Picks the reward for a cart total given the cart's latest upsell offer.
///
/// An unaccepted offer whose target the total reaches pays its bonus;
/// otherwise the order earns one mustache per 50.
#[must_use]
pub fn decide_reward(cart_total: f64, offer: Option<&upsell_offer::Model>) -> RewardDecision {
    match offer {
        Some(offer) if !offer.offer_accepted && cart_total >= offer.target_amount => {
            RewardDecision {
                mustaches: offer.mustaches_to_give,
                redeemed_offer: Some(offer.id),
            }
        }
        _ => RewardDecision {
            mustaches: base_mustaches(cart_total),
            redeemed_offer: None,
        },
    }
}

fn validate(request: &PlaceOrderRequest) -> Result<()> {
    if request.cart_id.trim().is_empty() {
        return Err(Error::validation("cart_id is required"));
    }
    if request.session_id.trim().is_empty() {
        return Err(Error::validation("session_id is required"));
    }
    if !request.total_amount.is_finite() || request.total_amount <= 0.0 {
        return Err(Error::validation("total_amount must be greater than zero"));
    }
    if !request.discount.is_finite() || request.discount < 0.0 {
        return Err(Error::validation("discount cannot be negative"));
    }
    if request.user_id == 0 {
        return Err(Error::validation("user is not authenticated"));
    }
    Ok(())
}

/// Runs `operation` under `timeout`, mapping expiry to [`Error::Timeout`].
///
/// The future is dropped on expiry, which rolls back any transaction it holds.
pub async fn with_deadline<T, F>(operation: &'static str, timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, ?timeout, "Deadline exceeded");
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            Err(Error::Timeout {
                operation,
                timeout_ms,
            })
        }
    }
}

/// Places an order for a session's cart.
///
/// Settlement and rewards (steps 2 and 3 of the module docs) run under the
/// configured placement deadline. Staff notification happens afterwards and
/// only adds warnings to the result.
#[instrument(skip(db, settings, notifier, request), fields(cart_id = %request.cart_id))]
pub async fn place_order(
    db: &DatabaseConnection,
    settings: &Settings,
    notifier: &dyn Notifier,
    request: PlaceOrderRequest,
) -> Result<PlacedOrder> {
    validate(&request)?;

    let (order, table_name) = insert_order(db, &request).await?;
    let reward = finish_order(db, &order, request.discount, settings.place_order_timeout()).await?;

    let notification_warnings = notify_staff(db, notifier, order.cafe_id, &table_name).await;

    info!(
        "Placed order {} for cart {} ({} mustaches)",
        order.order_id, order.cart_id, reward.mustaches
    );
    Ok(PlacedOrder {
        order_id: order.order_id,
        rewards_earned: reward.mustaches,
        accepted_upsell: reward.accepted_upsell,
        notification_warnings,
    })
}

struct CreditedReward {
    mustaches: i64,
    accepted_upsell: Option<String>,
}

async fn insert_order(
    db: &DatabaseConnection,
    request: &PlaceOrderRequest,
) -> Result<(order::Model, String)> {
    let (session, cart) = tokio::try_join!(
        require_active_session(db, &request.session_id),
        async {
            Cart::find_by_id(request.cart_id.as_str())
                .one(db)
                .await?
                .ok_or_else(|| Error::not_found("cart", request.cart_id.as_str()))
        },
    )?;
    if cart.session_id != session.session_id {
        return Err(Error::conflict(format!(
            "cart {} does not belong to session {}",
            cart.cart_id, session.session_id
        )));
    }

    let order = order::ActiveModel {
        order_id: Set(uuid::Uuid::new_v4().to_string()),
        cafe_id: Set(request.cafe_id),
        cart_id: Set(cart.cart_id.clone()),
        session_id: Set(session.session_id.clone()),
        user_id: Set(request.user_id),
        special_request: Set(request.special_request.clone()),
        status: Set(OrderStatus::Placed),
        payment_status: Set(PaymentStatus::Pending),
        total_amount: Set(request.total_amount),
        order_time: Set(Utc::now()),
    }
    .insert(db)
    .await?;
    debug!("Order {} inserted", order.order_id);
    Ok((order, session.table_name))
}

/// Settles the cart and credits rewards for an already committed order.
///
/// Expiry of `timeout` is a partial failure: the order row is durable and
/// must be reconciled rather than placed again.
async fn finish_order(
    db: &DatabaseConnection,
    order: &order::Model,
    discount_value: f64,
    timeout: Duration,
) -> Result<CreditedReward> {
    let settle_and_credit = async {
        settle_cart(db, order, discount_value).await?;
        credit_rewards(db, order).await.map_err(|e| Error::PartialFailure {
            operation: "place_order",
            committed: format!("order {} with its cart settled", order.order_id),
            failed: format!("crediting rewards: {e}"),
        })
    };

    with_deadline("place_order", timeout, settle_and_credit)
        .await
        .map_err(|e| match e {
            Error::Timeout { timeout_ms, .. } => Error::PartialFailure {
                operation: "place_order",
                committed: format!("order {}", order.order_id),
                failed: format!(
                    "deadline of {timeout_ms}ms exceeded, settlement and rewards may be incomplete"
                ),
            },
            other => other,
        })
}

async fn close_cart<C>(db: &C, cart_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    Cart::update_many()
        .col_expr(cart::Column::Status, Expr::value(CartStatus::Ordered))
        .col_expr(cart::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart::Column::CartId.eq(cart_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn close_items<C>(db: &C, cart_id: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    // Canceled lines are final and keep their status
    CartItem::update_many()
        .col_expr(cart_item::Column::Status, Expr::value(CartItemStatus::Ordered))
        .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::Status.eq(CartItemStatus::Active))
        .exec(db)
        .await?;
    Ok(())
}

async fn record_discount<C>(db: &C, order: &order::Model, discount_value: f64) -> Result<()>
where
    C: ConnectionTrait,
{
    discount::ActiveModel {
        user_id: Set(order.user_id),
        cafe_id: Set(order.cafe_id),
        order_id: Set(order.order_id.clone()),
        discount_value: Set(discount_value),
        total_cost: Set(order.total_amount),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

/// Closes the cart and its lines and writes the discount row, all or nothing.
async fn settle_cart(db: &DatabaseConnection, order: &order::Model, discount_value: f64) -> Result<()> {
    let partial = |failed: String| Error::PartialFailure {
        operation: "place_order",
        committed: format!("order {}", order.order_id),
        failed,
    };

    let txn = db
        .begin()
        .await
        .map_err(|e| partial(format!("opening settlement: {e}")))?;

    let (cart_closed, items_closed, discount_recorded) = tokio::join!(
        close_cart(&txn, &order.cart_id),
        close_items(&txn, &order.cart_id),
        record_discount(&txn, order, discount_value),
    );

    let failures: Vec<String> = [
        ("cart status", cart_closed),
        ("item statuses", items_closed),
        ("discount ledger", discount_recorded),
    ]
    .into_iter()
    .filter_map(|(step, result)| result.err().map(|e| format!("{step}: {e}")))
    .collect();

    if failures.is_empty() {
        return txn
            .commit()
            .await
            .map_err(|e| partial(format!("committing settlement: {e}")));
    }

    warn!(order_id = %order.order_id, ?failures, "Settlement failed, rolling back");
    if let Err(e) = txn.rollback().await {
        warn!(error = %e, "Settlement rollback failed");
    }
    Err(partial(failures.join("; ")))
}

/// Resolves the order's reward and appends it to the ledger.
async fn credit_rewards(db: &DatabaseConnection, order: &order::Model) -> Result<CreditedReward> {
    let txn = db.begin().await?;

    let cart = Cart::find_by_id(order.cart_id.as_str())
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("cart", order.cart_id.as_str()))?;
    let offer = latest_offer(&txn, &order.cart_id).await?;
    let decision = decide_reward(cart.total_amount, offer.as_ref());

    let accepted_upsell = match (decision.redeemed_offer, offer) {
        (Some(_), Some(offer)) => {
            let upsell_id = offer.upsell_id.clone();
            let mut active: upsell_offer::ActiveModel = offer.into();
            active.offer_accepted = Set(true);
            active.update(&txn).await?;
            Some(upsell_id)
        }
        _ => None,
    };

    reward_transaction::ActiveModel {
        user_id: Set(order.user_id),
        cafe_id: Set(order.cafe_id),
        session_id: Set(order.session_id.clone()),
        transaction_type: Set(RewardType::Credited),
        mustaches: Set(decision.mustaches),
        earned_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    Ok(CreditedReward {
        mustaches: decision.mustaches,
        accepted_upsell,
    })
}

/// Pushes the new-order notice to the cafe's staff devices. Returns warnings.
async fn notify_staff(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    cafe_id: i64,
    table_name: &str,
) -> Vec<String> {
    let devices = match DeviceToken::find()
        .filter(device_token::Column::CafeId.eq(cafe_id))
        .all(db)
        .await
    {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "Could not load staff devices");
            return vec![format!("loading staff devices: {e}")];
        }
    };
    if devices.is_empty() {
        debug!("Cafe {} has no staff devices registered", cafe_id);
        return Vec::new();
    }

    let tokens: Vec<String> = devices.into_iter().map(|device| device.token).collect();
    let body = format!("New order received for Table No: {table_name}");
    notifier
        .send(&tokens, ORDER_PUSH_TITLE, &body)
        .await
        .into_iter()
        .filter_map(|delivery| {
            delivery
                .error
                .map(|error| format!("push to {}: {error}", delivery.token))
        })
        .collect()
}

/// Withdraws a placed order.
#[instrument(skip(db))]
pub async fn cancel_order(db: &DatabaseConnection, order_id: &str) -> Result<order::Model> {
    let existing = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("order", order_id))?;

    if !existing.status.can_transition_to(OrderStatus::Cancelled) {
        return Err(Error::conflict(format!(
            "order {order_id} is {:?} and cannot be cancelled",
            existing.status
        )));
    }

    let mut active: order::ActiveModel = existing.into();
    active.status = Set(OrderStatus::Cancelled);
    Ok(active.update(db).await?)
}

/// One ordered line of an order summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    /// Cart line id
    pub cart_item_id: String,
    /// Menu item id
    pub item_id: i64,
    /// Menu item name
    pub name: String,
    /// Units ordered
    pub quantity: i32,
    /// Unit price at order time
    pub unit_price: f64,
    /// Selected customizations
    pub customizations: Vec<CustomizationName>,
    /// Note for the kitchen
    pub special_request: Option<String>,
}

/// One order in a session summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    /// Order id
    pub order_id: String,
    /// Ordered cart
    pub cart_id: String,
    /// Ordered lines
    pub lines: Vec<OrderLine>,
    /// Placement time in café time
    pub ordered_at: DateTime<FixedOffset>,
    /// Discount recorded for the order, 0 when none
    pub discount: f64,
    /// Amount charged
    pub total_amount: f64,
}

/// A diner's unpaid orders within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserOrders {
    /// Diner id
    pub user_id: i64,
    /// Diner name, `None` if the diner is unknown
    pub user_name: Option<String>,
    /// Sum of order totals
    pub cumulative_total: f64,
    /// Sum of order discounts
    pub discount: f64,
    /// Orders, oldest first
    pub orders: Vec<OrderSummary>,
}

/// Unpaid orders of a session grouped by diner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOrders {
    /// Per-diner groups ordered by diner id
    pub users: Vec<UserOrders>,
    /// Most recent placement time across all groups
    pub latest_order_time: Option<DateTime<FixedOffset>>,
    /// Running cafe advertisement, when enabled and available
    pub advertisement: Option<advertisement::Model>,
}

fn start_of_local_day(now: DateTime<Utc>, offset: FixedOffset) -> Result<DateTime<Utc>> {
    now.with_timezone(&offset)
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| offset.from_local_datetime(&midnight).single())
        .map(|start| start.with_timezone(&Utc))
        .ok_or_else(|| Error::validation(format!("cannot compute start of day for {now}")))
}

async fn summarize(
    db: &DatabaseConnection,
    settings: &Settings,
    order: order::Model,
) -> Result<OrderSummary> {
    let (items, recorded_discount) = tokio::try_join!(
        async {
            CartItem::find()
                .filter(cart_item::Column::CartId.eq(order.cart_id.as_str()))
                .filter(cart_item::Column::Status.eq(CartItemStatus::Ordered))
                .order_by_asc(cart_item::Column::AddedAt)
                .all(db)
                .await
                .map_err(Error::from)
        },
        async {
            Discount::find()
                .filter(discount::Column::OrderId.eq(order.order_id.as_str()))
                .one(db)
                .await
                .map_err(Error::from)
        },
    )?;

    let lines = try_join_all(items.into_iter().map(|item| async move {
        let Some(menu_item) = MenuItem::find_by_id(item.item_id).one(db).await? else {
            debug!("Menu item {} missing, line omitted", item.item_id);
            return Ok::<_, Error>(None);
        };
        let customizations = resolve_customizations(db, &id_list(&item.customization_ids)).await?;
        Ok(Some(OrderLine {
            cart_item_id: item.cart_item_id,
            item_id: item.item_id,
            name: menu_item.name,
            quantity: item.quantity,
            unit_price: item.price,
            customizations,
            special_request: item.special_request,
        }))
    }))
    .await?;

    Ok(OrderSummary {
        lines: lines.into_iter().flatten().collect(),
        ordered_at: settings.to_local(order.order_time)?,
        discount: recorded_discount.map_or(0.0, |d| d.discount_value),
        total_amount: order.total_amount,
        order_id: order.order_id,
        cart_id: order.cart_id,
    })
}

/// Lists a session's unpaid orders grouped by diner.
///
/// Cafes not running a complete POS only show the caller their own orders
/// from the current café-local day.
#[instrument(skip(db, settings))]
pub async fn fetch_order_details(
    db: &DatabaseConnection,
    settings: &Settings,
    session_id: &str,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<SessionOrders> {
    let session = Session::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("session", session_id))?;
    let complete_pos = Cafe::find_by_id(session.cafe_id)
        .one(db)
        .await?
        .is_some_and(|cafe| cafe.complete_pos);

    let mut query = Order::find()
        .filter(order::Column::SessionId.eq(session_id))
        .filter(order::Column::PaymentStatus.is_in([PaymentStatus::Pending, PaymentStatus::Failed]))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled));
    if !complete_pos {
        let today = start_of_local_day(now, settings.local_offset()?)?;
        query = query
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::OrderTime.gte(today));
    }
    let orders = query.order_by_asc(order::Column::OrderTime).all(db).await?;

    let mut user_ids: Vec<i64> = orders.iter().map(|o| o.user_id).collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let (summaries, users) = tokio::try_join!(
        try_join_all(orders.into_iter().map(|o| {
            let owner = o.user_id;
            async move { summarize(db, settings, o).await.map(|summary| (owner, summary)) }
        })),
        async {
            User::find()
                .filter(crate::entities::user::Column::Id.is_in(user_ids))
                .all(db)
                .await
                .map_err(Error::from)
        },
    )?;

    let names: BTreeMap<i64, String> = users.into_iter().map(|u| (u.id, u.name)).collect();
    let mut groups: BTreeMap<i64, UserOrders> = BTreeMap::new();
    let mut latest_order_time: Option<DateTime<FixedOffset>> = None;
    for (owner, summary) in summaries {
        latest_order_time = latest_order_time.max(Some(summary.ordered_at));
        let group = groups.entry(owner).or_insert_with(|| UserOrders {
            user_id: owner,
            user_name: names.get(&owner).cloned(),
            cumulative_total: 0.0,
            discount: 0.0,
            orders: Vec::new(),
        });
        group.cumulative_total += summary.total_amount;
        group.discount += summary.discount;
        group.orders.push(summary);
    }

    let advertisement = if settings.attach_advertisements {
        running_advertisement(db, session.cafe_id, now).await?
    } else {
        None
    };

    Ok(SessionOrders {
        users: groups.into_values().collect(),
        latest_order_time,
        advertisement,
    })
}

async fn running_advertisement(
    db: &DatabaseConnection,
    cafe_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<advertisement::Model>> {
    Advertisement::find()
        .filter(advertisement::Column::CafeId.eq(cafe_id))
        .filter(advertisement::Column::Status.eq(AdStatus::Active))
        .filter(advertisement::Column::StartsAt.lte(now))
        .filter(advertisement::Column::EndsAt.gte(now))
        .order_by_desc(advertisement::Column::CreatedAt)
        .one(db)
        .await
        .map_err(Into::into)
}
