//! Personalisation - Read-only suggestions derived from a diner's order history.

use crate::{
    entities::{
        CartItem, ItemFavorite, MenuItem, Order, cart_item, item_favorite, menu_item, order,
        sea_orm_active_enums::{CartItemStatus, OrderStatus},
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// Number of favourites shown in the feed
const FAVOURITES_SHOWN: usize = 3;

/// Menu item as shown in suggestion carousels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuItemSummary {
    /// Menu item id
    pub id: i64,
    /// Cafe serving the item
    pub cafe_id: i64,
    /// Picture
    pub image_url: Option<String>,
    /// Display name
    pub name: String,
    /// Base price
    pub price: f64,
    /// Whether the item takes customizations
    pub is_customizable: bool,
}

impl From<menu_item::Model> for MenuItemSummary {
    fn from(item: menu_item::Model) -> Self {
        Self {
            id: item.id,
            cafe_id: item.cafe_id,
            image_url: item.image_url,
            name: item.name,
            price: item.price,
            is_customizable: item.is_customizable,
        }
    }
}

/// One ordered line of the history: which item went out with which order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedItem {
    /// Order the item was part of
    pub order_id: String,
    /// When the order was placed
    pub order_time: DateTime<Utc>,
    /// Menu item id
    pub item_id: i64,
}

/// Finds the most recently repeated set of items.
///
/// Each order's items are sorted into a signature, so item order within an
/// order does not matter while repeated items do. Among signatures seen in more
/// than one order, the one ordered most recently wins; equal times go to the
/// lexicographically smallest signature.
#[must_use]
pub fn repeated_item_set(history: &[OrderedItem]) -> Option<Vec<i64>> {
    let mut orders: HashMap<&str, (DateTime<Utc>, Vec<i64>)> = HashMap::new();
    for row in history {
        let (time, items) = orders
            .entry(row.order_id.as_str())
            .or_insert_with(|| (row.order_time, Vec::new()));
        *time = (*time).max(row.order_time);
        items.push(row.item_id);
    }

    let mut signatures: BTreeMap<Vec<i64>, (usize, DateTime<Utc>)> = BTreeMap::new();
    for (time, mut items) in orders.into_values() {
        items.sort_unstable();
        let (count, latest) = signatures.entry(items).or_insert((0, time));
        *count += 1;
        *latest = (*latest).max(time);
    }

    signatures
        .into_iter()
        .filter(|(_, (count, _))| *count > 1)
        .fold(None, |best: Option<(Vec<i64>, DateTime<Utc>)>, (signature, (_, latest))| {
            match best {
                Some((_, best_latest)) if best_latest >= latest => best,
                _ => Some((signature, latest)),
            }
        })
        .map(|(signature, _)| signature)
}

/// Ordered items of a diner's placed orders at a cafe.
pub async fn order_history(
    db: &DatabaseConnection,
    user_id: i64,
    cafe_id: i64,
) -> Result<Vec<OrderedItem>> {
    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::CafeId.eq(cafe_id))
        .filter(order::Column::Status.eq(OrderStatus::Placed))
        .all(db)
        .await?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let cart_ids: Vec<String> = orders.iter().map(|o| o.cart_id.clone()).collect();
    let lines = CartItem::find()
        .filter(cart_item::Column::CartId.is_in(cart_ids))
        .filter(cart_item::Column::Status.eq(CartItemStatus::Ordered))
        .all(db)
        .await?;

    let mut by_cart: HashMap<&str, Vec<i64>> = HashMap::new();
    for line in &lines {
        by_cart.entry(line.cart_id.as_str()).or_default().push(line.item_id);
    }

    Ok(orders
        .iter()
        .flat_map(|o| {
            by_cart
                .get(o.cart_id.as_str())
                .into_iter()
                .flatten()
                .map(move |&item_id| OrderedItem {
                    order_id: o.order_id.clone(),
                    order_time: o.order_time,
                    item_id,
                })
        })
        .collect())
}

/// Resolves item ids to summaries, keeping the given order and skipping unknown ids.
async fn summaries(db: &DatabaseConnection, ids: &[i64]) -> Result<Vec<MenuItemSummary>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let items: HashMap<i64, menu_item::Model> = MenuItem::find()
        .filter(menu_item::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    Ok(ids
        .iter()
        .filter_map(|id| items.get(id).cloned().map(MenuItemSummary::from))
        .collect())
}

/// The diner's most recently repeated set of items, empty if nothing repeats.
#[instrument(skip(db))]
pub async fn repeat_order_signature(
    db: &DatabaseConnection,
    user_id: i64,
    cafe_id: i64,
) -> Result<Vec<MenuItemSummary>> {
    let history = order_history(db, user_id, cafe_id).await?;
    match repeated_item_set(&history) {
        Some(signature) => summaries(db, &signature).await,
        None => {
            debug!("No repeated orders for user {}", user_id);
            Ok(Vec::new())
        }
    }
}

/// Items of the diner's most recent placed order.
pub async fn recent_order(
    db: &DatabaseConnection,
    user_id: i64,
    cafe_id: i64,
) -> Result<Vec<MenuItemSummary>> {
    let Some(latest) = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::CafeId.eq(cafe_id))
        .filter(order::Column::Status.eq(OrderStatus::Placed))
        .order_by_desc(order::Column::OrderTime)
        .one(db)
        .await?
    else {
        return Ok(Vec::new());
    };

    let ids: Vec<i64> = CartItem::find()
        .filter(cart_item::Column::CartId.eq(latest.cart_id))
        .filter(cart_item::Column::Status.eq(CartItemStatus::Ordered))
        .order_by_asc(cart_item::Column::AddedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|line| line.item_id)
        .collect();
    summaries(db, &ids).await
}

/// The three most recently favourited distinct items.
pub async fn favourites(
    db: &DatabaseConnection,
    user_id: i64,
    cafe_id: i64,
) -> Result<Vec<MenuItemSummary>> {
    let favorites = ItemFavorite::find()
        .filter(item_favorite::Column::UserId.eq(user_id))
        .filter(item_favorite::Column::CafeId.eq(cafe_id))
        .order_by_desc(item_favorite::Column::CreatedAt)
        .all(db)
        .await?;

    let mut ids = Vec::with_capacity(FAVOURITES_SHOWN);
    for favorite in favorites {
        if !ids.contains(&favorite.item_id) {
            ids.push(favorite.item_id);
        }
        if ids.len() == FAVOURITES_SHOWN {
            break;
        }
    }
    summaries(db, &ids).await
}

/// Suggestions shown on a diner's home screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalisedFeed {
    /// Most recently repeated item set
    pub repeat_order: Vec<MenuItemSummary>,
    /// Items of the last order
    pub recent_order: Vec<MenuItemSummary>,
    /// Recently favourited items
    pub favourites: Vec<MenuItemSummary>,
}

/// Builds the whole feed, fetching its parts concurrently.
#[instrument(skip(db))]
pub async fn personalised_feed(
    db: &DatabaseConnection,
    user_id: i64,
    cafe_id: i64,
) -> Result<PersonalisedFeed> {
    let (repeat_order, recent_order, favourites) = tokio::try_join!(
        repeat_order_signature(db, user_id, cafe_id),
        recent_order(db, user_id, cafe_id),
        favourites(db, user_id, cafe_id),
    )?;
    Ok(PersonalisedFeed {
        repeat_order,
        recent_order,
        favourites,
    })
}
