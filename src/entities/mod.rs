//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod advertisement;
pub mod cafe;
pub mod cart;
pub mod cart_item;
pub mod category_popularity;
pub mod device_token;
pub mod dining_table;
pub mod discount;
pub mod item_customization;
pub mod item_favorite;
pub mod menu_item;
pub mod order;
pub mod reward_transaction;
pub mod sea_orm_active_enums;
pub mod session;
pub mod upgrade_suggestion;
pub mod upsell_offer;
pub mod user;
pub mod user_session;

// Re-export entities under their table-level names
pub use advertisement::Entity as Advertisement;
pub use cafe::Entity as Cafe;
pub use cart::Entity as Cart;
pub use cart_item::Entity as CartItem;
pub use category_popularity::Entity as CategoryPopularity;
pub use device_token::Entity as DeviceToken;
pub use dining_table::Entity as DiningTable;
pub use discount::Entity as Discount;
pub use item_customization::Entity as ItemCustomization;
pub use item_favorite::Entity as ItemFavorite;
pub use menu_item::Entity as MenuItem;
pub use order::Entity as Order;
pub use reward_transaction::Entity as RewardTransaction;
pub use session::Entity as Session;
pub use upgrade_suggestion::Entity as UpgradeSuggestion;
pub use upsell_offer::Entity as UpsellOffer;
pub use user::Entity as User;
pub use user_session::Entity as UserSession;
