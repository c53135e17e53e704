//! Core business logic - Framework-agnostic operations of the dine-in workflow.
//!
//! Modules are listed leaf-first: sessions, then carts and upsells built on
//! them, then order placement, and finally the read models derived from orders.
//! Every operation takes the store connection (and `Settings` where needed)
//! as explicit arguments.

pub mod session;

pub mod cart;
pub mod upsell;

pub mod order;

pub mod loyalty;
pub mod personalisation;

pub mod notify;
