//! Storefront - Self-hosted Storefront Service
//!
//! Server-side half of a storefront: catalog browsing, per-user carts,
//! checkout and order history over Postgres, with authentication delegated
//! to an external identity provider and payment capture delegated to a
//! client-side payment widget.
//!
//! ## Features
//! - Product catalog with filter, sort and pagination
//! - Shopping cart with stock ceilings enforced at mutation time
//! - Transactional checkout producing snapshot line items
//! - Payment confirmation against the stored order amount
//! - Order lifecycle events over NATS

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod orders;
pub mod payment;
pub mod routes;
pub mod state;

pub use error::{Error, Result};
