//! TechMart Core - Domain types and rules.
//!
//! This crate provides the types shared by every TechMart component:
//! - `server` - REST API server (storefront + admin back-office)
//! - `client` - Typed API client and client-side storefront state
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails and status enums
//! - [`product`] - Catalog product records
//! - [`cart`] - Cart aggregate and the merge-on-login plan
//! - [`order`] - Order aggregate, pricing and status transitions
//! - [`checkout`] - Validation of checkout submissions
//! - [`api`] - JSON request/response contract shared by server and client

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;
pub mod types;

pub use cart::{Cart, CartError, CartLine, MAX_QUANTITY, MergeStep, merge_plan};
pub use checkout::{AddressInput, CheckoutDraft, CheckoutError, CheckoutLine, CheckoutRequest};
pub use order::{
    LineItem, NewOrder, Order, OrderState, OrderTotals, ShippingAddress, StatusChange,
    TransitionError, price_order,
};
pub use product::{Product, ProductSpecs, ProductSummary};
pub use types::*;
