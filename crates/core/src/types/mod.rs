//! Core types for TechMart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{MAX_PRICE, Price, PriceError, round_money};
pub use status::*;
