//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, password login and profile updates
//! - `catalog` - Cached product reads and admin product writes
//! - `cart` - Server-side carts of signed-in accounts
//! - `orders` - Checkout, order reads and status transitions
//! - `images` - Product image hosting (Cloudinary)

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod images;
pub mod orders;
