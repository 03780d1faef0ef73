//! TechMart client - typed API access and storefront state.
//!
//! - [`ApiClient`] talks to the REST API, keeping the session cookie
//!   between calls.
//! - [`CartStore`] holds the shopper's cart locally, persists it on every
//!   change and mirrors changes to the server once signed in.
//! - [`ThemeStore`] remembers the light/dark preference.
//!
//! Persistence goes through the [`Storage`] trait so the same stores work
//! against memory, files or any other key-value backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

mod api;
mod cart;
mod error;
mod storage;
mod theme;

pub use api::{ApiClient, ImageFile, ProductUpload};
pub use cart::{CART_KEY, CartStore, MergeReport};
pub use error::ClientError;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use theme::{THEME_KEY, Theme, ThemePreference, ThemeStore, UnknownTheme};
