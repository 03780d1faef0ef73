//! Server-side domain models.
//!
//! Types here never leave the server as-is: accounts carry password hashes
//! and drafts are inputs to repositories. Public shapes live in
//! `techmart_core::api`.

pub mod account;
pub mod product;
pub mod session;

pub use account::{Account, NewAccount, ProfileUpdate};
pub use product::ProductDraft;
pub use session::{CurrentAccount, keys as session_keys};
