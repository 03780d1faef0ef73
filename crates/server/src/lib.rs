//! TechMart server library.
//!
//! This crate provides the REST API as a library, allowing it to be tested
//! in-process and started by the integration tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ServerConfig;
pub use db::Repositories;
pub use routes::router;
pub use state::{AppState, image_host};
