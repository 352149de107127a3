//! Core of margin: line-anchored comment threads.
//!
//! [`store`] holds the threads, [`navigator`] orders them, [`codec`] flattens
//! them for [`db`], and [`workspace`] ties the store to its database so every
//! mutation is persisted. [`tools`] is the text facade the MCP server exposes.

pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod navigator;
pub mod root;
pub mod schema;
pub mod store;
pub mod tools;
pub mod types;
pub mod workspace;

pub use error::{Error, Result, StoreError};
