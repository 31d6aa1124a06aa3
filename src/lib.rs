//! tunnelsync - cache-aware companion for the devtunnel CLI
//!
//! The library holds everything below the command line: the command bridge
//! and its retrying dispatcher, the entity cache, the detail-text parser and
//! the [`service::TunnelService`] that ties them together.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod service;

pub use error::{Error, Result};
