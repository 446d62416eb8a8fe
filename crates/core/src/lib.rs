//! Core types and shared functionality for ogp-server.
//!
//! This crate provides:
//! - Write-back image cache persisted to a JSON file
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStore, CachedImage, ImageCache, NullCache};
pub use config::AppConfig;
pub use error::Error;
