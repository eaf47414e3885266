//! Domain layer for the shop provisioner.
//!
//! This crate contains:
//! - Domain models (shop requests, tenants, step outcomes, translation catalogs)
//! - Locale tables and translation catalog codecs
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::CatalogError;
