//! Shared utilities and common types for the shop provisioner.
//!
//! This crate provides common functionality used across all other crates:
//! - Slug normalization for tenant site names
//! - Shell quoting for commands executed inside containers
//! - Generated administrator credentials
//! - Common validation logic

pub mod credentials;
pub mod shell;
pub mod slug;
pub mod validation;
