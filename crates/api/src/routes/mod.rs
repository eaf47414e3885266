//! HTTP route handlers.

pub mod health;
pub mod shops;
pub mod translations;
