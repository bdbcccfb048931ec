//! API endpoint handlers.

pub mod analyze;
pub mod catalog;
pub mod health;
