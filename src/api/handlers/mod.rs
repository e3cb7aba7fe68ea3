//! HTTP endpoint handlers.

pub mod query;
pub mod system;
