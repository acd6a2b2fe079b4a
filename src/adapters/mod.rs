//! Adapters implementing domain ports.

pub mod cache;
pub mod sqlite;
