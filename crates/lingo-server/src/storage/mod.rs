//! Storage layer
//!
//! SQLite (embedded) for persistence, DashMap (in-memory) for caching.

pub mod db;
pub mod memory;

pub use db::Database;
pub use memory::MemoryCache;
