//! Persistence gateway: entities, the store abstraction, and backends.

/// Change-notification hub shared by store backends.
pub mod change;
/// Game state storage and retrieval operations.
pub mod game_store;
/// Reference in-memory store backend.
pub mod memory;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
