/// Durable key-value backends and the adapter trait they implement.
pub mod kv_store;
/// Leaderboard persistence.
pub mod leaderboard;
/// Persisted model definitions and key layout.
pub mod models;
/// Per-player snapshot persistence.
pub mod progress;
/// Storage abstraction layer for database operations.
pub mod storage;
