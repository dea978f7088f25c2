/// Evidence image release.
pub mod evidence;
/// Domain model definitions shared by every storage backend.
pub mod models;
/// Persistence of users and personal bests.
pub mod result_store;
/// Storage abstraction layer for database operations.
pub mod storage;
