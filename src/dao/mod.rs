/// Durable entity definitions.
pub mod models;
/// Profile and team persistence (MongoDB + in-memory).
pub mod profile_store;
/// Hot session state over the clustered cache (Redis + in-memory).
pub mod session_store;
/// Storage abstraction shared by the durable backends.
pub mod storage;
