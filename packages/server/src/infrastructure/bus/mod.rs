//! Shared fan-out bus implementations.
//!
//! - `inmemory`: topic-keyed `tokio::sync::broadcast` channels, for single
//!   process deployments and tests

pub mod inmemory;

pub use inmemory::InMemoryPresenceBus;
