//! Chat history store implementations.

pub mod inmemory;

pub use inmemory::InMemoryChatHistoryStore;
