//! Utilities shared by the collaboration gateway library and its binaries.

pub mod logger;
pub mod time;
