//! Real-time collaboration gateway.
//!
//! Tracks who is present in each shared document, relays cursor moves, edits
//! and chat between the collaborators of a document, and keeps a bounded chat
//! history per document.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
