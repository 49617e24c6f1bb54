//! Credential verification implementations.

pub mod jwt;

pub use jwt::JwtTokenVerifier;
