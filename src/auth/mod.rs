//! Authentication module for session tokens and saved credentials.
//!
//! This module provides:
//! - `SessionTokens` / `TokenStore`: durable access/refresh token storage
//! - `CredentialStore`: optional remembered login password via the OS keychain
//!
//! Tokens are replaced wholesale on refresh and deleted entirely on logout or
//! irrecoverable refresh failure.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{FileTokenStore, SessionTokens, TokenStore};
