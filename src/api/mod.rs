//! REST API client module for the library analytics platform.
//!
//! This module provides the `ApiClient` for authentication, data-file
//! uploads, report generation and metric queries.
//!
//! Protected endpoints use JWT bearer authentication; an expired access
//! token is refreshed transparently (once per request) via the refresh
//! endpoint.

pub mod client;
pub mod error;

pub use client::{ApiClient, ExportFormat};
pub use error::ApiError;
