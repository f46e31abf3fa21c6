//! shelfscope - a terminal client for the library-usage analytics platform.
//!
//! Analysts upload JSON usage data, trigger server-side analysis into
//! reports, and view or export the resulting metrics. The interesting part
//! lives in [`api::ApiClient`]: bearer-token attachment, 401 detection,
//! silent token refresh and single-flight request replay.

pub mod api;
pub mod auth;
pub mod commands;
pub mod config;
pub mod models;
