//! Data models for the analytics platform.
//!
//! This module contains the structures exchanged with the REST API:
//!
//! - `Analyst`, `CurrentUser`: account models
//! - `DataFile`: uploaded library-usage data files
//! - `Report`, `ReportDetail`, `ReportData`: saved analysis reports
//! - `MetricsBundle`: the five per-file metric sections fetched together

pub mod analyst;
pub mod file;
pub mod report;

pub use analyst::{Analyst, CurrentUser};
pub use file::DataFile;
pub use report::{MetricsBundle, Report, ReportData, ReportDetail};
