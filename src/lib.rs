//! Descriptive statistics for a NICU sample sheet.
//!
//! The sheet is loaded once into typed [`types::SampleRow`]s; every dashboard
//! section is then derived from that immutable table by the pure functions in
//! [`aggregate`] and [`filter`].
pub mod aggregate;
pub mod aliases;
pub mod category;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;
