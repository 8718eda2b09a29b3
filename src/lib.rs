//! US Atlas - EPA pollution and data-center dashboard data service
//!
//! Loads annual county air-quality measurements from the EPA AQS API,
//! caches them, and serves tables, statistics and charts over HTTP.

pub mod cache;
pub mod charts;
pub mod config;
pub mod data;
pub mod epa;
pub mod geo;
pub mod server;
pub mod stats;
