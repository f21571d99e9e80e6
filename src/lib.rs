//! TICKERWATCH — momentum alerts for a Finviz Elite screener.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod snapshot;
pub mod provider;
pub mod storage;
pub mod engine;
pub mod news;
pub mod alerts;
pub mod control;
