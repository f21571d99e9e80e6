//! Market-data snapshot sources.
//!
//! Defines the `SnapshotSource` trait and the Finviz Elite screener
//! export client.

pub mod finviz;

use async_trait::async_trait;

use crate::types::FetchResult;

/// Abstraction over a tabular market-data feed.
///
/// Implementors never return an error: transport and parse failures are
/// folded into `FetchResult::Failure`, and an empty export into
/// `FetchResult::Empty`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch one snapshot of raw rows.
    async fn fetch(&self) -> FetchResult;

    /// Source name for logging and identification.
    fn name(&self) -> &'static str;
}
