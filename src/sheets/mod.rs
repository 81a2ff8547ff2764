pub mod a1;
mod auth;
mod client;
pub mod grid;

pub use client::SheetsClient;

use crate::models::SyncResult;
use async_trait::async_trait;

/// Read and write access to one configured sheet range.
///
/// Failures are logged and reported through the return value so a caller's
/// grid stays renderable.
#[async_trait]
pub trait SheetOperations {
    /// Fetch the configured range with formatted values and dropdown rules.
    /// Returns an empty result on any failure.
    async fn fetch_grid_with_validation(&self) -> SyncResult;

    /// Write a single cell (`range` in A1 notation, without the sheet name)
    async fn update_cell(&self, range: &str, value: &str) -> bool;
}
