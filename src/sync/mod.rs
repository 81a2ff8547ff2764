mod engine;
mod writeback;

pub use engine::SyncEngine;
pub use writeback::WriteOutcome;
