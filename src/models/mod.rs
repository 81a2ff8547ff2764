pub mod cell;
pub mod grid;

pub use cell::SheetCell;
pub use grid::{SyncResult, ValidationRule};
