use crate::error::{AppError, Result};
use crate::sheets::a1;
use serde::{Deserialize, Serialize};

/// A single cell value addressed by 0-based row and column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SheetCell {
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl SheetCell {
    pub fn new(row: usize, col: usize, value: impl Into<String>) -> Self {
        Self {
            row,
            col,
            value: value.into(),
        }
    }

    /// Parse an A1 reference such as `B2` into a cell holding `value`.
    pub fn parse(reference: &str, value: impl Into<String>) -> Result<Self> {
        let (row, col) = a1::parse_cell_ref(reference).ok_or_else(|| {
            AppError::Config(format!("Invalid cell reference '{}'", reference))
        })?;
        Ok(Self::new(row, col, value))
    }

    /// A1 range key, e.g. `C4` for row 3, column 2.
    pub fn range(&self) -> String {
        a1::cell_ref(self.row, self.col)
    }

    pub fn validation_key(&self) -> String {
        ValidationKey(self.row, self.col).to_string()
    }
}

/// `row:col` key used by the sparse validation map.
pub(crate) struct ValidationKey(pub usize, pub usize);

impl std::fmt::Display for ValidationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_key() {
        let cell = SheetCell::new(3, 2, "x");
        assert_eq!(cell.range(), "C4");
        assert_eq!(cell.validation_key(), "3:2");
    }

    #[test]
    fn test_parse() {
        let cell = SheetCell::parse("AB10", "Done").unwrap();
        assert_eq!(cell, SheetCell::new(9, 27, "Done"));

        assert!(SheetCell::parse("10", "x").is_err());
        assert!(SheetCell::parse("A0", "x").is_err());
    }
}
