use crate::models::cell::ValidationKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dropdown options for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    pub row: usize,
    pub col: usize,
    pub options: Vec<String>,
}

impl ValidationRule {
    pub fn key(&self) -> String {
        ValidationKey(self.row, self.col).to_string()
    }
}

/// Rows of formatted cell values plus the dropdown options keyed by `row:col`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResult {
    pub rows: Vec<Vec<String>>,
    pub validation: BTreeMap<String, Vec<String>>,
}

impl SyncResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.validation.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    pub fn options(&self, row: usize, col: usize) -> Option<&[String]> {
        self.validation
            .get(&ValidationKey(row, col).to_string())
            .map(Vec::as_slice)
    }

    pub fn add_rule(&mut self, rule: ValidationRule) {
        self.validation.insert(rule.key(), rule.options);
    }

    /// Length of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}
