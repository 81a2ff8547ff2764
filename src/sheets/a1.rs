//! A1 notation helpers. Columns are 0-based internally and rendered as
//! bijective base-26 letters (A=0 .. Z=25, AA=26); rows render 1-based.

/// Google Sheets caps a spreadsheet at ten million cells and column `ZZZ`.
pub const MAX_ROWS: usize = 10_000_000;
pub const MAX_COLUMNS: usize = 18_278;

pub fn index_to_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut index = index as u64 + 1;
    while index > 0 {
        let rem = ((index - 1) % 26) as u8;
        letters.push(b'A' + rem);
        index = (index - 1) / 26;
    }
    letters.iter().rev().map(|b| *b as char).collect()
}

pub fn letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut index: usize = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index - 1)
}

/// Render a 0-based (row, col) pair as an A1 reference.
pub fn cell_ref(row: usize, col: usize) -> String {
    format!("{}{}", index_to_letter(col), row + 1)
}

/// Parse an A1 reference like `B2` (case-insensitive) into 0-based (row, col).
/// References past the sheet limits are rejected.
pub fn parse_cell_ref(reference: &str) -> Option<(usize, usize)> {
    match parse_corner(reference)? {
        (Some(row), Some(col)) => Some((row, col)),
        _ => None,
    }
}

/// One end of a range: `B2`, a whole column `B` or a whole row `2`.
fn parse_corner(reference: &str) -> Option<(Option<usize>, Option<usize>)> {
    let reference = reference.trim();
    let split = reference
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(reference.len());
    let (letters, digits) = reference.split_at(split);

    let col = match letters {
        "" => None,
        letters => Some(letter_to_index(letters).filter(|&col| col < MAX_COLUMNS)?),
    };
    let row = match digits {
        "" => None,
        digits => {
            let row: usize = digits.parse().ok()?;
            Some(row.checked_sub(1).filter(|&row| row < MAX_ROWS)?)
        }
    };

    match (row, col) {
        (None, None) => None,
        corner => Some(corner),
    }
}

/// The block of the sheet covered by a configured range such as `C3:D10`.
///
/// Grids fetched for a range are indexed from its top-left corner; this maps
/// between those grid indices and sheet coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    top: usize,
    left: usize,
    bottom: usize,
    right: usize,
}

impl RangeWindow {
    pub fn parse(range: &str) -> Option<Self> {
        let (start, end) = match range.split_once(':') {
            Some((start, end)) => (start, Some(end)),
            None => (range, None),
        };

        let (top, left) = parse_corner(start)?;
        let (top, left) = (top.unwrap_or(0), left.unwrap_or(0));
        let (bottom, right) = match end {
            Some(end) => {
                let (bottom, right) = parse_corner(end)?;
                (bottom.unwrap_or(MAX_ROWS - 1), right.unwrap_or(MAX_COLUMNS - 1))
            }
            None => (top, left),
        };

        if bottom < top || right < left {
            return None;
        }

        Some(Self {
            top,
            left,
            bottom,
            right,
        })
    }

    /// Grid indices for a sheet cell, or `None` when it lies outside the range
    pub fn to_grid(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        if (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col) {
            Some((row - self.top, col - self.left))
        } else {
            None
        }
    }

    /// A1 reference of a grid cell
    pub fn cell_ref(&self, row: usize, col: usize) -> String {
        cell_ref(self.top + row, self.left + col)
    }
}

/// Sheet name as it must appear before `!` in a range.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && parse_cell_ref(name).is_none();

    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_to_letter() {
        assert_eq!(index_to_letter(0), "A");
        assert_eq!(index_to_letter(25), "Z");
        assert_eq!(index_to_letter(26), "AA");
        assert_eq!(index_to_letter(27), "AB");
        assert_eq!(index_to_letter(51), "AZ");
        assert_eq!(index_to_letter(52), "BA");
        assert_eq!(index_to_letter(701), "ZZ");
        assert_eq!(index_to_letter(702), "AAA");
    }

    #[test]
    fn test_letter_to_index() {
        assert_eq!(letter_to_index("A"), Some(0));
        assert_eq!(letter_to_index("z"), Some(25));
        assert_eq!(letter_to_index("AA"), Some(26));
        assert_eq!(letter_to_index("AAA"), Some(702));
        assert_eq!(letter_to_index(""), None);
        assert_eq!(letter_to_index("A1"), None);
    }

    #[test]
    fn test_round_trip() {
        for i in 0..=1000 {
            assert_eq!(letter_to_index(&index_to_letter(i)), Some(i), "index {}", i);
        }
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(1, 1), "B2");
        assert_eq!(cell_ref(99, 26), "AA100");

        assert_eq!(parse_cell_ref("B2"), Some((1, 1)));
        assert_eq!(parse_cell_ref(" aa100 "), Some((99, 26)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("B"), None);
        assert_eq!(parse_cell_ref("12"), None);
        assert_eq!(parse_cell_ref("B2C"), None);
    }

    #[test]
    fn test_cell_refs_past_sheet_limits() {
        assert_eq!(parse_cell_ref("A10000000"), Some((9_999_999, 0)));
        assert_eq!(parse_cell_ref("ZZZ1"), Some((0, MAX_COLUMNS - 1)));
        assert_eq!(parse_cell_ref("A10000001"), None);
        assert_eq!(parse_cell_ref("AAAA1"), None);
        assert_eq!(parse_cell_ref("A99999999999"), None);
        assert_eq!(parse_cell_ref("A18446744073709551615"), None);
        assert_eq!(parse_cell_ref("A18446744073709551616"), None);
    }

    #[test]
    fn test_range_window_offset() {
        let window = RangeWindow::parse("C3:D10").unwrap();

        assert_eq!(window.to_grid(2, 2), Some((0, 0)));
        assert_eq!(window.to_grid(9, 3), Some((7, 1)));
        assert_eq!(window.to_grid(1, 2), None);
        assert_eq!(window.to_grid(2, 1), None);
        assert_eq!(window.to_grid(10, 3), None);
        assert_eq!(window.to_grid(2, 4), None);

        assert_eq!(window.cell_ref(0, 0), "C3");
        assert_eq!(window.cell_ref(7, 1), "D10");
    }

    #[test]
    fn test_range_window_shapes() {
        let window = RangeWindow::parse("A1:Z100").unwrap();
        assert_eq!(window.to_grid(0, 0), Some((0, 0)));
        assert_eq!(window.to_grid(99, 25), Some((99, 25)));
        assert_eq!(window.to_grid(100, 0), None);

        let columns = RangeWindow::parse("B:C").unwrap();
        assert_eq!(columns.to_grid(5000, 1), Some((5000, 0)));
        assert_eq!(columns.to_grid(0, 3), None);

        let single = RangeWindow::parse("E5").unwrap();
        assert_eq!(single.to_grid(4, 4), Some((0, 0)));
        assert_eq!(single.to_grid(4, 5), None);

        assert_eq!(RangeWindow::parse("D10:C3"), None);
        assert_eq!(RangeWindow::parse("not a range"), None);
        assert_eq!(RangeWindow::parse(""), None);
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("tasks_2024"), "tasks_2024");
        assert_eq!(quote_sheet_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet_name("Q&A!"), "'Q&A!'");
        assert_eq!(quote_sheet_name("Bob's tasks"), "'Bob''s tasks'");
        assert_eq!(quote_sheet_name("2024"), "'2024'");
        assert_eq!(quote_sheet_name("B2"), "'B2'");
    }
}
