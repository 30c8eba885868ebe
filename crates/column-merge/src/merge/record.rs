use std::{cmp::Ordering, fmt};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Cell {
    Present(String),
    Absent,
}

impl Cell {
    pub fn present(value: impl Into<String>) -> Self {
        Self::Present(value.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Absent cells print as the empty string.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(value) => f.write_str(value),
            Self::Absent => Ok(()),
        }
    }
}

/// Absent sorts before present; present values compare as plain strings.
impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Absent, Self::Absent) => Ordering::Equal,
            (Self::Absent, Self::Present(_)) => Ordering::Less,
            (Self::Present(_), Self::Absent) => Ordering::Greater,
            (Self::Present(a), Self::Present(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cells as decoded from a source, in that source's raw column order.
pub type RawRecord = Vec<Cell>;

/// Cells aligned to the unified schema, one per column.
pub type Record = Vec<Cell>;

/// Compares the first `width` cells of two records.
pub(crate) fn compare_key_prefix(a: &[Cell], b: &[Cell], width: usize) -> Ordering {
    let a = &a[..width.min(a.len())];
    let b = &b[..width.min(b.len())];
    a.cmp(b)
}

/// Stable sort, so records with equal keys keep their arrival order.
pub(crate) fn sort_by_key_prefix(records: &mut [Record], width: usize) {
    records.sort_by(|a, b| compare_key_prefix(a, b, width));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[Option<&str>]) -> Record {
        values
            .iter()
            .map(|value| value.map_or(Cell::Absent, Cell::present))
            .collect()
    }

    #[test]
    fn absent_sorts_before_present() {
        assert!(Cell::Absent < Cell::present(""));
        assert_eq!(Cell::Absent.to_string(), "");
        assert_eq!(Cell::from(None), Cell::Absent);
    }

    #[test]
    fn present_values_compare_as_plain_strings() {
        assert!(Cell::present("10") < Cell::present("9"));
        assert!(Cell::present("B") < Cell::present("a"));
        assert!(Cell::present("") < Cell::present("0"));
    }

    #[test]
    fn key_prefix_only_looks_at_leading_cells() {
        let a = cells(&[Some("1"), Some("2"), Some("9")]);
        let b = cells(&[Some("1"), Some("2"), Some("3")]);
        assert_eq!(compare_key_prefix(&a, &b, 2), Ordering::Equal);
        assert_eq!(compare_key_prefix(&a, &b, 3), Ordering::Greater);
        assert_eq!(compare_key_prefix(&a, &b, 10), Ordering::Greater);
    }

    #[test]
    fn sort_by_key_prefix_is_stable() {
        let mut records = vec![
            cells(&[Some("2"), Some("x")]),
            cells(&[Some("1"), Some("b")]),
            cells(&[Some("1"), Some("a")]),
        ];
        sort_by_key_prefix(&mut records, 1);
        assert_eq!(records[0], cells(&[Some("1"), Some("b")]));
        assert_eq!(records[1], cells(&[Some("1"), Some("a")]));
        assert_eq!(records[2], cells(&[Some("2"), Some("x")]));
    }
}
