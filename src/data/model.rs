use std::fmt;
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV reader infers.
/// Grouping keys go through `BTreeMap`, so `CellValue` must be `Ord`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can use CellValue as a grouping key --

// Floats compare by `total_cmp`, so 0.0 != -0.0 and NaN == NaN.
impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, ""),
        }
    }
}

impl CellValue {
    /// Numeric view of the cell, `None` for text, bools and nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Equality against `true` the way a dataframe mask compares:
    /// a real `true`, or a numeric 1.
    pub fn is_true(&self) -> bool {
        match self {
            CellValue::Bool(b) => *b,
            CellValue::Integer(i) => *i == 1,
            CellValue::Float(v) => *v == 1.0,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Table – the loaded dataset and every view derived from it
// ---------------------------------------------------------------------------

/// Column name of the single field a diagnostic table carries.
pub const DIAGNOSTIC_COLUMN: &str = "Error";

/// An ordered, column-named table of loosely typed cells.
///
/// Rows always have exactly `columns.len()` cells. Tables are never mutated
/// after construction; views build a new one.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

/// The table as loaded from the origin.
pub type Dataset = Table;

/// A derived subset or aggregation of a [`Dataset`].
pub type View = Table;

impl Table {
    /// Build a table, padding short rows with nulls and truncating long ones.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// The "load failed, nothing found" table.
    pub fn empty() -> Self {
        Table::default()
    }

    /// A one-cell table carrying an error message for display.
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Table {
            columns: vec![DIAGNOSTIC_COLUMN.to_string()],
            rows: vec![vec![CellValue::String(message.into())]],
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether this is a diagnostic table produced by a failed load.
    pub fn is_diagnostic(&self) -> bool {
        self.columns.len() == 1 && self.columns[0] == DIAGNOSTIC_COLUMN && self.rows.len() == 1
    }

    /// Diagnostic message, if this table is one.
    pub fn diagnostic_message(&self) -> Option<String> {
        if self.is_diagnostic() {
            Some(self.rows[0][0].to_string())
        } else {
            None
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`), `None` if either is out of range.
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Numeric cells of the named column, one entry per row.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].as_f64()).collect())
    }

    /// Observed numeric (min, max) of a column, ignoring non-numeric cells.
    pub fn numeric_extent(&self, name: &str) -> Option<(f64, f64)> {
        let values = self.numeric_column(name)?;
        values
            .into_iter()
            .flatten()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// New table with only the rows for which `keep` returns true.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[CellValue]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// New table with the named columns in the given order.
    /// `None` if any of them is absent.
    pub fn select(&self, names: &[&str]) -> Option<Table> {
        let indices: Vec<usize> = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Option<_>>()?;
        Some(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| indices.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["abbrev".into(), "total".into()],
            vec![
                vec![CellValue::String("AL".into()), CellValue::Float(18.8)],
                vec![CellValue::String("AK".into()), CellValue::Integer(18)],
                vec![CellValue::String("AZ".into())],
            ],
        )
    }

    #[test]
    fn short_rows_are_padded_with_null() {
        let t = sample();
        assert_eq!(t.cell(2, "total"), Some(&CellValue::Null));
    }

    #[test]
    fn float_equality_agrees_with_ord_and_hash() {
        use crate::reactive::fingerprint;

        let zero = CellValue::Float(0.0);
        let neg_zero = CellValue::Float(-0.0);
        assert_ne!(zero, neg_zero);
        assert_ne!(fingerprint(&zero), fingerprint(&neg_zero));
        assert_eq!(CellValue::Float(f64::NAN), CellValue::Float(f64::NAN));
        assert_eq!(
            fingerprint(&CellValue::Float(f64::NAN)),
            fingerprint(&CellValue::Float(f64::NAN))
        );
        assert_ne!(CellValue::Integer(1), CellValue::Float(1.0));
    }

    #[test]
    fn extent_ignores_nulls() {
        assert_eq!(sample().numeric_extent("total"), Some((18.0, 18.8)));
        assert_eq!(sample().numeric_extent("abbrev"), None);
        assert_eq!(sample().numeric_extent("missing"), None);
    }

    #[test]
    fn select_requires_every_column() {
        let t = sample();
        let s = t.select(&["total", "abbrev"]).unwrap();
        assert_eq!(s.columns(), &["total".to_string(), "abbrev".to_string()]);
        assert_eq!(s.rows()[0][1], CellValue::String("AL".into()));
        assert!(t.select(&["total", "speeding"]).is_none());
    }

    #[test]
    fn diagnostic_round_trips_message() {
        let t = Table::diagnostic("boom");
        assert!(t.is_diagnostic());
        assert_eq!(t.diagnostic_message().as_deref(), Some("boom"));
        assert!(!sample().is_diagnostic());
    }

    #[test]
    fn truthiness_matches_mask_semantics() {
        assert!(CellValue::Bool(true).is_true());
        assert!(CellValue::Integer(1).is_true());
        assert!(CellValue::Float(1.0).is_true());
        assert!(!CellValue::Float(0.5).is_true());
        assert!(!CellValue::String("true".into()).is_true());
        assert!(!CellValue::Null.is_true());
    }
}
