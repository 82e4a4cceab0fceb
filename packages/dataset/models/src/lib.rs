#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dynamically-columned table types for the accident map datasets.
//!
//! The regulation, accident, and definition files are loaded into a
//! [`Table`] whose columns come from the file's header row. Nothing in the
//! pipeline assumes a fixed schema: every column is looked up by name and a
//! missing column simply yields `None`.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Raw field values treated as null when a file is parsed.
pub const NULL_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null"];

/// Returns `true` if the trimmed raw value is one of the [`NULL_MARKERS`].
#[must_use]
pub fn is_null_marker(raw: &str) -> bool {
    NULL_MARKERS.contains(&raw.trim())
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value.
    Null,
    /// Whole number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
}

impl Cell {
    /// Returns `true` for [`Cell::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Interprets the cell as a floating point number.
    ///
    /// Text cells are parsed after trimming; anything unparseable is `None`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Returns the text content of a [`Cell::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical string form used to match join keys across tables.
    ///
    /// Integral floats collapse to their integer form so that a key column
    /// read as `1.0` in one file still matches `1` in another.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn join_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) if !f.is_finite() => None,
            Self::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Some((*f as i64).to_string())
            }
            Self::Float(f) => Some(f.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    /// Compares the cell against a user-supplied selector string, coercing
    /// the selector to the cell's own type first.
    ///
    /// Null cells never match.
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    pub fn matches_selector(&self, selector: &str) -> bool {
        let selector = selector.trim();
        match self {
            Self::Null => false,
            Self::Integer(i) => selector.parse::<i64>().map_or_else(
                |_| selector.parse::<f64>().is_ok_and(|f| f == *i as f64),
                |s| s == *i,
            ),
            Self::Float(f) => selector.parse::<f64>().is_ok_and(|s| s == *f),
            Self::Text(s) => s == selector,
        }
    }

    /// Case-insensitive substring match.
    ///
    /// `needle_lower` must already be lowercased. Null cells never match.
    #[must_use]
    pub fn contains_lowercase(&self, needle_lower: &str) -> bool {
        match self {
            Self::Null => false,
            Self::Text(s) => s.to_lowercase().contains(needle_lower),
            other => other.to_string().to_lowercase().contains(needle_lower),
        }
    }

    /// Total ordering used when listing distinct values: nulls first, then
    /// numbers by value, then text lexicographically.
    #[must_use]
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        const fn rank(cell: &Cell) -> u8 {
            match cell {
                Cell::Null => 0,
                Cell::Integer(_) | Cell::Float(_) => 1,
                Cell::Text(_) => 2,
            }
        }

        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let a = a.as_f64().unwrap_or(f64::NAN);
                let b = b.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Self::Float(_) => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// Storage type inferred for a column from all of its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every value parses as `i64`.
    Integer,
    /// Every value parses as `f64`.
    Float,
    /// Anything else.
    Text,
}

impl ColumnType {
    /// Infers the narrowest type that can hold every non-null raw value.
    ///
    /// A column with no non-null values is [`ColumnType::Text`].
    #[must_use]
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut seen_any = false;
        let mut all_int = true;
        let mut all_float = true;

        for raw in values {
            if is_null_marker(raw) {
                continue;
            }
            seen_any = true;
            let raw = raw.trim();
            if all_int && raw.parse::<i64>().is_err() {
                all_int = false;
            }
            if !all_int && raw.parse::<f64>().is_err() {
                all_float = false;
                break;
            }
        }

        match (seen_any, all_int, all_float) {
            (false, _, _) => Self::Text,
            (true, true, _) => Self::Integer,
            (true, false, true) => Self::Float,
            (true, false, false) => Self::Text,
        }
    }

    /// Parses a raw value as this type. Null markers become [`Cell::Null`].
    #[must_use]
    pub fn parse(self, raw: &str) -> Cell {
        if is_null_marker(raw) {
            return Cell::Null;
        }
        let raw = raw.trim();
        match self {
            Self::Integer => raw.parse().map_or(Cell::Null, Cell::Integer),
            Self::Float => raw.parse().map_or(Cell::Null, Cell::Float),
            Self::Text => Cell::Text(raw.to_owned()),
        }
    }
}

/// An in-memory table whose columns come from a source header row.
///
/// Every row holds exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a table from already-typed rows.
    ///
    /// Short rows are padded with [`Cell::Null`]; surplus cells are dropped.
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Builds a table from raw text fields, inferring a [`ColumnType`] per
    /// column. Duplicate header names get a `.1`, `.2`, ... suffix.
    #[must_use]
    pub fn from_text_rows(headers: Vec<String>, raw_rows: &[Vec<String>]) -> Self {
        let columns = dedupe_headers(headers);

        let types: Vec<ColumnType> = (0..columns.len())
            .map(|i| {
                ColumnType::infer(
                    raw_rows
                        .iter()
                        .map(|row| row.get(i).map_or("", String::as_str)),
                )
            })
            .collect();

        let rows = raw_rows
            .iter()
            .map(|raw| {
                types
                    .iter()
                    .enumerate()
                    .map(|(i, ty)| ty.parse(raw.get(i).map_or("", String::as_str)))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in source order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns `true` if the table has a column with this name.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Iterates over the rows as [`Record`] views.
    pub fn records(&self) -> impl ExactSizeIterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record {
            columns: &self.columns,
            cells,
        })
    }

    /// Returns a new table containing only the rows accepted by `keep`.
    #[must_use]
    pub fn filter_rows(&self, mut keep: impl FnMut(&Record<'_>) -> bool) -> Self {
        let rows = self
            .records()
            .filter(|record| keep(record))
            .map(|record| record.cells.to_vec())
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Distinct non-null values of a column, sorted with [`Cell::sort_cmp`].
    ///
    /// Returns an empty list if the column does not exist.
    #[must_use]
    pub fn distinct_values(&self, column: &str) -> Vec<Cell> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        let mut values: Vec<Cell> = self
            .rows
            .iter()
            .map(|row| &row[idx])
            .filter(|cell| !cell.is_null())
            .cloned()
            .collect();
        values.sort_by(Cell::sort_cmp);
        values.dedup();
        values
    }

    /// Counts rows per canonical join key of `column`.
    ///
    /// Rows whose key cell is null are not counted.
    #[must_use]
    pub fn count_by(&self, column: &str) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        let Some(idx) = self.column_index(column) else {
            return counts;
        };
        for key in self.rows.iter().filter_map(|row| row[idx].join_key()) {
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }

    /// Serializable copies of every row, in table order.
    #[must_use]
    pub fn to_ordered_records(&self) -> Vec<OrderedRecord> {
        self.records().map(|r| r.to_ordered()).collect()
    }
}

/// Appends `.N` suffixes to repeated header names so lookups stay unique.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for header in headers {
        let mut candidate = header.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{header}.{n}");
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// By-name access to a row's non-null values.
///
/// Implemented by both borrowed [`Record`]s and owned [`OrderedRecord`]s so
/// pipeline stages can check for a field without caring which they hold.
pub trait FieldLookup {
    /// Returns the value of `name`, or `None` if the field is absent or null.
    fn field(&self, name: &str) -> Option<&Cell>;
}

/// Borrowed view of one table row with by-name lookup.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl<'a> Record<'a> {
    /// Looks up a non-null value by column name.
    ///
    /// Returns `None` both for a missing column and for a null cell.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.cells.get(idx).filter(|c| !c.is_null())
    }

    /// Column names, aligned with [`Record::cells`].
    #[must_use]
    pub const fn columns(&self) -> &'a [String] {
        self.columns
    }

    /// Cell values, aligned with [`Record::columns`].
    #[must_use]
    pub const fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    /// Owned copy preserving column order.
    #[must_use]
    pub fn to_ordered(&self) -> OrderedRecord {
        OrderedRecord {
            fields: self
                .columns
                .iter()
                .cloned()
                .zip(self.cells.iter().cloned())
                .collect(),
        }
    }
}

impl FieldLookup for Record<'_> {
    fn field(&self, name: &str) -> Option<&Cell> {
        self.get(name)
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

/// An owned field-name-to-value mapping that serializes in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedRecord {
    fields: Vec<(String, Cell)>,
}

impl OrderedRecord {
    /// Sets a field, replacing the value in place if the name already exists
    /// and appending it otherwise.
    pub fn set(&mut self, name: impl Into<String>, value: Cell) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FieldLookup for OrderedRecord {
    fn field(&self, name: &str) -> Option<&Cell> {
        self.get(name).filter(|c| !c.is_null())
    }
}

impl Serialize for OrderedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, cell) in &self.fields {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| (*s).to_string()).collect())
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn infers_integer_float_and_text_columns() {
        let table = Table::from_text_rows(
            headers(&["id", "lat", "name"]),
            &raw(&[&["1", "36.06", "A"], &["2", "", "B"], &["", "36", "3"]]),
        );
        let rows: Vec<_> = table.records().collect();
        assert_eq!(rows[0].get("id"), Some(&Cell::Integer(1)));
        assert_eq!(rows[2].get("id"), None);
        assert_eq!(rows[0].get("lat"), Some(&Cell::Float(36.06)));
        assert_eq!(rows[2].get("lat"), Some(&Cell::Float(36.0)));
        assert_eq!(rows[2].get("name"), Some(&Cell::Text("3".to_string())));
    }

    #[test]
    fn treats_null_markers_as_null() {
        for marker in NULL_MARKERS {
            assert_eq!(ColumnType::Text.parse(marker), Cell::Null);
        }
        assert_eq!(ColumnType::Text.parse("  "), Cell::Null);
    }

    #[test]
    fn all_null_column_is_text() {
        assert_eq!(ColumnType::infer(["", "NA"]), ColumnType::Text);
    }

    #[test]
    fn missing_column_and_null_cell_both_yield_none() {
        let table = Table::from_text_rows(headers(&["a"]), &raw(&[&[""]]));
        let record = table.records().next().unwrap();
        assert!(record.get("a").is_none());
        assert!(record.get("missing").is_none());
    }

    #[test]
    fn pads_short_rows() {
        let table = Table::from_text_rows(headers(&["a", "b"]), &raw(&[&["x"]]));
        let record = table.records().next().unwrap();
        assert_eq!(record.cells().len(), 2);
        assert!(record.get("b").is_none());
    }

    #[test]
    fn dedupes_repeated_headers() {
        let table = Table::from_text_rows(headers(&["a", "a", "a"]), &[]);
        assert_eq!(table.columns(), ["a", "a.1", "a.2"]);
    }

    #[test]
    fn selector_is_coerced_to_column_type() {
        assert!(Cell::Integer(12).matches_selector("12"));
        assert!(Cell::Integer(12).matches_selector(" 12.0 "));
        assert!(!Cell::Integer(12).matches_selector("twelve"));
        assert!(Cell::Float(1.5).matches_selector("1.5"));
        assert!(Cell::Text("北部".to_string()).matches_selector("北部"));
        assert!(!Cell::Null.matches_selector(""));
    }

    #[test]
    fn join_key_collapses_integral_floats() {
        assert_eq!(Cell::Float(1.0).join_key().as_deref(), Some("1"));
        assert_eq!(Cell::Integer(1).join_key().as_deref(), Some("1"));
        assert_eq!(Cell::Float(1.5).join_key().as_deref(), Some("1.5"));
        assert_eq!(Cell::Null.join_key(), None);
        assert_eq!(Cell::Float(f64::NAN).join_key(), None);
    }

    #[test]
    fn substring_match_ignores_case() {
        let cell = Cell::Text("Main Street".to_string());
        assert!(cell.contains_lowercase("main"));
        assert!(cell.contains_lowercase("street"));
        assert!(!cell.contains_lowercase("elm"));
        assert!(!Cell::Null.contains_lowercase(""));
    }

    #[test]
    fn distinct_values_are_sorted_and_skip_nulls() {
        let table = Table::new(
            headers(&["area"]),
            vec![
                vec![Cell::Text("b".to_string())],
                vec![Cell::Null],
                vec![Cell::Text("a".to_string())],
                vec![Cell::Text("b".to_string())],
            ],
        );
        assert_eq!(
            table.distinct_values("area"),
            vec![Cell::Text("a".to_string()), Cell::Text("b".to_string())]
        );
        assert!(table.distinct_values("missing").is_empty());
    }

    #[test]
    fn numbers_sort_before_text() {
        let mut cells = vec![
            Cell::Text("x".to_string()),
            Cell::Integer(10),
            Cell::Float(2.5),
        ];
        cells.sort_by(Cell::sort_cmp);
        assert_eq!(
            cells,
            vec![Cell::Float(2.5), Cell::Integer(10), Cell::Text("x".to_string())]
        );
    }

    #[test]
    fn count_by_skips_null_keys() {
        let table = Table::new(
            headers(&["id"]),
            vec![
                vec![Cell::Integer(1)],
                vec![Cell::Integer(1)],
                vec![Cell::Null],
                vec![Cell::Integer(2)],
            ],
        );
        let counts = table.count_by("id");
        assert_eq!(counts.get("1"), Some(&2));
        assert_eq!(counts.get("2"), Some(&1));
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn filter_rows_leaves_input_untouched() {
        let table = Table::new(
            headers(&["id"]),
            vec![vec![Cell::Integer(1)], vec![Cell::Integer(2)]],
        );
        let filtered = table.filter_rows(|r| r.get("id") == Some(&Cell::Integer(2)));
        assert_eq!(filtered.len(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn record_serializes_in_column_order() {
        let table = Table::new(
            headers(&["z", "a", "m"]),
            vec![vec![
                Cell::Integer(1),
                Cell::Float(f64::NAN),
                Cell::Text("x".to_string()),
            ]],
        );
        let json = serde_json::to_string(&table.to_ordered_records()).unwrap();
        assert_eq!(json, r#"[{"z":1,"a":null,"m":"x"}]"#);
    }

    #[test]
    fn ordered_record_set_replaces_existing_field() {
        let mut record = OrderedRecord::default();
        record.set("a", Cell::Integer(1));
        record.set("b", Cell::Integer(2));
        record.set("a", Cell::Integer(3));
        assert_eq!(record.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(record.get("a"), Some(&Cell::Integer(3)));
    }
}
