use std::collections::HashMap;

use rusqlite::types::Value as SqlValue;

use super::fragment::Count;

/// One scalar cell of a source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Null, NaN and blank text all count as a missing value.
    pub fn is_present(&self) -> bool {
        match self {
            Cell::Null => false,
            Cell::Float(f) => !f.is_nan(),
            Cell::Text(s) => !s.trim().is_empty(),
            Cell::Bool(_) | Cell::Int(_) => true,
        }
    }

    pub fn text(&self) -> Option<String> {
        if !self.is_present() {
            return None;
        }
        let s = match self {
            Cell::Bool(true) => "True".to_string(),
            Cell::Bool(false) => "False".to_string(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Null => return None,
        };
        Some(s)
    }

    pub fn flag(&self) -> Option<bool> {
        if !self.is_present() {
            return None;
        }
        let val = match self {
            Cell::Bool(b) => *b,
            Cell::Int(i) => *i != 0,
            Cell::Float(f) => *f != 0.0,
            Cell::Text(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "false" | "0" | "0.0" | "no" | "n" | "нет"
            ),
            Cell::Null => return None,
        };
        Some(val)
    }

    /// Integer when the value coerces to a number, otherwise the raw string.
    pub fn count(&self) -> Option<Count> {
        if !self.is_present() {
            return None;
        }
        let count = match self {
            Cell::Bool(b) => Count::Number(i64::from(*b)),
            Cell::Int(i) => Count::Number(*i),
            Cell::Float(f) => Count::Number(f.trunc() as i64),
            Cell::Text(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<f64>() {
                    Ok(f) if f.is_finite() => Count::Number(f.trunc() as i64),
                    _ => Count::Text(trimmed.to_string()),
                }
            }
            Cell::Null => return None,
        };
        Some(count)
    }
}

impl From<SqlValue> for Cell {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Cell::Null,
            SqlValue::Integer(i) => Cell::Int(i),
            SqlValue::Real(f) => Cell::Float(f),
            SqlValue::Text(s) => Cell::Text(s),
            SqlValue::Blob(b) => Cell::Text(String::from_utf8_lossy(&b).into_owned()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

/// A single source-table record: column name to cell, any subset of columns.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, Cell>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, cell: impl Into<Cell>) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn insert(&mut self, column: &str, cell: impl Into<Cell>) {
        self.cells.insert(column.to_string(), cell.into());
    }

    /// The cell for `column` if the column exists and holds a value.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells.get(column).filter(|c| c.is_present())
    }

    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Cell::text)
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Cell::flag)
    }

    pub fn count(&self, column: &str) -> Option<Count> {
        self.get(column).and_then(Cell::count)
    }

    /// First present value among `columns`, in list order.
    pub fn first_text(&self, columns: &[&str]) -> Option<String> {
        columns.iter().find_map(|c| self.text(c))
    }

    pub fn first_count(&self, columns: &[&str]) -> Option<Count> {
        columns.iter().find_map(|c| self.count(c))
    }
}

impl FromIterator<(String, Cell)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (String, Cell)>>(iter: I) -> Self {
        RawRow {
            cells: iter.into_iter().collect(),
        }
    }
}
