use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse type tag attached to a column. Metadata only; date cleaning is the
/// one operation that writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    Float,
    Date,
    Bool,
    Json,
}

/// Ordered headers plus a rectangular grid of string cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Column names. Duplicates are allowed; lookups resolve to the first match.
    pub(crate) headers: Vec<String>,
    /// One `Vec<String>` per row, each as wide as `headers`.
    pub(crate) rows: Vec<Vec<String>>,
    pub(crate) column_types: HashMap<String, ColumnType>,
}

impl Table {
    /// Build a table, rejecting an empty header list or any row whose width
    /// differs from the header count.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if headers.is_empty() {
            return Err(CleanError::EmptyHeaders);
        }

        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != headers.len())
        {
            return Err(CleanError::ShapeMismatch {
                row,
                actual: cells.len(),
                expected: headers.len(),
            });
        }

        let column_types = headers
            .iter()
            .map(|h| (h.clone(), ColumnType::String))
            .collect();

        Ok(Self {
            headers,
            rows,
            column_types,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Direct row access. Callers must keep every row as wide as the headers.
    pub fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }

    /// `(row count, column count)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.headers.len())
    }

    /// Position of the first header equal to `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_types.get(name).copied()
    }

    pub fn column_types(&self) -> &HashMap<String, ColumnType> {
        &self.column_types
    }

    pub fn set_column_type(&mut self, name: &str, ty: ColumnType) -> Result<()> {
        self.require_column(name)?;
        self.column_types.insert(name.to_string(), ty);
        Ok(())
    }

    /// Header row followed by the first `n` data rows (fewer if the table is shorter).
    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        if n == 0 {
            return Vec::new();
        }
        std::iter::once(self.headers.clone())
            .chain(self.rows.iter().take(n).cloned())
            .collect()
    }

    /// Hand the headers and grid back to a serialization adapter.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<String>>) {
        (self.headers, self.rows)
    }

    /// Resolve `name` or fail with `ColumnNotFound`.
    pub(crate) fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CleanError::ColumnNotFound(name.to_string()))
    }
}
