//! Tabular data sources.
//!
//! A source table is a grid of cells where every cell carries one value per
//! registered role name. The pipeline only reads tables; changes reach it
//! through the [`TableEvent`] stream returned by [`SourceTable::subscribe`].

use std::borrow::Cow;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;

use glam::Quat;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::{Error, Result};

/// Default number of buffered change events per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A value stored in a table cell under one role.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// A numeric value.
    Number(f64),
    /// A text value.
    Text(String),
    /// A boolean flag.
    Bool(bool),
    /// An orientation.
    Rotation(Quat),
    /// A missing value.
    #[default]
    Null,
}

impl CellValue {
    /// Convert to `f32`, defaulting to zero when no number can be derived.
    ///
    /// Text is trimmed and parsed; booleans map to 1 and 0.
    #[must_use]
    pub fn to_f32(&self) -> f32 {
        match self {
            CellValue::Number(n) => *n as f32,
            CellValue::Text(s) => s.trim().parse::<f32>().unwrap_or(0.0),
            CellValue::Bool(b) => f32::from(u8::from(*b)),
            CellValue::Rotation(_) | CellValue::Null => 0.0,
        }
    }

    /// Get as string slice, or None if not text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// String representation used for pattern substitution.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Bool(b) => Cow::Owned(b.to_string()),
            CellValue::Rotation(q) => Cow::Owned(format!("{},{},{},{}", q.w, q.x, q.y, q.z)),
            CellValue::Null => Cow::Borrowed(""),
        }
    }

    /// Check for a missing value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<f32> for CellValue {
    fn from(v: f32) -> Self {
        CellValue::Number(f64::from(v))
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Number(f64::from(v))
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<Quat> for CellValue {
    fn from(q: Quat) -> Self {
        CellValue::Rotation(q)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Structural and content changes published by a source table.
///
/// Ranges are half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    /// Rows were inserted at `rows.start`.
    RowsInserted {
        /// Indices of the new rows.
        rows: Range<usize>,
    },
    /// Rows were removed starting at `rows.start`.
    RowsRemoved {
        /// Indices the removed rows occupied.
        rows: Range<usize>,
    },
    /// Columns were inserted.
    ColumnsInserted {
        /// Indices of the new columns.
        columns: Range<usize>,
    },
    /// Columns were removed.
    ColumnsRemoved {
        /// Indices the removed columns occupied.
        columns: Range<usize>,
    },
    /// Cell contents changed inside a rectangle.
    DataChanged {
        /// Affected rows.
        rows: Range<usize>,
        /// Affected columns.
        columns: Range<usize>,
    },
    /// The whole table was replaced.
    ModelReset,
    /// Rows were reordered without changing the dimensions.
    LayoutChanged,
}

/// Read access to externally owned tabular data.
pub trait SourceTable {
    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Registry of role names; a role's index is its position in the slice.
    fn role_names(&self) -> &[String];

    /// Value of a cell under a role index. Out-of-range lookups yield `Null`.
    fn data(&self, row: usize, column: usize, role: usize) -> CellValue;

    /// Receive future change events.
    fn subscribe(&self) -> broadcast::Receiver<TableEvent>;

    /// Look up a role index by name.
    fn role_index(&self, name: &str) -> Option<usize> {
        self.role_names().iter().position(|r| r == name)
    }

    /// All role values of one cell, in registry order.
    fn cell_at(&self, row: usize, column: usize) -> Vec<CellValue> {
        (0..self.role_names().len())
            .map(|role| self.data(row, column, role))
            .collect()
    }
}

/// A source table shared between its owner and the pipeline.
pub type SharedTable = Rc<RefCell<dyn SourceTable>>;

/// One cell of an [`ItemTable`]: values indexed by role.
pub type Cell = Vec<CellValue>;

/// An in-memory source table that publishes its own changes.
#[derive(Debug)]
pub struct ItemTable {
    role_names: Vec<String>,
    /// Row-major cells: `rows[row][column][role]`.
    rows: Vec<Vec<Cell>>,
    columns: usize,
    events: broadcast::Sender<TableEvent>,
}

impl ItemTable {
    /// Create an empty table with the given role registry and column count.
    #[must_use]
    pub fn new<S: Into<String>>(role_names: impl IntoIterator<Item = S>, columns: usize) -> Self {
        Self::with_event_capacity(role_names, columns, DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty table with an explicit event buffer size.
    #[must_use]
    pub fn with_event_capacity<S: Into<String>>(
        role_names: impl IntoIterator<Item = S>,
        columns: usize,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            role_names: role_names.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            columns,
            events,
        }
    }

    /// Wrap the table for sharing with a proxy.
    #[must_use]
    pub fn into_shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    fn publish(&self, event: TableEvent) {
        trace!(?event, "table event");
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }

    /// Conform a row to the table's column and role counts.
    fn normalize_row(&self, mut row: Vec<Cell>) -> Vec<Cell> {
        row.resize_with(self.columns, Vec::new);
        for cell in &mut row {
            cell.resize(self.role_names.len(), CellValue::Null);
        }
        row
    }

    /// Build a single-role row from plain values, one per column.
    ///
    /// Values land under `role`; other roles are `Null`.
    #[must_use]
    pub fn row_for_role<V: Into<CellValue>>(
        &self,
        role: usize,
        values: impl IntoIterator<Item = V>,
    ) -> Vec<Cell> {
        values
            .into_iter()
            .map(|v| {
                let mut cell = vec![CellValue::Null; self.role_names.len()];
                if let Some(slot) = cell.get_mut(role) {
                    *slot = v.into();
                }
                cell
            })
            .collect()
    }

    /// Append a row, returning its index.
    pub fn append_row(&mut self, row: Vec<Cell>) -> usize {
        let index = self.rows.len();
        let row = self.normalize_row(row);
        self.rows.push(row);
        self.publish(TableEvent::RowsInserted {
            rows: index..index + 1,
        });
        index
    }

    /// Insert rows before `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > row_count()`.
    pub fn insert_rows(&mut self, index: usize, rows: Vec<Vec<Cell>>) -> Result<()> {
        if index > self.rows.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count: rows.len(),
                len: self.rows.len(),
            });
        }
        if rows.is_empty() {
            return Ok(());
        }
        let count = rows.len();
        let normalized: Vec<_> = rows.into_iter().map(|r| self.normalize_row(r)).collect();
        self.rows.splice(index..index, normalized);
        self.publish(TableEvent::RowsInserted {
            rows: index..index + count,
        });
        Ok(())
    }

    /// Remove up to `count` rows starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > row_count()`.
    pub fn remove_rows(&mut self, index: usize, count: usize) -> Result<()> {
        if index > self.rows.len() {
            return Err(Error::IndexOutOfRange {
                index,
                count,
                len: self.rows.len(),
            });
        }
        let count = count.min(self.rows.len() - index);
        if count == 0 {
            return Ok(());
        }
        self.rows.drain(index..index + count);
        self.publish(TableEvent::RowsRemoved {
            rows: index..index + count,
        });
        Ok(())
    }

    /// Insert `count` empty columns before `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > column_count()`.
    pub fn insert_columns(&mut self, index: usize, count: usize) -> Result<()> {
        if index > self.columns {
            return Err(Error::IndexOutOfRange {
                index,
                count,
                len: self.columns,
            });
        }
        if count == 0 {
            return Ok(());
        }
        let empty = vec![CellValue::Null; self.role_names.len()];
        for row in &mut self.rows {
            row.splice(index..index, std::iter::repeat(empty.clone()).take(count));
        }
        self.columns += count;
        self.publish(TableEvent::ColumnsInserted {
            columns: index..index + count,
        });
        Ok(())
    }

    /// Remove up to `count` columns starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index > column_count()`.
    pub fn remove_columns(&mut self, index: usize, count: usize) -> Result<()> {
        if index > self.columns {
            return Err(Error::IndexOutOfRange {
                index,
                count,
                len: self.columns,
            });
        }
        let count = count.min(self.columns - index);
        if count == 0 {
            return Ok(());
        }
        for row in &mut self.rows {
            row.drain(index..index + count);
        }
        self.columns -= count;
        self.publish(TableEvent::ColumnsRemoved {
            columns: index..index + count,
        });
        Ok(())
    }

    /// Set one cell value under a role index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if the row, column or role does not exist.
    pub fn set_data(
        &mut self,
        row: usize,
        column: usize,
        role: usize,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        let (rows, columns, roles) = (self.rows.len(), self.columns, self.role_names.len());
        let slot = self
            .rows
            .get_mut(row)
            .ok_or_else(|| Error::out_of_range(row, 1, rows))?
            .get_mut(column)
            .ok_or_else(|| Error::out_of_range(column, 1, columns))?
            .get_mut(role)
            .ok_or_else(|| Error::out_of_range(role, 1, roles))?;
        *slot = value.into();
        self.publish(TableEvent::DataChanged {
            rows: row..row + 1,
            columns: column..column + 1,
        });
        Ok(())
    }

    /// Swap two rows.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if either row does not exist.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.rows.len();
        if a >= len || b >= len {
            return Err(Error::IndexOutOfRange {
                index: a.max(b),
                count: 1,
                len,
            });
        }
        self.rows.swap(a, b);
        self.publish(TableEvent::LayoutChanged);
        Ok(())
    }

    /// Replace every row at once.
    pub fn reset(&mut self, rows: Vec<Vec<Cell>>) {
        self.rows = rows.into_iter().map(|r| self.normalize_row(r)).collect();
        self.publish(TableEvent::ModelReset);
    }
}

impl SourceTable for ItemTable {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn column_count(&self) -> usize {
        self.columns
    }

    fn role_names(&self) -> &[String] {
        &self.role_names
    }

    fn data(&self, row: usize, column: usize, role: usize) -> CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.get(role))
            .cloned()
            .unwrap_or_default()
    }

    fn subscribe(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }
}
