//! Column tables of rankings and their aligned scores.
//!
//! A batch holds one column per replicate. Columns may differ in length; the padded
//! view marks the missing trailing cells with `None`, which is never a valid item.

use crate::error::{invalid, Result};

/// A table of columns, one per replicate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Batch<T> {
    columns: Vec<Vec<T>>,
}

/// Rankings, one column per replicate (best item first).
pub type RankingBatch<I> = Batch<I>;

/// Scores aligned positionally with a [`RankingBatch`].
pub type ScoreBatch = Batch<f64>;

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
        }
    }
}

impl<T> Batch<T> {
    pub fn new(columns: Vec<Vec<T>>) -> Self {
        Self { columns }
    }

    /// A batch holding a single column.
    pub fn single(column: Vec<T>) -> Self {
        Self {
            columns: vec![column],
        }
    }

    pub fn push(&mut self, column: Vec<T>) {
        self.columns.push(column);
    }

    /// Number of columns (replicates).
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Length of the longest column.
    pub fn depth(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn column(&self, r: usize) -> Option<&[T]> {
        self.columns.get(r).map(Vec::as_slice)
    }

    pub fn columns(&self) -> &[Vec<T>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Vec<T>> {
        self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &[T]> {
        self.columns.iter().map(Vec::as_slice)
    }

    /// Cell at `(row, col)`; `None` for padding or out-of-range.
    pub fn cell(&self, row: usize, col: usize) -> Option<&T> {
        self.columns.get(col).and_then(|c| c.get(row))
    }
}

impl<T: Clone> Batch<T> {
    /// Columns padded to [`Batch::depth`] with `None`.
    pub fn padded_columns(&self) -> Vec<Vec<Option<T>>> {
        let depth = self.depth();
        self.columns
            .iter()
            .map(|c| {
                let mut out: Vec<Option<T>> = c.iter().cloned().map(Some).collect();
                out.resize(depth, None);
                out
            })
            .collect()
    }

    /// Rebuild from padded columns.
    ///
    /// Padding is only allowed at the tail of a column; a present cell after a missing
    /// one is rejected.
    pub fn from_padded(columns: Vec<Vec<Option<T>>>) -> Result<Self> {
        let mut out = Vec::with_capacity(columns.len());
        for (ci, col) in columns.into_iter().enumerate() {
            let present = col.iter().take_while(|c| c.is_some()).count();
            if col[present..].iter().any(Option::is_some) {
                return Err(invalid(format!(
                    "column {ci}: missing marker followed by a present cell at row {present}"
                )));
            }
            out.push(col.into_iter().take(present).flatten().collect());
        }
        Ok(Self { columns: out })
    }
}

impl<T> From<Vec<T>> for Batch<T> {
    fn from(column: Vec<T>) -> Self {
        Self::single(column)
    }
}
