//! Row-sparse storage for per-column synapse data.
//!
//! Every column owns one row. A row keeps its non-zero entries as an ascending list of
//! input indices with a parallel list of values, so:
//! - iterating a row's non-zeros is linear in the row's non-zero count,
//! - point lookup is a binary search,
//! - dense <-> sparse conversions are linear in the row width.
//!
//! The same container stores binary data (`SparseMatrix<bool>`, e.g. potential pools and
//! connected synapses) and real data (`SparseMatrix<f32>`, permanences).
//!
//! `Buffer` is a fixed-capacity, reusable list with an explicit occupied count, used for
//! per-call scratch lists that should not reallocate between `compute` calls.

use serde::{Deserialize, Serialize};

/// A value that can live in a sparse row. The default value is the implicit zero.
pub trait Element: Copy + Default + PartialEq {
    /// The value stored for a set bit in binary rows.
    fn one() -> Self;

    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Element for bool {
    #[inline]
    fn one() -> Self {
        true
    }
}

impl Element for f32 {
    #[inline]
    fn one() -> Self {
        1.0
    }
}

/// Non-zero entries of a single row: ascending indices with parallel values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseRow<T> {
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T: Element> SparseRow<T> {
    /// Ascending column positions of the non-zero entries.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Values of the non-zero entries, parallel to `indices()`.
    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Value at `index`, zero when absent.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => T::default(),
        }
    }

    /// `(index, value)` pairs in ascending index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    fn clear(&mut self) {
        self.indices.clear();
        self.values.clear();
    }
}

/// A row-oriented sparse matrix with a fixed number of rows and columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix<T> {
    rows: Vec<SparseRow<T>>,
    ncols: usize,
}

impl<T: Element> SparseMatrix<T> {
    /// Creates an all-zero `nrows x ncols` matrix.
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            rows: vec![SparseRow::default(); nrows],
            ncols,
        }
    }

    /// Resizes to `nrows x ncols`, dropping entries that fall outside the new shape.
    pub fn resize(&mut self, nrows: usize, ncols: usize) {
        self.rows.resize_with(nrows, SparseRow::default);
        if ncols < self.ncols {
            for row in &mut self.rows {
                let keep = row.indices.partition_point(|&i| i < ncols);
                row.indices.truncate(keep);
                row.values.truncate(keep);
            }
        }
        self.ncols = ncols;
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Borrow one row.
    #[inline]
    pub fn row(&self, row: usize) -> &SparseRow<T> {
        &self.rows[row]
    }

    /// Replaces `row` with the non-zero entries of `dense`.
    pub fn set_row_from_dense(&mut self, row: usize, dense: &[T]) {
        debug_assert_eq!(dense.len(), self.ncols);
        let target = &mut self.rows[row];
        target.clear();
        for (index, &value) in dense.iter().enumerate() {
            if !value.is_zero() {
                target.indices.push(index);
                target.values.push(value);
            }
        }
    }

    /// Writes `row` into `dense`, zeroing every other position.
    pub fn row_to_dense(&self, row: usize, dense: &mut [T]) {
        debug_assert_eq!(dense.len(), self.ncols);
        dense.fill(T::default());
        for (index, value) in self.rows[row].iter() {
            dense[index] = value;
        }
    }

    /// Returns `row` as a freshly allocated dense vector.
    pub fn dense_row(&self, row: usize) -> Vec<T> {
        let mut dense = vec![T::default(); self.ncols];
        self.row_to_dense(row, &mut dense);
        dense
    }

    /// Ascending indices of the non-zero entries of `row`.
    #[inline]
    pub fn sparse_row(&self, row: usize) -> &[usize] {
        &self.rows[row].indices
    }

    /// Replaces `row` with `T::one()` at every position in `indices`.
    /// Indices may arrive unordered or repeated; they are stored sorted and unique.
    pub fn replace_sparse_row(&mut self, row: usize, indices: &[usize]) {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        debug_assert!(sorted.last().map_or(true, |&i| i < self.ncols));
        let target = &mut self.rows[row];
        target.values = vec![T::one(); sorted.len()];
        target.indices = sorted;
    }

    /// Number of non-zero entries in `row`.
    #[inline]
    pub fn n_non_zeros_on_row(&self, row: usize) -> usize {
        self.rows[row].len()
    }

    /// Total number of non-zero entries.
    pub fn n_non_zeros(&self) -> usize {
        self.rows.iter().map(SparseRow::len).sum()
    }

    /// For every row, counts the non-zero entries whose column is set in `input`,
    /// writing the count into `out[row]`.
    pub fn right_vec_sum_at_nz(&self, input: &[bool], out: &mut [u32]) {
        debug_assert_eq!(input.len(), self.ncols);
        debug_assert_eq!(out.len(), self.rows.len());
        for (row, count) in self.rows.iter().zip(out.iter_mut()) {
            *count = row
                .iter()
                .filter(|&(index, value)| !value.is_zero() && input[index])
                .count() as u32;
        }
    }
}

/// A reusable list with a fixed capacity and an explicit occupied count.
///
/// Slots past `len()` keep stale data and are never exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Buffer<T> {
    slots: Vec<T>,
    len: usize,
}

impl<T: Copy + Default> Buffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity],
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends `value`. Pushing past the capacity is a logic error.
    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(self.len < self.slots.len(), "buffer capacity exceeded");
        self.slots[self.len] = value;
        self.len += 1;
    }

    /// The occupied prefix.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.len]
    }

    /// Changes the capacity and empties the buffer.
    pub fn reset(&mut self, capacity: usize) {
        self.slots.clear();
        self.slots.resize(capacity, T::default());
        self.len = 0;
    }
}

/// Buffers compare by their occupied prefix only.
impl<T: Copy + Default + PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}
