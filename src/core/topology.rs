//! Shapes of the input space and the column space.
//!
//! A `Topology` maps flat indices to N-dimensional coordinates and back (row-major, the last
//! dimension varies fastest). Potential pools are drawn from input-space neighborhoods, while
//! local inhibition, local boosting and local minimum duty cycles walk column-space neighborhoods.
//!
//! Two neighborhood flavours exist:
//! - wrapping: the space behaves like a torus, coordinates past an edge re-enter on the other side.
//!   A dimension never yields more than `dim` distinct coordinates, even for large radii.
//! - bounded: coordinates are clipped at the edges, so neighborhoods near a border are smaller.
//!
//! Neighborhoods include the center and are enumerated in row-major order starting from the
//! lowest corner. A pooler's reproducibility depends on that order.

use serde::{Deserialize, Serialize};
use std::cmp::min;

/// Dimension sizes of an N-dimensional grid plus the row-major strides derived from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    dims: Vec<usize>,
    strides: Vec<usize>,
}

impl Topology {
    pub fn new(dimensions: &[usize]) -> Self {
        let dims = dimensions.to_vec();
        let mut strides = vec![1; dims.len()];
        for axis in (0..dims.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * dims[axis + 1];
        }

        Self { dims, strides }
    }

    /// The size of every dimension, outermost first.
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of points in the space (product of all dimensions).
    #[inline]
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Size of the largest dimension, 0 for an empty topology.
    #[inline]
    pub fn max_dimension(&self) -> usize {
        self.dims.iter().copied().max().unwrap_or(0)
    }

    /// Row-major coordinates of a flat `index`, one entry per dimension.
    #[inline]
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        let mut rest = index;

        self.strides
            .iter()
            .map(|&stride| {
                let coordinate = rest / stride;
                rest %= stride;
                coordinate
            })
            .collect()
    }

    /// Flat index of `coords`. Expects one coordinate per dimension.
    #[inline]
    pub fn index_from_coordinates(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.strides.len());
        coords
            .iter()
            .zip(&self.strides)
            .fold(0, |index, (&coordinate, &stride)| index + coordinate * stride)
    }

    /// Every index within `radius` of `center` along each axis (a hypercube, not a ball).
    ///
    /// The iterator is `Clone`, so a neighborhood can be walked more than once.
    pub fn neighborhood(&self, center: usize, radius: usize, wrapping: bool) -> NeighborhoodIter<'_> {
        let ranges: Vec<(usize, usize)> = self
            .coordinates(center)
            .into_iter()
            .zip(&self.dims)
            .map(|(coordinate, &dim)| {
                if wrapping {
                    // Positions run past `dim` and are reduced modulo `dim` when yielded.
                    let start = (coordinate + dim - radius % dim) % dim;
                    let span = min(radius.saturating_mul(2).saturating_add(1), dim);
                    (start, start + span)
                } else {
                    let end = min(coordinate.saturating_add(radius).saturating_add(1), dim);
                    (coordinate.saturating_sub(radius), end)
                }
            })
            .collect();

        let remaining = ranges
            .iter()
            .map(|&(start, end)| end.saturating_sub(start))
            .product();
        let cursor = ranges.iter().map(|&(start, _)| start).collect();

        NeighborhoodIter {
            topology: self,
            ranges,
            cursor,
            remaining,
            wrapping,
        }
    }
}

/// Row-major walk over the half-open per-axis `ranges` of a neighborhood.
#[derive(Debug, Clone)]
pub struct NeighborhoodIter<'a> {
    topology: &'a Topology,
    ranges: Vec<(usize, usize)>,
    cursor: Vec<usize>,
    remaining: usize,
    wrapping: bool,
}

impl NeighborhoodIter<'_> {
    /// Moves the cursor to the next point, odometer style.
    fn advance(&mut self) {
        for axis in (0..self.cursor.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.ranges[axis].1 {
                return;
            }
            self.cursor[axis] = self.ranges[axis].0;
        }
    }
}

impl Iterator for NeighborhoodIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let index = self
            .cursor
            .iter()
            .zip(&self.topology.dims)
            .zip(&self.topology.strides)
            .map(|((&position, &dim), &stride)| {
                let coordinate = if self.wrapping { position % dim } else { position };
                coordinate * stride
            })
            .sum();

        self.remaining -= 1;
        self.advance();

        Some(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for NeighborhoodIter<'_> {}
