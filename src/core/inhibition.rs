//! Inhibition picks the active columns from their boosted overlaps.
//!
//! Nothing here keeps state between calls: the result depends only on the overlaps,
//! the target density, the stimulus threshold and (for local inhibition) the topology.
//!
//! Global inhibition keeps the `floor(density * num_columns)` best columns of the whole pooler.
//! Ties are broken by column order: among equal scores the lower column index ranks first.
//!
//! Local inhibition lets every column compete only within its inhibition radius. Columns are
//! visited in ascending index order and a neighbor with an equal score counts as "bigger" once
//! it has already been activated, so two equal neighbors never both lose to each other.

use super::{sparse::Buffer, topology::Topology};
use crate::error::{Result, SpatialPoolerError};

/// Fraction of columns that should be active within one inhibition area, and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetDensity {
    /// Derived from `num_active_columns_per_inh_area` and the inhibition area.
    FromCount(f32),
    /// The configured `local_area_density`.
    Fixed(f32),
}

impl TargetDensity {
    #[inline]
    pub fn value(self) -> f32 {
        match self {
            TargetDensity::FromCount(density) | TargetDensity::Fixed(density) => density,
        }
    }

    /// Number of winners global inhibition selects among `num_columns`: `floor(density * num_columns)`.
    ///
    /// A density derived from a count gets a relative slack that absorbs the rounding error of
    /// `n / area * area`, so it yields exactly `n` winners. A fixed density is floored as is.
    #[inline]
    pub fn desired_winners(self, num_columns: usize) -> usize {
        let product = self.value() as f64 * num_columns as f64;
        match self {
            TargetDensity::FromCount(_) => (product + product * 1e-6).floor() as usize,
            TargetDensity::Fixed(_) => product.floor() as usize,
        }
    }
}

/// Target density for the current inhibition radius.
///
/// With `num_active_columns_per_inh_area > 0` the density is derived from the area covered by
/// the inhibition radius, capped at 0.5. Otherwise `local_area_density` is used as is.
pub fn target_density(
    num_active_columns_per_inh_area: u32,
    local_area_density: f32,
    inhibition_radius: usize,
    columns: &Topology,
) -> TargetDensity {
    if num_active_columns_per_inh_area == 0 {
        return TargetDensity::Fixed(local_area_density);
    }

    let diameter = 2.0 * inhibition_radius as f64 + 1.0;
    let area = diameter.powi(columns.rank() as i32);
    let area = area.min(columns.size() as f64);
    let density = num_active_columns_per_inh_area as f64 / area;

    TargetDensity::FromCount(density.min(0.5) as f32)
}

/// Selects the top `density.desired_winners(num_columns)` columns by score.
///
/// Columns scoring below `stimulus_threshold` never win. Fails if the density selects no column at all.
pub fn inhibit_global(
    overlaps: &[f32],
    density: TargetDensity,
    stimulus_threshold: f32,
    active: &mut Buffer<usize>,
) -> Result<()> {
    active.clear();

    let num_desired = density.desired_winners(overlaps.len());
    if num_desired == 0 {
        return Err(SpatialPoolerError::NotEnoughColumns {
            num_columns: overlaps.len(),
            density: density.value(),
        });
    }

    // Kept sorted by descending score; equal scores keep their arrival order.
    let mut winners: Vec<(usize, f32)> = Vec::with_capacity(num_desired + 1);

    for (column, &score) in overlaps.iter().enumerate() {
        if score < stimulus_threshold {
            continue;
        }
        if winners.len() == num_desired && score <= winners[num_desired - 1].1 {
            continue;
        }

        let position = winners.partition_point(|&(_, s)| s >= score);
        winners.insert(position, (column, score));
        winners.truncate(num_desired);
    }

    let mut selected: Vec<usize> = winners.into_iter().map(|(column, _)| column).collect();
    selected.sort_unstable();
    selected.into_iter().for_each(|column| active.push(column));

    Ok(())
}

/// Activates every column that has fewer than `round(density * (neighbors + 1))` bigger
/// neighbors within `radius`.
pub fn inhibit_local(
    overlaps: &[f32],
    density: f32,
    stimulus_threshold: f32,
    radius: usize,
    columns: &Topology,
    wrap_around: bool,
    active: &mut Buffer<usize>,
) {
    active.clear();

    let mut is_active = vec![false; overlaps.len()];

    for (column, &score) in overlaps.iter().enumerate() {
        if score < stimulus_threshold {
            continue;
        }

        let mut num_neighbors = 0usize;
        let mut num_bigger = 0usize;

        for neighbor in columns.neighborhood(column, radius, wrap_around) {
            if neighbor == column {
                continue;
            }
            num_neighbors += 1;

            let difference = overlaps[neighbor] - score;
            if difference > 0.0 || (difference == 0.0 && is_active[neighbor]) {
                num_bigger += 1;
            }
        }

        let num_active = (0.5 + density as f64 * (num_neighbors + 1) as f64) as usize;
        if num_bigger < num_active {
            active.push(column);
            is_active[column] = true;
        }
    }
}
