//! A synapse links one column to one input bit through a permanence value.
//!
//! If the permanence is at or above the connected threshold, the synapse is considered "connected".
//! During learning, permanence is increased or decreased depending on whether the corresponding
//! input bit was active. A connected synapse counts toward the column's overlap score.
//!
//! The centralized `Synapses` struct keeps three row-sparse stores, one row per column:
//! - the potential pool: which inputs a column may ever connect to (fixed after initialization),
//! - the permanences: a value per potential input, absent entries are zero,
//! - the connected synapses: derived from the permanences and recomputed on every write.
//!
//! Permanences are edited as dense rows (one value per input) and written back through
//! `update_column_permanences`, which optionally raises the column until it has enough connected
//! synapses, trims tiny values to zero, clips to the maximum and refreshes the connected set.

use super::{
    random::Random,
    sparse::{SparseMatrix, SparseRow},
};
use crate::error::{Result, SpatialPoolerError};
use serde::{Deserialize, Serialize};

/// Slack applied when comparing a permanence against the connected threshold.
pub const PERMANENCE_EPSILON: f32 = 0.000_001;

/// Options governing how synapse permanence is adjusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermanenceOptions {
    pub inactive_decrement: f32,
    pub active_increment: f32,
    pub connected: f32,
    pub below_stimulus_increment: f32,
    pub min: f32,
    pub max: f32,
    pub trim_threshold: f32,
}

impl PermanenceOptions {
    /// Builds the options from the three learning rates, deriving the rest.
    pub fn new(inactive_decrement: f32, active_increment: f32, connected: f32) -> Self {
        Self {
            inactive_decrement,
            active_increment,
            connected,
            below_stimulus_increment: connected / 10.0,
            min: 0.0,
            max: 1.0,
            trim_threshold: active_increment / 2.0,
        }
    }

    /// True if `permanence` counts as a connected synapse.
    #[inline]
    pub fn is_connected(&self, permanence: f32) -> bool {
        permanence >= self.connected - PERMANENCE_EPSILON
    }
}

impl Default for PermanenceOptions {
    fn default() -> Self {
        Self::new(0.008, 0.05, 0.10)
    }
}

/// Truncates to five decimal digits so initial permanences do not drift between platforms.
#[inline]
fn round5(value: f32) -> f32 {
    ((value * 100_000.0) as i32) as f32 / 100_000.0
}

/// The per-column synapse stores of a Spatial Pooler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Synapses {
    potential_pools: SparseMatrix<bool>,
    permanences: SparseMatrix<f32>,
    connected_synapses: SparseMatrix<bool>,
    connected_counts: Vec<u32>,
}

impl Synapses {
    /// Creates empty stores for `num_columns` columns over `num_inputs` inputs.
    pub fn new(num_columns: usize, num_inputs: usize) -> Self {
        Self {
            potential_pools: SparseMatrix::new(num_columns, num_inputs),
            permanences: SparseMatrix::new(num_columns, num_inputs),
            connected_synapses: SparseMatrix::new(num_columns, num_inputs),
            connected_counts: vec![0; num_columns],
        }
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.connected_counts.len()
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.permanences.ncols()
    }

    /// Ascending input indices in the potential pool of `column`.
    #[inline]
    pub fn potential(&self, column: usize) -> &[usize] {
        self.potential_pools.sparse_row(column)
    }

    /// Dense membership mask of the potential pool of `column`.
    pub fn potential_dense(&self, column: usize) -> Vec<bool> {
        self.potential_pools.dense_row(column)
    }

    /// Replaces the potential pool of `column` with `inputs`.
    pub fn set_potential(&mut self, column: usize, inputs: &[usize]) {
        self.potential_pools.replace_sparse_row(column, inputs);
    }

    /// Replaces the potential pool of `column` from a dense membership mask.
    pub fn set_potential_dense(&mut self, column: usize, mask: &[bool]) {
        self.potential_pools.set_row_from_dense(column, mask);
    }

    /// Non-zero permanences of `column`.
    #[inline]
    pub fn permanences(&self, column: usize) -> &SparseRow<f32> {
        self.permanences.row(column)
    }

    /// Dense permanence row of `column`.
    pub fn permanence_dense(&self, column: usize) -> Vec<f32> {
        self.permanences.dense_row(column)
    }

    /// Ascending input indices of the connected synapses of `column`.
    #[inline]
    pub fn connected(&self, column: usize) -> &[usize] {
        self.connected_synapses.sparse_row(column)
    }

    /// Dense connected mask of `column`.
    pub fn connected_dense(&self, column: usize) -> Vec<bool> {
        self.connected_synapses.dense_row(column)
    }

    /// Number of connected synapses per column.
    #[inline]
    pub fn connected_counts(&self) -> &[u32] {
        &self.connected_counts
    }

    /// Counts, for every column, the connected synapses whose input bit is on.
    #[inline]
    pub fn overlaps(&self, input: &[bool], out: &mut [u32]) {
        self.connected_synapses.right_vec_sum_at_nz(input, out);
    }

    /// Draws initial permanences for the given potential pool, returned as a dense row.
    ///
    /// With probability `init_connected_percentage` a synapse starts connected
    /// (uniform in `[connected, max]`), otherwise disconnected (uniform in `[0, connected)`).
    /// Values below the trim threshold start at zero.
    pub fn init_permanences(
        num_inputs: usize,
        potential: &[usize],
        init_connected_percentage: f32,
        options: &PermanenceOptions,
        rng: &mut Random,
    ) -> Vec<f32> {
        let mut perm = vec![0.0; num_inputs];

        for &input in potential {
            let value = if rng.get_real64() <= init_connected_percentage as f64 {
                let span = (options.max - options.connected) as f64;
                round5((options.connected as f64 + span * rng.get_real64()) as f32)
            } else {
                round5((options.connected as f64 * rng.get_real64()) as f32)
            };

            perm[input] = if value < options.trim_threshold {
                0.0
            } else {
                value
            };
        }

        perm
    }

    /// Writes a dense permanence row for `column`:
    /// - if `raise_permanences` is true, first raise values until `stimulus_threshold` synapses are connected,
    /// - then recompute the connected set,
    /// - then clip values to `[trim_threshold, max]`, snapping trimmed values to `min`,
    /// - finally store the row and the column's connected count.
    pub fn update_column_permanences(
        &mut self,
        column: usize,
        perm: &mut [f32],
        raise_permanences: bool,
        stimulus_threshold: u32,
        options: &PermanenceOptions,
    ) -> Result<()> {
        debug_assert_eq!(perm.len(), self.num_inputs());

        if raise_permanences {
            let potential = self.potential_pools.sparse_row(column);
            raise_permanences_to_threshold(column, perm, potential, stimulus_threshold, options)?;
        }

        let connected: Vec<usize> = perm
            .iter()
            .enumerate()
            .filter(|&(_, &p)| options.is_connected(p))
            .map(|(i, _)| i)
            .collect();

        clip(perm, true, options);

        self.connected_counts[column] = connected.len() as u32;
        self.connected_synapses.replace_sparse_row(column, &connected);
        self.permanences.set_row_from_dense(column, perm);

        Ok(())
    }
}

/// Counts the permanences that count as connected.
#[inline]
pub fn count_connected(perm: &[f32], options: &PermanenceOptions) -> u32 {
    perm.iter().filter(|&&p| options.is_connected(p)).count() as u32
}

/// Clamps every permanence to `options.max`. Values below the lower bound
/// (`trim_threshold` when `trim` is set, `min` otherwise) snap to `min`.
pub fn clip(perm: &mut [f32], trim: bool, options: &PermanenceOptions) {
    let lower = if trim {
        options.trim_threshold
    } else {
        options.min
    };

    for value in perm.iter_mut() {
        if *value > options.max {
            *value = options.max;
        }
        if *value < lower {
            *value = options.min;
        }
    }
}

/// Raises every potential permanence of a column by `below_stimulus_increment` until at least
/// `stimulus_threshold` synapses are connected. Returns the final connected count.
///
/// Fails instead of looping forever when the potential pool is too small to ever reach the threshold.
pub fn raise_permanences_to_threshold(
    column: usize,
    perm: &mut [f32],
    potential: &[usize],
    stimulus_threshold: u32,
    options: &PermanenceOptions,
) -> Result<u32> {
    clip(perm, false, options);

    let mut num_connected = count_connected(perm, options);
    if num_connected >= stimulus_threshold {
        return Ok(num_connected);
    }

    if potential.len() < stimulus_threshold as usize || options.below_stimulus_increment <= 0.0 {
        return Err(SpatialPoolerError::UnreachableStimulusThreshold {
            column,
            threshold: stimulus_threshold,
            potential: potential.len(),
        });
    }

    while num_connected < stimulus_threshold {
        for &input in potential {
            perm[input] += options.below_stimulus_increment;
        }
        num_connected = count_connected(perm, options);
    }

    Ok(num_connected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> PermanenceOptions {
        PermanenceOptions::new(0.008, 0.05, 0.10)
    }

    #[test]
    fn test_derived_options() {
        let options = options();
        assert!((options.below_stimulus_increment - 0.01).abs() < 1e-7);
        assert!((options.trim_threshold - 0.025).abs() < 1e-7);
        assert_eq!(options.min, 0.0);
        assert_eq!(options.max, 1.0);
    }

    #[test]
    fn test_round5_truncates() {
        assert_eq!(round5(0.123_456_7), 0.12345);
        assert_eq!(round5(0.0), 0.0);
    }

    #[test]
    fn test_init_permanences_respects_pool_and_trim() {
        let options = options();
        let mut rng = Random::new(42);
        let potential = vec![1, 3, 5, 7, 9];

        for _ in 0..50 {
            let perm = Synapses::init_permanences(10, &potential, 0.5, &options, &mut rng);
            for (input, &p) in perm.iter().enumerate() {
                if potential.contains(&input) {
                    assert!(p == 0.0 || (p >= options.trim_threshold && p <= options.max));
                } else {
                    assert_eq!(p, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_init_permanences_fully_connected() {
        let options = options();
        let mut rng = Random::new(7);
        let potential: Vec<usize> = (0..20).collect();
        let perm = Synapses::init_permanences(20, &potential, 1.0, &options, &mut rng);
        assert_eq!(count_connected(&perm, &options), 20);
    }

    #[test]
    fn test_clip_with_trim_snaps_to_min() {
        let options = options();
        let mut perm = vec![-0.5, 0.01, 0.03, 0.7, 1.5];
        clip(&mut perm, true, &options);
        assert_eq!(perm, vec![0.0, 0.0, 0.03, 0.7, 1.0]);

        let mut perm = vec![-0.5, 0.01];
        clip(&mut perm, false, &options);
        assert_eq!(perm, vec![0.0, 0.01]);
    }

    #[test]
    fn test_raise_reaches_threshold_monotonically() {
        let options = options();
        let potential = vec![0, 2, 4, 6];
        let mut perm = vec![0.0, 0.0, 0.05, 0.0, 0.02, 0.0, 0.0, 0.0];

        let mut previous = count_connected(&perm, &options);
        for threshold in 1..=4 {
            let connected =
                raise_permanences_to_threshold(0, &mut perm, &potential, threshold, &options)
                    .unwrap();
            assert!(connected >= threshold);
            assert!(connected >= previous);
            previous = connected;
        }
        for input in [1, 3, 5, 7] {
            assert_eq!(perm[input], 0.0);
        }
    }

    #[test]
    fn test_raise_fails_when_pool_too_small() {
        let options = options();
        let mut perm = vec![0.0; 4];
        let result = raise_permanences_to_threshold(3, &mut perm, &[0, 1], 3, &options);
        assert!(matches!(
            result,
            Err(SpatialPoolerError::UnreachableStimulusThreshold {
                column: 3,
                threshold: 3,
                potential: 2
            })
        ));
    }

    #[test]
    fn test_update_column_permanences_refreshes_connected_set() {
        let options = options();
        let mut synapses = Synapses::new(2, 6);
        synapses.set_potential(1, &[0, 1, 2, 3]);

        let mut perm = vec![0.2, 0.01, 0.099_999_5, 1.4, 0.0, 0.0];
        synapses
            .update_column_permanences(1, &mut perm, false, 0, &options)
            .unwrap();

        assert_eq!(synapses.connected(1), &[0, 2, 3]);
        assert_eq!(synapses.connected_counts(), &[0, 3]);
        assert_eq!(synapses.permanences(1).indices(), &[0, 2, 3]);
        assert_eq!(synapses.permanences(1).get(3), 1.0);
        assert_eq!(synapses.permanences(1).get(1), 0.0);
    }

    #[test]
    fn test_update_with_raise_connects_enough_synapses() {
        let options = options();
        let mut synapses = Synapses::new(1, 8);
        synapses.set_potential(0, &[1, 2, 3, 4, 5]);

        let mut perm = vec![0.0; 8];
        synapses
            .update_column_permanences(0, &mut perm, true, 3, &options)
            .unwrap();

        assert!(synapses.connected_counts()[0] >= 3);
        assert!(synapses.connected(0).iter().all(|i| (1..=5).contains(i)));
    }

    #[test]
    fn test_overlaps_count_active_connected_inputs() {
        let options = options();
        let mut synapses = Synapses::new(2, 4);
        synapses.set_potential(0, &[0, 1, 2, 3]);
        synapses.set_potential(1, &[0, 1, 2, 3]);
        let mut first = vec![0.5, 0.5, 0.0, 0.0];
        let mut second = vec![0.0, 0.5, 0.5, 0.5];
        synapses
            .update_column_permanences(0, &mut first, false, 0, &options)
            .unwrap();
        synapses
            .update_column_permanences(1, &mut second, false, 0, &options)
            .unwrap();

        let mut overlaps = vec![0; 2];
        synapses.overlaps(&[true, true, true, false], &mut overlaps);
        assert_eq!(overlaps, vec![2, 2]);
    }
}
