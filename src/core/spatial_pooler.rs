//! The `SpatialPooler` turns binary inputs into sparse distributed representations (SDRs):
//! - Every column owns potential synapses into a topological patch of the input space.
//! - A column's overlap is the number of its connected synapses whose input bit is on.
//! - Inhibition keeps only the best columns active, globally or within a neighborhood.
//! - Learning strengthens synapses to active inputs of winning columns and weakens the rest.
//!
//! Over time each column specializes on input patterns it sees often.
//!
//! Topology:
//! - Every column is mapped to a "center" in the input space, its potential pool is sampled from a
//!   neighborhood of that center.
//! - Inhibition is either global (the whole pooler competes) or local (columns compete within the
//!   inhibition radius, which tracks the average receptive field size of the columns).
//!
//! Duty cycles are moving averages of per-column events:
//! - overlap duty cycle (ODC): how often a column had a non-zero overlap,
//! - active duty cycle (ADC): how often a column won the inhibition.
//! - Columns whose ODC falls below a fraction of their neighborhood's best get all their permanences bumped.
//! - Columns whose ADC falls below the target density get an exponentially growing boost factor.
//!
//! Given the same seed, parameters and input sequence, two poolers produce identical outputs.

use super::{
    inhibition::{self, TargetDensity},
    random::{Random, SeedSource},
    sparse::Buffer,
    synapses::{PermanenceOptions, Synapses},
    topology::Topology,
};
use crate::error::{Result, SpatialPoolerError};
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

/// Newest serialization format version written by `save`.
pub const VERSION: u32 = 2;

/// Creation parameters of a `SpatialPooler`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialPoolerParams {
    /// Shape of the input space.
    pub input_dimensions: Vec<usize>,

    /// Shape of the column grid. Must have as many dimensions as the input space.
    pub column_dimensions: Vec<usize>,

    /// Radius (in input space) around a column's center from which potential synapses are drawn.
    /// Clipped to the number of inputs.
    pub potential_radius: usize,

    /// Fraction of the inputs within `potential_radius` that become potential synapses, in (0, 1].
    pub potential_pct: f32,

    /// If true, all columns compete globally. If false, local inhibition is used.
    pub global_inhibition: bool,

    /// Target density of active columns in an inhibition area, in (0, 0.5].
    /// Only used when `num_active_columns_per_inh_area` is 0.
    pub local_area_density: f32,

    /// Number of active columns per inhibition area. Overrides `local_area_density` when > 0.
    pub num_active_columns_per_inh_area: u32,

    /// Minimum overlap a column must have to be considered for activation.
    pub stimulus_threshold: u32,

    /// Permanence decrement for synapses to inactive inputs of an active column.
    pub syn_perm_inactive_dec: f32,

    /// Permanence increment for synapses to active inputs of an active column.
    pub syn_perm_active_inc: f32,

    /// Permanence at or above which a synapse is connected.
    pub syn_perm_connected: f32,

    /// Fraction of the neighborhood's best overlap duty cycle below which a column is bumped.
    pub min_pct_overlap_duty_cycles: f32,

    /// Window (in iterations) of the duty cycle moving averages.
    pub duty_cycle_period: u32,

    /// Strength of boosting, 0 disables it.
    pub boost_strength: f32,

    /// Seed of the pooler's generator. Values <= 0 draw a seed from the seed source.
    pub seed: i64,

    /// Values > 0 log every parameter after initialization.
    pub sp_verbosity: u32,

    /// If true, neighborhoods wrap around the edges. The space behaves like a torus.
    pub wrap_around: bool,
}

impl Default for SpatialPoolerParams {
    fn default() -> Self {
        Self {
            input_dimensions: vec![32, 32],
            column_dimensions: vec![64, 64],
            potential_radius: 16,
            potential_pct: 0.5,
            global_inhibition: true,
            local_area_density: 0.0,
            num_active_columns_per_inh_area: 10,
            stimulus_threshold: 0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_connected: 0.10,
            min_pct_overlap_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            boost_strength: 0.0,
            seed: 1,
            sp_verbosity: 0,
            wrap_around: true,
        }
    }
}

impl SpatialPoolerParams {
    /// Checks every constraint `initialize` relies on.
    pub fn validate(&self) -> Result<()> {
        if self.input_dimensions.is_empty() || self.column_dimensions.is_empty() {
            return Err(SpatialPoolerError::InvalidDimensions(
                "input and column dimensions must not be empty".to_string(),
            ));
        }
        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(SpatialPoolerError::DimensionMismatch {
                input: self.input_dimensions.len(),
                columns: self.column_dimensions.len(),
            });
        }
        if self.input_dimensions.contains(&0) || self.column_dimensions.contains(&0) {
            return Err(SpatialPoolerError::InvalidDimensions(format!(
                "every dimension must be >= 1 (inputs {:?}, columns {:?})",
                self.input_dimensions, self.column_dimensions
            )));
        }
        if !(self.potential_pct > 0.0 && self.potential_pct <= 1.0) {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "potential_pct",
                message: format!("{} is outside (0, 1]", self.potential_pct),
            });
        }
        if self.num_active_columns_per_inh_area == 0
            && !(self.local_area_density > 0.0 && self.local_area_density <= 0.5)
        {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "local_area_density",
                message: format!(
                    "{} is outside (0, 0.5] and num_active_columns_per_inh_area is 0",
                    self.local_area_density
                ),
            });
        }
        if self.syn_perm_active_inc / 2.0 >= self.syn_perm_connected {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "syn_perm_connected",
                message: format!(
                    "trim threshold {} must stay below the connected threshold {}",
                    self.syn_perm_active_inc / 2.0,
                    self.syn_perm_connected
                ),
            });
        }
        if self.duty_cycle_period == 0 {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "duty_cycle_period",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A topological Spatial Pooler. All state is owned by the instance, including its generator.
/// Synapses live in the embedded `Synapses` stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialPooler {
    pub(crate) version: u32,

    /// Number of `compute` calls so far.
    pub(crate) iteration_num: u32,

    /// Number of `compute` calls with learning enabled.
    pub(crate) iteration_learn_num: u32,

    pub(crate) potential_radius: usize,
    pub(crate) potential_percentage: f32,
    pub(crate) global_inhibition: bool,
    pub(crate) num_active_columns_per_inh_area: u32,
    pub(crate) local_area_density: f32,
    pub(crate) stimulus_threshold: u32,

    /// Neighborhood size (in column space) used for local competition.
    pub(crate) inhibition_radius: usize,

    pub(crate) duty_cycle_period: u32,
    pub(crate) boost_strength: f32,
    pub(crate) sp_verbosity: u32,
    pub(crate) wrap_around: bool,

    /// How often (in iterations) the inhibition radius and minimum duty cycles are recomputed.
    pub(crate) update_period: u32,

    /// Fraction of each column's synapses that start out connected.
    pub(crate) init_connected_percentage: f32,

    pub(crate) min_percentage_overlap_duty_cycles: f32,

    pub(crate) num_inputs: usize,
    pub(crate) num_columns: usize,
    pub(crate) input_topology: Topology,
    pub(crate) column_topology: Topology,

    pub(crate) permanence_options: PermanenceOptions,
    pub(crate) synapses: Synapses,

    /// A multiplier applied to a column's overlap while learning.
    pub(crate) boost_factors: Vec<f32>,

    /// Rolling average of how often each column has an overlap > 0.
    pub(crate) overlap_duty_cycles: Vec<f32>,

    /// Rolling average of how often each column is active.
    pub(crate) active_duty_cycles: Vec<f32>,

    /// Columns whose overlap duty cycle drops below this get their permanences bumped.
    pub(crate) min_overlap_duty_cycles: Vec<f32>,

    /// Small random value per column, drawn once at initialization.
    pub(crate) tie_breakers: Vec<f32>,

    pub(crate) overlaps: Vec<u32>,
    pub(crate) overlaps_pct: Vec<f32>,
    pub(crate) boosted_overlaps: Vec<f32>,
    pub(crate) active_columns: Buffer<usize>,

    /// The pooler's own seeded generator.
    pub(crate) rand: Random,
}

impl Default for SpatialPooler {
    /// An empty pooler with no columns, to be filled by `initialize` or `load`.
    fn default() -> Self {
        Self {
            version: VERSION,
            iteration_num: 0,
            iteration_learn_num: 0,
            potential_radius: 0,
            potential_percentage: 0.0,
            global_inhibition: true,
            num_active_columns_per_inh_area: 0,
            local_area_density: 0.0,
            stimulus_threshold: 0,
            inhibition_radius: 0,
            duty_cycle_period: 1000,
            boost_strength: 0.0,
            sp_verbosity: 0,
            wrap_around: true,
            update_period: 50,
            init_connected_percentage: 0.5,
            min_percentage_overlap_duty_cycles: 0.0,
            num_inputs: 0,
            num_columns: 0,
            input_topology: Topology::default(),
            column_topology: Topology::default(),
            permanence_options: PermanenceOptions::default(),
            synapses: Synapses::default(),
            boost_factors: Vec::new(),
            overlap_duty_cycles: Vec::new(),
            active_duty_cycles: Vec::new(),
            min_overlap_duty_cycles: Vec::new(),
            tie_breakers: Vec::new(),
            overlaps: Vec::new(),
            overlaps_pct: Vec::new(),
            boosted_overlaps: Vec::new(),
            active_columns: Buffer::default(),
            rand: Random::new(1),
        }
    }
}

impl SpatialPooler {
    /// Creates and initializes a pooler. A non-positive seed is drawn from the thread generator.
    pub fn new(params: SpatialPoolerParams) -> Result<Self> {
        Self::with_seed_source(params, &mut rand::rng())
    }

    /// Creates and initializes a pooler, drawing the seed from `seeds` when `params.seed <= 0`.
    pub fn with_seed_source<S: SeedSource + ?Sized>(
        params: SpatialPoolerParams,
        seeds: &mut S,
    ) -> Result<Self> {
        let mut pooler = Self::default();
        pooler.initialize(&params, seeds)?;
        Ok(pooler)
    }

    /// (Re)builds every column from `params`:
    /// - Validates the parameters and derives the remaining permanence options.
    /// - Seeds the generator and draws the tie-breakers.
    /// - Samples each column's potential pool and initial permanences.
    /// - Computes the first inhibition radius.
    ///
    /// A failure part-way leaves the pooler unusable until it is initialized again.
    pub fn initialize<S: SeedSource + ?Sized>(
        &mut self,
        params: &SpatialPoolerParams,
        seeds: &mut S,
    ) -> Result<()> {
        params.validate()?;

        self.input_topology = Topology::new(&params.input_dimensions);
        self.column_topology = Topology::new(&params.column_dimensions);
        self.num_inputs = self.input_topology.size();
        self.num_columns = self.column_topology.size();

        self.rand = if params.seed > 0 {
            Random::new(params.seed as u64)
        } else {
            Random::from_source(seeds)
        };

        self.potential_radius = params.potential_radius.min(self.num_inputs);
        self.potential_percentage = params.potential_pct;
        self.global_inhibition = params.global_inhibition;
        self.num_active_columns_per_inh_area = params.num_active_columns_per_inh_area;
        self.local_area_density = params.local_area_density;
        self.stimulus_threshold = params.stimulus_threshold;
        self.permanence_options = PermanenceOptions::new(
            params.syn_perm_inactive_dec,
            params.syn_perm_active_inc,
            params.syn_perm_connected,
        );
        self.min_percentage_overlap_duty_cycles = params.min_pct_overlap_duty_cycles;
        self.duty_cycle_period = params.duty_cycle_period;
        self.boost_strength = params.boost_strength;
        self.sp_verbosity = params.sp_verbosity;
        self.wrap_around = params.wrap_around;
        self.update_period = 50;
        self.init_connected_percentage = 0.5;
        self.iteration_num = 0;
        self.iteration_learn_num = 0;

        self.tie_breakers = (0..self.num_columns)
            .map(|_| (0.01 * self.rand.get_real64()) as f32)
            .collect();

        self.synapses = Synapses::new(self.num_columns, self.num_inputs);
        self.overlap_duty_cycles = vec![0.0; self.num_columns];
        self.active_duty_cycles = vec![0.0; self.num_columns];
        self.min_overlap_duty_cycles = vec![0.0; self.num_columns];
        self.boost_factors = vec![1.0; self.num_columns];
        self.reset_transient_state();

        self.inhibition_radius = 0;
        self.connect_and_configure_inputs()?;
        self.update_inhibition_radius();

        debug!(
            "spatial pooler initialized: {} columns over {} inputs, seed {}, inhibition radius {}",
            self.num_columns,
            self.num_inputs,
            self.rand.seed(),
            self.inhibition_radius
        );
        if self.sp_verbosity > 0 {
            self.log_parameters();
        }

        Ok(())
    }

    /// Sizes the per-call buffers for the current column count.
    pub(crate) fn reset_transient_state(&mut self) {
        self.overlaps = vec![0; self.num_columns];
        self.overlaps_pct = vec![0.0; self.num_columns];
        self.boosted_overlaps = vec![0.0; self.num_columns];
        self.active_columns.reset(self.num_columns);
    }

    /// Samples and configures every column's potential pool and initial permanences:
    /// - Calls `map_potential()` for each column to select which input indices are in its pool.
    /// - Draws initial permanences based on `init_connected_percentage`.
    /// - Raises the column until at least `stimulus_threshold` synapses are connected.
    fn connect_and_configure_inputs(&mut self) -> Result<()> {
        for column in 0..self.num_columns {
            let potential = self.map_potential(column, self.wrap_around)?;
            let mut perm = Synapses::init_permanences(
                self.num_inputs,
                &potential,
                self.init_connected_percentage,
                &self.permanence_options,
                &mut self.rand,
            );
            self.synapses.set_potential(column, &potential);
            self.synapses.update_column_permanences(
                column,
                &mut perm,
                true,
                self.stimulus_threshold,
                &self.permanence_options,
            )?;
        }
        Ok(())
    }

    /// Input index at the center of `column`'s receptive field:
    /// - Scales each column coordinate by `input_dim / column_dim`.
    /// - Offsets by half a column so the centers are spread evenly.
    /// - Floors and flattens the result.
    pub fn map_column(&self, column: usize) -> Result<usize> {
        self.check_column(column)?;
        let coords: Vec<usize> = self
            .column_topology
            .coordinates(column)
            .into_iter()
            .zip(self.column_topology.dims())
            .zip(self.input_topology.dims())
            .map(|((index, &col_dim), &in_dim)| {
                let scaled = (index as f64 + 0.5) * (in_dim as f64 / col_dim as f64);
                (scaled.floor() as usize).min(in_dim - 1)
            })
            .collect();
        Ok(self.input_topology.index_from_coordinates(&coords))
    }

    /// Samples which input bits a column may connect to:
    /// - Finds the column's center input via `map_column()`.
    /// - Collects the input neighborhood of `potential_radius` around it.
    /// - Keeps `round(neighborhood size * potential_percentage)` of them, chosen by the generator.
    ///
    /// Returns the ascending input indices of the potential pool.
    pub fn map_potential(&mut self, column: usize, wrap_around: bool) -> Result<Vec<usize>> {
        let center = self.map_column(column)?;
        let neighborhood: Vec<usize> = self
            .input_topology
            .neighborhood(center, self.potential_radius, wrap_around)
            .collect();

        let size = self.potential_synapses(neighborhood.len());
        let mut potential = self.rand.sample(&neighborhood, size)?;
        potential.sort_unstable();
        Ok(potential)
    }

    /// How many potential synapses a column gets out of a neighborhood of `neighborhood_size` inputs.
    #[inline]
    pub fn potential_synapses(&self, neighborhood_size: usize) -> usize {
        let size = (neighborhood_size as f64 * self.potential_percentage as f64).round() as usize;
        size.min(neighborhood_size)
    }

    /// Processes the current `input_pattern` and writes the active columns into `active`:
    /// - Bumps the iteration counters.
    /// - Calculates overlaps between columns and the input.
    /// - Boosts the overlaps while learning.
    /// - Performs inhibition to pick the active columns.
    ///
    /// When `learn` is set it also:
    /// - Updates synapse permanence values.
    /// - Updates duty cycles and bumps weak columns.
    /// - Recomputes boost factors.
    /// - Periodically recomputes the inhibition radius and minimum duty cycles.
    pub fn compute(&mut self, input_pattern: &[bool], learn: bool, active: &mut [bool]) -> Result<()> {
        if input_pattern.len() != self.num_inputs {
            return Err(SpatialPoolerError::InputLength {
                expected: self.num_inputs,
                actual: input_pattern.len(),
            });
        }
        if active.len() != self.num_columns {
            return Err(SpatialPoolerError::InputLength {
                expected: self.num_columns,
                actual: active.len(),
            });
        }

        self.update_iteration_number(learn);
        self.calculate_overlaps(input_pattern);
        self.calculate_overlaps_pct();
        self.boost(learn);
        self.inhibit_columns()?;

        active.fill(false);
        for &column in self.active_columns.as_slice() {
            active[column] = true;
        }

        if learn {
            self.adapt_synapses(input_pattern)?;
            self.update_duty_cycles(active);
            self.bump_up_weak_columns()?;
            self.update_boost_factors();
            if self.is_update_round() {
                self.update_inhibition_radius();
                self.update_min_duty_cycles();
            }
        }

        Ok(())
    }

    /// Increments the global iteration counter, and the learning counter if `learn` is true.
    #[inline]
    fn update_iteration_number(&mut self, learn: bool) {
        self.iteration_num += 1;
        if learn {
            self.iteration_learn_num += 1;
        }
    }

    /// Counts how many connected synapses map to an active input bit, for every column.
    #[inline]
    fn calculate_overlaps(&mut self, input_pattern: &[bool]) {
        self.synapses.overlaps(input_pattern, &mut self.overlaps);
    }

    /// Overlap relative to the number of connected synapses, 0 for columns with none.
    fn calculate_overlaps_pct(&mut self) {
        let counts = self.synapses.connected_counts();
        self.overlaps_pct
            .iter_mut()
            .zip(&self.overlaps)
            .zip(counts)
            .for_each(|((pct, &overlap), &count)| {
                *pct = if count == 0 {
                    0.0
                } else {
                    overlap as f32 / count as f32
                };
            });
    }

    /// Multiplies each column's overlap by its boost factor (if learning is on).
    ///
    /// Without learning the boosted overlaps equal the raw overlaps.
    #[inline]
    fn boost(&mut self, learn: bool) {
        for ((boosted, &overlap), &factor) in self
            .boosted_overlaps
            .iter_mut()
            .zip(&self.overlaps)
            .zip(&self.boost_factors)
        {
            *boosted = if learn {
                overlap as f32 * factor
            } else {
                overlap as f32
            };
        }
    }

    /// Fraction of columns that should be active per inhibition area with the current radius.
    #[inline]
    pub fn target_density(&self) -> f32 {
        self.inhibition_target().value()
    }

    #[inline]
    fn inhibition_target(&self) -> TargetDensity {
        inhibition::target_density(
            self.num_active_columns_per_inh_area,
            self.local_area_density,
            self.inhibition_radius,
            &self.column_topology,
        )
    }

    /// True when the inhibition radius spans the whole column space.
    #[inline]
    fn uses_global_inhibition(&self) -> bool {
        self.global_inhibition || self.inhibition_radius > self.column_topology.max_dimension()
    }

    /// Picks the active columns from the boosted overlaps, globally or locally.
    fn inhibit_columns(&mut self) -> Result<()> {
        let density = self.inhibition_target();
        let threshold = self.stimulus_threshold as f32;

        if self.uses_global_inhibition() {
            inhibition::inhibit_global(
                &self.boosted_overlaps,
                density,
                threshold,
                &mut self.active_columns,
            )
        } else {
            inhibition::inhibit_local(
                &self.boosted_overlaps,
                density.value(),
                threshold,
                self.inhibition_radius,
                &self.column_topology,
                self.wrap_around,
                &mut self.active_columns,
            );
            Ok(())
        }
    }

    /// Adjusts synapses for each active column after an input is processed:
    /// - Increments permanence of potential synapses whose input bit was active.
    /// - Decrements permanence of potential synapses whose input bit was inactive.
    /// - Raises the column back to `stimulus_threshold` connected synapses and clips the values.
    ///
    /// Winners drift towards the inputs they respond to.
    fn adapt_synapses(&mut self, input_pattern: &[bool]) -> Result<()> {
        let increment = self.permanence_options.active_increment;
        let decrement = self.permanence_options.inactive_decrement;

        for k in 0..self.active_columns.len() {
            let column = self.active_columns.as_slice()[k];
            let mut perm = self.synapses.permanence_dense(column);
            for &input in self.synapses.potential(column) {
                if input_pattern[input] {
                    perm[input] += increment;
                } else {
                    perm[input] -= decrement;
                }
            }
            self.synapses.update_column_permanences(
                column,
                &mut perm,
                true,
                self.stimulus_threshold,
                &self.permanence_options,
            )?;
        }

        Ok(())
    }

    /// Updates the rolling duty cycles for overlap and active states.
    ///
    /// Both are exponential moving averages with period `min(duty_cycle_period, iteration_num)`.
    fn update_duty_cycles(&mut self, active: &[bool]) {
        let period = self.duty_cycle_period.min(self.iteration_num).max(1) as f32;

        for (duty, &overlap) in self.overlap_duty_cycles.iter_mut().zip(&self.overlaps) {
            let value = if overlap > 0 { 1.0 } else { 0.0 };
            *duty = (*duty * (period - 1.0) + value) / period;
        }
        for (duty, &is_active) in self.active_duty_cycles.iter_mut().zip(active) {
            let value = if is_active { 1.0 } else { 0.0 };
            *duty = (*duty * (period - 1.0) + value) / period;
        }
    }

    /// Rescues columns whose overlap duty cycle fell under their minimum:
    /// - For each column whose overlap duty cycle is below its minimum, bumps every potential synapse.
    /// - Writes the column back without raising it to the stimulus threshold.
    ///
    /// Such columns eventually connect to enough inputs to compete again.
    fn bump_up_weak_columns(&mut self) -> Result<()> {
        let increment = self.permanence_options.below_stimulus_increment;

        for column in 0..self.num_columns {
            if self.overlap_duty_cycles[column] >= self.min_overlap_duty_cycles[column] {
                continue;
            }
            let mut perm = self.synapses.permanence_dense(column);
            for &input in self.synapses.potential(column) {
                perm[input] += increment;
            }
            self.synapses.update_column_permanences(
                column,
                &mut perm,
                false,
                self.stimulus_threshold,
                &self.permanence_options,
            )?;
        }

        Ok(())
    }

    /// Recalculates each column's boost factor from its active duty cycle:
    /// `exp((target_density - active_duty_cycle) * boost_strength)`.
    ///
    /// The target is the global target density, or with local inhibition the mean active
    /// duty cycle of the column's neighborhood.
    fn update_boost_factors(&mut self) {
        if self.global_inhibition {
            let target = self.target_density();
            for (boost, &active) in self.boost_factors.iter_mut().zip(&self.active_duty_cycles) {
                *boost = ((target - active) * self.boost_strength).exp();
            }
        } else {
            for column in 0..self.num_columns {
                let (sum, count) = self
                    .column_topology
                    .neighborhood(column, self.inhibition_radius, self.wrap_around)
                    .fold((0.0f32, 0usize), |(sum, count), neighbor| {
                        (sum + self.active_duty_cycles[neighbor], count + 1)
                    });
                let target = sum / count.max(1) as f32;
                self.boost_factors[column] =
                    ((target - self.active_duty_cycles[column]) * self.boost_strength).exp();
            }
        }
    }

    /// Recomputes the inhibition radius from the average receptive field size of the columns.
    ///
    /// With global inhibition the radius is the largest column dimension.
    pub fn update_inhibition_radius(&mut self) {
        let previous = self.inhibition_radius;

        if self.global_inhibition {
            self.inhibition_radius = self.column_topology.max_dimension();
        } else {
            let connected_span = (0..self.num_columns)
                .map(|column| self.avg_connected_span_for_column(column))
                .sum::<f64>()
                / self.num_columns as f64;
            let diameter = connected_span * self.avg_columns_per_input();
            let radius = ((diameter - 1.0) / 2.0).max(1.0);
            self.inhibition_radius = radius.round() as usize;
        }

        if previous != self.inhibition_radius {
            trace!(
                "inhibition radius {} -> {}",
                previous,
                self.inhibition_radius
            );
        }
    }

    /// Mean per-axis ratio of column dimension to input dimension.
    pub fn avg_columns_per_input(&self) -> f64 {
        let ratios = self
            .column_topology
            .dims()
            .iter()
            .zip(self.input_topology.dims())
            .map(|(&col, &input)| col as f64 / input as f64);
        ratios.sum::<f64>() / self.column_topology.rank() as f64
    }

    /// Mean per-axis span (max - min + 1) of the connected inputs of `column`, 0 if none are connected.
    pub fn avg_connected_span_for_column(&self, column: usize) -> f64 {
        let connected = self.synapses.connected(column);
        if connected.is_empty() {
            return 0.0;
        }

        let rank = self.input_topology.rank();
        let mut min_coord = vec![usize::MAX; rank];
        let mut max_coord = vec![0usize; rank];

        for &input in connected {
            for (axis, coord) in self.input_topology.coordinates(input).into_iter().enumerate() {
                min_coord[axis] = min_coord[axis].min(coord);
                max_coord[axis] = max_coord[axis].max(coord);
            }
        }

        let total_span: usize = min_coord
            .iter()
            .zip(&max_coord)
            .map(|(&lo, &hi)| hi - lo + 1)
            .sum();
        total_span as f64 / rank as f64
    }

    /// Updates each column's minimum overlap duty cycle to a fraction of the best
    /// overlap duty cycle in its inhibition area (the whole pooler under global inhibition).
    fn update_min_duty_cycles(&mut self) {
        if self.uses_global_inhibition() {
            let max_overlap = self
                .overlap_duty_cycles
                .iter()
                .fold(0.0f32, |acc, &x| acc.max(x));
            self.min_overlap_duty_cycles
                .fill(self.min_percentage_overlap_duty_cycles * max_overlap);
        } else {
            for column in 0..self.num_columns {
                let max_overlap = self
                    .column_topology
                    .neighborhood(column, self.inhibition_radius, self.wrap_around)
                    .fold(0.0f32, |acc, neighbor| {
                        acc.max(self.overlap_duty_cycles[neighbor])
                    });
                self.min_overlap_duty_cycles[column] =
                    max_overlap * self.min_percentage_overlap_duty_cycles;
            }
        }
    }

    #[inline]
    fn is_update_round(&self) -> bool {
        self.iteration_num % self.update_period == 0
    }

    /// Zeroes every output bit whose column has never been active while learning.
    pub fn strip_unlearned_columns(&self, active: &mut [bool]) {
        for (bit, &duty) in active.iter_mut().zip(&self.active_duty_cycles) {
            if duty == 0.0 {
                *bit = false;
            }
        }
    }

    /// Logs every creation parameter at info level.
    pub fn log_parameters(&self) {
        info!("------------ SpatialPooler Parameters ------------");
        info!("iterationNum                = {}", self.iteration_num);
        info!("iterationLearnNum           = {}", self.iteration_learn_num);
        info!("numInputs                   = {}", self.num_inputs);
        info!("numColumns                  = {}", self.num_columns);
        info!("numActiveColumnsPerInhArea  = {}", self.num_active_columns_per_inh_area);
        info!("potentialPct                = {}", self.potential_percentage);
        info!("globalInhibition            = {}", self.global_inhibition);
        info!("localAreaDensity            = {}", self.local_area_density);
        info!("stimulusThreshold           = {}", self.stimulus_threshold);
        info!("synPermActiveInc            = {}", self.permanence_options.active_increment);
        info!("synPermInactiveDec          = {}", self.permanence_options.inactive_decrement);
        info!("synPermConnected            = {}", self.permanence_options.connected);
        info!("minPctOverlapDutyCycles     = {}", self.min_percentage_overlap_duty_cycles);
        info!("dutyCyclePeriod             = {}", self.duty_cycle_period);
        info!("boostStrength               = {}", self.boost_strength);
        info!("spVerbosity                 = {}", self.sp_verbosity);
        info!("wrapAround                  = {}", self.wrap_around);
        info!("seed                        = {}", self.rand.seed());
        info!("version                     = {}", self.version);
    }

    fn check_column(&self, column: usize) -> Result<()> {
        if column < self.num_columns {
            Ok(())
        } else {
            Err(SpatialPoolerError::ColumnOutOfRange {
                column,
                num_columns: self.num_columns,
            })
        }
    }

    fn check_len(&self, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(SpatialPoolerError::InputLength { expected, actual })
        }
    }
}

// Parameter accessors.
impl SpatialPooler {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn input_dimensions(&self) -> &[usize] {
        self.input_topology.dims()
    }

    pub fn column_dimensions(&self) -> &[usize] {
        self.column_topology.dims()
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn potential_radius(&self) -> usize {
        self.potential_radius
    }

    pub fn set_potential_radius(&mut self, potential_radius: usize) {
        self.potential_radius = potential_radius;
    }

    pub fn potential_pct(&self) -> f32 {
        self.potential_percentage
    }

    pub fn set_potential_pct(&mut self, potential_pct: f32) {
        self.potential_percentage = potential_pct;
    }

    pub fn global_inhibition(&self) -> bool {
        self.global_inhibition
    }

    pub fn set_global_inhibition(&mut self, global_inhibition: bool) {
        self.global_inhibition = global_inhibition;
    }

    pub fn num_active_columns_per_inh_area(&self) -> u32 {
        self.num_active_columns_per_inh_area
    }

    /// Switches sparsity control to a fixed count per inhibition area; clears `local_area_density`.
    pub fn set_num_active_columns_per_inh_area(&mut self, count: u32) -> Result<()> {
        if count == 0 {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "num_active_columns_per_inh_area",
                message: "must be positive".to_string(),
            });
        }
        self.num_active_columns_per_inh_area = count;
        self.local_area_density = 0.0;
        Ok(())
    }

    pub fn local_area_density(&self) -> f32 {
        self.local_area_density
    }

    /// Switches sparsity control to a fixed density; clears `num_active_columns_per_inh_area`.
    pub fn set_local_area_density(&mut self, density: f32) -> Result<()> {
        if !(density > 0.0 && density <= 1.0) {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "local_area_density",
                message: format!("{} is outside (0, 1]", density),
            });
        }
        self.local_area_density = density;
        self.num_active_columns_per_inh_area = 0;
        Ok(())
    }

    pub fn stimulus_threshold(&self) -> u32 {
        self.stimulus_threshold
    }

    pub fn set_stimulus_threshold(&mut self, threshold: u32) {
        self.stimulus_threshold = threshold;
    }

    pub fn inhibition_radius(&self) -> usize {
        self.inhibition_radius
    }

    pub fn set_inhibition_radius(&mut self, radius: usize) {
        self.inhibition_radius = radius;
    }

    pub fn duty_cycle_period(&self) -> u32 {
        self.duty_cycle_period
    }

    pub fn set_duty_cycle_period(&mut self, period: u32) -> Result<()> {
        if period == 0 {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "duty_cycle_period",
                message: "must be at least 1".to_string(),
            });
        }
        self.duty_cycle_period = period;
        Ok(())
    }

    pub fn boost_strength(&self) -> f32 {
        self.boost_strength
    }

    pub fn set_boost_strength(&mut self, strength: f32) {
        self.boost_strength = strength;
    }

    pub fn iteration_num(&self) -> u32 {
        self.iteration_num
    }

    pub fn set_iteration_num(&mut self, iteration: u32) {
        self.iteration_num = iteration;
    }

    pub fn iteration_learn_num(&self) -> u32 {
        self.iteration_learn_num
    }

    pub fn set_iteration_learn_num(&mut self, iteration: u32) {
        self.iteration_learn_num = iteration;
    }

    pub fn sp_verbosity(&self) -> u32 {
        self.sp_verbosity
    }

    pub fn set_sp_verbosity(&mut self, verbosity: u32) {
        self.sp_verbosity = verbosity;
    }

    pub fn wrap_around(&self) -> bool {
        self.wrap_around
    }

    pub fn set_wrap_around(&mut self, wrap_around: bool) {
        self.wrap_around = wrap_around;
    }

    pub fn update_period(&self) -> u32 {
        self.update_period
    }

    pub fn set_update_period(&mut self, period: u32) -> Result<()> {
        if period == 0 {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "update_period",
                message: "must be at least 1".to_string(),
            });
        }
        self.update_period = period;
        Ok(())
    }

    pub fn init_connected_pct(&self) -> f32 {
        self.init_connected_percentage
    }

    pub fn permanence_options(&self) -> &PermanenceOptions {
        &self.permanence_options
    }

    pub fn syn_perm_trim_threshold(&self) -> f32 {
        self.permanence_options.trim_threshold
    }

    pub fn set_syn_perm_trim_threshold(&mut self, value: f32) {
        self.permanence_options.trim_threshold = value;
    }

    pub fn syn_perm_active_inc(&self) -> f32 {
        self.permanence_options.active_increment
    }

    pub fn set_syn_perm_active_inc(&mut self, value: f32) {
        self.permanence_options.active_increment = value;
    }

    pub fn syn_perm_inactive_dec(&self) -> f32 {
        self.permanence_options.inactive_decrement
    }

    pub fn set_syn_perm_inactive_dec(&mut self, value: f32) {
        self.permanence_options.inactive_decrement = value;
    }

    pub fn syn_perm_below_stimulus_inc(&self) -> f32 {
        self.permanence_options.below_stimulus_increment
    }

    pub fn set_syn_perm_below_stimulus_inc(&mut self, value: f32) {
        self.permanence_options.below_stimulus_increment = value;
    }

    pub fn syn_perm_connected(&self) -> f32 {
        self.permanence_options.connected
    }

    pub fn set_syn_perm_connected(&mut self, value: f32) {
        self.permanence_options.connected = value;
    }

    pub fn syn_perm_min(&self) -> f32 {
        self.permanence_options.min
    }

    pub fn syn_perm_max(&self) -> f32 {
        self.permanence_options.max
    }

    pub fn set_syn_perm_max(&mut self, value: f32) {
        self.permanence_options.max = value;
    }

    pub fn min_pct_overlap_duty_cycles(&self) -> f32 {
        self.min_percentage_overlap_duty_cycles
    }

    pub fn set_min_pct_overlap_duty_cycles(&mut self, value: f32) {
        self.min_percentage_overlap_duty_cycles = value;
    }

    /// The pooler's generator, e.g. to compare two poolers' random streams.
    pub fn rng(&self) -> &Random {
        &self.rand
    }
}

// Per-column state.
impl SpatialPooler {
    pub fn boost_factors(&self) -> &[f32] {
        &self.boost_factors
    }

    pub fn set_boost_factors(&mut self, values: &[f32]) -> Result<()> {
        self.check_len(self.num_columns, values.len())?;
        self.boost_factors.copy_from_slice(values);
        Ok(())
    }

    pub fn overlap_duty_cycles(&self) -> &[f32] {
        &self.overlap_duty_cycles
    }

    pub fn set_overlap_duty_cycles(&mut self, values: &[f32]) -> Result<()> {
        self.check_len(self.num_columns, values.len())?;
        self.overlap_duty_cycles.copy_from_slice(values);
        Ok(())
    }

    pub fn active_duty_cycles(&self) -> &[f32] {
        &self.active_duty_cycles
    }

    pub fn set_active_duty_cycles(&mut self, values: &[f32]) -> Result<()> {
        self.check_len(self.num_columns, values.len())?;
        self.active_duty_cycles.copy_from_slice(values);
        Ok(())
    }

    pub fn min_overlap_duty_cycles(&self) -> &[f32] {
        &self.min_overlap_duty_cycles
    }

    pub fn set_min_overlap_duty_cycles(&mut self, values: &[f32]) -> Result<()> {
        self.check_len(self.num_columns, values.len())?;
        self.min_overlap_duty_cycles.copy_from_slice(values);
        Ok(())
    }

    pub fn tie_breakers(&self) -> &[f32] {
        &self.tie_breakers
    }

    /// Dense potential pool membership of `column`.
    pub fn potential(&self, column: usize) -> Result<Vec<bool>> {
        self.check_column(column)?;
        Ok(self.synapses.potential_dense(column))
    }

    /// Replaces the potential pool of `column` from a dense mask.
    pub fn set_potential(&mut self, column: usize, potential: &[bool]) -> Result<()> {
        self.check_column(column)?;
        self.check_len(self.num_inputs, potential.len())?;
        self.synapses.set_potential_dense(column, potential);
        Ok(())
    }

    /// Dense permanence row of `column`.
    pub fn permanence(&self, column: usize) -> Result<Vec<f32>> {
        self.check_column(column)?;
        Ok(self.synapses.permanence_dense(column))
    }

    /// Writes a dense permanence row for `column` without raising it to the stimulus threshold.
    /// Values outside the column's potential pool are dropped.
    pub fn set_permanence(&mut self, column: usize, permanences: &[f32]) -> Result<()> {
        self.check_column(column)?;
        self.check_len(self.num_inputs, permanences.len())?;

        let mut perm = vec![0.0; self.num_inputs];
        for &input in self.synapses.potential(column) {
            perm[input] = permanences[input];
        }
        self.synapses.update_column_permanences(
            column,
            &mut perm,
            false,
            self.stimulus_threshold,
            &self.permanence_options,
        )
    }

    /// Dense connected-synapse mask of `column`.
    pub fn connected_synapses(&self, column: usize) -> Result<Vec<bool>> {
        self.check_column(column)?;
        Ok(self.synapses.connected_dense(column))
    }

    pub fn connected_counts(&self) -> &[u32] {
        self.synapses.connected_counts()
    }

    /// Raw overlaps of the last `compute` call.
    pub fn overlaps(&self) -> &[u32] {
        &self.overlaps
    }

    /// Overlaps of the last `compute` call as a fraction of each column's connected synapses.
    pub fn overlaps_pct(&self) -> &[f32] {
        &self.overlaps_pct
    }

    /// Overlaps of the last `compute` call after boosting.
    pub fn boosted_overlaps(&self) -> &[f32] {
        &self.boosted_overlaps
    }

    /// Ascending indices of the columns activated by the last `compute` call.
    pub fn active_columns(&self) -> &[usize] {
        self.active_columns.as_slice()
    }

    pub fn synapses(&self) -> &Synapses {
        &self.synapses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> SpatialPoolerParams {
        SpatialPoolerParams {
            input_dimensions: vec![4],
            column_dimensions: vec![4],
            potential_radius: 4,
            potential_pct: 1.0,
            global_inhibition: true,
            num_active_columns_per_inh_area: 1,
            stimulus_threshold: 0,
            seed: 42,
            ..Default::default()
        }
    }

    fn pooler(params: SpatialPoolerParams) -> SpatialPooler {
        SpatialPooler::new(params).unwrap()
    }

    #[test]
    fn test_create_spatial_pooler() {
        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10, 10],
            column_dimensions: vec![20, 20],
            ..Default::default()
        });

        assert_eq!(sp.num_inputs(), 100);
        assert_eq!(sp.num_columns(), 400);
        assert_eq!(sp.inhibition_radius(), 20);
        assert_eq!(sp.boost_factors(), vec![1.0; 400].as_slice());
        assert!(sp.tie_breakers().iter().all(|&t| (0.0..0.01).contains(&t)));
    }

    #[test]
    fn test_single_winner_end_to_end() {
        let mut sp = pooler(small_params());
        let input = [true, false, false, false];
        let mut active = [false; 4];

        sp.compute(&input, false, &mut active).unwrap();

        assert_eq!(active.iter().filter(|&&a| a).count(), 1);
        let winner = sp.active_columns()[0];
        let best = *sp.overlaps().iter().max().unwrap();
        assert_eq!(best, 1);
        assert_eq!(sp.overlaps()[winner], best);
        // Equal overlaps go to the lower column.
        assert_eq!(winner, 0);
        assert!(sp.connected_synapses(winner).unwrap()[0]);
    }

    #[test]
    fn test_map_column_spreads_centers() {
        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![12],
            column_dimensions: vec![4],
            potential_radius: 2,
            ..small_params()
        });
        let centers: Vec<usize> = (0..4).map(|c| sp.map_column(c).unwrap()).collect();
        assert_eq!(centers, vec![1, 4, 7, 10]);
        assert!(matches!(
            sp.map_column(4),
            Err(SpatialPoolerError::ColumnOutOfRange { column: 4, num_columns: 4 })
        ));

        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![4, 6],
            column_dimensions: vec![2, 3],
            potential_radius: 2,
            ..small_params()
        });
        // Column (1, 2) maps to input (3, 5).
        assert_eq!(sp.map_column(5).unwrap(), 3 * 6 + 5);
        assert_eq!(sp.map_column(0).unwrap(), 7);
    }

    #[test]
    fn test_map_potential_rejects_unknown_column() {
        let mut sp = pooler(small_params());
        let rng_before = sp.rng().clone();

        assert!(matches!(
            sp.map_potential(4, true),
            Err(SpatialPoolerError::ColumnOutOfRange { column: 4, .. })
        ));
        assert_eq!(sp.rng(), &rng_before);

        assert_eq!(sp.map_potential(1, true).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_potential_pool_size() {
        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![100],
            column_dimensions: vec![50],
            potential_radius: 10,
            potential_pct: 0.5,
            wrap_around: true,
            ..small_params()
        });
        for column in 0..sp.num_columns() {
            let pool = sp.potential(column).unwrap();
            assert_eq!(pool.iter().filter(|&&p| p).count(), 11);
        }
    }

    #[test]
    fn test_permanences_only_inside_potential_pool() {
        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![30],
            column_dimensions: vec![10],
            potential_radius: 5,
            potential_pct: 0.6,
            ..small_params()
        });
        let trim = sp.syn_perm_trim_threshold();
        for column in 0..sp.num_columns() {
            let pool = sp.potential(column).unwrap();
            let perm = sp.permanence(column).unwrap();
            for (input, &p) in perm.iter().enumerate() {
                if !pool[input] {
                    assert_eq!(p, 0.0);
                }
                assert!(p == 0.0 || p >= trim);
                assert!(p <= sp.syn_perm_max());
            }
        }
    }

    #[test]
    fn test_stimulus_threshold_reached_after_init() {
        let sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![40],
            column_dimensions: vec![20],
            potential_radius: 10,
            potential_pct: 0.5,
            stimulus_threshold: 5,
            ..small_params()
        });
        assert!(sp.connected_counts().iter().all(|&c| c >= 5));
    }

    #[test]
    fn test_unreachable_stimulus_threshold_fails() {
        let result = SpatialPooler::new(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![5],
            potential_radius: 1,
            potential_pct: 1.0,
            stimulus_threshold: 4,
            ..small_params()
        });
        assert!(matches!(
            result,
            Err(SpatialPoolerError::UnreachableStimulusThreshold { .. })
        ));
    }

    #[test]
    fn test_invalid_params() {
        let cases = [
            SpatialPoolerParams {
                input_dimensions: vec![],
                ..small_params()
            },
            SpatialPoolerParams {
                input_dimensions: vec![2, 2],
                ..small_params()
            },
            SpatialPoolerParams {
                potential_pct: 0.0,
                ..small_params()
            },
            SpatialPoolerParams {
                potential_pct: 1.5,
                ..small_params()
            },
            SpatialPoolerParams {
                num_active_columns_per_inh_area: 0,
                local_area_density: 0.7,
                ..small_params()
            },
            SpatialPoolerParams {
                column_dimensions: vec![0],
                ..small_params()
            },
        ];
        for params in cases {
            assert!(SpatialPooler::new(params).is_err());
        }
    }

    #[test]
    fn test_global_inhibition_with_zero_winners_fails() {
        let mut sp = pooler(SpatialPoolerParams {
            num_active_columns_per_inh_area: 0,
            local_area_density: 0.1,
            ..small_params()
        });
        let mut active = [false; 4];
        let result = sp.compute(&[true, true, false, false], false, &mut active);
        assert!(matches!(
            result,
            Err(SpatialPoolerError::NotEnoughColumns { .. })
        ));
    }

    #[test]
    fn test_compute_rejects_wrong_lengths() {
        let mut sp = pooler(small_params());
        let mut active = [false; 4];
        assert!(sp.compute(&[true; 3], false, &mut active).is_err());
        let mut short = [false; 3];
        assert!(sp.compute(&[true; 4], false, &mut short).is_err());
    }

    #[test]
    fn test_learning_counters_and_duty_cycles() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![20],
            column_dimensions: vec![10],
            potential_radius: 20,
            num_active_columns_per_inh_area: 2,
            ..small_params()
        });
        let input: Vec<bool> = (0..20).map(|i| i % 3 == 0).collect();
        let mut active = vec![false; 10];

        sp.compute(&input, true, &mut active).unwrap();
        sp.compute(&input, false, &mut active).unwrap();

        assert_eq!(sp.iteration_num(), 2);
        assert_eq!(sp.iteration_learn_num(), 1);
        assert!(sp.active_duty_cycles().iter().all(|&d| (0.0..=1.0).contains(&d)));
        let active_sum: f32 = sp.active_duty_cycles().iter().sum();
        assert!((active_sum - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_adapt_synapses_moves_permanences() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![8],
            column_dimensions: vec![2],
            potential_radius: 8,
            num_active_columns_per_inh_area: 1,
            ..small_params()
        });
        let input = [true, true, true, true, false, false, false, false];
        let mut active = [false; 2];

        let before: Vec<Vec<f32>> = (0..2).map(|c| sp.permanence(c).unwrap()).collect();
        sp.compute(&input, true, &mut active).unwrap();
        let winner = sp.active_columns()[0];
        let after = sp.permanence(winner).unwrap();
        let pool = sp.potential(winner).unwrap();

        for input_index in 0..8 {
            if !pool[input_index] {
                continue;
            }
            let old = before[winner][input_index];
            let new = after[input_index];
            if input[input_index] {
                assert!(new >= old);
            } else {
                assert!(new <= old);
            }
        }
    }

    #[test]
    fn test_set_permanence_drops_values_outside_pool() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![5],
            potential_radius: 1,
            ..small_params()
        });
        sp.set_permanence(2, &[0.5; 10]).unwrap();

        let pool = sp.potential(2).unwrap();
        let perm = sp.permanence(2).unwrap();
        let connected = sp.connected_synapses(2).unwrap();
        for input in 0..10 {
            assert_eq!(perm[input] > 0.0, pool[input]);
            assert_eq!(connected[input], pool[input]);
        }
        assert_eq!(
            sp.connected_counts()[2] as usize,
            pool.iter().filter(|&&p| p).count()
        );
        assert!(sp.permanence(5).is_err());
    }

    #[test]
    fn test_boost_factors_follow_activity() {
        let mut sp = pooler(SpatialPoolerParams {
            boost_strength: 10.0,
            ..small_params()
        });
        sp.set_active_duty_cycles(&[0.0, 0.25, 0.5, 1.0]).unwrap();
        sp.update_boost_factors();

        let boosts = sp.boost_factors();
        assert!((boosts[1] - 1.0).abs() < 1e-6);
        assert!(boosts[0] > boosts[1] && boosts[1] > boosts[2] && boosts[2] > boosts[3]);
        assert!(boosts.iter().all(|&b| b >= 0.0));
    }

    #[test]
    fn test_local_boost_uses_neighborhood_mean() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![10],
            potential_radius: 3,
            global_inhibition: false,
            boost_strength: 1.0,
            wrap_around: false,
            ..small_params()
        });
        sp.set_inhibition_radius(1);
        let duty = [0.0, 0.3, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.6];
        sp.set_active_duty_cycles(&duty).unwrap();
        sp.update_boost_factors();

        let expected_first = ((0.3f32 / 2.0 - 0.0) * 1.0).exp();
        assert!((sp.boost_factors()[0] - expected_first).abs() < 1e-6);
        let expected_last = ((0.6f32 / 2.0 - 0.6) * 1.0).exp();
        assert!((sp.boost_factors()[9] - expected_last).abs() < 1e-6);
        assert!((sp.boost_factors()[5] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inhibition_radius_global_is_max_dimension() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![8, 12],
            column_dimensions: vec![5, 7],
            potential_radius: 3,
            ..small_params()
        });
        sp.set_inhibition_radius(0);
        sp.update_inhibition_radius();
        assert_eq!(sp.inhibition_radius(), 7);
    }

    #[test]
    fn test_inhibition_radius_local_tracks_connected_span() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![20],
            column_dimensions: vec![20],
            potential_radius: 20,
            global_inhibition: false,
            num_active_columns_per_inh_area: 1,
            ..small_params()
        });

        // Every column connected to inputs 5..=13: span 9, one column per input.
        for column in 0..20 {
            let mut potential = vec![false; 20];
            let mut perm = vec![0.0; 20];
            for input in 5..=13 {
                potential[input] = true;
                perm[input] = 0.5;
            }
            sp.set_potential(column, &potential).unwrap();
            sp.set_permanence(column, &perm).unwrap();
        }
        sp.update_inhibition_radius();
        assert_eq!(sp.inhibition_radius(), 4);
        assert!((sp.avg_connected_span_for_column(3) - 9.0).abs() < 1e-9);
        assert!((sp.avg_columns_per_input() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_avg_connected_span_multi_dimensional() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![6, 6],
            column_dimensions: vec![3, 3],
            potential_radius: 6,
            ..small_params()
        });
        let mut perm = vec![0.0; 36];
        perm[1 * 6 + 1] = 0.6;
        perm[3 * 6 + 4] = 0.6;
        sp.set_permanence(0, &perm).unwrap();

        // The pool covers the whole input, so both synapses stay connected.
        // Row span 3, column span 4.
        assert_eq!(sp.connected_counts()[0], 2);
        assert!((sp.avg_connected_span_for_column(0) - 3.5).abs() < 1e-9);

        sp.set_permanence(1, &vec![0.0; 36]).unwrap();
        assert_eq!(sp.avg_connected_span_for_column(1), 0.0);
        assert!((sp.avg_columns_per_input() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_bump_up_weak_columns_raises_pool_only() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![5],
            potential_radius: 3,
            ..small_params()
        });
        // No column could reach this many connected synapses, so nothing may be raised to it.
        sp.set_stimulus_threshold(10);

        let mut before = Vec::new();
        for column in 0..5 {
            let perm: Vec<f32> = (0..10).map(|i| if i % 2 == 0 { 0.3 } else { 0.0 }).collect();
            sp.set_permanence(column, &perm).unwrap();
            before.push(sp.permanence(column).unwrap());
        }
        sp.set_overlap_duty_cycles(&[0.0; 5]).unwrap();
        sp.set_min_overlap_duty_cycles(&[0.0, 0.5, 0.5, 0.5, 0.5]).unwrap();

        sp.bump_up_weak_columns().unwrap();

        let increment = sp.syn_perm_below_stimulus_inc();
        assert!(increment < sp.syn_perm_trim_threshold());
        assert_eq!(sp.permanence(0).unwrap(), before[0]);
        for column in 1..5 {
            let pool = sp.potential(column).unwrap();
            let perm = sp.permanence(column).unwrap();
            for input in 0..10 {
                if pool[input] && before[column][input] > 0.0 {
                    assert!((perm[input] - (0.3 + increment)).abs() < 1e-6);
                } else {
                    // Untouched outside the pool, trimmed back to zero inside it.
                    assert_eq!(perm[input], 0.0);
                }
            }
        }
    }

    #[test]
    fn test_min_duty_cycles_global() {
        let mut sp = pooler(SpatialPoolerParams {
            min_pct_overlap_duty_cycles: 0.5,
            ..small_params()
        });
        sp.set_overlap_duty_cycles(&[0.2, 0.8, 0.0, 0.4]).unwrap();
        sp.update_min_duty_cycles();
        assert!(sp.min_overlap_duty_cycles().iter().all(|&m| (m - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_min_duty_cycles_follow_overlap_during_learning() {
        let mut sp = pooler(SpatialPoolerParams {
            min_pct_overlap_duty_cycles: 0.25,
            ..small_params()
        });
        sp.set_update_period(1).unwrap();

        let mut active = [false; 4];
        sp.compute(&[true, true, false, false], true, &mut active).unwrap();

        let best = sp.overlap_duty_cycles().iter().fold(0.0f32, |acc, &d| acc.max(d));
        assert!(best > 0.0);
        for &min in sp.min_overlap_duty_cycles() {
            assert!((min - 0.25 * best).abs() < 1e-6);
        }
    }

    #[test]
    fn test_min_duty_cycles_local() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![10],
            potential_radius: 3,
            global_inhibition: false,
            wrap_around: false,
            min_pct_overlap_duty_cycles: 0.5,
            ..small_params()
        });
        sp.set_inhibition_radius(1);
        let duty = [0.1, 0.0, 0.0, 0.6, 0.0, 0.2, 0.0, 0.0, 0.0, 0.8];
        sp.set_overlap_duty_cycles(&duty).unwrap();
        sp.update_min_duty_cycles();

        for column in 0usize..10 {
            let lo = column.saturating_sub(1);
            let hi = (column + 1).min(9);
            let best = duty[lo..=hi].iter().fold(0.0f32, |acc, &d| acc.max(d));
            assert!((sp.min_overlap_duty_cycles()[column] - 0.5 * best).abs() < 1e-6);
        }
        assert!((sp.min_overlap_duty_cycles()[1] - 0.05).abs() < 1e-6);
        assert_eq!(sp.min_overlap_duty_cycles()[7], 0.0);
    }

    #[test]
    fn test_duty_cycles_average_over_period() {
        let mut sp = pooler(SpatialPoolerParams {
            column_dimensions: vec![3],
            ..small_params()
        });
        sp.set_duty_cycle_period(2).unwrap();

        let overlaps = [[1, 0, 0], [0, 1, 0], [1, 1, 1]];
        let active = [[true, false, false], [true, false, false], [false, false, true]];
        let expected_overlap = [[1.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.75, 0.75, 0.5]];
        let expected_active = [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 0.0, 0.5]];

        for step in 0..3 {
            sp.iteration_num += 1;
            sp.overlaps.copy_from_slice(&overlaps[step]);
            sp.update_duty_cycles(&active[step]);

            for column in 0..3 {
                let overlap_duty = sp.overlap_duty_cycles()[column];
                let active_duty = sp.active_duty_cycles()[column];
                assert!((overlap_duty - expected_overlap[step][column]).abs() < 1e-6);
                assert!((active_duty - expected_active[step][column]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_huge_inhibition_radius_falls_back_to_global() {
        let mut sp = pooler(SpatialPoolerParams {
            input_dimensions: vec![10],
            column_dimensions: vec![10],
            potential_radius: 3,
            global_inhibition: false,
            num_active_columns_per_inh_area: 2,
            boost_strength: 1.0,
            ..small_params()
        });
        sp.set_inhibition_radius(usize::MAX);
        sp.set_update_period(1).unwrap();

        let mut active = [false; 10];
        let input = [true, false, true, false, true, false, true, false, true, false];
        sp.compute(&input, true, &mut active).unwrap();

        assert_eq!(active.iter().filter(|&&a| a).count(), 2);
        assert!(sp.inhibition_radius() <= 10);
    }

    #[test]
    fn test_strip_unlearned_columns() {
        let mut sp = pooler(small_params());
        sp.set_active_duty_cycles(&[0.0, 0.1, 0.0, 0.2]).unwrap();
        let mut active = [true, true, true, false];
        sp.strip_unlearned_columns(&mut active);
        assert_eq!(active, [false, true, false, false]);
    }

    #[test]
    fn test_setters_enforce_exclusive_sparsity_modes() {
        let mut sp = pooler(small_params());
        sp.set_local_area_density(0.25).unwrap();
        assert_eq!(sp.num_active_columns_per_inh_area(), 0);
        assert!(sp.set_local_area_density(0.0).is_err());

        sp.set_num_active_columns_per_inh_area(2).unwrap();
        assert_eq!(sp.local_area_density(), 0.0);
        assert!(sp.set_num_active_columns_per_inh_area(0).is_err());
        assert!(sp.set_boost_factors(&[1.0; 3]).is_err());
    }
}
