//! Topological Spatial Pooler for Hierarchical Temporal Memory (HTM).
//!
//! The pooler turns binary input vectors into sparse distributed representations (SDRs):
//! a fixed-size set of columns compete for every input and only the best-matching few
//! become active. Learning adapts each column's synapses towards the inputs it wins on,
//! while duty-cycle bookkeeping and boosting keep every column in use.
//!
//! ```no_run
//! use htm_sp::core::spatial_pooler::{SpatialPooler, SpatialPoolerParams};
//!
//! let mut sp = SpatialPooler::new(SpatialPoolerParams {
//!     input_dimensions: vec![28, 28],
//!     column_dimensions: vec![32, 32],
//!     potential_radius: 28 * 28,
//!     num_active_columns_per_inh_area: 40,
//!     seed: 42,
//!     ..Default::default()
//! })?;
//!
//! let input = vec![false; 28 * 28];
//! let mut active = vec![false; 32 * 32];
//! sp.compute(&input, true, &mut active)?;
//! # Ok::<(), htm_sp::error::SpatialPoolerError>(())
//! ```

pub mod core;
pub mod error;

pub use crate::core::spatial_pooler::{SpatialPooler, SpatialPoolerParams};
pub use crate::error::{Result, SpatialPoolerError};
