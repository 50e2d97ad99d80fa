pub mod inhibition;
pub mod random;
pub mod serialization;
pub mod sparse;
pub mod spatial_pooler;
pub mod synapses;
pub mod topology;
