//! Persistence for `SpatialPooler`.
//!
//! Two formats are supported:
//! - A whitespace-separated text stream framed by `SpatialPooler` / `~SpatialPooler` markers.
//!   Reals are written in their shortest round-trip form, so `load(save(sp))` restores every
//!   parameter, duty cycle, synapse and the generator bit-for-bit.
//! - A compact binary snapshot of the whole instance via `bincode`.
//!
//! Version 1 text streams predate `wrap_around`; loading one sets it to `true`.

use super::{
    random::Random,
    spatial_pooler::{SpatialPooler, VERSION},
    synapses::{PermanenceOptions, Synapses},
    topology::Topology,
};
use crate::error::{Result, SpatialPoolerError};
use log::debug;
use std::io::{Read, Write};
use std::str::{FromStr, SplitWhitespace};

const START_MARKER: &str = "SpatialPooler";
const END_MARKER: &str = "~SpatialPooler";

impl SpatialPooler {
    /// Writes the full state as text.
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let options = &self.permanence_options;

        writeln!(writer, "{}", START_MARKER)?;
        writeln!(writer, "{}", self.version)?;

        write!(
            writer,
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {} ",
            self.num_inputs,
            self.num_columns,
            self.potential_radius,
            self.potential_percentage,
            self.init_connected_percentage,
            self.global_inhibition as u8,
            self.num_active_columns_per_inh_area,
            self.local_area_density,
            self.stimulus_threshold,
            self.inhibition_radius,
            self.duty_cycle_period,
            self.boost_strength,
            self.iteration_num,
            self.iteration_learn_num,
            self.sp_verbosity,
            self.update_period,
        )?;
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {} {} ",
            options.min,
            options.max,
            options.trim_threshold,
            options.inactive_decrement,
            options.active_increment,
            options.below_stimulus_increment,
            options.connected,
            self.min_percentage_overlap_duty_cycles,
            self.wrap_around as u8,
        )?;

        write_list(writer, self.input_topology.dims(), true)?;
        write_list(writer, self.column_topology.dims(), true)?;

        write_list(writer, &self.boost_factors, false)?;
        write_list(writer, &self.overlap_duty_cycles, false)?;
        write_list(writer, &self.active_duty_cycles, false)?;
        write_list(writer, &self.min_overlap_duty_cycles, false)?;
        write_list(writer, &self.tie_breakers, false)?;

        for column in 0..self.num_columns {
            let potential = self.synapses.potential(column);
            writeln!(writer, "{}", potential.len())?;
            write_list(writer, potential, false)?;
        }
        writeln!(writer)?;

        for column in 0..self.num_columns {
            let row = self.synapses.permanences(column);
            writeln!(writer, "{}", row.len())?;
            for (input, value) in row.iter() {
                write!(writer, "{} {} ", input, value)?;
            }
            writeln!(writer)?;
        }
        writeln!(writer)?;

        writeln!(writer, "{}", self.rand)?;
        writeln!(writer, "{}", END_MARKER)?;

        debug!(
            "saved spatial pooler: {} columns over {} inputs",
            self.num_columns, self.num_inputs
        );
        Ok(())
    }

    /// Reads a pooler written by `save`. Accepts format versions 1 and 2.
    pub fn load<R: Read>(reader: &mut R) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut tokens = Tokens::new(&text);

        tokens.expect(START_MARKER)?;
        let version: u32 = tokens.parse()?;
        if version > VERSION {
            return Err(SpatialPoolerError::UnsupportedVersion {
                found: version,
                supported: VERSION,
            });
        }

        let mut sp = SpatialPooler::default();

        sp.num_inputs = tokens.parse()?;
        sp.num_columns = tokens.parse()?;
        sp.potential_radius = tokens.parse()?;
        sp.potential_percentage = tokens.parse()?;
        sp.init_connected_percentage = tokens.parse()?;
        sp.global_inhibition = tokens.parse_bool()?;
        sp.num_active_columns_per_inh_area = tokens.parse()?;
        sp.local_area_density = tokens.parse()?;
        sp.stimulus_threshold = tokens.parse()?;
        sp.inhibition_radius = tokens.parse()?;
        sp.duty_cycle_period = tokens.parse()?;
        sp.boost_strength = tokens.parse()?;
        sp.iteration_num = tokens.parse()?;
        sp.iteration_learn_num = tokens.parse()?;
        sp.sp_verbosity = tokens.parse()?;
        sp.update_period = tokens.parse()?;

        let min = tokens.parse()?;
        let max = tokens.parse()?;
        let trim_threshold = tokens.parse()?;
        let inactive_decrement = tokens.parse()?;
        let active_increment = tokens.parse()?;
        let below_stimulus_increment = tokens.parse()?;
        let connected = tokens.parse()?;
        sp.permanence_options = PermanenceOptions {
            inactive_decrement,
            active_increment,
            connected,
            below_stimulus_increment,
            min,
            max,
            trim_threshold,
        };
        sp.min_percentage_overlap_duty_cycles = tokens.parse()?;
        sp.wrap_around = if version >= 2 {
            tokens.parse_bool()?
        } else {
            true
        };

        if sp.duty_cycle_period == 0 || sp.update_period == 0 {
            return Err(SpatialPoolerError::Malformed(
                "duty cycle period and update period must be positive".to_string(),
            ));
        }

        let input_dims: Vec<usize> = tokens.parse_counted_list()?;
        let column_dims: Vec<usize> = tokens.parse_counted_list()?;
        validate_dims(&input_dims, sp.num_inputs, "input")?;
        validate_dims(&column_dims, sp.num_columns, "column")?;
        if input_dims.len() != column_dims.len() {
            return Err(SpatialPoolerError::DimensionMismatch {
                input: input_dims.len(),
                columns: column_dims.len(),
            });
        }
        sp.input_topology = Topology::new(&input_dims);
        sp.column_topology = Topology::new(&column_dims);

        sp.boost_factors = tokens.parse_list(sp.num_columns)?;
        sp.overlap_duty_cycles = tokens.parse_list(sp.num_columns)?;
        sp.active_duty_cycles = tokens.parse_list(sp.num_columns)?;
        sp.min_overlap_duty_cycles = tokens.parse_list(sp.num_columns)?;
        sp.tie_breakers = tokens.parse_list(sp.num_columns)?;

        sp.synapses = Synapses::new(sp.num_columns, sp.num_inputs);
        for column in 0..sp.num_columns {
            let potential: Vec<usize> = tokens.parse_counted_list()?;
            if let Some(&input) = potential.iter().find(|&&i| i >= sp.num_inputs) {
                return Err(SpatialPoolerError::Malformed(format!(
                    "potential input {} of column {} exceeds {} inputs",
                    input, column, sp.num_inputs
                )));
            }
            sp.synapses.set_potential(column, &potential);
        }

        for column in 0..sp.num_columns {
            let count: usize = tokens.parse()?;
            let mut perm = vec![0.0f32; sp.num_inputs];
            for _ in 0..count {
                let input: usize = tokens.parse()?;
                let value: f32 = tokens.parse()?;
                if input >= sp.num_inputs {
                    return Err(SpatialPoolerError::Malformed(format!(
                        "permanence input {} of column {} exceeds {} inputs",
                        input, column, sp.num_inputs
                    )));
                }
                perm[input] = value;
            }
            sp.synapses.update_column_permanences(
                column,
                &mut perm,
                false,
                sp.stimulus_threshold,
                &sp.permanence_options,
            )?;
        }

        sp.rand = Random::from_tokens(&mut tokens.inner)?;
        tokens.expect(END_MARKER)?;

        sp.version = VERSION;
        sp.reset_transient_state();

        debug!(
            "loaded spatial pooler (format version {}): {} columns over {} inputs",
            version, sp.num_columns, sp.num_inputs
        );

        Ok(sp)
    }

    /// Number of bytes `save` writes for the current state.
    pub fn persistent_size(&self) -> Result<usize> {
        let mut counter = ByteCounter::default();
        self.save(&mut counter)?;
        Ok(counter.count)
    }

    /// Encodes the full instance as a binary snapshot.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decodes a snapshot produced by `to_bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let sp: SpatialPooler = bincode::deserialize(bytes)?;
        if sp.version > VERSION {
            return Err(SpatialPoolerError::UnsupportedVersion {
                found: sp.version,
                supported: VERSION,
            });
        }
        Ok(sp)
    }
}

fn write_list<W: Write, T: std::fmt::Display>(
    writer: &mut W,
    values: &[T],
    with_count: bool,
) -> Result<()> {
    if with_count {
        write!(writer, "{} ", values.len())?;
    }
    for value in values {
        write!(writer, "{} ", value)?;
    }
    writeln!(writer)?;
    Ok(())
}

fn validate_dims(dims: &[usize], expected: usize, space: &str) -> Result<()> {
    if dims.is_empty() || dims.contains(&0) {
        return Err(SpatialPoolerError::InvalidDimensions(format!(
            "{} dimensions {:?}",
            space, dims
        )));
    }
    let size = dims
        .iter()
        .try_fold(1usize, |size, &dim| size.checked_mul(dim))
        .ok_or_else(|| {
            SpatialPoolerError::Malformed(format!(
                "{} dimensions {:?} overflow the index space",
                space, dims
            ))
        })?;
    if size != expected {
        return Err(SpatialPoolerError::Malformed(format!(
            "{} dimensions {:?} describe {} elements, header says {}",
            space, dims, size, expected
        )));
    }
    Ok(())
}

/// Counts bytes without storing them.
#[derive(Default)]
struct ByteCounter {
    count: usize,
}

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.count += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Tokens<'a> {
    inner: SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
        }
    }

    fn next_token(&mut self) -> Result<&'a str> {
        self.inner.next().ok_or(SpatialPoolerError::UnexpectedEof)
    }

    fn expect(&mut self, marker: &str) -> Result<()> {
        let found = self.next_token()?;
        if found == marker {
            Ok(())
        } else {
            Err(SpatialPoolerError::MarkerMismatch {
                expected: marker.to_string(),
                found: found.to_string(),
            })
        }
    }

    fn parse<T: FromStr>(&mut self) -> Result<T> {
        let token = self.next_token()?;
        token
            .parse()
            .map_err(|_| SpatialPoolerError::Malformed(format!("unexpected token '{}'", token)))
    }

    fn parse_bool(&mut self) -> Result<bool> {
        match self.next_token()? {
            "1" | "true" => Ok(true),
            "0" | "false" => Ok(false),
            other => Err(SpatialPoolerError::Malformed(format!(
                "expected a boolean, found '{}'",
                other
            ))),
        }
    }

    fn parse_list<T: FromStr>(&mut self, len: usize) -> Result<Vec<T>> {
        (0..len).map(|_| self.parse()).collect()
    }

    fn parse_counted_list<T: FromStr>(&mut self) -> Result<Vec<T>> {
        let len: usize = self.parse()?;
        self.parse_list(len)
    }
}
