//! Deterministic pseudo-random number generator owned by each Spatial Pooler.
//!
//! The generator is an additive lagged-Fibonacci generator over a 31-word state
//! (the classic BSD `random()` scheme). It is cheap to copy, compares by value and
//! serializes to a short token list, which lets a saved pooler resume its random
//! stream exactly where it stopped.
//!
//! Seeding is explicit. Instead of a process-wide default generator, callers that
//! want "some seed" pass a [`SeedSource`]; every `rand::RngCore` already is one.

use crate::error::{Result, SpatialPoolerError};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

const STATE_SIZE: usize = 31;
const SEPARATION: usize = 3;
const MAX32: u32 = u32::MAX;
const IMPL_VERSION: u32 = 2;

/// Supplies seeds for generators constructed without an explicit one.
pub trait SeedSource {
    /// Returns the next seed. Zero is allowed; the caller redraws.
    fn next_seed(&mut self) -> u64;
}

impl<R: RngCore> SeedSource for R {
    fn next_seed(&mut self) -> u64 {
        self.next_u64()
    }
}

/// A seeded pseudo-random number generator with reproducible, serializable state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Random {
    seed: u64,
    state: Vec<u32>,
    rptr: usize,
    fptr: usize,
}

impl Random {
    /// Creates a generator from a non-zero seed.
    ///
    /// A zero seed leaves the whole state at zero and the stream constant,
    /// use [`Random::from_source`] when no fixed seed is wanted.
    pub fn new(seed: u64) -> Self {
        debug_assert!(seed != 0, "a zero seed produces a constant stream");

        let mut state = vec![0u32; STATE_SIZE];
        state[0] = (seed % MAX32 as u64) as u32;
        for i in 1..STATE_SIZE {
            // state[i] = (16807 * state[i - 1]) % 2147483647 without overflowing 31 bits.
            let quot = (state[i - 1] / 127_773) as i32;
            let rem = (state[i - 1] % 127_773) as i32;
            let test = 16_807 * rem - 2_836 * quot;
            let value = test as i64 + if test < 0 { 2_147_483_647 } else { 0 };
            state[i] = (value as u64 % MAX32 as u64) as u32;
        }

        let mut rng = Self {
            seed,
            state,
            rptr: 0,
            fptr: SEPARATION,
        };

        for _ in 0..10 * STATE_SIZE {
            rng.next_raw();
        }

        rng
    }

    /// Creates a generator seeded from `source`, redrawing until the seed is non-zero.
    pub fn from_source<S: SeedSource + ?Sized>(source: &mut S) -> Self {
        let mut seed = source.next_seed();
        while seed == 0 {
            seed = source.next_seed();
        }
        Self::new(seed)
    }

    /// The seed this generator was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Advances the state and returns 31 random bits.
    fn next_raw(&mut self) -> u32 {
        let sum = (self.state[self.fptr] as u64 + self.state[self.rptr] as u64) % MAX32 as u64;
        self.state[self.fptr] = sum as u32;
        let value = (self.state[self.fptr] >> 1) & 0x7fff_ffff;

        self.fptr += 1;
        if self.fptr >= STATE_SIZE {
            self.fptr = 0;
            self.rptr += 1;
        } else {
            self.rptr += 1;
            if self.rptr >= STATE_SIZE {
                self.rptr = 0;
            }
        }

        value
    }

    /// Uniform integer in `[0, max)`. `max` must be positive.
    pub fn get_u32(&mut self, max: u32) -> u32 {
        debug_assert!(max > 0);
        let smax = MAX32 - (MAX32 % max);
        loop {
            let sample = self.next_raw();
            if sample <= smax {
                return sample % max;
            }
        }
    }

    /// Uniform integer in `[0, max)` built from two draws. `max` must be positive.
    pub fn get_u64(&mut self, max: u64) -> u64 {
        debug_assert!(max > 0);
        let smax = u64::MAX - (u64::MAX % max);
        loop {
            let lo = self.next_raw() as u64;
            let hi = self.next_raw() as u64;
            let sample = lo | (hi << 32);
            if sample <= smax {
                return sample % max;
            }
        }
    }

    /// Uniform real in `[0, 1)` with 48 bits of mantissa.
    pub fn get_real64(&mut self) -> f64 {
        const MANTISSA_BITS: i32 = 48;
        let value = self.get_u64(1u64 << MANTISSA_BITS);
        value as f64 / (1u64 << MANTISSA_BITS) as f64
    }

    /// Selects `count` elements of `population` without replacement, preserving their relative order.
    ///
    /// Each element is considered once and taken with probability
    /// `still_needed / still_available`, so exactly `count` elements are returned.
    pub fn sample<T: Copy>(&mut self, population: &[T], count: usize) -> Result<Vec<T>> {
        if count > population.len() {
            return Err(SpatialPoolerError::InvalidParameter {
                name: "count",
                message: format!(
                    "cannot sample {} elements from a population of {}",
                    count,
                    population.len()
                ),
            });
        }

        let mut chosen = Vec::with_capacity(count);
        let total = population.len();
        for (i, &item) in population.iter().enumerate() {
            if chosen.len() == count {
                break;
            }
            let available = (total - i) as u32;
            if (self.get_u32(available) as usize) < count - chosen.len() {
                chosen.push(item);
            }
        }

        Ok(chosen)
    }

    /// Reads a generator from the token stream written by its `Display` impl.
    pub(crate) fn from_tokens<'a, I>(tokens: &mut I) -> Result<Self>
    where
        I: Iterator<Item = &'a str>,
    {
        let mut next = || tokens.next().ok_or(SpatialPoolerError::UnexpectedEof);

        expect_marker(next()?, "random-v1")?;
        let seed = parse(next()?)?;

        let marker = next()?;
        match marker {
            "RandomImpl" => {
                let version: u32 = parse(next()?)?;
                if version != IMPL_VERSION {
                    return Err(SpatialPoolerError::UnsupportedVersion {
                        found: version,
                        supported: IMPL_VERSION,
                    });
                }
            }
            "randomimpl-v1" => {}
            other => {
                return Err(SpatialPoolerError::MarkerMismatch {
                    expected: "RandomImpl".to_string(),
                    found: other.to_string(),
                })
            }
        }

        let size: usize = parse(next()?)?;
        if size != STATE_SIZE {
            return Err(SpatialPoolerError::Malformed(format!(
                "random state size {} (expected {})",
                size, STATE_SIZE
            )));
        }

        let mut state = Vec::with_capacity(STATE_SIZE);
        for _ in 0..STATE_SIZE {
            let word: i64 = parse(next()?)?;
            state.push(word as u32);
        }

        let rptr: usize = parse(next()?)?;
        let fptr: usize = parse(next()?)?;
        if rptr >= STATE_SIZE || fptr >= STATE_SIZE {
            return Err(SpatialPoolerError::Malformed(format!(
                "random pointers out of range: rptr {} fptr {}",
                rptr, fptr
            )));
        }

        expect_marker(next()?, "endrandom-v1")?;

        Ok(Self {
            seed,
            state,
            rptr,
            fptr,
        })
    }
}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        let hi = self.next_raw();
        let lo = self.next_raw();
        (hi << 16) ^ lo
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl fmt::Display for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "random-v1 {} RandomImpl {} {} ",
            self.seed, IMPL_VERSION, STATE_SIZE
        )?;
        for word in &self.state {
            write!(f, "{} ", word)?;
        }
        write!(f, "{} {} endrandom-v1", self.rptr, self.fptr)
    }
}

fn expect_marker(found: &str, expected: &str) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(SpatialPoolerError::MarkerMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn parse<T: std::str::FromStr>(token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| SpatialPoolerError::Malformed(format!("unexpected token '{}'", token)))
}
