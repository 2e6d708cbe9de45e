//! Injectable randomness for history synthesis.
//!
//! Every random decision goes through [`IntervalSource`] so tests can pin the
//! day gap, per-day commit count, hour and minute independently.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{BackfillError, Result};

/// A closed integer interval `min..=max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub min: u32,
    pub max: u32,
}

impl Interval {
    /// Build an interval, rejecting `min > max`.
    pub fn new(name: &str, min: u32, max: u32) -> Result<Self> {
        let interval = Interval { min, max };
        interval.validate(name)?;
        Ok(interval)
    }

    /// Check `min <= max`.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.min > self.max {
            return Err(BackfillError::InvalidInterval {
                name: name.to_string(),
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Clamp `value` into the interval.
    pub fn clamp(&self, value: u32) -> u32 {
        value.clamp(self.min, self.max.max(self.min))
    }
}

/// What a drawn number is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Draw {
    /// Days to advance before the next active day.
    DayGap,
    /// Commits on an active day.
    DayCommits,
    /// Hour of a commit.
    Hour,
    /// Minute of a commit.
    Minute,
}

/// Source of the random decisions made while synthesizing history.
pub trait IntervalSource {
    /// Draw a value in `interval` (inclusive) for the given purpose.
    fn draw(&mut self, kind: Draw, interval: Interval) -> u32;

    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// [`IntervalSource`] backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RandomSource<R = StdRng> {
    rng: R,
}

impl RandomSource<StdRng> {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> RandomSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> IntervalSource for RandomSource<R> {
    fn draw(&mut self, _kind: Draw, interval: Interval) -> u32 {
        self.rng.gen_range(interval.min..=interval.max)
    }

    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Deterministic [`IntervalSource`] for tests.
///
/// Each [`Draw`] kind replays its own sequence (cycling); kinds without a
/// sequence return the interval minimum. Values are clamped into the
/// requested interval.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    draws: HashMap<Draw, (Vec<u32>, usize)>,
    picks: Vec<usize>,
    pick_pos: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always return `value` for `kind`.
    pub fn fix(self, kind: Draw, value: u32) -> Self {
        self.sequence(kind, vec![value])
    }

    /// Cycle through `values` for `kind`.
    pub fn sequence(mut self, kind: Draw, values: Vec<u32>) -> Self {
        if !values.is_empty() {
            self.draws.insert(kind, (values, 0));
        }
        self
    }

    /// Cycle through `indices` for [`IntervalSource::pick`], taken modulo `len`.
    pub fn picks(mut self, indices: Vec<usize>) -> Self {
        self.picks = indices;
        self.pick_pos = 0;
        self
    }
}

impl IntervalSource for ScriptedSource {
    fn draw(&mut self, kind: Draw, interval: Interval) -> u32 {
        match self.draws.get_mut(&kind) {
            Some((values, pos)) => {
                let value = values[*pos % values.len()];
                *pos += 1;
                interval.clamp(value)
            }
            None => interval.min,
        }
    }

    fn pick(&mut self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let index = self.picks[self.pick_pos % self.picks.len()];
        self.pick_pos += 1;
        index % len
    }
}
