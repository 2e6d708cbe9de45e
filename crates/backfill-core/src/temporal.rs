//! Temporal distribution: the random walk that decides when commits happen.
//!
//! Starting at the range start, each step advances by a drawn number of days
//! and, if still inside the range, emits a drawn number of commit instants on
//! that day. Gaps are at least one day, so the walk always terminates.

use std::collections::VecDeque;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{BackfillError, Result};
use crate::source::{Draw, Interval, IntervalSource};

/// Inclusive calendar range. Invariant: `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(BackfillError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies within the range, bounds included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

const MINUTES: Interval = Interval { min: 0, max: 59 };

/// Shape parameters of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionParams {
    /// Days advanced per step.
    pub gap_days: Interval,
    /// Commits emitted on each active day.
    pub commits_per_day: Interval,
    /// Hours of the day commits may land in.
    pub working_hours: Interval,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self {
            gap_days: Interval { min: 1, max: 3 },
            commits_per_day: Interval { min: 1, max: 2 },
            working_hours: Interval { min: 9, max: 21 },
        }
    }
}

impl DistributionParams {
    pub fn validate(&self) -> Result<()> {
        self.gap_days.validate("gap_days")?;
        self.commits_per_day.validate("commits_per_day")?;
        self.working_hours.validate("working_hours")?;

        // A zero gap would never leave the current day.
        if self.gap_days.min == 0 {
            return Err(BackfillError::InvalidInterval {
                name: "gap_days".to_string(),
                min: self.gap_days.min,
                max: self.gap_days.max,
            });
        }
        if self.commits_per_day.min == 0 {
            return Err(BackfillError::InvalidInterval {
                name: "commits_per_day".to_string(),
                min: self.commits_per_day.min,
                max: self.commits_per_day.max,
            });
        }
        if self.working_hours.max > 23 {
            return Err(BackfillError::InvalidInterval {
                name: "working_hours".to_string(),
                min: self.working_hours.min,
                max: self.working_hours.max,
            });
        }
        Ok(())
    }
}

/// Finite iterator over commit instants, in generation order.
///
/// Dates never decrease; instants within one day come out in the order they
/// were drawn, not sorted by time of day.
pub struct TemporalDistribution<'a, S: IntervalSource + ?Sized> {
    range: DateRange,
    params: DistributionParams,
    source: &'a mut S,
    current: NaiveDate,
    pending: VecDeque<NaiveDateTime>,
    exhausted: bool,
}

impl<'a, S: IntervalSource + ?Sized> TemporalDistribution<'a, S> {
    /// Start a walk over `range`. Parameters are validated up front.
    pub fn new(range: DateRange, params: DistributionParams, source: &'a mut S) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            range,
            params,
            source,
            current: range.start(),
            pending: VecDeque::new(),
            exhausted: false,
        })
    }

    fn advance(&mut self) -> bool {
        let gap = self.source.draw(Draw::DayGap, self.params.gap_days);
        let next = match self.current.checked_add_days(Days::new(u64::from(gap))) {
            Some(date) if date <= self.range.end() => date,
            _ => return false,
        };
        self.current = next;

        let count = self.source.draw(Draw::DayCommits, self.params.commits_per_day);
        for _ in 0..count {
            let hour = self.source.draw(Draw::Hour, self.params.working_hours);
            let minute = self.source.draw(Draw::Minute, MINUTES);
            let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
            self.pending.push_back(next.and_time(time));
        }
        true
    }
}

impl<S: IntervalSource + ?Sized> Iterator for TemporalDistribution<'_, S> {
    type Item = NaiveDateTime;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(instant) = self.pending.pop_front() {
                return Some(instant);
            }
            if self.exhausted {
                return None;
            }
            if !self.advance() {
                self.exhausted = true;
            }
        }
    }
}

/// Collect the whole walk over `range`.
pub fn generate(
    range: DateRange,
    params: DistributionParams,
    source: &mut dyn IntervalSource,
) -> Result<Vec<NaiveDateTime>> {
    Ok(TemporalDistribution::new(range, params, source)?.collect())
}
