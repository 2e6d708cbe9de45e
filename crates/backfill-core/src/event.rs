//! Commit events: one synthesized (timestamp, message) pair per history entry.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::source::IntervalSource;
use crate::temporal::{DateRange, DistributionParams, TemporalDistribution};
use crate::vocabulary::MessageSynthesizer;

/// Timestamp format used for `GIT_AUTHOR_DATE` / `GIT_COMMITTER_DATE`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One history entry to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitEvent {
    pub timestamp: NaiveDateTime,
    pub message: String,
}

impl CommitEvent {
    pub fn new(timestamp: NaiveDateTime, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }

    /// Local wall-clock timestamp, second precision, no offset.
    pub fn git_date(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Walk `range` and attach a fresh message to every instant, in generation order.
pub fn synthesize_history(
    range: DateRange,
    params: DistributionParams,
    synthesizer: &MessageSynthesizer,
    source: &mut dyn IntervalSource,
) -> Result<Vec<CommitEvent>> {
    let instants: Vec<NaiveDateTime> =
        TemporalDistribution::new(range, params, &mut *source)?.collect();

    let events = instants
        .into_iter()
        .map(|timestamp| CommitEvent::new(timestamp, synthesizer.synthesize(source)))
        .collect();

    Ok(events)
}
