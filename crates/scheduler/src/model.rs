use std::time::Duration;

use scorebridge_core_types::ScorePayload;
use scorebridge_event_bus::PublishReport;
use scorebridge_selector::ResolutionTier;
use serde::{Deserialize, Serialize};

/// What asked for an extraction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Trigger {
    Initial,
    Poll,
    Mutation,
    Visibility,
    Manual,
}

impl Trigger {
    pub fn name(self) -> &'static str {
        match self {
            Trigger::Initial => "initial",
            Trigger::Poll => "poll",
            Trigger::Mutation => "mutation",
            Trigger::Visibility => "visibility",
            Trigger::Manual => "manual",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    #[serde(with = "millis")]
    pub update_interval: Duration,
    /// Reload intervals below this are treated as disabled.
    #[serde(with = "millis")]
    pub min_reload_interval: Duration,
    pub bus_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(100),
            min_reload_interval: Duration::from_secs(5),
            bus_capacity: 64,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// Result of one extract-and-propagate cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// Another extraction was in flight.
    Skipped,
    NotFound,
    Extracted {
        payload: ScorePayload,
        tier: ResolutionTier,
        changed: bool,
        sounded: bool,
        rendered: bool,
        report: PublishReport,
    },
}

impl ExtractionOutcome {
    pub fn payload(&self) -> Option<&ScorePayload> {
        match self {
            ExtractionOutcome::Extracted { payload, .. } => Some(payload),
            _ => None,
        }
    }

    pub fn sounded(&self) -> bool {
        matches!(self, ExtractionOutcome::Extracted { sounded: true, .. })
    }
}
