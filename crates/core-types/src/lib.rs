//! Shared primitives for the ScoreBridge crates.
//!
//! Every browsing context (the source page, the display surface, any other
//! tab) speaks in terms of the types defined here.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Shared error type for the ScoreBridge crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("{message}")]
    Message { message: String },
    #[error("{what} unavailable")]
    Unavailable { what: String },
}

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable { what: what.into() }
    }
}

/// Identity of one execution context (tab, popup, worker).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ContextId(pub String);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One extracted score reading.
///
/// Immutable once built; a newer extraction supersedes it with a fresh value.
/// The serialized shape is the one persisted under the payload storage key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePayload {
    #[serde(rename = "scoreTeam1")]
    pub team_a: String,
    #[serde(rename = "scoreTeam2")]
    pub team_b: String,
    #[serde(rename = "fontSize")]
    pub font_size_px: u32,
    #[serde(rename = "t", default)]
    pub timestamp_ms: i64,
}

impl ScorePayload {
    pub fn new(team_a: impl Into<String>, team_b: impl Into<String>, font_size_px: u32) -> Self {
        Self::at(
            team_a,
            team_b,
            font_size_px,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    pub fn at(
        team_a: impl Into<String>,
        team_b: impl Into<String>,
        font_size_px: u32,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            team_a: team_a.into(),
            team_b: team_b.into(),
            font_size_px,
            timestamp_ms,
        }
    }

    /// Compact `a-b` form used for change detection.
    pub fn score_key(&self) -> String {
        format!("{}-{}", self.team_a, self.team_b)
    }

    /// Text shown on the display surface.
    pub fn display_text(&self) -> String {
        format!("{} - {}", self.team_a, self.team_b)
    }

    /// True when both payloads would render identically (timestamps ignored).
    pub fn same_display(&self, other: &ScorePayload) -> bool {
        self.team_a == other.team_a
            && self.team_b == other.team_b
            && self.font_size_px == other.font_size_px
    }
}

impl fmt::Display for ScorePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}px", self.display_text(), self.font_size_px)
    }
}

/// User preferences shared by every context of the origin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub font_size_px: u32,
    pub sound_enabled: bool,
    pub auto_reload_enabled: bool,
    pub auto_reload_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size_px: 60,
            sound_enabled: true,
            auto_reload_enabled: true,
            auto_reload_seconds: 600,
        }
    }
}

/// Encodes a flag the way every stored boolean is written.
pub fn flag_str(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
