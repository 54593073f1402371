//! Core types for score resolution

use scraper::ElementRef;
use serde::{Deserialize, Serialize};

/// Resolution tier enumeration
///
/// Tiers are tried in order and the first one yielding a pair wins:
/// - Document: element selectors against the whole document
/// - Container: element selectors scoped to the first matching container
/// - Heuristic: text/class scan over generic text-bearing elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Document,
    Container,
    Heuristic,
}

impl ResolutionTier {
    /// Get tier name as string
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionTier::Document => "document",
            ResolutionTier::Container => "container",
            ResolutionTier::Heuristic => "heuristic",
        }
    }

    /// Get all tiers in fallback order
    pub fn fallback_chain() -> Vec<ResolutionTier> {
        vec![
            ResolutionTier::Document,
            ResolutionTier::Container,
            ResolutionTier::Heuristic,
        ]
    }
}

/// Static selector configuration, never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorStrategy {
    /// Score element selectors, highest priority first
    pub score_elements: Vec<String>,

    /// Containers that usually wrap the score, highest priority first
    pub score_containers: Vec<String>,

    /// Element selectors tried inside a container; defaults to `score_elements`
    pub scoped_elements: Option<Vec<String>>,

    /// Generic text-bearing elements scanned by the heuristic tier
    pub fallback_scan: String,

    /// Class/id substrings an element must carry to survive the heuristic tier
    pub fallback_class_patterns: Vec<String>,
}

impl Default for SelectorStrategy {
    fn default() -> Self {
        Self {
            score_elements: vec![
                r#"h3[class*="FactionsDetails__FactionScore"]"#.to_string(),
                r#"h3[class*="MatchScore__"]"#.to_string(),
                ".score-display h3".to_string(),
                r#"[data-testid="team-score"]"#.to_string(),
            ],
            score_containers: vec![
                r#"[class*="FactionsDetails__Container"]"#.to_string(),
                r#"[class*="Header__Container"]"#.to_string(),
                r#"[class*="MatchHeader__"]"#.to_string(),
                ".match-score-container".to_string(),
            ],
            scoped_elements: None,
            fallback_scan: "h3, div, span".to_string(),
            fallback_class_patterns: vec![
                "FactionsDetails__".to_string(),
                "MatchScore__".to_string(),
                "TeamScore__".to_string(),
            ],
        }
    }
}

impl SelectorStrategy {
    /// Element selectors used by the container tier
    pub fn scoped_elements(&self) -> &[String] {
        self.scoped_elements
            .as_deref()
            .unwrap_or(&self.score_elements)
    }
}

/// The two score-bearing elements, in document order.
#[derive(Debug, Clone, Copy)]
pub struct ScorePair<'a> {
    pub first: ElementRef<'a>,
    pub second: ElementRef<'a>,
    pub tier: ResolutionTier,
}

impl<'a> ScorePair<'a> {
    /// Extracted score strings for both participants
    pub fn scores(&self) -> (String, String) {
        (score_text(self.first), score_text(self.second))
    }
}

/// Owned resolution result, detached from the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScore {
    pub team_a: String,
    pub team_b: String,
    pub tier: ResolutionTier,
}

/// Where the mutation observer should be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveTarget {
    /// First container selector with a match
    Container(String),

    /// No container present; watch the whole body
    Body,
}

/// Trimmed text content of an element, `"0"` when blank.
pub fn score_text(element: ElementRef<'_>) -> String {
    let text: String = element.text().collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
