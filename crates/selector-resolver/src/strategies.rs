//! Resolution tiers
//!
//! Three tiers in fallback order:
//! 1. Document - score selectors against the whole document
//! 2. Container - score selectors scoped to the first matching container
//! 3. Heuristic - standalone integer text on elements with score-like classes

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::{errors::SelectorError, types::*};

static STANDALONE_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+\b").expect("static integer pattern"));

/// A parsed selector that remembers its source text for diagnostics.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    source: String,
    selector: Selector,
}

impl CompiledSelector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let selector =
            Selector::parse(source).map_err(|err| SelectorError::InvalidSelector {
                selector: source.to_string(),
                reason: format!("{err:?}"),
            })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

pub(crate) fn compile_all(sources: &[String]) -> Result<Vec<CompiledSelector>, SelectorError> {
    sources.iter().map(|s| CompiledSelector::parse(s)).collect()
}

/// Tier trait for score pair resolution
pub trait Tier: Send + Sync {
    /// Attempt to find two score elements using this tier only
    fn find<'a>(&self, document: &'a Html) -> Option<(ElementRef<'a>, ElementRef<'a>)>;

    /// Get tier type
    fn tier(&self) -> ResolutionTier;

    /// Get tier name
    fn name(&self) -> &'static str {
        self.tier().name()
    }
}

/// Document-wide selector tier
pub struct DocumentTier {
    elements: Arc<Vec<CompiledSelector>>,
}

impl DocumentTier {
    pub fn new(elements: Arc<Vec<CompiledSelector>>) -> Self {
        Self { elements }
    }
}

impl Tier for DocumentTier {
    fn find<'a>(&self, document: &'a Html) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
        for compiled in self.elements.iter() {
            if let Some(pair) = first_two(document.select(compiled.selector())) {
                debug!("document tier matched selector: {}", compiled.source());
                return Some(pair);
            }
        }
        None
    }

    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Document
    }
}

/// Container-scoped selector tier
pub struct ContainerTier {
    containers: Arc<Vec<CompiledSelector>>,
    elements: Vec<CompiledSelector>,
}

impl ContainerTier {
    pub fn new(containers: Arc<Vec<CompiledSelector>>, elements: Vec<CompiledSelector>) -> Self {
        Self {
            containers,
            elements,
        }
    }
}

impl Tier for ContainerTier {
    fn find<'a>(&self, document: &'a Html) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
        for container_selector in self.containers.iter() {
            let Some(container) = document.select(container_selector.selector()).next() else {
                continue;
            };
            for compiled in &self.elements {
                if let Some(pair) = first_two(container.select(compiled.selector())) {
                    debug!(
                        "container tier matched {} inside {}",
                        compiled.source(),
                        container_selector.source()
                    );
                    return Some(pair);
                }
            }
        }
        None
    }

    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Container
    }
}

/// Text and class heuristic tier
pub struct HeuristicTier {
    scan: CompiledSelector,
    class_patterns: Vec<String>,
}

impl HeuristicTier {
    pub fn new(scan: CompiledSelector, class_patterns: Vec<String>) -> Self {
        Self {
            scan,
            class_patterns,
        }
    }

    fn is_candidate(&self, element: ElementRef<'_>) -> bool {
        let text: String = element.text().collect();
        if !has_standalone_integer(text.trim()) {
            return false;
        }
        let value = element.value();
        let identity = format!(
            "{} {}",
            value.attr("class").unwrap_or_default(),
            value.id().unwrap_or_default()
        );
        self.class_patterns
            .iter()
            .any(|pattern| identity.contains(pattern.as_str()))
    }
}

impl Tier for HeuristicTier {
    fn find<'a>(&self, document: &'a Html) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
        if self.class_patterns.is_empty() {
            return None;
        }
        first_two(
            document
                .select(self.scan.selector())
                .filter(|element| self.is_candidate(*element)),
        )
    }

    fn tier(&self) -> ResolutionTier {
        ResolutionTier::Heuristic
    }
}

/// True when the text contains an integer delimited by word boundaries.
pub fn has_standalone_integer(text: &str) -> bool {
    STANDALONE_INTEGER.is_match(text)
}

/// First two items of a document-ordered match list, or nothing.
fn first_two<'a>(
    mut matches: impl Iterator<Item = ElementRef<'a>>,
) -> Option<(ElementRef<'a>, ElementRef<'a>)> {
    let first = matches.next()?;
    let second = matches.next()?;
    Some((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_predicate() {
        assert!(has_standalone_integer("13"));
        assert!(has_standalone_integer("Round 7"));
        assert!(!has_standalone_integer("Team Liquid"));
        assert!(!has_standalone_integer(""));
    }

    #[test]
    fn invalid_selector_is_reported() {
        let err = CompiledSelector::parse("h3[class*=").unwrap_err();
        assert!(matches!(err, SelectorError::InvalidSelector { .. }));
    }

    #[test]
    fn heuristic_matches_id_as_identity() {
        let html = Html::parse_document(
            r#"<div><span id="TeamScore__left">4</span><span id="TeamScore__right">9</span></div>"#,
        );
        let tier = HeuristicTier::new(
            CompiledSelector::parse("h3, div, span").unwrap(),
            vec!["TeamScore__".to_string()],
        );
        let (a, b) = tier.find(&html).expect("pair");
        assert_eq!(score_text(a), "4");
        assert_eq!(score_text(b), "9");
    }

    #[test]
    fn heuristic_requires_both_text_and_class() {
        let html = Html::parse_document(
            r#"<span class="MatchScore__a">no digits</span><span class="other">5</span>"#,
        );
        let tier = HeuristicTier::new(
            CompiledSelector::parse("h3, div, span").unwrap(),
            vec!["MatchScore__".to_string()],
        );
        assert!(tier.find(&html).is_none());
    }
}
