//! Score pair resolver with fallback chain orchestration

use std::sync::Arc;

use scraper::Html;
use tracing::{debug, trace};

use crate::{errors::SelectorError, strategies::*, types::*};

/// Resolves the two score elements of a document.
pub struct ScoreResolver {
    tiers: Vec<Box<dyn Tier>>,
    containers: Arc<Vec<CompiledSelector>>,
}

impl ScoreResolver {
    /// Compile a strategy into a resolver; invalid selectors are rejected up front.
    pub fn new(strategy: &SelectorStrategy) -> Result<Self, SelectorError> {
        if strategy.score_elements.is_empty() {
            return Err(SelectorError::EmptyStrategy(
                "no score element selectors configured".to_string(),
            ));
        }

        let elements = Arc::new(compile_all(&strategy.score_elements)?);
        let containers = Arc::new(compile_all(&strategy.score_containers)?);
        let scoped = compile_all(strategy.scoped_elements())?;
        let scan = CompiledSelector::parse(&strategy.fallback_scan)?;

        let tiers: Vec<Box<dyn Tier>> = ResolutionTier::fallback_chain()
            .into_iter()
            .map(|tier| -> Box<dyn Tier> {
                match tier {
                    ResolutionTier::Document => Box::new(DocumentTier::new(elements.clone())),
                    ResolutionTier::Container => {
                        Box::new(ContainerTier::new(containers.clone(), scoped.clone()))
                    }
                    ResolutionTier::Heuristic => Box::new(HeuristicTier::new(
                        scan.clone(),
                        strategy.fallback_class_patterns.clone(),
                    )),
                }
            })
            .collect();

        Ok(Self { tiers, containers })
    }

    /// Find the score pair; first tier with two matches wins, results are never merged.
    pub fn find_score_pair<'a>(&self, document: &'a Html) -> Option<ScorePair<'a>> {
        for tier in &self.tiers {
            trace!("trying tier: {}", tier.name());
            if let Some((first, second)) = tier.find(document) {
                debug!("score pair resolved by {} tier", tier.name());
                return Some(ScorePair {
                    first,
                    second,
                    tier: tier.tier(),
                });
            }
        }
        trace!("all tiers exhausted without a score pair");
        None
    }

    /// Parse a serialized document and extract owned score strings.
    pub fn resolve_html(&self, html: &str) -> Option<ResolvedScore> {
        let document = Html::parse_document(html);
        self.find_score_pair(&document).map(|pair| {
            let (team_a, team_b) = pair.scores();
            ResolvedScore {
                team_a,
                team_b,
                tier: pair.tier,
            }
        })
    }

    /// Best subtree for mutation observation: first present container, else body.
    pub fn observe_target(&self, document: &Html) -> ObserveTarget {
        self.containers
            .iter()
            .find(|compiled| document.select(compiled.selector()).next().is_some())
            .map(|compiled| ObserveTarget::Container(compiled.source().to_string()))
            .unwrap_or(ObserveTarget::Body)
    }

    /// [`Self::observe_target`] over a serialized document.
    pub fn observe_target_html(&self, html: &str) -> ObserveTarget {
        self.observe_target(&Html::parse_document(html))
    }
}

/// One-shot resolution with a freshly compiled strategy.
pub fn find_score_pair<'a>(
    document: &'a Html,
    strategy: &SelectorStrategy,
) -> Result<Option<ScorePair<'a>>, SelectorError> {
    let resolver = ScoreResolver::new(strategy)?;
    Ok(resolver.find_score_pair(document))
}
