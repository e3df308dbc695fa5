//! Triage scoring strategies.
//!
//! Two interchangeable scoring backends sit behind one closed sum type:
//! a deterministic rule engine (useful for tests and offline operation) and
//! an LLM-backed scorer. Strategy selection happens at construction time:
//! an unknown discriminator is a configuration error before any scoring
//! call is made.

pub mod llm;
pub mod rules;

pub use llm::LlmStrategy;
pub use rules::RuleBasedStrategy;

use crate::config::GatewayConfig;
use crate::context::TriageRequest;
use crate::error::{GatewayError, GatewayResult};
use triage_types::TriageResult;

/// Scoring-backend discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    Rule,
    Llm,
}

impl std::str::FromStr for StrategyKind {
    type Err = GatewayError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.trim().to_ascii_lowercase().as_str() {
            "rule" => Ok(StrategyKind::Rule),
            "llm" => Ok(StrategyKind::Llm),
            other => Err(GatewayError::Config(format!(
                "unknown triage strategy: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Rule => write!(f, "rule"),
            StrategyKind::Llm => write!(f, "llm"),
        }
    }
}

/// A constructed scoring backend.
#[derive(Clone, Debug)]
pub enum TriageScorer {
    Rule(RuleBasedStrategy),
    Llm(LlmStrategy),
}

impl TriageScorer {
    /// Build the backend for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] when the LLM backend cannot be
    /// constructed.
    pub fn new(kind: StrategyKind, config: &GatewayConfig) -> GatewayResult<Self> {
        match kind {
            StrategyKind::Rule => Ok(TriageScorer::Rule(RuleBasedStrategy)),
            StrategyKind::Llm => Ok(TriageScorer::Llm(LlmStrategy::new(config)?)),
        }
    }

    /// Build the backend named by a string discriminator.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] for an unknown discriminator; this
    /// is the construction-time check that keeps bad configuration from
    /// surfacing mid-request.
    pub fn from_name(name: &str, config: &GatewayConfig) -> GatewayResult<Self> {
        Self::new(name.parse()?, config)
    }

    /// Score a request with whichever backend was selected.
    pub async fn score(&self, request: &TriageRequest) -> GatewayResult<TriageResult> {
        match self {
            TriageScorer::Rule(strategy) => Ok(strategy.score(request)),
            TriageScorer::Llm(strategy) => strategy.score(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_discriminators_case_insensitively() {
        assert_eq!("rule".parse::<StrategyKind>().expect("rule"), StrategyKind::Rule);
        assert_eq!("LLM".parse::<StrategyKind>().expect("llm"), StrategyKind::Llm);
        assert_eq!(" Rule ".parse::<StrategyKind>().expect("rule"), StrategyKind::Rule);
    }

    #[test]
    fn unknown_discriminator_is_a_config_error() {
        let err = "bayes".parse::<StrategyKind>().expect_err("unknown");
        match err {
            GatewayError::Config(msg) => assert!(msg.contains("bayes")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn display_round_trips() {
        for kind in [StrategyKind::Rule, StrategyKind::Llm] {
            let reparsed: StrategyKind = kind.to_string().parse().expect("round trip");
            assert_eq!(reparsed, kind);
        }
    }
}
