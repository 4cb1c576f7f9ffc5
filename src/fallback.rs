//! Fallback orchestration across three understanding stages.
//!
//! The primary (enhanced) classifier is accepted outright when it clears
//! the threshold. Otherwise the secondary (basic) classifier runs, with an
//! entity-presence boost, and the better of the two low candidates wins.
//! If the secondary stage itself fails, an infallible keyword matcher
//! answers. Escalation only ever moves down the chain, and a lower stage
//! never reports higher confidence than an accepted higher stage would have.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::classify::{classify, clamp01, IntentScore};
use crate::entities;
use crate::patterns::{FallbackConfig, PatternLibrary};
use crate::preprocess::Utterance;

/// Stage-level failure. Pattern libraries are validated at load, so these
/// mostly surface from custom stages layered on `run_chain`.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("classifier failure: {0}")]
    Classifier(String),
    #[error("entity extraction failure: {0}")]
    Extraction(String),
}

/// Which stage produced the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Primary,
    Secondary,
    Basic,
}

/// Outcome of the chain, with the degradation reason when any stage was
/// skipped over.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainResult {
    pub intent: String,
    pub confidence: f32,
    pub stage: Stage,
    pub degraded: Option<String>,
}

/// Run the standard three-stage chain over an utterance.
pub fn classify_with_fallback(
    primary: &PatternLibrary,
    secondary: &PatternLibrary,
    utterance: &Utterance,
) -> ChainResult {
    let cfg = primary.fallback();
    run_chain(
        || Ok(classify(primary, &utterance.normalized)),
        || {
            let score = classify(secondary, &utterance.normalized);
            let found_entity = !entities::extract(secondary, &utterance.raw).is_empty();
            Ok((score, found_entity))
        },
        || basic_classify(primary, &utterance.normalized),
        cfg,
    )
}

/// The chain itself, generic over the stage implementations so failing
/// stages can be simulated.
pub fn run_chain<P, S, B>(primary: P, secondary: S, basic: B, cfg: &FallbackConfig) -> ChainResult
where
    P: FnOnce() -> Result<IntentScore, StageError>,
    S: FnOnce() -> Result<(IntentScore, bool), StageError>,
    B: FnOnce() -> IntentScore,
{
    let mut degraded: Option<String> = None;
    let low_primary = match primary() {
        Ok(score) if score.confidence >= cfg.primary_accept => {
            return ChainResult {
                intent: score.intent,
                confidence: clamp01(score.confidence),
                stage: Stage::Primary,
                degraded: None,
            };
        }
        Ok(score) => {
            degraded = Some(format!(
                "primary confidence {:.2} below {:.2}",
                score.confidence, cfg.primary_accept
            ));
            Some(score)
        }
        Err(err) => {
            warn!(target: "nlq::fallback", error = %err, "primary stage failed, escalating");
            degraded = Some(format!("primary stage failed: {err}"));
            None
        }
    };

    match secondary() {
        Ok((mut score, found_entity)) => {
            if found_entity {
                // Boost is monotone: it never lowers an already-high score.
                let boosted = (score.confidence + cfg.entity_boost).min(cfg.boost_cap);
                score.confidence = score.confidence.max(boosted);
            }
            // Keep the primary candidate when it still scored better.
            if let Some(prim) = low_primary {
                if prim.confidence > score.confidence {
                    return ChainResult {
                        intent: prim.intent,
                        confidence: clamp01(prim.confidence),
                        stage: Stage::Secondary,
                        degraded,
                    };
                }
            }
            ChainResult {
                intent: score.intent,
                confidence: clamp01(score.confidence),
                stage: Stage::Secondary,
                degraded,
            }
        }
        Err(err) => {
            warn!(target: "nlq::fallback", error = %err, "secondary stage failed, using basic matcher");
            let score = basic();
            ChainResult {
                intent: score.intent,
                confidence: clamp01(score.confidence),
                stage: Stage::Basic,
                degraded: Some(format!("secondary stage failed: {err}")),
            }
        }
    }
}

/// Last-resort keyword matcher. Scans each intent's keyword list with plain
/// substring tests; never fails and never panics.
pub fn basic_classify(lib: &PatternLibrary, normalized: &str) -> IntentScore {
    let scoring = lib.scoring();
    let cfg = lib.fallback();
    for intent in lib.intents() {
        if intent
            .keywords
            .iter()
            .any(|k| normalized.contains(k.as_str()))
        {
            return IntentScore {
                intent: intent.name.clone(),
                confidence: cfg.basic_confidence,
            };
        }
    }
    IntentScore {
        intent: scoring.default_intent.clone(),
        confidence: scoring.default_confidence.min(cfg.basic_confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess;

    fn libs() -> (PatternLibrary, PatternLibrary) {
        let primary = PatternLibrary::from_toml_str(crate::patterns::DEFAULT_PATTERNS)
            .expect("default patterns");
        let secondary = PatternLibrary::basic().expect("basic patterns");
        (primary, secondary)
    }

    fn cfg() -> FallbackConfig {
        FallbackConfig {
            primary_accept: 0.4,
            entity_boost: 0.2,
            boost_cap: 0.85,
            basic_confidence: 0.4,
        }
    }

    fn score(intent: &str, confidence: f32) -> IntentScore {
        IntentScore {
            intent: intent.to_string(),
            confidence,
        }
    }

    #[test]
    fn confident_primary_short_circuits() {
        let (primary, secondary) = libs();
        let utt = preprocess::prepare(&primary, "check stock SKU: prod001");
        let result = classify_with_fallback(&primary, &secondary, &utt);
        assert_eq!(result.stage, Stage::Primary);
        assert_eq!(result.intent, "inventory_check");
        assert!(result.degraded.is_none());
    }

    #[test]
    fn weak_primary_with_entity_gets_boosted() {
        let (primary, secondary) = libs();
        // No enhanced pattern matches a bare coded ID, but the basic set
        // recognizes it and the SKU entity lifts the confidence.
        let utt = preprocess::prepare(&primary, "PROD001?");
        let result = classify_with_fallback(&primary, &secondary, &utt);
        assert_eq!(result.stage, Stage::Secondary);
        assert_eq!(result.intent, "inventory_check");
        assert!(result.confidence > 0.4);
        assert!(result.confidence <= 0.85);
        assert!(result.degraded.is_some());
    }

    #[test]
    fn entity_boost_never_exceeds_cap() {
        let result = run_chain(
            || Ok(score("inventory_check", 0.1)),
            || Ok((score("inventory_check", 0.8), true)),
            || unreachable!("basic stage must not run"),
            &cfg(),
        );
        assert!((result.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn boost_never_lowers_a_high_secondary_score() {
        let result = run_chain(
            || Ok(score("inventory_check", 0.1)),
            || Ok((score("inventory_check", 0.9), true)),
            || unreachable!("basic stage must not run"),
            &cfg(),
        );
        assert!((result.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn better_low_primary_candidate_is_kept() {
        let result = run_chain(
            || Ok(score("order_status", 0.35)),
            || Ok((score("help_general", 0.2), false)),
            || unreachable!("basic stage must not run"),
            &cfg(),
        );
        assert_eq!(result.intent, "order_status");
        assert_eq!(result.stage, Stage::Secondary);
        assert!(result.degraded.is_some());
    }

    #[test]
    fn primary_failure_escalates_to_secondary() {
        let result = run_chain(
            || Err(StageError::Classifier("primary exploded".into())),
            || Ok((score("inventory_check", 0.6), false)),
            || unreachable!("basic stage must not run"),
            &cfg(),
        );
        assert_eq!(result.stage, Stage::Secondary);
        assert_eq!(result.intent, "inventory_check");
    }

    #[test]
    fn double_failure_lands_on_basic() {
        let (primary, _) = libs();
        let result = run_chain(
            || Err(StageError::Classifier("primary exploded".into())),
            || Err(StageError::Extraction("secondary exploded".into())),
            || basic_classify(&primary, "check the inventory please"),
            &cfg(),
        );
        assert_eq!(result.stage, Stage::Basic);
        assert_eq!(result.intent, "inventory_check");
        assert!((result.confidence - 0.4).abs() < 1e-6);
        assert!(result.degraded.expect("reason").contains("secondary"));
    }

    #[test]
    fn basic_matcher_defaults_when_nothing_hits() {
        let (primary, _) = libs();
        let s = basic_classify(&primary, "zzz qqq");
        assert_eq!(s.intent, "help_general");
        assert!(s.confidence <= 0.4);
    }
}
