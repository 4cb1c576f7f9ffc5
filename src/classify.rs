//! Weighted intent classification over a compiled pattern library.
//!
//! Every registered intent is scored against the normalized utterance; the
//! highest score wins, ties going to the earlier-registered intent. A zero
//! score everywhere yields the library's default intent at its floor
//! confidence, so classification never fails outright.

use serde::Serialize;

use crate::patterns::{CompiledIntent, PatternLibrary, ScoringConfig};

/// One classified intent with its confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentScore {
    pub intent: String,
    pub confidence: f32,
}

/// Classify a normalized utterance.
pub fn classify(lib: &PatternLibrary, normalized: &str) -> IntentScore {
    let scoring = lib.scoring();
    let mut best_idx: Option<usize> = None;
    let mut best_score = 0.0f32;
    for (idx, intent) in lib.intents().iter().enumerate() {
        let score = score_intent(intent, scoring, normalized);
        // Strictly greater keeps the first-registered intent on ties.
        if score > best_score {
            best_score = score;
            best_idx = Some(idx);
        }
    }
    match best_idx {
        Some(idx) => IntentScore {
            intent: lib.intents()[idx].name.clone(),
            confidence: clamp01(best_score),
        },
        None => IntentScore {
            intent: scoring.default_intent.clone(),
            confidence: clamp01(scoring.default_confidence),
        },
    }
}

/// Pattern-hit score for a single intent.
///
/// The strongest hit sets the base (formal outranks casual), each extra hit
/// adds a small bonus capped at two extras, and keyword density scales the
/// total slightly upward. Keywords alone never produce a nonzero score.
fn score_intent(intent: &CompiledIntent, scoring: &ScoringConfig, text: &str) -> f32 {
    let mut hits = 0usize;
    let mut base = 0.0f32;
    for re in &intent.casual {
        if re.is_match(text) {
            hits += 1;
            base = base.max(scoring.casual_weight);
        }
    }
    for re in &intent.formal {
        if re.is_match(text) {
            hits += 1;
            base = base.max(scoring.formal_weight);
        }
    }
    if hits == 0 {
        return 0.0;
    }
    let extras = hits.saturating_sub(1).min(2) as f32;
    let kw_hits = intent
        .keywords
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count();
    let density = kw_hits as f32 / intent.keywords.len().max(1) as f32;
    clamp01((base + scoring.repeat_hit_bonus * extras) * (1.0 + scoring.density_bonus * density))
}

pub(crate) fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess;

    fn lib() -> PatternLibrary {
        PatternLibrary::from_toml_str(crate::patterns::DEFAULT_PATTERNS).expect("default patterns")
    }

    fn classify_text(text: &str) -> IntentScore {
        let lib = lib();
        let utt = preprocess::prepare(&lib, text);
        classify(&lib, &utt.normalized)
    }

    #[test]
    fn formal_inventory_query_scores_high() {
        let s = classify_text("check stock SKU: prod001");
        assert_eq!(s.intent, "inventory_check");
        assert!(s.confidence >= 0.85, "confidence {}", s.confidence);
    }

    #[test]
    fn casual_inventory_query_classifies() {
        let s = classify_text("Hi! Do we have any laptops left?");
        assert_eq!(s.intent, "inventory_check");
        assert!(s.confidence >= 0.4);
    }

    #[test]
    fn stock_update_with_quantity() {
        let s = classify_text("add 25 units to PROD002");
        assert_eq!(s.intent, "stock_update");
        assert!(s.confidence >= 0.4);
    }

    #[test]
    fn inbound_delivery_phrases() {
        let s = classify_text("the truck just arrived at the dock");
        assert_eq!(s.intent, "inbound_operations");
    }

    #[test]
    fn unmatched_text_falls_back_to_default_intent() {
        let s = classify_text("zzz qqq www");
        assert_eq!(s.intent, "help_general");
        assert!((s.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn empty_input_is_default_intent() {
        let s = classify_text("");
        assert_eq!(s.intent, "help_general");
    }

    #[test]
    fn confidence_is_always_clamped() {
        for text in [
            "check stock inventory status check stock level stock check find where have",
            "urgent rush priority ship dispatch order to customer today",
        ] {
            let s = classify_text(text);
            assert!((0.0..=1.0).contains(&s.confidence), "{}", s.confidence);
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify_text("where is order ORD123");
        for _ in 0..5 {
            let b = classify_text("where is order ORD123");
            assert_eq!(a, b);
        }
    }
}
