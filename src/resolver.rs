//! Tiered catalog resolution: exact name, singular-normalized, substring,
//! token overlap, then fuzzy similarity. Earlier tiers short-circuit, so a
//! cheap exact hit never pays for a fuzzy scan. Candidate preference within
//! a tier follows catalog snapshot order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strsim::normalized_levenshtein;
use tracing::debug;

/// Minimum token-overlap ratio (intersection over larger set).
pub const TOKEN_OVERLAP_THRESHOLD: f64 = 0.5;
/// Minimum normalized Levenshtein similarity for a fuzzy hit.
pub const FUZZY_THRESHOLD: f64 = 0.6;
/// Minimum similarity for SKU typo suggestions.
pub const SKU_SUGGESTION_CUTOFF: f64 = 0.6;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: u64,
    pub sku: String,
    pub name: String,
}

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Singular,
    Substring,
    TokenOverlap,
    Fuzzy,
}

/// A resolved record with its tier and, for scored tiers, the score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionCandidate {
    pub record: CatalogRecord,
    pub tier: MatchTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Read access to the product catalog.
pub trait CatalogRepository {
    /// Snapshot of all products. Iteration order defines tie preference.
    fn list_products(&self) -> Vec<CatalogRecord>;
    /// Exact SKU lookup, case-insensitive.
    fn find_by_sku(&self, sku: &str) -> Option<CatalogRecord>;
}

/// Fixed in-memory catalog, mainly for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    records: Vec<CatalogRecord>,
}

impl StaticCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self { records }
    }
}

impl CatalogRepository for StaticCatalog {
    fn list_products(&self) -> Vec<CatalogRecord> {
        self.records.clone()
    }

    fn find_by_sku(&self, sku: &str) -> Option<CatalogRecord> {
        self.records
            .iter()
            .find(|r| r.sku.eq_ignore_ascii_case(sku))
            .cloned()
    }
}

/// Resolve a free-text product query against the catalog.
pub fn resolve(query: &str, repo: &dyn CatalogRepository) -> Option<ResolutionCandidate> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let products = repo.list_products();
    if products.is_empty() {
        return None;
    }

    // Tier 1: exact name match.
    for record in &products {
        if record.name.to_lowercase() == needle {
            return Some(candidate(record, MatchTier::Exact, None));
        }
    }

    // Tier 2: singular-normalized query, retried exactly.
    let singular = singularize(&needle);
    if singular != needle {
        for record in &products {
            if record.name.to_lowercase() == singular {
                return Some(candidate(record, MatchTier::Singular, None));
            }
        }
    }

    // Tier 3: substring containment either way.
    for record in &products {
        let name = record.name.to_lowercase();
        if name.contains(&needle) || needle.contains(&name) {
            return Some(candidate(record, MatchTier::Substring, None));
        }
    }
    // Retry containment with the singular form.
    if singular != needle {
        for record in &products {
            let name = record.name.to_lowercase();
            if name.contains(&singular) || singular.contains(&name) {
                return Some(candidate(record, MatchTier::Substring, None));
            }
        }
    }

    // Tier 4: word-set overlap, intersection over the larger set.
    let query_tokens = tokens(&singular);
    if !query_tokens.is_empty() {
        let mut best: Option<(f64, &CatalogRecord)> = None;
        for record in &products {
            let name_tokens = tokens(&record.name.to_lowercase());
            let ratio = overlap_ratio(&query_tokens, &name_tokens);
            // Strictly greater keeps the earlier record on ties.
            if ratio >= TOKEN_OVERLAP_THRESHOLD && best.map_or(true, |(b, _)| ratio > b) {
                best = Some((ratio, record));
            }
        }
        if let Some((ratio, record)) = best {
            return Some(candidate(record, MatchTier::TokenOverlap, Some(ratio)));
        }
    }

    // Tier 5: fuzzy similarity over full names.
    let mut best: Option<(f64, &CatalogRecord)> = None;
    for record in &products {
        let sim = normalized_levenshtein(&needle, &record.name.to_lowercase());
        if sim >= FUZZY_THRESHOLD && best.map_or(true, |(b, _)| sim > b) {
            best = Some((sim, record));
        }
    }
    if let Some((sim, record)) = best {
        return Some(candidate(record, MatchTier::Fuzzy, Some(sim)));
    }

    debug!(target: "nlq::resolver", query_len = needle.len(), "no catalog match");
    None
}

/// Closest catalog SKUs to a possibly mistyped one, best first.
pub fn close_skus(sku: &str, repo: &dyn CatalogRepository, limit: usize) -> Vec<String> {
    let needle = sku.trim().to_uppercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f64, String)> = repo
        .list_products()
        .into_iter()
        .filter_map(|record| {
            let sim = normalized_levenshtein(&needle, &record.sku.to_uppercase());
            (sim >= SKU_SUGGESTION_CUTOFF).then_some((sim, record.sku))
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored.into_iter().map(|(_, sku)| sku).collect()
}

fn candidate(record: &CatalogRecord, tier: MatchTier, score: Option<f64>) -> ResolutionCandidate {
    ResolutionCandidate {
        record: record.clone(),
        tier,
        score,
    }
}

const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("mice", "mouse"),
    ("shelves", "shelf"),
    ("knives", "knife"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("people", "person"),
    ("children", "child"),
];

/// Singularize each whitespace token of an already-lowercased phrase.
pub fn singularize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(singular_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Irregular table first, then suffix heuristics.
fn singular_token(word: &str) -> String {
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(plural, _)| *plural == word) {
        return (*singular).to_string();
    }
    if word.len() > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.len() > 3 && word.ends_with("es") {
        let sibilant = ["ches", "shes", "xes", "zes"]
            .iter()
            .any(|suf| word.ends_with(suf));
        if sibilant {
            return word[..word.len() - 1].to_string();
        }
        return word[..word.len() - 2].to_string();
    }
    if word.len() > 2 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|tok| !tok.is_empty())
        .map(str::to_string)
        .collect()
}

fn overlap_ratio(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let larger = a.len().max(b.len());
    if larger == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / larger as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(vec![
            CatalogRecord {
                id: 1,
                sku: "PROD001".into(),
                name: "Laptop".into(),
            },
            CatalogRecord {
                id: 2,
                sku: "PROD002".into(),
                name: "Laptop Stand".into(),
            },
            CatalogRecord {
                id: 3,
                sku: "PROD003".into(),
                name: "Wireless Bluetooth Headphones".into(),
            },
            CatalogRecord {
                id: 4,
                sku: "PROD004".into(),
                name: "Wireless Mouse".into(),
            },
        ])
    }

    #[test]
    fn exact_match_beats_substring_superset() {
        let hit = resolve("laptop", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Laptop");
        assert_eq!(hit.tier, MatchTier::Exact);
    }

    #[test]
    fn plural_query_resolves_via_singular_tier() {
        let hit = resolve("laptops", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Laptop");
        assert_eq!(hit.tier, MatchTier::Singular);
    }

    #[test]
    fn substring_match_when_exact_fails() {
        let hit = resolve("stand", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Laptop Stand");
        assert_eq!(hit.tier, MatchTier::Substring);
    }

    #[test]
    fn substring_ties_prefer_catalog_order() {
        // "laptop sta" contains "laptop", so the earlier record wins.
        let hit = resolve("laptop sta", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Laptop");
        assert_eq!(hit.tier, MatchTier::Substring);
    }

    #[test]
    fn token_overlap_bridges_word_swaps() {
        let hit = resolve("wireless bluetooth headset", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Wireless Bluetooth Headphones");
        assert_eq!(hit.tier, MatchTier::TokenOverlap);
        let score = hit.score.expect("overlap score");
        assert!(score > 0.6 && score < 0.7, "score {score}");
    }

    #[test]
    fn fuzzy_tier_catches_typos() {
        let hit = resolve("laptoop stannd", &catalog()).expect("hit");
        assert_eq!(hit.record.name, "Laptop Stand");
        assert_eq!(hit.tier, MatchTier::Fuzzy);
        assert!(hit.score.expect("similarity") >= FUZZY_THRESHOLD);
    }

    #[test]
    fn unmatched_query_returns_none() {
        assert!(resolve("forklift battery", &catalog()).is_none());
        assert!(resolve("", &catalog()).is_none());
        assert!(resolve("laptop", &StaticCatalog::default()).is_none());
    }

    #[test]
    fn singularize_rules() {
        assert_eq!(singularize("laptops"), "laptop");
        assert_eq!(singularize("batteries"), "battery");
        assert_eq!(singularize("glasses"), "glass");
        assert_eq!(singularize("mice"), "mouse");
        assert_eq!(singularize("wireless mice"), "wireless mouse");
        // Double-s words stay put.
        assert_eq!(singularize("glass"), "glass");
    }

    #[test]
    fn find_by_sku_is_case_insensitive() {
        let rec = catalog().find_by_sku("prod003").expect("record");
        assert_eq!(rec.name, "Wireless Bluetooth Headphones");
    }

    #[test]
    fn close_skus_ranks_by_similarity() {
        let suggestions = close_skus("PROD01", &catalog(), 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 3);
        assert!(suggestions.contains(&"PROD001".to_string()));
        assert!(close_skus("ZZZZZZ", &catalog(), 3).is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let first = resolve("wireless bluetooth headset", &catalog());
        for _ in 0..5 {
            assert_eq!(resolve("wireless bluetooth headset", &catalog()), first);
        }
    }
}
