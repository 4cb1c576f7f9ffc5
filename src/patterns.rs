//! Pattern library: the TOML-configured rule set behind classification,
//! entity extraction and tone detection.
//!
//! Two libraries ship embedded in the binary: the enhanced set
//! (`config/patterns.toml`) and the basic set (`config/patterns_basic.toml`)
//! used by the fallback chain. `NLQ_PATTERNS_PATH` points the enhanced
//! library at an external file instead; `NLQ_PRIMARY_ACCEPT` overrides the
//! acceptance threshold (clamped to `0.0..=1.0`).
//!
//! All regexes are compiled once at load; a pattern that fails to compile
//! rejects the whole library with a message naming the offending pattern.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;

/// Embedded enhanced pattern set.
pub const DEFAULT_PATTERNS: &str = include_str!("../config/patterns.toml");
/// Embedded basic (secondary) pattern set.
pub const BASIC_PATTERNS: &str = include_str!("../config/patterns_basic.toml");

/// Env var: path to an external enhanced pattern file.
pub const ENV_PATTERNS_PATH: &str = "NLQ_PATTERNS_PATH";
/// Env var: override for `fallback.primary_accept`.
pub const ENV_PRIMARY_ACCEPT: &str = "NLQ_PRIMARY_ACCEPT";

fn default_repeat_hit_bonus() -> f32 {
    0.03
}

fn default_density_bonus() -> f32 {
    0.05
}

/// Intent scoring knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Weight of a casual (conversational) pattern hit.
    pub casual_weight: f32,
    /// Weight of a formal (command-style) pattern hit.
    pub formal_weight: f32,
    /// Added per pattern hit beyond the first, capped at two extras.
    #[serde(default = "default_repeat_hit_bonus")]
    pub repeat_hit_bonus: f32,
    /// Multiplier scale for keyword density.
    #[serde(default = "default_density_bonus")]
    pub density_bonus: f32,
    /// Intent reported when nothing matches.
    pub default_intent: String,
    /// Confidence reported for the default intent.
    pub default_confidence: f32,
}

/// Fallback chain thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackConfig {
    /// Primary-stage acceptance threshold.
    pub primary_accept: f32,
    /// Confidence boost when the secondary stage finds an entity.
    pub entity_boost: f32,
    /// Ceiling for the boosted confidence.
    pub boost_cap: f32,
    /// Confidence assigned by the basic keyword matcher.
    pub basic_confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToneConfig {
    pub greetings: Vec<String>,
    pub polite: Vec<String>,
    pub urgency: Vec<String>,
    pub uncertainty: Vec<String>,
    /// Regex marking technical register (coded IDs, domain jargon).
    pub technical: String,
}

/// Ordered regex lists per entity type. First match wins at extraction time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub sku: Vec<String>,
    #[serde(default)]
    pub quantity: Vec<String>,
    #[serde(default)]
    pub product_name: Vec<String>,
    #[serde(default)]
    pub order_number: Vec<String>,
    #[serde(default)]
    pub shipment_number: Vec<String>,
    #[serde(default)]
    pub location: Vec<String>,
    #[serde(default)]
    pub time_reference: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntentConfig {
    pub name: String,
    #[serde(default)]
    pub casual: Vec<String>,
    #[serde(default)]
    pub formal: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Root of the TOML schema.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRoot {
    pub scoring: ScoringConfig,
    pub fallback: FallbackConfig,
    /// Canonical term -> layman synonyms folded onto it.
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    pub tone: ToneConfig,
    #[serde(default)]
    pub entities: EntityConfig,
    pub intents: Vec<IntentConfig>,
}

/// An intent with its patterns compiled. Registration order is score
/// tie-break order.
#[derive(Debug)]
pub struct CompiledIntent {
    pub name: String,
    pub casual: Vec<Regex>,
    pub formal: Vec<Regex>,
    pub keywords: Vec<String>,
}

#[derive(Debug, Default)]
pub struct EntityPatterns {
    pub sku: Vec<Regex>,
    pub quantity: Vec<Regex>,
    pub product_name: Vec<Regex>,
    pub order_number: Vec<Regex>,
    pub shipment_number: Vec<Regex>,
    pub location: Vec<Regex>,
    pub time_reference: Vec<Regex>,
}

/// Tone keyword sets compiled into word-boundary alternations.
#[derive(Debug)]
pub struct ToneSets {
    pub greetings: Regex,
    pub polite: Regex,
    pub urgency: Regex,
    pub uncertainty: Regex,
    pub technical: Regex,
}

/// A fully compiled pattern library.
#[derive(Debug)]
pub struct PatternLibrary {
    scoring: ScoringConfig,
    fallback: FallbackConfig,
    intents: Vec<CompiledIntent>,
    entities: EntityPatterns,
    tone: ToneSets,
    synonyms: Vec<(Regex, String)>,
}

impl PatternLibrary {
    /// Parse and compile a library from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let root: LibraryRoot = toml::from_str(raw).context("pattern library TOML parse failed")?;
        Self::compile(root)
    }

    /// Load a library from a file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading pattern library {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    /// Enhanced library: external file if `NLQ_PATTERNS_PATH` is set,
    /// embedded defaults otherwise. `NLQ_PRIMARY_ACCEPT` overrides the
    /// acceptance threshold either way.
    pub fn enhanced_from_env() -> Result<Self> {
        let mut lib = match std::env::var(ENV_PATTERNS_PATH) {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(path.trim()))?,
            _ => Self::from_toml_str(DEFAULT_PATTERNS)?,
        };
        if let Some(t) = parse_threshold_env(ENV_PRIMARY_ACCEPT) {
            lib.fallback.primary_accept = t;
        }
        Ok(lib)
    }

    /// Basic library from the embedded secondary pattern set.
    pub fn basic() -> Result<Self> {
        Self::from_toml_str(BASIC_PATTERNS)
    }

    fn compile(root: LibraryRoot) -> Result<Self> {
        if root.intents.is_empty() {
            bail!("pattern library declares no intents");
        }
        validate_weight("scoring.casual_weight", root.scoring.casual_weight)?;
        validate_weight("scoring.formal_weight", root.scoring.formal_weight)?;
        validate_weight("scoring.default_confidence", root.scoring.default_confidence)?;
        validate_weight("fallback.primary_accept", root.fallback.primary_accept)?;
        validate_weight("fallback.entity_boost", root.fallback.entity_boost)?;
        validate_weight("fallback.boost_cap", root.fallback.boost_cap)?;
        validate_weight("fallback.basic_confidence", root.fallback.basic_confidence)?;
        if !root
            .intents
            .iter()
            .any(|i| i.name == root.scoring.default_intent)
        {
            bail!(
                "default intent `{}` is not a registered intent",
                root.scoring.default_intent
            );
        }

        let intents = root
            .intents
            .iter()
            .map(|i| {
                Ok(CompiledIntent {
                    name: i.name.clone(),
                    casual: compile_list(&format!("intent `{}` casual", i.name), &i.casual)?,
                    formal: compile_list(&format!("intent `{}` formal", i.name), &i.formal)?,
                    keywords: i.keywords.iter().map(|k| k.to_lowercase()).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let entities = EntityPatterns {
            sku: compile_list("entities.sku", &root.entities.sku)?,
            quantity: compile_list("entities.quantity", &root.entities.quantity)?,
            product_name: compile_list("entities.product_name", &root.entities.product_name)?,
            order_number: compile_list("entities.order_number", &root.entities.order_number)?,
            shipment_number: compile_list(
                "entities.shipment_number",
                &root.entities.shipment_number,
            )?,
            location: compile_list("entities.location", &root.entities.location)?,
            time_reference: compile_list("entities.time_reference", &root.entities.time_reference)?,
        };

        let tone = ToneSets {
            greetings: phrase_set("tone.greetings", &root.tone.greetings)?,
            polite: phrase_set("tone.polite", &root.tone.polite)?,
            urgency: phrase_set("tone.urgency", &root.tone.urgency)?,
            uncertainty: phrase_set("tone.uncertainty", &root.tone.uncertainty)?,
            technical: Regex::new(&root.tone.technical)
                .map_err(|e| anyhow!("tone.technical regex `{}`: {e}", root.tone.technical))?,
        };

        // BTreeMap iteration keeps folding order stable across runs.
        let mut synonyms = Vec::new();
        for (canonical, alts) in &root.synonyms {
            for alt in alts {
                let pat = format!(r"(?i)\b{}\b", regex::escape(alt).replace(' ', r"\s+"));
                let re = Regex::new(&pat)
                    .map_err(|e| anyhow!("synonym `{alt}` for `{canonical}`: {e}"))?;
                synonyms.push((re, canonical.clone()));
            }
        }

        Ok(Self {
            scoring: root.scoring,
            fallback: root.fallback,
            intents,
            entities,
            tone,
            synonyms,
        })
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn fallback(&self) -> &FallbackConfig {
        &self.fallback
    }

    pub fn intents(&self) -> &[CompiledIntent] {
        &self.intents
    }

    pub fn entity_patterns(&self) -> &EntityPatterns {
        &self.entities
    }

    pub fn tone(&self) -> &ToneSets {
        &self.tone
    }

    pub fn synonyms(&self) -> &[(Regex, String)] {
        &self.synonyms
    }

    pub fn has_intent(&self, name: &str) -> bool {
        self.intents.iter().any(|i| i.name == name)
    }
}

fn validate_weight(field: &str, value: f32) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        bail!("{field} must be within 0.0..=1.0, got {value}");
    }
    Ok(())
}

fn compile_list(kind: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| anyhow!("{kind} pattern `{p}`: {e}")))
        .collect()
}

/// Build a case-insensitive word-boundary alternation over literal phrases.
fn phrase_set(kind: &str, phrases: &[String]) -> Result<Regex> {
    if phrases.is_empty() {
        bail!("{kind} must list at least one phrase");
    }
    let alt = phrases
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alt})\b")).map_err(|e| anyhow!("{kind} phrase set: {e}"))
}

/// Parse a 0..=1 float from an env var; out-of-range values are clamped,
/// unparsable ones ignored.
fn parse_threshold_env(var: &str) -> Option<f32> {
    let raw = std::env::var(var).ok()?;
    let parsed: f32 = raw.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    Some(parsed.clamp(0.0, 1.0))
}
