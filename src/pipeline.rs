//! End-to-end query understanding: normalization, classification with
//! fallback, entity extraction, context analysis, optional catalog
//! resolution and style selection.
//!
//! Log lines carry a short anonymized hash of the utterance instead of the
//! text itself, so operator queries never land in logs verbatim.

use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::classify::clamp01;
use crate::context::{self, ConversationContext};
use crate::entities::{self, Entities};
use crate::fallback::{self, ChainResult, Stage};
use crate::patterns::PatternLibrary;
use crate::preprocess;
use crate::resolver::{self, CatalogRepository};
use crate::style::{self, ResponseStyle};

/// One natural-language query. The optional hint pins a known intent and
/// skips classification when it names a registered intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hint: Option<String>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent_hint: None,
        }
    }

    pub fn with_hint(text: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intent_hint: Some(hint.into()),
        }
    }
}

/// The pipeline's answer for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub intent: String,
    pub confidence: f32,
    pub entities: Entities,
    pub context: ConversationContext,
    pub response_style: ResponseStyle,
}

/// A configured pipeline holding the enhanced and basic pattern libraries.
#[derive(Debug, Clone)]
pub struct Pipeline {
    primary: Arc<PatternLibrary>,
    secondary: Arc<PatternLibrary>,
}

static SHARED: Lazy<Pipeline> =
    Lazy::new(|| Pipeline::from_env().expect("embedded pattern libraries are valid"));

impl Pipeline {
    pub fn new(primary: PatternLibrary, secondary: PatternLibrary) -> Self {
        Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
        }
    }

    /// Build from the embedded configs, honoring the env overrides.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(
            PatternLibrary::enhanced_from_env()?,
            PatternLibrary::basic()?,
        ))
    }

    /// Process-wide pipeline over the embedded configs.
    pub fn shared() -> &'static Pipeline {
        &SHARED
    }

    pub fn primary(&self) -> &PatternLibrary {
        &self.primary
    }

    /// Analyze without catalog resolution.
    pub fn analyze(&self, request: &QueryRequest) -> QueryAnalysis {
        self.run(request, None)
    }

    /// Analyze and resolve extracted product references against `catalog`.
    pub fn analyze_with_catalog(
        &self,
        request: &QueryRequest,
        catalog: &dyn CatalogRepository,
    ) -> QueryAnalysis {
        self.run(request, Some(catalog))
    }

    fn run(&self, request: &QueryRequest, catalog: Option<&dyn CatalogRepository>) -> QueryAnalysis {
        let utterance = preprocess::prepare(&self.primary, &request.text);

        let chain = match request.intent_hint.as_deref() {
            Some(hint) if self.primary.has_intent(hint) => ChainResult {
                intent: hint.to_string(),
                confidence: self.primary.scoring().formal_weight,
                stage: Stage::Primary,
                degraded: None,
            },
            // Unknown hints are ignored, not errors.
            _ => fallback::classify_with_fallback(&self.primary, &self.secondary, &utterance),
        };

        let mut entities = entities::extract(&self.primary, &utterance.raw);
        let context = context::analyze(&self.primary, &utterance.raw);
        if let Some(repo) = catalog {
            resolve_entities(&mut entities, repo);
        }
        let response_style = style::select(&context, &entities);

        debug!(
            target: "nlq::pipeline",
            id = %anon_hash(&request.text),
            intent = %chain.intent,
            confidence = chain.confidence,
            stage = ?chain.stage,
            degraded = chain.degraded.as_deref().unwrap_or(""),
            "analyzed utterance"
        );

        QueryAnalysis {
            intent: chain.intent,
            confidence: clamp01(chain.confidence),
            entities,
            context,
            response_style,
        }
    }
}

/// Fill canonical product name and SKU from the catalog. An extracted SKU
/// takes precedence over a free-text product name.
fn resolve_entities(entities: &mut Entities, repo: &dyn CatalogRepository) {
    if let Some(sku) = entities.sku.clone() {
        if let Some(record) = repo.find_by_sku(&sku) {
            entities.sku = Some(record.sku);
            entities.product_name = Some(record.name);
            return;
        }
        debug!(target: "nlq::pipeline", suggestions = ?resolver::close_skus(&sku, repo, 3), "unknown sku");
    }
    if let Some(name) = entities.product_name.clone() {
        if let Some(hit) = resolver::resolve(&name, repo) {
            entities.sku = Some(hit.record.sku);
            entities.product_name = Some(hit.record.name);
        }
    }
}

/// Short stable hash for correlating log lines without exposing the text.
fn anon_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}
