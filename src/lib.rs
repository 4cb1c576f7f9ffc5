//! Natural-language query understanding for warehouse operations.
//!
//! Turns operator utterances like "Hi! Do we have any laptops left?" into a
//! structured analysis: intent, confidence, extracted entities,
//! conversational context and a response style, with product references
//! optionally resolved against a catalog.
//!
//! ```
//! use warehouse_nlq::{Pipeline, QueryRequest};
//!
//! let analysis = Pipeline::shared().analyze(&QueryRequest::new("check stock SKU: prod001"));
//! assert_eq!(analysis.intent, "inventory_check");
//! assert_eq!(analysis.entities.sku.as_deref(), Some("PROD001"));
//! ```

pub mod classify;
pub mod context;
pub mod entities;
pub mod fallback;
pub mod patterns;
pub mod preprocess;
pub mod resolver;
pub mod style;

mod pipeline;

pub use classify::IntentScore;
pub use context::{ConversationContext, Formality, Tone};
pub use entities::Entities;
pub use fallback::{ChainResult, Stage, StageError};
pub use patterns::PatternLibrary;
pub use pipeline::{Pipeline, QueryAnalysis, QueryRequest};
pub use preprocess::Utterance;
pub use resolver::{
    CatalogRecord, CatalogRepository, MatchTier, ResolutionCandidate, StaticCatalog,
};
pub use style::ResponseStyle;
