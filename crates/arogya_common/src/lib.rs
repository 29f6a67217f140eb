//! Shared library for Arogya components.
//!
//! Holds the intent-resolution pipeline: catalog loading, normalization,
//! similarity scoring, match selection, the fallback chain and the
//! interaction log. The daemon and the CLI are thin shells around it.

pub mod catalog;
pub mod composer;
pub mod config;
pub mod error;
pub mod external;
pub mod interaction_log;
pub mod normalize;
#[cfg(feature = "onnx")]
pub mod onnx_encoder;
pub mod records;
pub mod resolver;
pub mod selector;
pub mod semantic;
pub mod similarity;
pub mod transcript;
pub mod types;
pub mod wordpiece;

pub use catalog::IntentCatalog;
pub use composer::{FixedChooser, ResponseChooser, SeededChooser, APOLOGY};
pub use config::Config;
pub use error::{LogError, StartupDataError};
pub use external::{FakeSummaryLookup, LookupMiss, LookupOutcome, Summary, SummaryLookup, WikipediaSummary};
pub use interaction_log::{InteractionLog, InteractionLogger};
pub use records::RecordStore;
pub use resolver::{FallbackResolver, Resolution, ResolverSettings, Stage};
pub use types::{Intent, InteractionLogEntry, ScoredCandidate, TopicRecord};
