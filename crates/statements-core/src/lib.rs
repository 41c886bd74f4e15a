#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and engine for financial statement normalization.
//!
//! This crate provides the building blocks shared by every statement crate:
//!
//! - [`MetricDictionary`](dictionary::MetricDictionary) - Ordered label-to-key rules
//! - [`Normalizer`](normalizer::Normalizer) - Long extraction to wide period records
//! - [`Reconstructor`](reconstructor::Reconstructor) - Wide records back to the nested view
//! - [`AmendmentResolver`](amendment::AmendmentResolver) - Superseded disclosure filtering
//! - [`MetricEvaluator`](metrics::MetricEvaluator) - Direct and derived metric evaluation
//! - [`StatementStore`](store::StatementStore) - Storage abstraction
//! - [`ExtractionProvider`](provider::ExtractionProvider) - Extraction abstraction

/// Amendment resolution across disclosures of the same period.
pub mod amendment;
/// Disclosure title classification.
pub mod classifier;
/// Cross-company metric comparison.
pub mod comparison;
/// Engine configuration.
pub mod config;
/// Ordered label dictionary.
pub mod dictionary;
/// Error types for statement operations.
pub mod error;
/// Number formatting for computed values.
pub mod format;
/// Polars DataFrame exports.
pub mod frame;
/// Canonical metric keys and cells.
pub mod metric;
/// Direct and derived metric evaluation.
pub mod metrics;
/// Long-to-wide normalization.
pub mod normalizer;
/// Period type, audit status and period date definitions.
pub mod period;
/// Extraction provider trait.
pub mod provider;
/// Wide per-period record schema.
pub mod record;
/// Wide-to-nested reconstruction.
pub mod reconstructor;
/// Statement store trait and query types.
pub mod store;
/// Core data types (Symbol, SourceDocument, RawExtraction, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use amendment::{AmendmentCandidate, AmendmentResolver};
pub use classifier::{TitleClassifier, TitleInfo};
pub use comparison::{
    Comparator, Comparison, ComparisonMetric, ComparisonPoint, ComparisonRequest, SymbolSeries,
};
pub use config::{AuditKeywords, PeriodKeywords, StatementsConfig};
pub use dictionary::{LabelRule, MetricDictionary};
pub use error::{Result, StatementsError};
pub use frame::records_to_frame;
pub use metric::{MetricCell, MetricKey};
pub use metrics::{
    DerivedMetric, Formula, MetricCatalog, MetricDefinition, MetricEvaluator, MetricInfo,
    MetricRegistry, MetricValue, Term,
};
pub use normalizer::Normalizer;
pub use period::{AuditStatus, PeriodDate, PeriodType};
pub use provider::ExtractionProvider;
pub use reconstructor::{
    KeyMetric, KeyMetricCategory, NestedItem, NestedView, Reconstructor, ViewSummary,
};
pub use record::PeriodRecord;
pub use store::{
    CompanySummary, RecentActivity, RecordQuery, StatementStore, StatementSummary, StoreStats,
    SummaryFilter,
};
pub use types::{RawExtraction, RawItem, RawValue, SourceDocument, SourceId, Symbol};
