#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Normalization, storage and comparison of financial statement disclosures.
//!
//! This crate re-exports the core engine, the store implementations and the HTTP
//! extraction provider, and provides [`StatementService`] which runs documents through
//! extract, normalize, store and reconstruct with bounded concurrency.
//!
//! # Features
//!
//! - `http` - Remote extraction service provider
//! - `store-sqlite` - SQLite-based statement store
//!
//! # Example
//!
//! ```rust,ignore
//! use statements::{
//!     ComparisonRequest, PeriodType, SourceDocument, SourceId, SqliteStore, StatementService,
//!     StatementsConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> statements::Result<()> {
//!     let config = StatementsConfig::from_json_file("statements.json")?;
//!     let store = Arc::new(SqliteStore::new("statements.db")?);
//!     let service = StatementService::with_http(config, "http://localhost:8080", store)?;
//!
//!     let source = SourceDocument::new(
//!         SourceId(1234),
//!         "فولاد",
//!         "Mobarakeh Steel",
//!         "اطلاعات و صورتهای مالی سال مالی منتهی به 1402/12/29 (حسابرسی شده)",
//!     )
//!     .with_url("https://example.com/statement/1234");
//!     let view = service.process(&source, false).await?;
//!     println!("{} items", view.statement.summary.total_items);
//!
//!     let request = ComparisonRequest::new(
//!         ["فولاد", "شپنا"],
//!         PeriodType::FullYear,
//!         ["operating_revenue", "net_profit_margin"],
//!     );
//!     let comparison = service.compare(&request).await?;
//!     println!("{:?}", comparison.to_frame()?);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use statements_core::*;

// Store implementations
#[cfg(feature = "store-sqlite")]
pub use statements_store::SqliteStore;
pub use statements_store::InMemoryStore;

// Providers
#[cfg(feature = "http")]
pub use statements_http::HttpExtractionProvider;

mod service;
pub use service::{BatchOutcome, BatchReport, StatementService, StatementView};
