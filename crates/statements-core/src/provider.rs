//! Extraction provider trait.
//!
//! An [`ExtractionProvider`] turns a [`SourceDocument`] into a [`RawExtraction`]. The
//! engine treats providers as external collaborators: how the table is fetched and
//! parsed (browser automation, a remote service, fixtures) is up to the implementation.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{RawExtraction, SourceDocument},
};

/// Source of raw statement tables.
///
/// Extraction sessions are expensive; callers bound how many run at once.
#[async_trait]
pub trait ExtractionProvider: Send + Sync + Debug {
    /// Returns the name of this provider.
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;

    /// Extracts the statement table of a source document.
    ///
    /// An upstream failure to find or parse the table may be reported either as an
    /// error or as a [`RawExtraction`] whose `error` field is set.
    async fn extract(&self, source: &SourceDocument) -> Result<RawExtraction>;
}
