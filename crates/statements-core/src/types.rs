//! Core data types for disclosures and raw extractions.
//!
//! This module defines the inputs of the engine:
//!
//! - [`Symbol`] - Trading symbol of the issuing company
//! - [`SourceId`] - Identifier of one source document (disclosure notice)
//! - [`SourceDocument`] - Source document metadata
//! - [`RawExtraction`] - Long-shaped table produced by an extraction provider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StatementsError};

/// A trading symbol/ticker.
///
/// Symbols are trimmed and uppercased on creation. Persian symbols have no case and
/// pass through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, trimming and converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identifier of a source document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(pub u64);

impl SourceId {
    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SourceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// A published disclosure whose table is extracted and normalized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Document identifier.
    pub id: SourceId,
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Issuer name.
    pub company_name: String,
    /// Full disclosure title; period type, audit status and date are derived from it.
    pub title: String,
    /// Link to the HTML rendering of the disclosure.
    pub url: Option<String>,
    /// Publish timestamp as printed by the publisher (sortable text).
    pub published_at: Option<String>,
}

impl SourceDocument {
    /// Creates a new source document with required fields.
    #[must_use]
    pub fn new(
        id: SourceId,
        symbol: impl Into<Symbol>,
        company_name: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            company_name: company_name.into(),
            title: title.into(),
            url: None,
            published_at: None,
        }
    }

    /// Sets the document link.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the publish timestamp.
    #[must_use]
    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }
}

/// One extracted cell: numeric amount (if the text parsed) and the original text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawValue {
    /// Parsed amount.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Text as displayed in the source table.
    #[serde(default)]
    pub formatted: String,
}

impl RawValue {
    /// Creates a raw value.
    #[must_use]
    pub fn new(amount: Option<f64>, formatted: impl Into<String>) -> Self {
        Self {
            amount,
            formatted: formatted.into(),
        }
    }
}

/// One extracted table row: a free-text label and one value per period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Row label as it appears in the source.
    #[serde(alias = "name")]
    pub label: String,
    /// Values, one per period. May be shorter than the period list.
    #[serde(default)]
    pub values: Vec<RawValue>,
}

impl RawItem {
    /// Creates a raw item.
    #[must_use]
    pub fn new(label: impl Into<String>, values: Vec<RawValue>) -> Self {
        Self {
            label: label.into(),
            values,
        }
    }

    /// Returns the value for a period index, `None` if the row is shorter.
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<&RawValue> {
        self.values.get(index)
    }
}

/// Long-shaped extraction result: arbitrary rows × periods.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    /// Period column labels, in table order.
    #[serde(default)]
    pub periods: Vec<String>,
    /// Table rows.
    #[serde(default)]
    pub items: Vec<RawItem>,
    /// Upstream extraction error; when set no records are produced.
    #[serde(default)]
    pub error: Option<String>,
}

impl RawExtraction {
    /// Creates an extraction from periods and items.
    #[must_use]
    pub const fn new(periods: Vec<String>, items: Vec<RawItem>) -> Self {
        Self {
            periods,
            items,
            error: None,
        }
    }

    /// Creates a failed extraction carrying the upstream error.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Returns the upstream error, if any, as [`StatementsError::Extraction`].
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(e) => Err(StatementsError::Extraction(e.clone())),
            None => Ok(()),
        }
    }
}
