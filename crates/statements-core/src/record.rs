//! Wide per-period record schema.
//!
//! A [`PeriodRecord`] is one row of the wide table: document metadata, the period
//! attributes classified from the title, and one [`MetricCell`] per [`MetricKey`].

use serde::{Deserialize, Serialize};

use crate::{
    metric::{MetricCell, MetricKey},
    period::{AuditStatus, PeriodDate, PeriodType},
    types::{SourceDocument, SourceId, Symbol},
};

/// One reporting period of one source document, with a fixed column per metric.
///
/// Exactly one record exists per `(source_id, period_order)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Source document identifier.
    pub source_id: SourceId,
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Issuer name.
    pub company_name: String,
    /// Title of the source document.
    pub source_title: String,
    /// Publish timestamp of the source document.
    pub published_at: Option<String>,
    /// Period column label as extracted.
    pub period_name: String,
    /// Index of the period in the extracted period list.
    pub period_order: u32,
    /// Period length.
    pub period_type: PeriodType,
    /// Assurance level.
    pub audit_status: AuditStatus,
    /// Period end date read from the title.
    pub period_date: Option<PeriodDate>,
    metrics: [MetricCell; MetricKey::COUNT],
}

impl PeriodRecord {
    /// Creates a record for a source document with every metric absent.
    #[must_use]
    pub fn new(
        source: &SourceDocument,
        period_name: impl Into<String>,
        period_order: u32,
        zero_glyph: &str,
    ) -> Self {
        Self {
            source_id: source.id,
            symbol: source.symbol.clone(),
            company_name: source.company_name.clone(),
            source_title: source.title.clone(),
            published_at: source.published_at.clone(),
            period_name: period_name.into(),
            period_order,
            period_type: PeriodType::Unknown,
            audit_status: AuditStatus::Unknown,
            period_date: None,
            metrics: std::array::from_fn(|_| MetricCell::absent(zero_glyph)),
        }
    }

    /// Sets the period attributes.
    #[must_use]
    pub fn with_period(
        mut self,
        period_type: PeriodType,
        audit_status: AuditStatus,
        period_date: Option<PeriodDate>,
    ) -> Self {
        self.period_type = period_type;
        self.audit_status = audit_status;
        self.period_date = period_date;
        self
    }

    /// Sets one metric cell.
    #[must_use]
    pub fn with_metric(mut self, key: MetricKey, cell: MetricCell) -> Self {
        self.set(key, cell);
        self
    }

    /// Returns the cell for a metric.
    #[must_use]
    pub fn get(&self, key: MetricKey) -> &MetricCell {
        &self.metrics[key.index()]
    }

    /// Returns the amount for a metric.
    #[must_use]
    pub fn amount(&self, key: MetricKey) -> Option<f64> {
        self.get(key).amount
    }

    /// Replaces the cell for a metric.
    pub fn set(&mut self, key: MetricKey, cell: MetricCell) {
        self.metrics[key.index()] = cell;
    }

    /// Iterates `(key, cell)` pairs in column order.
    pub fn metrics(&self) -> impl Iterator<Item = (MetricKey, &MetricCell)> {
        MetricKey::ALL.into_iter().zip(self.metrics.iter())
    }

    /// Returns the number of metrics with an amount.
    #[must_use]
    pub fn populated_count(&self) -> usize {
        self.metrics.iter().filter(|c| c.has_amount()).count()
    }
}
