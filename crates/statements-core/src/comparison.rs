//! Cross-company metric comparison.
//!
//! A [`ComparisonRequest`] names symbols, a period type and metrics. For each symbol the
//! caller supplies the period-order-0 records of matching statements; the [`Comparator`]
//! drops superseded disclosures, applies the limit and evaluates every requested metric
//! into an aligned [`SymbolSeries`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    amendment::AmendmentResolver,
    error::{Result, StatementsError},
    metrics::{MetricDefinition, MetricEvaluator, MetricRegistry, MetricValue},
    period::{AuditStatus, PeriodDate, PeriodType},
    record::PeriodRecord,
    store::RecordQuery,
    types::{SourceId, Symbol},
};

/// Parameters of a comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Symbols to compare, in output order.
    pub symbols: Vec<Symbol>,
    /// Period type of the compared statements.
    pub period_type: PeriodType,
    /// Metric identifiers, direct or derived.
    pub metrics: Vec<String>,
    /// Assurance level filter; `None` accepts every status.
    pub audit_status: Option<AuditStatus>,
    /// Earliest period date, inclusive.
    pub from: Option<PeriodDate>,
    /// Latest period date, inclusive.
    pub to: Option<PeriodDate>,
    /// Maximum number of periods per symbol.
    pub limit: Option<usize>,
}

impl ComparisonRequest {
    /// Creates a request for audited statements.
    #[must_use]
    pub fn new<S, M>(symbols: S, period_type: PeriodType, metrics: M) -> Self
    where
        S: IntoIterator,
        S::Item: Into<Symbol>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            period_type,
            metrics: metrics.into_iter().map(Into::into).collect(),
            audit_status: Some(AuditStatus::Audited),
            from: None,
            to: None,
            limit: None,
        }
    }

    /// Sets the assurance level filter.
    #[must_use]
    pub const fn with_audit_status(mut self, audit_status: Option<AuditStatus>) -> Self {
        self.audit_status = audit_status;
        self
    }

    /// Sets the period date range.
    #[must_use]
    pub const fn with_date_range(mut self, from: Option<PeriodDate>, to: Option<PeriodDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Sets the per-symbol period limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks that symbols and metrics are present.
    pub fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            return Err(StatementsError::InvalidParameter(
                "at least one symbol is required".to_string(),
            ));
        }
        if self.metrics.is_empty() {
            return Err(StatementsError::InvalidParameter(
                "at least one metric is required".to_string(),
            ));
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(StatementsError::InvalidParameter(format!(
                    "date range {} to {} is empty",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Returns the record query for one symbol: headline period of each statement only.
    #[must_use]
    pub fn record_query(&self, symbol: &Symbol) -> RecordQuery {
        RecordQuery {
            symbol: Some(symbol.clone()),
            period_type: Some(self.period_type),
            audit_status: self.audit_status,
            period_order: Some(0),
            from: self.from,
            to: self.to,
        }
    }
}

/// A compared metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonMetric {
    /// Request identifier.
    pub key: String,
    /// Display name.
    pub name: String,
    /// True for computed metrics.
    pub derived: bool,
}

/// Metric values of one statement period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonPoint {
    /// Source document identifier.
    pub source_id: SourceId,
    /// Period column label.
    pub period_name: String,
    /// Period date.
    pub period_date: Option<PeriodDate>,
    /// Assurance level.
    pub audit_status: AuditStatus,
    /// Title of the source document.
    pub title: String,
    /// One value per compared metric, aligned with [`Comparison::metrics`].
    pub values: Vec<MetricValue>,
}

/// All compared periods of one symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Issuer name, when any statement was found.
    pub company_name: Option<String>,
    /// Periods, newest first.
    pub points: Vec<ComparisonPoint>,
}

impl SymbolSeries {
    /// Returns true if any statement was found for the symbol.
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.points.is_empty()
    }
}

/// Result of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Period type of the compared statements.
    pub period_type: PeriodType,
    /// Compared metrics.
    pub metrics: Vec<ComparisonMetric>,
    /// One series per requested symbol, in request order.
    pub series: Vec<SymbolSeries>,
}

/// Builds comparison series from stored records.
#[derive(Clone, Debug)]
pub struct Comparator {
    registry: Arc<MetricRegistry>,
    evaluator: MetricEvaluator,
    resolver: AmendmentResolver,
}

impl Comparator {
    /// Creates a comparator.
    #[must_use]
    pub const fn new(
        registry: Arc<MetricRegistry>,
        evaluator: MetricEvaluator,
        resolver: AmendmentResolver,
    ) -> Self {
        Self {
            registry,
            evaluator,
            resolver,
        }
    }

    /// Validates a request and resolves its metrics.
    pub fn resolve_metrics(
        &self,
        request: &ComparisonRequest,
    ) -> Result<Vec<(ComparisonMetric, MetricDefinition)>> {
        request.validate()?;
        let definitions = self.registry.resolve_all(&request.metrics)?;
        Ok(definitions
            .into_iter()
            .map(|definition| {
                let key = definition.name().to_string();
                let metric = ComparisonMetric {
                    name: self
                        .registry
                        .display_name(&key)
                        .map_or_else(|| key.clone(), str::to_string),
                    derived: definition.is_derived(),
                    key,
                };
                (metric, definition)
            })
            .collect())
    }

    /// Builds the series of one symbol from its candidate records.
    #[must_use]
    pub fn series(
        &self,
        symbol: Symbol,
        records: Vec<PeriodRecord>,
        definitions: &[MetricDefinition],
        limit: Option<usize>,
    ) -> SymbolSeries {
        let records = self.resolver.filter(records, limit);
        let company_name = records.first().map(|r| r.company_name.clone());
        let points = records
            .iter()
            .map(|record| ComparisonPoint {
                source_id: record.source_id,
                period_name: record.period_name.clone(),
                period_date: record.period_date,
                audit_status: record.audit_status,
                title: record.source_title.clone(),
                values: definitions
                    .iter()
                    .map(|d| self.evaluator.evaluate(record, d))
                    .collect(),
            })
            .collect();

        SymbolSeries {
            symbol,
            company_name,
            points,
        }
    }
}
