//! Statement store trait and query types.
//!
//! This module defines the [`StatementStore`] trait that persists normalized
//! [`PeriodRecord`]s, keyed by source document, together with the filters and summaries
//! it serves.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;

use crate::{
    amendment::AmendmentCandidate,
    error::{Result, StatementsError},
    period::{AuditStatus, PeriodDate, PeriodType},
    record::PeriodRecord,
    types::{SourceId, Symbol},
};

/// Number of entries reported in [`StoreStats::recent_activity`].
pub const RECENT_ACTIVITY_LIMIT: usize = 30;

/// Filter over stored period records. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    /// Exact symbol.
    pub symbol: Option<Symbol>,
    /// Period length.
    pub period_type: Option<PeriodType>,
    /// Assurance level.
    pub audit_status: Option<AuditStatus>,
    /// Position of the period in its source table.
    pub period_order: Option<u32>,
    /// Earliest period date, inclusive.
    pub from: Option<PeriodDate>,
    /// Latest period date, inclusive.
    pub to: Option<PeriodDate>,
}

impl RecordQuery {
    /// Creates a query for one symbol.
    #[must_use]
    pub fn for_symbol(symbol: impl Into<Symbol>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    /// Restricts the period type.
    #[must_use]
    pub const fn with_period_type(mut self, period_type: PeriodType) -> Self {
        self.period_type = Some(period_type);
        self
    }

    /// Restricts the audit status.
    #[must_use]
    pub const fn with_audit_status(mut self, audit_status: AuditStatus) -> Self {
        self.audit_status = Some(audit_status);
        self
    }

    /// Restricts the period position.
    #[must_use]
    pub const fn with_period_order(mut self, period_order: u32) -> Self {
        self.period_order = Some(period_order);
        self
    }

    /// Restricts the period date range. Records without a date are excluded once a bound is set.
    #[must_use]
    pub const fn with_date_range(mut self, from: Option<PeriodDate>, to: Option<PeriodDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Returns true if a record satisfies every set field.
    #[must_use]
    pub fn matches(&self, record: &PeriodRecord) -> bool {
        if self.symbol.as_ref().is_some_and(|s| *s != record.symbol) {
            return false;
        }
        if self.period_type.is_some_and(|pt| pt != record.period_type) {
            return false;
        }
        if self.audit_status.is_some_and(|a| a != record.audit_status) {
            return false;
        }
        if self.period_order.is_some_and(|o| o != record.period_order) {
            return false;
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(date) = record.period_date else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }
}

/// Filter over stored statements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFilter {
    /// Substring of the symbol or company name, case-insensitive.
    pub symbol_contains: Option<String>,
    /// Period length.
    pub period_type: Option<PeriodType>,
    /// Assurance level.
    pub audit_status: Option<AuditStatus>,
    /// Maximum number of statements.
    pub limit: Option<usize>,
}

impl SummaryFilter {
    /// Returns true if a statement satisfies the text, period type and audit filters.
    #[must_use]
    pub fn matches(&self, summary: &StatementSummary) -> bool {
        if let Some(needle) = &self.symbol_contains {
            let needle = needle.trim().to_lowercase();
            let hit = summary.symbol.as_str().to_lowercase().contains(&needle)
                || summary.company_name.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.period_type.is_some_and(|pt| pt != summary.period_type) {
            return false;
        }
        !self.audit_status.is_some_and(|a| a != summary.audit_status)
    }
}

/// One stored statement (all records of a source document).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementSummary {
    /// Source document identifier.
    pub source_id: SourceId,
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Issuer name.
    pub company_name: String,
    /// Title of the source document.
    pub title: String,
    /// Publish timestamp of the source document.
    pub published_at: Option<String>,
    /// Period length.
    pub period_type: PeriodType,
    /// Assurance level.
    pub audit_status: AuditStatus,
    /// Period date read from the title.
    pub period_date: Option<PeriodDate>,
    /// Number of stored period records.
    pub period_count: usize,
    /// When the records were stored.
    pub stored_at: DateTime<Utc>,
}

impl StatementSummary {
    /// Builds a summary from the records of one source document.
    ///
    /// Returns `None` for an empty record set.
    #[must_use]
    pub fn from_records(records: &[PeriodRecord], stored_at: DateTime<Utc>) -> Option<Self> {
        let first = records.first()?;
        Some(Self {
            source_id: first.source_id,
            symbol: first.symbol.clone(),
            company_name: first.company_name.clone(),
            title: first.source_title.clone(),
            published_at: first.published_at.clone(),
            period_type: first.period_type,
            audit_status: first.audit_status,
            period_date: first.period_date,
            period_count: records.len(),
            stored_at,
        })
    }
}

impl AmendmentCandidate for StatementSummary {
    fn title(&self) -> &str {
        &self.title
    }

    fn period_type(&self) -> PeriodType {
        self.period_type
    }

    fn period_date(&self) -> Option<PeriodDate> {
        self.period_date
    }

    fn published_at(&self) -> Option<&str> {
        self.published_at.as_deref()
    }
}

/// One company with stored statements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySummary {
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Issuer name.
    pub company_name: String,
    /// Number of stored statements.
    pub statement_count: usize,
    /// Number of stored period records.
    pub period_record_count: usize,
    /// Most recent store time.
    pub latest_stored_at: Option<DateTime<Utc>>,
}

/// One entry of recent store activity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    /// Source document identifier.
    pub source_id: SourceId,
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Period length.
    pub period_type: PeriodType,
    /// When the records were stored.
    pub stored_at: DateTime<Utc>,
}

/// Aggregate statistics over the store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Number of distinct source documents.
    pub total_statements: usize,
    /// Number of period records.
    pub total_period_records: usize,
    /// Number of distinct symbols.
    pub unique_companies: usize,
    /// Number of distinct period names.
    pub unique_periods: usize,
    /// Metric columns per statement.
    pub items_per_statement: usize,
    /// Statements per known period type.
    pub period_distribution: BTreeMap<PeriodType, usize>,
    /// Statements per known audit status.
    pub audit_distribution: BTreeMap<AuditStatus, usize>,
    /// Most recently stored statements, newest first.
    pub recent_activity: Vec<RecentActivity>,
}

/// Trait for persisting normalized statements.
///
/// Implementations must make [`replace_records`](StatementStore::replace_records) atomic:
/// readers observe either the previous record set of a source or the new one, never a mix.
#[async_trait]
pub trait StatementStore: Send + Sync + Debug {
    /// Replaces every record of a source document with a new set.
    ///
    /// Returns the number of records stored.
    async fn replace_records(
        &self,
        source_id: SourceId,
        records: &[PeriodRecord],
    ) -> Result<usize>;

    /// Returns the records of a source document ordered by `period_order`.
    async fn records_for_source(&self, source_id: SourceId) -> Result<Vec<PeriodRecord>>;

    /// Deletes every record of a source document, returning the number removed.
    async fn delete_source(&self, source_id: SourceId) -> Result<usize>;

    /// Returns true if any record exists for a source document.
    async fn has_records(&self, source_id: SourceId) -> Result<bool>;

    /// Returns records matching a query, ordered by period date descending (undated
    /// last), then source id and period order.
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<PeriodRecord>>;

    /// Returns stored statements matching a filter, most recently stored first.
    async fn summaries(&self, filter: &SummaryFilter) -> Result<Vec<StatementSummary>>;

    /// Returns every company with stored statements, most statements first.
    async fn companies(&self) -> Result<Vec<CompanySummary>>;

    /// Returns aggregate statistics.
    async fn stats(&self) -> Result<StoreStats>;

    /// Removes every record.
    async fn clear(&self) -> Result<()>;
}

/// Checks that a replacement set belongs to one source and has unique period positions.
pub fn validate_replacement(source_id: SourceId, records: &[PeriodRecord]) -> Result<()> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if record.source_id != source_id {
            return Err(StatementsError::InvalidParameter(format!(
                "record for source {} in replacement of source {}",
                record.source_id, source_id
            )));
        }
        if !seen.insert(record.period_order) {
            return Err(StatementsError::InvalidParameter(format!(
                "duplicate period_order {} for source {}",
                record.period_order, source_id
            )));
        }
    }
    Ok(())
}

/// Orders records by period date descending (undated last), then source id and period order.
pub fn sort_records(records: &mut [PeriodRecord]) {
    records.sort_by(|a, b| {
        let by_date = match (a.period_date, b.period_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        by_date
            .then(a.source_id.cmp(&b.source_id))
            .then(a.period_order.cmp(&b.period_order))
    });
}
