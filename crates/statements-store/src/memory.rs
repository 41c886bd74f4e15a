//! In-memory store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use statements_core::{
    CompanySummary, PeriodRecord, RecentActivity, RecordQuery, Result, SourceId, StatementStore,
    StatementSummary, StoreStats, SummaryFilter, Symbol,
    metric::MetricKey,
    period::{AuditStatus, PeriodType},
    store::{RECENT_ACTIVITY_LIMIT, sort_records, validate_replacement},
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Records of one source document with their store time.
#[derive(Debug, Clone)]
struct StoredStatement {
    records: Vec<PeriodRecord>,
    stored_at: DateTime<Utc>,
}

impl StoredStatement {
    fn summary(&self) -> Option<StatementSummary> {
        StatementSummary::from_records(&self.records, self.stored_at)
    }
}

/// Simple in-memory store for testing and development.
///
/// Statements are kept in a `RwLock`-protected map keyed by source id and are lost when
/// the store is dropped. A replacement swaps the whole record set under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    statements: RwLock<BTreeMap<SourceId, StoredStatement>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Most recently stored first; newer source ids win ties.
fn sort_summaries(summaries: &mut [StatementSummary]) {
    summaries.sort_by(|a, b| {
        b.stored_at
            .cmp(&a.stored_at)
            .then(b.source_id.cmp(&a.source_id))
    });
}

#[async_trait]
impl StatementStore for InMemoryStore {
    #[instrument(skip(self, records), fields(source_id = %source_id, count = records.len()))]
    async fn replace_records(
        &self,
        source_id: SourceId,
        records: &[PeriodRecord],
    ) -> Result<usize> {
        validate_replacement(source_id, records)?;

        let mut sorted = records.to_vec();
        sorted.sort_by_key(|r| r.period_order);

        let mut statements = self.statements.write().await;
        if sorted.is_empty() {
            statements.remove(&source_id);
        } else {
            statements.insert(
                source_id,
                StoredStatement {
                    records: sorted,
                    stored_at: Utc::now(),
                },
            );
        }
        debug!("Stored {} period records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn records_for_source(&self, source_id: SourceId) -> Result<Vec<PeriodRecord>> {
        let statements = self.statements.read().await;
        match statements.get(&source_id) {
            Some(stored) => {
                debug!("Store hit for source");
                Ok(stored.records.clone())
            }
            None => {
                debug!("Store miss for source");
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn delete_source(&self, source_id: SourceId) -> Result<usize> {
        let mut statements = self.statements.write().await;
        Ok(statements
            .remove(&source_id)
            .map_or(0, |stored| stored.records.len()))
    }

    async fn has_records(&self, source_id: SourceId) -> Result<bool> {
        Ok(self.statements.read().await.contains_key(&source_id))
    }

    #[instrument(skip(self))]
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<PeriodRecord>> {
        let statements = self.statements.read().await;
        let mut records: Vec<PeriodRecord> = statements
            .values()
            .flat_map(|stored| stored.records.iter())
            .filter(|record| query.matches(record))
            .cloned()
            .collect();
        drop(statements);

        sort_records(&mut records);
        debug!("Found {} matching records", records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn summaries(&self, filter: &SummaryFilter) -> Result<Vec<StatementSummary>> {
        let statements = self.statements.read().await;
        let mut summaries: Vec<StatementSummary> = statements
            .values()
            .filter_map(StoredStatement::summary)
            .filter(|summary| filter.matches(summary))
            .collect();
        drop(statements);

        sort_summaries(&mut summaries);
        if let Some(limit) = filter.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    async fn companies(&self) -> Result<Vec<CompanySummary>> {
        let statements = self.statements.read().await;
        let mut by_symbol: HashMap<Symbol, CompanySummary> = HashMap::new();
        for stored in statements.values() {
            let Some(first) = stored.records.first() else {
                continue;
            };
            let entry = by_symbol
                .entry(first.symbol.clone())
                .or_insert_with(|| CompanySummary {
                    symbol: first.symbol.clone(),
                    company_name: first.company_name.clone(),
                    statement_count: 0,
                    period_record_count: 0,
                    latest_stored_at: None,
                });
            entry.statement_count += 1;
            entry.period_record_count += stored.records.len();
            if entry.latest_stored_at.is_none_or(|at| stored.stored_at > at) {
                entry.latest_stored_at = Some(stored.stored_at);
                entry.company_name = first.company_name.clone();
            }
        }
        drop(statements);

        let mut companies: Vec<CompanySummary> = by_symbol.into_values().collect();
        companies.sort_by(|a, b| {
            b.statement_count
                .cmp(&a.statement_count)
                .then(a.symbol.cmp(&b.symbol))
        });
        Ok(companies)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<StoreStats> {
        let statements = self.statements.read().await;

        let mut symbols = HashSet::new();
        let mut period_names = HashSet::new();
        let mut period_distribution: BTreeMap<PeriodType, usize> = BTreeMap::new();
        let mut audit_distribution: BTreeMap<AuditStatus, usize> = BTreeMap::new();
        let mut total_period_records = 0;
        let mut summaries = Vec::with_capacity(statements.len());

        for stored in statements.values() {
            total_period_records += stored.records.len();
            for record in &stored.records {
                symbols.insert(record.symbol.clone());
                period_names.insert(record.period_name.clone());
            }
            let Some(summary) = stored.summary() else {
                continue;
            };
            if summary.period_type != PeriodType::Unknown {
                *period_distribution.entry(summary.period_type).or_default() += 1;
            }
            if summary.audit_status != AuditStatus::Unknown {
                *audit_distribution.entry(summary.audit_status).or_default() += 1;
            }
            summaries.push(summary);
        }
        drop(statements);

        sort_summaries(&mut summaries);
        let recent_activity = summaries
            .iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|s| RecentActivity {
                source_id: s.source_id,
                symbol: s.symbol.clone(),
                period_type: s.period_type,
                stored_at: s.stored_at,
            })
            .collect();

        Ok(StoreStats {
            total_statements: summaries.len(),
            total_period_records,
            unique_companies: symbols.len(),
            unique_periods: period_names.len(),
            items_per_statement: MetricKey::COUNT,
            period_distribution,
            audit_distribution,
            recent_activity,
        })
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.statements.write().await.clear();
        debug!("Cleared all stored statements");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statements_core::{MetricCell, PeriodDate, SourceDocument};

    fn statement(id: u64, symbol: &str, period_type: PeriodType, periods: u32) -> Vec<PeriodRecord> {
        let source = SourceDocument::new(SourceId(id), symbol, format!("{} Co", symbol), "title");
        (0..periods)
            .map(|order| {
                PeriodRecord::new(&source, format!("P{}", order + 1), order, "۰")
                    .with_period(
                        period_type,
                        AuditStatus::Audited,
                        PeriodDate::new(1400 + id as u16, 12, 29),
                    )
                    .with_metric(
                        MetricKey::NetProfit,
                        MetricCell::new(Some(order as f64), order.to_string()),
                    )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_replace_and_read_back() {
        let store = InMemoryStore::new();
        assert!(!store.has_records(SourceId(1)).await.unwrap());

        let mut records = statement(1, "فولاد", PeriodType::FullYear, 2);
        records.reverse();
        assert_eq!(store.replace_records(SourceId(1), &records).await.unwrap(), 2);
        assert!(store.has_records(SourceId(1)).await.unwrap());

        let stored = store.records_for_source(SourceId(1)).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].period_order, 0);
        assert_eq!(stored[1].amount(MetricKey::NetProfit), Some(1.0));
    }

    #[tokio::test]
    async fn test_replace_discards_previous_set() {
        let store = InMemoryStore::new();
        store
            .replace_records(SourceId(1), &statement(1, "A", PeriodType::FullYear, 3))
            .await
            .unwrap();
        store
            .replace_records(SourceId(1), &statement(1, "A", PeriodType::FullYear, 1))
            .await
            .unwrap();
        assert_eq!(store.records_for_source(SourceId(1)).await.unwrap().len(), 1);

        let foreign = statement(2, "A", PeriodType::FullYear, 1);
        assert!(store.replace_records(SourceId(1), &foreign).await.is_err());
        assert_eq!(store.records_for_source(SourceId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let store = InMemoryStore::new();
        store
            .replace_records(SourceId(1), &statement(1, "A", PeriodType::FullYear, 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "B", PeriodType::FullYear, 1))
            .await
            .unwrap();

        assert_eq!(store.delete_source(SourceId(1)).await.unwrap(), 2);
        assert_eq!(store.delete_source(SourceId(1)).await.unwrap(), 0);
        assert!(store.has_records(SourceId(2)).await.unwrap());

        store.clear().await.unwrap();
        assert!(!store.has_records(SourceId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_records() {
        let store = InMemoryStore::new();
        store
            .replace_records(SourceId(1), &statement(1, "A", PeriodType::FullYear, 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "A", PeriodType::FullYear, 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(3), &statement(3, "A", PeriodType::Quarter, 2))
            .await
            .unwrap();

        let query = RecordQuery::for_symbol("A")
            .with_period_type(PeriodType::FullYear)
            .with_period_order(0);
        let records = store.query_records(&query).await.unwrap();
        let ids: Vec<u64> = records.iter().map(|r| r.source_id.get()).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_summaries_companies_and_stats() {
        let store = InMemoryStore::new();
        store
            .replace_records(SourceId(1), &statement(1, "A", PeriodType::FullYear, 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "A", PeriodType::HalfYear, 1))
            .await
            .unwrap();
        store
            .replace_records(SourceId(3), &statement(3, "B", PeriodType::Unknown, 1))
            .await
            .unwrap();

        let all = store.summaries(&SummaryFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].source_id, SourceId(3));

        let filtered = store
            .summaries(&SummaryFilter {
                symbol_contains: Some("a co".to_string()),
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].symbol, Symbol::new("A"));

        let companies = store.companies().await.unwrap();
        assert_eq!(companies[0].symbol, Symbol::new("A"));
        assert_eq!(companies[0].statement_count, 2);
        assert_eq!(companies[0].period_record_count, 3);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_statements, 3);
        assert_eq!(stats.total_period_records, 4);
        assert_eq!(stats.unique_companies, 2);
        assert_eq!(stats.unique_periods, 2);
        assert_eq!(stats.items_per_statement, MetricKey::COUNT);
        assert_eq!(stats.period_distribution.get(&PeriodType::FullYear), Some(&1));
        assert!(!stats.period_distribution.contains_key(&PeriodType::Unknown));
        assert_eq!(stats.audit_distribution.get(&AuditStatus::Audited), Some(&3));
        assert_eq!(stats.recent_activity.len(), 3);
    }
}
