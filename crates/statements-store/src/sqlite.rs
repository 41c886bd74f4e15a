//! SQLite-based store implementation.
//!
//! Records live in one wide table, `period_records`, keyed by `(source_id, period_order)`.
//! Each metric key owns two columns: `{key}` (REAL, nullable) holding the amount and
//! `{key}_fmt` (TEXT) holding the formatted value.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row, params, params_from_iter, types::Value};
use statements_core::{
    CompanySummary, MetricCell, PeriodRecord, RecentActivity, RecordQuery, Result, SourceDocument,
    SourceId, StatementStore, StatementSummary, StatementsError, StoreStats, SummaryFilter,
    metric::MetricKey,
    period::{AuditStatus, PeriodDate, PeriodType},
    store::{RECENT_ACTIVITY_LIMIT, sort_records, validate_replacement},
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// Metadata columns, in select order.
const META_COLUMNS: [&str; 11] = [
    "source_id",
    "symbol",
    "company_name",
    "source_title",
    "published_at",
    "period_name",
    "period_order",
    "period_type",
    "audit_status",
    "period_date",
    "stored_at",
];

/// Column holding the formatted value of a metric.
fn formatted_column(key: MetricKey) -> String {
    format!("{}_fmt", key.as_str())
}

/// Every column of `period_records`, metadata first, then amount/formatted pairs.
fn all_columns() -> Vec<String> {
    META_COLUMNS
        .iter()
        .map(|c| (*c).to_string())
        .chain(
            MetricKey::ALL
                .into_iter()
                .flat_map(|key| [key.as_str().to_string(), formatted_column(key)]),
        )
        .collect()
}

fn store_err(e: impl std::fmt::Display) -> StatementsError {
    StatementsError::Store(e.to_string())
}

fn to_sql_id(source_id: SourceId) -> Result<i64> {
    i64::try_from(source_id.get()).map_err(|_| {
        StatementsError::InvalidParameter(format!("source id {} out of range", source_id))
    })
}

fn from_sql_id(id: i64) -> Result<SourceId> {
    u64::try_from(id)
        .map(SourceId)
        .map_err(|_| StatementsError::Store(format!("negative source id {}", id)))
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StatementsError::Parse(format!("Invalid timestamp {}: {}", s, e)))
}

fn parse_period_date(s: Option<String>) -> Result<Option<PeriodDate>> {
    s.map(|s| {
        PeriodDate::parse(&s)
            .ok_or_else(|| StatementsError::Parse(format!("Invalid period date: {}", s)))
    })
    .transpose()
}

/// A `period_records` row as read from SQLite, before domain parsing.
#[derive(Debug)]
struct RecordRow {
    source_id: i64,
    symbol: String,
    company_name: String,
    source_title: String,
    published_at: Option<String>,
    period_name: String,
    period_order: u32,
    period_type: String,
    audit_status: String,
    period_date: Option<String>,
    cells: Vec<(Option<f64>, String)>,
}

impl RecordRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut cells: Vec<(Option<f64>, String)> = Vec::with_capacity(MetricKey::COUNT);
        for i in 0..MetricKey::COUNT {
            let offset = META_COLUMNS.len() + 2 * i;
            cells.push((row.get(offset)?, row.get(offset + 1)?));
        }
        Ok(Self {
            source_id: row.get(0)?,
            symbol: row.get(1)?,
            company_name: row.get(2)?,
            source_title: row.get(3)?,
            published_at: row.get(4)?,
            period_name: row.get(5)?,
            period_order: row.get(6)?,
            period_type: row.get(7)?,
            audit_status: row.get(8)?,
            period_date: row.get(9)?,
            cells,
        })
    }

    fn into_record(self) -> Result<PeriodRecord> {
        let mut source = SourceDocument::new(
            from_sql_id(self.source_id)?,
            self.symbol,
            self.company_name,
            self.source_title,
        );
        source.published_at = self.published_at;

        let mut record = PeriodRecord::new(&source, self.period_name, self.period_order, "")
            .with_period(
                self.period_type.parse()?,
                self.audit_status.parse()?,
                parse_period_date(self.period_date)?,
            );
        for (key, (amount, formatted)) in MetricKey::ALL.into_iter().zip(self.cells) {
            record.set(key, MetricCell::new(amount, formatted));
        }
        Ok(record)
    }
}

/// SQLite-based store for normalized statements.
///
/// This store keeps records in a SQLite database file, providing persistence across
/// application restarts. Replacements run in a single transaction.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    select_columns: String,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            select_columns: all_columns().join(", "),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;

        let metric_columns: String = MetricKey::ALL
            .into_iter()
            .map(|key| {
                format!(
                    "{} REAL,\n                {} TEXT NOT NULL,\n                ",
                    key.as_str(),
                    formatted_column(key)
                )
            })
            .collect();

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS period_records (
                source_id INTEGER NOT NULL,
                symbol TEXT NOT NULL,
                company_name TEXT NOT NULL,
                source_title TEXT NOT NULL,
                published_at TEXT,
                period_name TEXT NOT NULL,
                period_order INTEGER NOT NULL,
                period_type TEXT NOT NULL,
                audit_status TEXT NOT NULL,
                period_date TEXT,
                stored_at TEXT NOT NULL,
                {}PRIMARY KEY (source_id, period_order)
            )",
                metric_columns
            ),
            [],
        )
        .map_err(store_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_period_records_symbol
             ON period_records(symbol, period_type, audit_status)",
            [],
        )
        .map_err(store_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_period_records_stored_at
             ON period_records(stored_at)",
            [],
        )
        .map_err(store_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    /// Row values of one record, in [`all_columns`] order.
    fn row_values(record: &PeriodRecord, stored_at: &str) -> Result<Vec<Value>> {
        let text = |s: &str| Value::Text(s.to_string());
        let optional = |s: Option<String>| s.map_or(Value::Null, Value::Text);

        let mut values = vec![
            Value::Integer(to_sql_id(record.source_id)?),
            text(record.symbol.as_str()),
            text(&record.company_name),
            text(&record.source_title),
            optional(record.published_at.clone()),
            text(&record.period_name),
            Value::Integer(i64::from(record.period_order)),
            text(record.period_type.as_str()),
            text(record.audit_status.as_str()),
            optional(record.period_date.map(|d| d.to_string())),
            text(stored_at),
        ];
        for (_, cell) in record.metrics() {
            values.push(cell.amount.map_or(Value::Null, Value::Real));
            values.push(text(&cell.formatted));
        }
        Ok(values)
    }

    /// Reads statement summaries, newest first, without filtering.
    fn load_summaries(conn: &Connection) -> Result<Vec<StatementSummary>> {
        let mut stmt = conn
            .prepare(
                "SELECT source_id, symbol, company_name, source_title, published_at,
                        period_type, audit_status, period_date, COUNT(*), MAX(stored_at)
                 FROM period_records
                 GROUP BY source_id
                 ORDER BY MAX(stored_at) DESC, source_id DESC",
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, i64>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })
            .map_err(store_err)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (
                source_id,
                symbol,
                company_name,
                title,
                published_at,
                period_type,
                audit_status,
                period_date,
                period_count,
                stored_at,
            ) = row.map_err(store_err)?;
            summaries.push(StatementSummary {
                source_id: from_sql_id(source_id)?,
                symbol: symbol.into(),
                company_name,
                title,
                published_at,
                period_type: period_type.parse()?,
                audit_status: audit_status.parse()?,
                period_date: parse_period_date(period_date)?,
                period_count: usize::try_from(period_count).map_err(store_err)?,
                stored_at: parse_timestamp(&stored_at)?,
            });
        }
        Ok(summaries)
    }

    fn count(conn: &Connection, sql: &str) -> Result<usize> {
        let n: i64 = conn.query_row(sql, [], |row| row.get(0)).map_err(store_err)?;
        usize::try_from(n).map_err(store_err)
    }
}

#[async_trait]
impl StatementStore for SqliteStore {
    #[instrument(skip(self, records), fields(source_id = %source_id, count = records.len()))]
    async fn replace_records(
        &self,
        source_id: SourceId,
        records: &[PeriodRecord],
    ) -> Result<usize> {
        validate_replacement(source_id, records)?;
        let id = to_sql_id(source_id)?;
        let stored_at = format_timestamp(Utc::now());
        let insert = format!(
            "INSERT INTO period_records ({}) VALUES ({})",
            self.select_columns,
            vec!["?"; META_COLUMNS.len() + 2 * MetricKey::COUNT].join(", ")
        );

        let conn = self.conn.lock().map_err(store_err)?;
        let tx = conn.unchecked_transaction().map_err(store_err)?;

        tx.execute(
            "DELETE FROM period_records WHERE source_id = ?1",
            params![id],
        )
        .map_err(store_err)?;

        {
            let mut stmt = tx.prepare(&insert).map_err(store_err)?;
            for record in records {
                stmt.execute(params_from_iter(Self::row_values(record, &stored_at)?))
                    .map_err(store_err)?;
            }
        }

        tx.commit().map_err(store_err)?;
        debug!("Stored {} period records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn records_for_source(&self, source_id: SourceId) -> Result<Vec<PeriodRecord>> {
        let id = to_sql_id(source_id)?;
        let conn = self.conn.lock().map_err(store_err)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM period_records WHERE source_id = ?1 ORDER BY period_order ASC",
                self.select_columns
            ))
            .map_err(store_err)?;

        let rows = stmt
            .query_map(params![id], RecordRow::read)
            .map_err(store_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(store_err)?.into_record()?);
        }

        if records.is_empty() {
            debug!("Store miss for source");
        } else {
            debug!("Found {} stored period records", records.len());
        }
        Ok(records)
    }

    #[instrument(skip(self), fields(source_id = %source_id))]
    async fn delete_source(&self, source_id: SourceId) -> Result<usize> {
        let id = to_sql_id(source_id)?;
        let conn = self.conn.lock().map_err(store_err)?;
        let deleted = conn
            .execute(
                "DELETE FROM period_records WHERE source_id = ?1",
                params![id],
            )
            .map_err(store_err)?;
        debug!("Deleted {} period records", deleted);
        Ok(deleted)
    }

    async fn has_records(&self, source_id: SourceId) -> Result<bool> {
        let id = to_sql_id(source_id)?;
        let conn = self.conn.lock().map_err(store_err)?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM period_records WHERE source_id = ?1)",
            params![id],
            |row| row.get::<_, bool>(0),
        )
        .map_err(store_err)
    }

    #[instrument(skip(self))]
    async fn query_records(&self, query: &RecordQuery) -> Result<Vec<PeriodRecord>> {
        let symbol = query.symbol.as_ref().map(|s| s.as_str().to_string());
        let period_type = query.period_type.map(|pt| pt.as_str());
        let audit_status = query.audit_status.map(|a| a.as_str());
        let period_order = query.period_order.map(i64::from);

        let conn = self.conn.lock().map_err(store_err)?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM period_records
                 WHERE (?1 IS NULL OR symbol = ?1)
                   AND (?2 IS NULL OR period_type = ?2)
                   AND (?3 IS NULL OR audit_status = ?3)
                   AND (?4 IS NULL OR period_order = ?4)",
                self.select_columns
            ))
            .map_err(store_err)?;

        let rows = stmt
            .query_map(
                params![symbol, period_type, audit_status, period_order],
                RecordRow::read,
            )
            .map_err(store_err)?;

        let mut records = Vec::new();
        for row in rows {
            let record = row.map_err(store_err)?.into_record()?;
            // Date bounds compare parsed dates.
            if query.matches(&record) {
                records.push(record);
            }
        }

        sort_records(&mut records);
        debug!("Found {} matching records", records.len());
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn summaries(&self, filter: &SummaryFilter) -> Result<Vec<StatementSummary>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let mut summaries: Vec<StatementSummary> = Self::load_summaries(&conn)?
            .into_iter()
            .filter(|summary| filter.matches(summary))
            .collect();
        if let Some(limit) = filter.limit {
            summaries.truncate(limit);
        }
        Ok(summaries)
    }

    async fn companies(&self) -> Result<Vec<CompanySummary>> {
        let conn = self.conn.lock().map_err(store_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT symbol, company_name, COUNT(DISTINCT source_id), COUNT(*), MAX(stored_at)
                 FROM period_records
                 GROUP BY symbol
                 ORDER BY COUNT(DISTINCT source_id) DESC, symbol ASC",
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })
            .map_err(store_err)?;

        let mut companies = Vec::new();
        for row in rows {
            let (symbol, company_name, statements, records, latest) = row.map_err(store_err)?;
            companies.push(CompanySummary {
                symbol: symbol.into(),
                company_name,
                statement_count: usize::try_from(statements).map_err(store_err)?,
                period_record_count: usize::try_from(records).map_err(store_err)?,
                latest_stored_at: latest.as_deref().map(parse_timestamp).transpose()?,
            });
        }
        Ok(companies)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock().map_err(store_err)?;

        let total_period_records = Self::count(&conn, "SELECT COUNT(*) FROM period_records")?;
        let unique_companies =
            Self::count(&conn, "SELECT COUNT(DISTINCT symbol) FROM period_records")?;
        let unique_periods =
            Self::count(&conn, "SELECT COUNT(DISTINCT period_name) FROM period_records")?;

        let summaries = Self::load_summaries(&conn)?;
        let mut period_distribution: BTreeMap<PeriodType, usize> = BTreeMap::new();
        let mut audit_distribution: BTreeMap<AuditStatus, usize> = BTreeMap::new();
        for summary in &summaries {
            if summary.period_type != PeriodType::Unknown {
                *period_distribution.entry(summary.period_type).or_default() += 1;
            }
            if summary.audit_status != AuditStatus::Unknown {
                *audit_distribution.entry(summary.audit_status).or_default() += 1;
            }
        }

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
            unique_companies,
            unique_periods,
            items_per_statement: MetricKey::COUNT,
            period_distribution,
            audit_distribution,
            recent_activity,
        })
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(store_err)?;
        conn.execute("DELETE FROM period_records", [])
            .map_err(store_err)?;
        debug!("Cleared all stored statements");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statements_core::Symbol;

    fn statement(id: u64, symbol: &str, title: &str, periods: u32) -> Vec<PeriodRecord> {
        let source = SourceDocument::new(SourceId(id), symbol, "شرکت نمونه", title)
            .with_published_at("1403/01/15 10:00:00");
        (0..periods)
            .map(|order| {
                PeriodRecord::new(&source, format!("1402/12/{}", 29 - order), order, "۰")
                    .with_period(
                        PeriodType::FullYear,
                        AuditStatus::Audited,
                        PeriodDate::new(1402, 12, 29),
                    )
                    .with_metric(
                        MetricKey::OperatingRevenue,
                        MetricCell::new(Some(1_000.0 + f64::from(order)), "1,000"),
                    )
                    .with_metric(MetricKey::NetProfit, MetricCell::new(Some(0.0), "۰"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sqlite_store_initialization() {
        let store = SqliteStore::in_memory();
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_round_trip_preserves_every_cell() {
        let store = SqliteStore::in_memory().unwrap();
        let records = statement(7, "فولاد", "صورت سال مالی", 2);

        assert_eq!(store.replace_records(SourceId(7), &records).await.unwrap(), 2);
        let stored = store.records_for_source(SourceId(7)).await.unwrap();
        assert_eq!(stored, records);

        let capital = stored[0].get(MetricKey::Capital);
        assert_eq!(capital.amount, None);
        assert_eq!(capital.formatted, "۰");
        assert_eq!(stored[0].amount(MetricKey::NetProfit), Some(0.0));
        assert_eq!(stored[0].published_at.as_deref(), Some("1403/01/15 10:00:00"));
    }

    #[tokio::test]
    async fn test_replace_is_atomic_per_source() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .replace_records(SourceId(1), &statement(1, "A", "t", 3))
            .await
            .unwrap();

        // A failing replacement leaves the previous set untouched.
        let mut bad = statement(1, "A", "t", 2);
        bad[1].period_order = 0;
        assert!(store.replace_records(SourceId(1), &bad).await.is_err());
        assert_eq!(store.records_for_source(SourceId(1)).await.unwrap().len(), 3);

        store
            .replace_records(SourceId(1), &statement(1, "A", "t", 1))
            .await
            .unwrap();
        assert_eq!(store.records_for_source(SourceId(1)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_has_delete_and_clear() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.has_records(SourceId(1)).await.unwrap());

        store
            .replace_records(SourceId(1), &statement(1, "A", "t", 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "B", "t", 1))
            .await
            .unwrap();
        assert!(store.has_records(SourceId(1)).await.unwrap());

        assert_eq!(store.delete_source(SourceId(1)).await.unwrap(), 2);
        assert!(!store.has_records(SourceId(1)).await.unwrap());

        store.clear().await.unwrap();
        assert!(!store.has_records(SourceId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_records_filters_and_orders() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .replace_records(SourceId(1), &statement(1, "A", "t", 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "B", "t", 2))
            .await
            .unwrap();

        let all = store.query_records(&RecordQuery::default()).await.unwrap();
        let order: Vec<(u64, u32)> = all
            .iter()
            .map(|r| (r.source_id.get(), r.period_order))
            .collect();
        assert_eq!(order, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);

        let headline = RecordQuery::for_symbol("B").with_period_order(0);
        let records = store.query_records(&headline).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_id, SourceId(2));

        let later = RecordQuery::default().with_date_range(PeriodDate::new(1403, 1, 1), None);
        assert!(store.query_records(&later).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summaries_companies_and_stats() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .replace_records(SourceId(1), &statement(1, "A", "first", 2))
            .await
            .unwrap();
        store
            .replace_records(SourceId(2), &statement(2, "A", "second", 1))
            .await
            .unwrap();
        store
            .replace_records(SourceId(3), &statement(3, "B", "third", 1))
            .await
            .unwrap();

        let summaries = store.summaries(&SummaryFilter::default()).await.unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].source_id, SourceId(3));
        let first = summaries.iter().find(|s| s.source_id == SourceId(1)).unwrap();
        assert_eq!(first.period_count, 2);
        assert_eq!(first.title, "first");

        let only_a = store
            .summaries(&SummaryFilter {
                symbol_contains: Some("a".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_a.len(), 2);

        let companies = store.companies().await.unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].symbol, Symbol::new("A"));
        assert_eq!(companies[0].statement_count, 2);
        assert_eq!(companies[0].period_record_count, 3);
        assert!(companies[0].latest_stored_at.is_some());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_statements, 3);
        assert_eq!(stats.total_period_records, 4);
        assert_eq!(stats.unique_companies, 2);
        assert_eq!(stats.unique_periods, 2);
        assert_eq!(stats.period_distribution.get(&PeriodType::FullYear), Some(&3));
        assert_eq!(stats.audit_distribution.get(&AuditStatus::Audited), Some(&3));
        assert_eq!(stats.recent_activity.len(), 3);
    }
}
