//! Statement service orchestrating extraction, normalization, storage and reads.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use statements_core::{
    AmendmentResolver, AuditStatus, Comparator, Comparison, ComparisonRequest, CompanySummary,
    ExtractionProvider, MetricCatalog, MetricEvaluator, MetricRegistry, NestedView, Normalizer,
    PeriodDate, PeriodRecord, PeriodType, Reconstructor, RecordQuery, Result, SourceDocument,
    SourceId, StatementStore, StatementSummary, StatementsConfig, StatementsError, StoreStats,
    SummaryFilter, Symbol, records_to_frame,
};

/// A reconstructed statement with the metadata of its source document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatementView {
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
    /// True when served from the store without a new extraction.
    pub from_store: bool,
    /// The statement in its nested form.
    pub statement: NestedView,
}

/// Result of one document in a batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Source document identifier.
    pub source_id: SourceId,
    /// Issuer symbol.
    pub symbol: Symbol,
    /// Number of period records in the resulting view.
    pub period_count: usize,
    /// True when served from the store.
    pub from_store: bool,
    /// Failure message; `None` on success.
    pub error: Option<String>,
}

impl BatchOutcome {
    /// Returns true if the document was processed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-document results of a batch, in input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// One outcome per input document.
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    /// Number of processed documents.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of failed documents.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Orchestrates extraction, normalization, storage and reconstruction of statements.
///
/// Extractions run under a semaphore with `max_concurrent_extractions` permits. Work on
/// the same source document is serialized by a per-document lock held across extract,
/// normalize and replace.
///
/// # Example
///
/// ```rust,ignore
/// use statements::{InMemoryStore, StatementService, StatementsConfig, HttpExtractionProvider};
/// use std::sync::Arc;
///
/// let service = StatementService::new(
///     StatementsConfig::default(),
///     Arc::new(HttpExtractionProvider::new("http://localhost:8080")?),
///     Arc::new(InMemoryStore::new()),
/// )?;
///
/// let view = service.process(&source, false).await?;
/// println!("{} items over {} periods", view.statement.summary.total_items, view.statement.summary.total_periods);
/// ```
pub struct StatementService {
    config: Arc<StatementsConfig>,
    provider: Arc<dyn ExtractionProvider>,
    store: Arc<dyn StatementStore>,
    normalizer: Normalizer,
    reconstructor: Reconstructor,
    registry: Arc<MetricRegistry>,
    resolver: AmendmentResolver,
    comparator: Comparator,
    extractions: Semaphore,
    locks: std::sync::Mutex<HashMap<SourceId, Arc<Mutex<()>>>>,
}

impl std::fmt::Debug for StatementService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementService")
            .field("provider", &self.provider.name())
            .field("store", &self.store)
            .field(
                "max_concurrent_extractions",
                &self.config.max_concurrent_extractions,
            )
            .field("dictionary_rules", &self.normalizer.dictionary().len())
            .finish()
    }
}

impl StatementService {
    /// Create a service from a configuration, an extraction provider and a store.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: StatementsConfig,
        provider: Arc<dyn ExtractionProvider>,
        store: Arc<dyn StatementStore>,
    ) -> Result<Self> {
        config.validate()?;
        let dictionary = Arc::new(config.build_dictionary()?);
        let config = Arc::new(config);

        let registry = Arc::new(MetricRegistry::new(
            &dictionary,
            MetricRegistry::standard().derived().to_vec(),
        )?);
        let normalizer = Normalizer::new(Arc::clone(&config), Arc::clone(&dictionary))?;
        let reconstructor = Reconstructor::new(Arc::clone(&config), dictionary);
        let resolver = AmendmentResolver::with_classifier(normalizer.classifier().clone());
        let comparator = Comparator::new(
            Arc::clone(&registry),
            MetricEvaluator::from_config(&config),
            resolver.clone(),
        );

        debug!(provider = provider.name(), "Creating statement service");
        Ok(Self {
            extractions: Semaphore::new(config.max_concurrent_extractions),
            config,
            provider,
            store,
            normalizer,
            reconstructor,
            registry,
            resolver,
            comparator,
            locks: std::sync::Mutex::new(HashMap::new()),
        })
    }

    /// Create a service backed by the remote extraction service at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    #[cfg(feature = "http")]
    pub fn with_http(
        config: StatementsConfig,
        base_url: &str,
        store: Arc<dyn StatementStore>,
    ) -> Result<Self> {
        let provider = Arc::new(statements_http::HttpExtractionProvider::new(base_url)?);
        Self::new(config, provider, store)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &StatementsConfig {
        &self.config
    }

    /// Returns the metric registry.
    #[must_use]
    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }

    /// Processes one source document.
    ///
    /// Stored records are served as-is unless `force_refresh` is set; otherwise the
    /// document is extracted, normalized and its stored records replaced.
    ///
    /// # Errors
    /// Returns [`StatementsError::InvalidParameter`] for titles that are not financial
    /// statements or documents without a URL, the upstream message as
    /// [`StatementsError::Extraction`], and store failures.
    #[instrument(skip(self, source), fields(source_id = %source.id, symbol = %source.symbol))]
    pub async fn process(
        &self,
        source: &SourceDocument,
        force_refresh: bool,
    ) -> Result<StatementView> {
        self.check_source(source)?;

        let lock = self.source_lock(source.id)?;
        let result = {
            let _guard = lock.lock().await;
            self.process_locked(source, force_refresh).await
        };
        self.release_lock(source.id, lock);
        result
    }

    /// Processes many documents; a failure never aborts the batch.
    #[instrument(skip(self, sources), fields(count = sources.len()))]
    pub async fn process_batch(
        &self,
        sources: &[SourceDocument],
        force_refresh: bool,
    ) -> BatchReport {
        let outcomes = join_all(sources.iter().map(|source| async move {
            match self.process(source, force_refresh).await {
                Ok(view) => BatchOutcome {
                    source_id: source.id,
                    symbol: source.symbol.clone(),
                    period_count: view.statement.periods.len(),
                    from_store: view.from_store,
                    error: None,
                },
                Err(e) => {
                    warn!(source_id = %source.id, error = %e, "Statement processing failed");
                    BatchOutcome {
                        source_id: source.id,
                        symbol: source.symbol.clone(),
                        period_count: 0,
                        from_store: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        }))
        .await;

        let report = BatchReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Processed statement batch"
        );
        report
    }

    /// Returns the stored statement of a source document.
    ///
    /// # Errors
    /// Returns [`StatementsError::NotFound`] if nothing is stored for the document.
    #[instrument(skip(self), fields(source_id = %source_id))]
    pub async fn stored_view(&self, source_id: SourceId) -> Result<StatementView> {
        let records = self.store.records_for_source(source_id).await?;
        self.view_from_records(&records).ok_or_else(|| {
            StatementsError::NotFound(format!("no stored records for source {}", source_id))
        })
    }

    /// Deletes the stored records of a source document, returning the number removed.
    pub async fn delete_statement(&self, source_id: SourceId) -> Result<usize> {
        self.store.delete_source(source_id).await
    }

    /// Compares metrics across symbols.
    ///
    /// Symbols without matching statements yield an empty series.
    ///
    /// # Errors
    /// Returns [`StatementsError::InvalidParameter`] for an empty request,
    /// [`StatementsError::UnknownMetric`] for an unknown metric, and store failures.
    #[instrument(skip(self, request), fields(symbols = request.symbols.len(), period_type = %request.period_type))]
    pub async fn compare(&self, request: &ComparisonRequest) -> Result<Comparison> {
        let (metrics, definitions): (Vec<_>, Vec<_>) =
            self.comparator.resolve_metrics(request)?.into_iter().unzip();

        let mut series = Vec::with_capacity(request.symbols.len());
        for symbol in &request.symbols {
            let records = self.store.query_records(&request.record_query(symbol)).await?;
            debug!(symbol = %symbol, candidates = records.len(), "Comparing symbol");
            series.push(
                self.comparator
                    .series(symbol.clone(), records, &definitions, request.limit),
            );
        }

        Ok(Comparison {
            period_type: request.period_type,
            metrics,
            series,
        })
    }

    /// Searches stored statements, most recently stored first.
    ///
    /// With `filter_amendments`, statements superseded by an amendment of the same
    /// company and period are dropped before the limit is applied.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        filter: &SummaryFilter,
        filter_amendments: bool,
    ) -> Result<Vec<StatementSummary>> {
        if !filter_amendments {
            return self.store.summaries(filter).await;
        }

        let unlimited = SummaryFilter {
            limit: None,
            ..filter.clone()
        };
        let summaries = self.store.summaries(&unlimited).await?;

        let mut by_symbol: Vec<(Symbol, Vec<StatementSummary>)> = Vec::new();
        for summary in summaries {
            match by_symbol.iter_mut().find(|(s, _)| *s == summary.symbol) {
                Some((_, group)) => group.push(summary),
                None => by_symbol.push((summary.symbol.clone(), vec![summary])),
            }
        }

        let mut kept: Vec<StatementSummary> = by_symbol
            .into_iter()
            .flat_map(|(_, group)| self.resolver.filter(group, None))
            .collect();
        kept.sort_by(|a, b| {
            b.stored_at
                .cmp(&a.stored_at)
                .then(b.source_id.cmp(&a.source_id))
        });
        if let Some(limit) = filter.limit {
            kept.truncate(limit);
        }
        Ok(kept)
    }

    /// Returns aggregate store statistics.
    pub async fn stats(&self) -> Result<StoreStats> {
        self.store.stats().await
    }

    /// Returns every company with stored statements.
    pub async fn companies(&self) -> Result<Vec<CompanySummary>> {
        self.store.companies().await
    }

    /// Returns the direct, featured and derived metrics available for comparison.
    #[must_use]
    pub fn available_metrics(&self) -> MetricCatalog {
        self.registry.catalog()
    }

    /// Returns stored records matching a query as a wide DataFrame.
    pub async fn records_frame(&self, query: &RecordQuery) -> Result<DataFrame> {
        let records = self.store.query_records(query).await?;
        records_to_frame(&records)
    }

    fn check_source(&self, source: &SourceDocument) -> Result<()> {
        if !self
            .normalizer
            .classifier()
            .is_financial_statement(&source.title)
        {
            return Err(StatementsError::InvalidParameter(format!(
                "source {} is not a financial statement: {}",
                source.id, source.title
            )));
        }
        if source.url.is_none() {
            return Err(StatementsError::InvalidParameter(format!(
                "source {} has no url",
                source.id
            )));
        }
        Ok(())
    }

    async fn process_locked(
        &self,
        source: &SourceDocument,
        force_refresh: bool,
    ) -> Result<StatementView> {
        if !force_refresh {
            let stored = self.store.records_for_source(source.id).await?;
            if let Some(view) = self.view_from_records(&stored) {
                debug!("Serving stored statement");
                return Ok(view);
            }
        }

        let raw = {
            let _permit = self
                .extractions
                .acquire()
                .await
                .map_err(|e| StatementsError::Other(e.to_string()))?;
            debug!("Extracting statement");
            self.provider.extract(source).await?
        };

        let records = self.normalizer.normalize(source, &raw)?;
        let stored = self.store.replace_records(source.id, &records).await?;
        info!(records = stored, "Stored statement");

        let info = self.normalizer.classifier().classify(&source.title);
        Ok(StatementView {
            source_id: source.id,
            symbol: source.symbol.clone(),
            company_name: source.company_name.clone(),
            title: source.title.clone(),
            published_at: source.published_at.clone(),
            period_type: info.period_type,
            audit_status: info.audit_status,
            period_date: info.period_date,
            from_store: false,
            statement: self.reconstructor.reconstruct(&records),
        })
    }

    fn view_from_records(&self, records: &[PeriodRecord]) -> Option<StatementView> {
        let first = records.first()?;
        Some(StatementView {
            source_id: first.source_id,
            symbol: first.symbol.clone(),
            company_name: first.company_name.clone(),
            title: first.source_title.clone(),
            published_at: first.published_at.clone(),
            period_type: first.period_type,
            audit_status: first.audit_status,
            period_date: first.period_date,
            from_store: true,
            statement: self.reconstructor.reconstruct(records),
        })
    }

    fn source_lock(&self, source_id: SourceId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| StatementsError::Other(e.to_string()))?;
        Ok(Arc::clone(locks.entry(source_id).or_default()))
    }

    fn release_lock(&self, source_id: SourceId, lock: Arc<Mutex<()>>) {
        if let Ok(mut locks) = self.locks.lock() {
            // Only the map and this handle remain.
            if Arc::strong_count(&lock) == 2 {
                locks.remove(&source_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use statements_core::{
        MetricDictionary, MetricKey, RawExtraction, RawItem, RawValue, metrics::Formula,
    };
    use statements_store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Extraction provider replaying canned tables keyed by source id.
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        responses: HashMap<u64, RawExtraction>,
        delay: Duration,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedProvider {
        fn with(mut self, id: u64, raw: RawExtraction) -> Self {
            self.responses.insert(id, raw);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExtractionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn description(&self) -> &str {
            "Replays canned extractions"
        }

        async fn extract(&self, source: &SourceDocument) -> Result<RawExtraction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.responses
                .get(&source.id.get())
                .cloned()
                .ok_or_else(|| StatementsError::Network(format!("no response for {}", source.id)))
        }
    }

    fn label(key: MetricKey) -> String {
        MetricDictionary::standard().display_label(key).to_string()
    }

    fn table(revenue: f64, gross: f64) -> RawExtraction {
        RawExtraction::new(
            vec!["1402/12/29".to_string(), "1401/12/29".to_string()],
            vec![
                RawItem::new(
                    label(MetricKey::OperatingRevenue),
                    vec![
                        RawValue::new(Some(revenue), revenue.to_string()),
                        RawValue::new(Some(revenue / 2.0), (revenue / 2.0).to_string()),
                    ],
                ),
                RawItem::new(
                    label(MetricKey::GrossProfit),
                    vec![RawValue::new(Some(gross), gross.to_string())],
                ),
                RawItem::new("ردیف ناشناخته", vec![RawValue::new(Some(1.0), "1")]),
            ],
        )
    }

    fn source(id: u64, symbol: &str, title: &str) -> SourceDocument {
        SourceDocument::new(SourceId(id), symbol, format!("{} Co", symbol), title)
            .with_url(format!("https://example.com/{}", id))
            .with_published_at(format!("1403/01/{:02} 10:00:00", id))
    }

    const ANNUAL: &str = "اطلاعات و صورتهای مالی سال مالی منتهی به 1402/12/29 (حسابرسی شده)";
    const ANNUAL_AMENDED: &str =
        "اصلاحیه اطلاعات و صورتهای مالی سال مالی منتهی به 1402/12/29 (حسابرسی شده)";

    fn service(provider: ScriptedProvider) -> (StatementService, Arc<ScriptedProvider>) {
        let provider = Arc::new(provider);
        let service = StatementService::new(
            StatementsConfig::default(),
            Arc::clone(&provider) as Arc<dyn ExtractionProvider>,
            Arc::new(InMemoryStore::new()),
        )
        .unwrap();
        (service, provider)
    }

    #[tokio::test]
    async fn test_process_extracts_then_serves_from_store() {
        let (service, provider) = service(ScriptedProvider::default().with(1, table(400.0, 100.0)));
        let doc = source(1, "فولاد", ANNUAL);

        let view = service.process(&doc, false).await.unwrap();
        assert!(!view.from_store);
        assert_eq!(view.period_type, PeriodType::FullYear);
        assert_eq!(view.audit_status, AuditStatus::Audited);
        assert_eq!(view.statement.periods, vec!["1402/12/29", "1401/12/29"]);
        let revenue = view.statement.item(MetricKey::OperatingRevenue).unwrap();
        assert_eq!(revenue.values[1].amount, Some(200.0));
        assert!(view.statement.item(MetricKey::Capital).is_none());

        let again = service.process(&doc, false).await.unwrap();
        assert!(again.from_store);
        assert_eq!(again.statement, view.statement);
        assert_eq!(provider.calls(), 1);

        let refreshed = service.process(&doc, true).await.unwrap();
        assert!(!refreshed.from_store);
        assert_eq!(provider.calls(), 2);

        let stored = service.stored_view(SourceId(1)).await.unwrap();
        assert!(stored.from_store);
        assert_eq!(stored.title, ANNUAL);
    }

    #[tokio::test]
    async fn test_process_rejects_invalid_sources() {
        let (service, provider) = service(ScriptedProvider::default());

        let not_financial = source(1, "فولاد", "گزارش فعالیت ماهانه دوره 1 ماهه");
        assert!(matches!(
            service.process(&not_financial, false).await,
            Err(StatementsError::InvalidParameter(_))
        ));

        let mut no_url = source(2, "فولاد", ANNUAL);
        no_url.url = None;
        assert!(matches!(
            service.process(&no_url, false).await,
            Err(StatementsError::InvalidParameter(_))
        ));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_extraction_error_is_passed_through() {
        let (service, _) = service(
            ScriptedProvider::default().with(1, RawExtraction::failed("table not found")),
        );
        match service.process(&source(1, "فولاد", ANNUAL), false).await {
            Err(StatementsError::Extraction(msg)) => assert_eq!(msg, "table not found"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            service.stored_view(SourceId(1)).await,
            Err(StatementsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_isolates_failures_and_bounds_extractions() {
        let provider = ScriptedProvider {
            delay: Duration::from_millis(20),
            ..Default::default()
        }
        .with(1, table(100.0, 10.0))
        .with(2, table(200.0, 20.0))
        .with(3, RawExtraction::failed("boom"))
        .with(4, table(400.0, 40.0))
        .with(5, table(500.0, 50.0));
        let (service, provider) = service(provider);

        let sources: Vec<SourceDocument> =
            (1..=6).map(|id| source(id, "فولاد", ANNUAL)).collect();
        let report = service.process_batch(&sources, false).await;

        assert_eq!(report.outcomes.len(), 6);
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.failed(), 2);
        assert!(!report.outcomes[2].is_success());
        assert!(!report.outcomes[5].is_success());
        assert_eq!(report.outcomes[0].period_count, 2);
        assert!(provider.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_same_document_is_extracted_once_per_batch() {
        let provider = ScriptedProvider {
            delay: Duration::from_millis(10),
            ..Default::default()
        }
        .with(1, table(100.0, 10.0));
        let (service, provider) = service(provider);

        let doc = source(1, "فولاد", ANNUAL);
        let report = service
            .process_batch(&[doc.clone(), doc.clone(), doc], false)
            .await;
        assert_eq!(report.succeeded(), 3);
        assert_eq!(provider.calls(), 1);
        assert_eq!(report.outcomes.iter().filter(|o| o.from_store).count(), 2);
    }

    #[tokio::test]
    async fn test_compare_prefers_amendment() {
        let provider = ScriptedProvider::default()
            .with(1, table(400.0, 100.0))
            .with(2, table(500.0, 150.0))
            .with(3, table(50.0, 5.0));
        let (service, _) = service(provider);

        service.process(&source(1, "فولاد", ANNUAL), false).await.unwrap();
        service
            .process(&source(2, "فولاد", ANNUAL_AMENDED), false)
            .await
            .unwrap();
        service.process(&source(3, "شپنا", ANNUAL), false).await.unwrap();

        let request = ComparisonRequest::new(
            ["فولاد", "شپنا", "خودرو"],
            PeriodType::FullYear,
            ["operating_revenue", "gross_profit_margin"],
        );
        let comparison = service.compare(&request).await.unwrap();

        assert_eq!(comparison.metrics.len(), 2);
        assert!(comparison.metrics[1].derived);
        assert_eq!(comparison.series.len(), 3);

        let steel = &comparison.series[0];
        assert_eq!(steel.points.len(), 1);
        assert_eq!(steel.points[0].source_id, SourceId(2));
        assert_eq!(steel.points[0].values[0].amount, Some(500.0));
        assert_eq!(steel.points[0].values[1].amount, Some(30.0));
        assert_eq!(steel.points[0].values[1].formatted, "30.00%");

        assert!(comparison.series[1].has_data());
        assert!(!comparison.series[2].has_data());

        let frame = comparison.to_frame().unwrap();
        assert_eq!(frame.height(), 4);
    }

    #[tokio::test]
    async fn test_compare_rejects_unknown_metric() {
        let (service, _) = service(ScriptedProvider::default());
        let request = ComparisonRequest::new(["فولاد"], PeriodType::FullYear, ["roe"]);
        assert!(matches!(
            service.compare(&request).await,
            Err(StatementsError::UnknownMetric(_))
        ));
    }

    #[tokio::test]
    async fn test_search_with_amendment_filtering() {
        let provider = ScriptedProvider::default()
            .with(1, table(400.0, 100.0))
            .with(2, table(500.0, 150.0))
            .with(3, table(50.0, 5.0));
        let (service, _) = service(provider);

        service.process(&source(1, "فولاد", ANNUAL), false).await.unwrap();
        service
            .process(&source(2, "فولاد", ANNUAL_AMENDED), false)
            .await
            .unwrap();
        service.process(&source(3, "شپنا", ANNUAL), false).await.unwrap();

        let all = service.search(&SummaryFilter::default(), false).await.unwrap();
        assert_eq!(all.len(), 3);

        let current = service.search(&SummaryFilter::default(), true).await.unwrap();
        let mut ids: Vec<u64> = current.iter().map(|s| s.source_id.get()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3]);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_statements, 3);
        assert_eq!(stats.total_period_records, 6);

        let companies = service.companies().await.unwrap();
        assert_eq!(companies[0].symbol, Symbol::new("فولاد"));
        assert_eq!(companies[0].statement_count, 2);
    }

    #[tokio::test]
    async fn test_records_frame_and_catalog() {
        let (service, _) = service(ScriptedProvider::default().with(1, table(400.0, 100.0)));
        service.process(&source(1, "فولاد", ANNUAL), false).await.unwrap();

        let frame = service
            .records_frame(&RecordQuery::for_symbol("فولاد"))
            .await
            .unwrap();
        assert_eq!(frame.height(), 2);

        let catalog = service.available_metrics();
        assert_eq!(catalog.direct.len(), MetricKey::COUNT);
        assert!(catalog.derived.iter().any(|m| m.key == "gross_profit_margin"));
        assert!(matches!(
            service.registry().resolve("gross_profit_margin"),
            Some(statements_core::MetricDefinition::Derived(ref d))
                if matches!(d.formula, Formula::Percentage { .. })
        ));

        assert_eq!(service.delete_statement(SourceId(1)).await.unwrap(), 2);
    }
}
