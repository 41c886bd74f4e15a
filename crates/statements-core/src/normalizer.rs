//! Long-to-wide normalization of raw extractions.
//!
//! The [`Normalizer`] turns a [`RawExtraction`] (free-text rows × periods) into one
//! [`PeriodRecord`] per data period, binding rows to canonical keys through the
//! [`MetricDictionary`]. It performs no I/O and the same inputs always produce the same
//! records.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{
    classifier::TitleClassifier,
    config::StatementsConfig,
    dictionary::MetricDictionary,
    error::{Result, StatementsError},
    metric::{MetricCell, MetricKey},
    record::PeriodRecord,
    types::{RawExtraction, RawItem, SourceDocument},
};

/// Converts raw extractions into wide period records.
#[derive(Clone, Debug)]
pub struct Normalizer {
    config: Arc<StatementsConfig>,
    dictionary: Arc<MetricDictionary>,
    classifier: TitleClassifier,
}

impl Normalizer {
    /// Creates a normalizer from shared configuration and dictionary.
    pub fn new(config: Arc<StatementsConfig>, dictionary: Arc<MetricDictionary>) -> Result<Self> {
        let classifier = TitleClassifier::new(&config)?;
        Ok(Self {
            config,
            dictionary,
            classifier,
        })
    }

    /// Creates a normalizer with the dictionary described by the configuration.
    pub fn from_config(config: StatementsConfig) -> Result<Self> {
        let dictionary = Arc::new(config.build_dictionary()?);
        Self::new(Arc::new(config), dictionary)
    }

    /// Returns the label dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &MetricDictionary {
        &self.dictionary
    }

    /// Returns the title classifier.
    #[must_use]
    pub const fn classifier(&self) -> &TitleClassifier {
        &self.classifier
    }

    /// Normalizes one extraction of a source document.
    ///
    /// # Errors
    ///
    /// Returns [`StatementsError::Extraction`] with the upstream message when the
    /// extraction carries an error. No records are produced in that case.
    pub fn normalize(
        &self,
        source: &SourceDocument,
        raw: &RawExtraction,
    ) -> Result<Vec<PeriodRecord>> {
        raw.check()?;

        let info = self.classifier.classify(&source.title);

        let mut lookup: HashMap<&str, &RawItem> = HashMap::with_capacity(raw.items.len());
        for item in &raw.items {
            lookup.insert(item.label.trim(), item);
        }

        let mut bindings: [Option<&RawItem>; MetricKey::COUNT] = [None; MetricKey::COUNT];
        for rule in self.dictionary.rules() {
            if let Some(item) = lookup.get(rule.label.as_str()) {
                bindings[rule.key.index()] = Some(*item);
            }
        }

        let unmapped = lookup
            .keys()
            .filter(|label| self.dictionary.resolve(label).is_none())
            .count();

        let mut records = Vec::with_capacity(raw.periods.len());
        for (i, period_name) in raw.periods.iter().enumerate() {
            if self.config.is_non_data_period(period_name) {
                debug!(source_id = %source.id, period = %period_name, "Skipping non-data period");
                continue;
            }

            let period_order = u32::try_from(i).map_err(|_| {
                StatementsError::InvalidParameter(format!("period index {} out of range", i))
            })?;

            let mut record =
                PeriodRecord::new(source, period_name.as_str(), period_order, &self.config.zero_glyph)
                    .with_period(info.period_type, info.audit_status, info.period_date);

            for key in MetricKey::ALL {
                let value = bindings[key.index()].and_then(|item| item.value_at(i));
                if let Some(value) = value {
                    record.set(key, MetricCell::new(value.amount, value.formatted.clone()));
                }
            }

            records.push(record);
        }

        debug!(
            source_id = %source.id,
            records = records.len(),
            mapped = bindings.iter().filter(|b| b.is_some()).count(),
            unmapped,
            "Normalized extraction"
        );

        Ok(records)
    }
}
