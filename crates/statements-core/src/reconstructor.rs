//! Wide-to-nested reconstruction.
//!
//! The [`Reconstructor`] is the inverse of the [`Normalizer`](crate::normalizer::Normalizer):
//! it rebuilds the periods × items view from stored [`PeriodRecord`]s, using canonical
//! display labels and dictionary order for the rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{
    config::StatementsConfig,
    dictionary::MetricDictionary,
    metric::{MetricCell, MetricKey},
    record::PeriodRecord,
    types::{RawExtraction, RawItem, RawValue},
};

/// One row of the nested view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NestedItem {
    /// Canonical key of the row.
    pub key: MetricKey,
    /// Display label.
    pub name: String,
    /// One cell per period, aligned with [`NestedView::periods`].
    pub values: Vec<MetricCell>,
    /// True for subtotal and total lines.
    pub is_total: bool,
    /// 1-based position of the key in dictionary order.
    pub row_index: usize,
}

/// Headline categories summarised in [`NestedView::key_metrics`].
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KeyMetricCategory {
    /// Operating revenue.
    Revenue,
    /// Gross profit.
    GrossProfit,
    /// Operating profit.
    OperatingProfit,
    /// Net profit.
    NetProfit,
    /// Earnings per share.
    Eps,
    /// Share capital.
    Capital,
}

impl KeyMetricCategory {
    /// All categories, in summary order.
    pub const ALL: [Self; 6] = [
        Self::Revenue,
        Self::GrossProfit,
        Self::OperatingProfit,
        Self::NetProfit,
        Self::Eps,
        Self::Capital,
    ];

    /// Keys accepted for this category, most preferred first.
    #[must_use]
    pub const fn keys(self) -> &'static [MetricKey] {
        match self {
            Self::Revenue => &[MetricKey::OperatingRevenue],
            Self::GrossProfit => &[MetricKey::GrossProfit],
            Self::OperatingProfit => &[MetricKey::OperatingProfit],
            Self::NetProfit => &[MetricKey::NetProfitContinuing, MetricKey::NetProfit],
            Self::Eps => &[
                MetricKey::BasicEps,
                MetricKey::DilutedEps,
                MetricKey::EpsContinuing,
            ],
            Self::Capital => &[MetricKey::Capital],
        }
    }

    /// Returns the category name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Revenue => "operating_revenue",
            Self::GrossProfit => "gross_profit",
            Self::OperatingProfit => "operating_profit",
            Self::NetProfit => "net_profit",
            Self::Eps => "eps",
            Self::Capital => "capital",
        }
    }
}

impl fmt::Display for KeyMetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A headline figure picked from the view's items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyMetric {
    /// Category this item represents.
    pub category: KeyMetricCategory,
    /// Key of the selected item.
    pub key: MetricKey,
    /// Display label of the selected item.
    pub name: String,
    /// Values of the selected item.
    pub values: Vec<MetricCell>,
}

/// Counts describing a nested view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSummary {
    /// Number of items.
    pub total_items: usize,
    /// Number of periods.
    pub total_periods: usize,
    /// Number of key metric categories found.
    pub key_metrics_found: usize,
}

/// Nested periods × items representation of a statement.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NestedView {
    /// Period names in period order.
    pub periods: Vec<String>,
    /// Items in dictionary order.
    pub items: Vec<NestedItem>,
    /// Headline figures.
    pub key_metrics: Vec<KeyMetric>,
    /// Counts.
    pub summary: ViewSummary,
}

impl NestedView {
    /// Returns the item for a key, if present.
    #[must_use]
    pub fn item(&self, key: MetricKey) -> Option<&NestedItem> {
        self.items.iter().find(|i| i.key == key)
    }

    /// Returns the headline figure for a category, if found.
    #[must_use]
    pub fn key_metric(&self, category: KeyMetricCategory) -> Option<&KeyMetric> {
        self.key_metrics.iter().find(|m| m.category == category)
    }

    /// Returns true if the view has no periods.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Converts the view back into the long extraction shape.
    #[must_use]
    pub fn to_extraction(&self) -> RawExtraction {
        let items = self
            .items
            .iter()
            .map(|item| {
                let values = item
                    .values
                    .iter()
                    .map(|cell| RawValue::new(cell.amount, cell.formatted.clone()))
                    .collect();
                RawItem::new(item.name.clone(), values)
            })
            .collect();
        RawExtraction::new(self.periods.clone(), items)
    }
}

/// Rebuilds nested views from period records.
#[derive(Clone, Debug)]
pub struct Reconstructor {
    config: Arc<StatementsConfig>,
    dictionary: Arc<MetricDictionary>,
}

impl Reconstructor {
    /// Creates a reconstructor from shared configuration and dictionary.
    #[must_use]
    pub const fn new(config: Arc<StatementsConfig>, dictionary: Arc<MetricDictionary>) -> Self {
        Self { config, dictionary }
    }

    /// Rebuilds the nested view of one source document's records.
    ///
    /// Records are ordered by `period_order`; non-data marker periods are dropped. A key
    /// is listed only if at least one period has an amount for it.
    #[must_use]
    pub fn reconstruct(&self, records: &[PeriodRecord]) -> NestedView {
        let mut ordered: Vec<&PeriodRecord> = records
            .iter()
            .filter(|r| !self.config.is_non_data_period(&r.period_name))
            .collect();
        ordered.sort_by_key(|r| r.period_order);

        let periods: Vec<String> = ordered.iter().map(|r| r.period_name.clone()).collect();

        let items: Vec<NestedItem> = self
            .dictionary
            .keys()
            .into_iter()
            .enumerate()
            .filter(|(_, key)| ordered.iter().any(|r| r.get(*key).has_amount()))
            .map(|(position, key)| NestedItem {
                key,
                name: self.dictionary.display_label(key).to_string(),
                values: ordered.iter().map(|r| r.get(key).clone()).collect(),
                is_total: key.is_total_line(),
                row_index: position + 1,
            })
            .collect();

        let key_metrics: Vec<KeyMetric> = KeyMetricCategory::ALL
            .into_iter()
            .filter_map(|category| {
                category.keys().iter().find_map(|key| {
                    items.iter().find(|i| i.key == *key).map(|item| KeyMetric {
                        category,
                        key: item.key,
                        name: item.name.clone(),
                        values: item.values.clone(),
                    })
                })
            })
            .collect();

        let summary = ViewSummary {
            total_items: items.len(),
            total_periods: periods.len(),
            key_metrics_found: key_metrics.len(),
        };

        NestedView {
            periods,
            items,
            key_metrics,
            summary,
        }
    }
}
