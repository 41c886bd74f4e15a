//! Direct and derived metric evaluation.
//!
//! A metric is either a stored column ([`MetricDefinition::Direct`]) or a
//! [`DerivedMetric`] whose [`Formula`] combines stored columns. The [`MetricEvaluator`]
//! computes either kind for one [`PeriodRecord`] and never fails: unavailable values come
//! back as `None` with the unavailable glyph.
//!
//! # Example
//!
//! ```
//! use statements_core::{MetricEvaluator, MetricKey, MetricRegistry, PeriodRecord, SourceDocument, SourceId};
//! use statements_core::MetricCell;
//!
//! let source = SourceDocument::new(SourceId(1), "فولاد", "Steel", "title");
//! let record = PeriodRecord::new(&source, "P1", 0, "۰")
//!     .with_metric(MetricKey::OperatingRevenue, MetricCell::new(Some(200.0), "200"))
//!     .with_metric(MetricKey::GrossProfit, MetricCell::new(Some(50.0), "50"));
//!
//! let registry = MetricRegistry::standard();
//! let evaluator = MetricEvaluator::default();
//! let margin = registry.resolve("gross_profit_margin").unwrap();
//! let value = evaluator.evaluate(&record, &margin);
//! assert_eq!(value.formatted, "25.00%");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    config::StatementsConfig,
    dictionary::MetricDictionary,
    error::{Result, StatementsError},
    format::{format_grouped, format_percentage, format_ratio},
    metric::MetricKey,
    record::PeriodRecord,
};

/// One signed operand of a sum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Operand column.
    pub key: MetricKey,
    /// True if the operand is subtracted.
    pub negate: bool,
}

impl Term {
    /// An added operand.
    #[must_use]
    pub const fn plus(key: MetricKey) -> Self {
        Self { key, negate: false }
    }

    /// A subtracted operand.
    #[must_use]
    pub const fn minus(key: MetricKey) -> Self {
        Self { key, negate: true }
    }
}

/// Arithmetic over stored columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formula {
    /// Signed sum; missing operands count as zero.
    Sum(Vec<Term>),
    /// `numerator / denominator`.
    Ratio {
        /// Dividend column.
        numerator: MetricKey,
        /// Divisor column.
        denominator: MetricKey,
    },
    /// `numerator / denominator * 100`.
    Percentage {
        /// Dividend column.
        numerator: MetricKey,
        /// Divisor column.
        denominator: MetricKey,
    },
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    match (i, term.negate) {
                        (0, false) => write!(f, "{}", term.key)?,
                        (0, true) => write!(f, "-{}", term.key)?,
                        (_, false) => write!(f, " + {}", term.key)?,
                        (_, true) => write!(f, " - {}", term.key)?,
                    }
                }
                Ok(())
            }
            Self::Ratio {
                numerator,
                denominator,
            } => write!(f, "{} / {}", numerator, denominator),
            Self::Percentage {
                numerator,
                denominator,
            } => write!(f, "({} / {}) * 100", numerator, denominator),
        }
    }
}

/// A named metric computed from stored columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedMetric {
    /// Identifier used in requests.
    pub key: String,
    /// Display name.
    pub name: String,
    /// What the metric measures.
    pub description: String,
    /// How it is computed.
    pub formula: Formula,
}

impl DerivedMetric {
    /// Creates a derived metric.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        formula: Formula,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            formula,
        }
    }
}

/// A metric that can be requested for comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricDefinition {
    /// A stored column.
    Direct {
        /// Column key.
        key: MetricKey,
    },
    /// A computed metric.
    Derived(DerivedMetric),
}

impl MetricDefinition {
    /// Returns the request identifier of the metric.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Direct { key } => key.as_str(),
            Self::Derived(derived) => &derived.key,
        }
    }

    /// Returns true for computed metrics.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        matches!(self, Self::Derived(_))
    }
}

impl From<MetricKey> for MetricDefinition {
    fn from(key: MetricKey) -> Self {
        Self::Direct { key }
    }
}

/// Evaluated metric: amount (if available) and display text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    /// Numeric value; `None` when unavailable.
    pub amount: Option<f64>,
    /// Display text.
    pub formatted: String,
}

impl MetricValue {
    /// Returns true if the value has an amount.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.amount.is_some()
    }
}

/// Evaluates metrics against period records.
#[derive(Clone, Debug)]
pub struct MetricEvaluator {
    unavailable_glyph: String,
}

impl Default for MetricEvaluator {
    fn default() -> Self {
        Self::new("N/A")
    }
}

impl MetricEvaluator {
    /// Creates an evaluator rendering unavailable values with the given glyph.
    #[must_use]
    pub fn new(unavailable_glyph: impl Into<String>) -> Self {
        Self {
            unavailable_glyph: unavailable_glyph.into(),
        }
    }

    /// Creates an evaluator from configuration.
    #[must_use]
    pub fn from_config(config: &StatementsConfig) -> Self {
        Self::new(config.unavailable_glyph.clone())
    }

    /// Evaluates a metric for one record.
    ///
    /// Direct metrics return the stored pair verbatim, or the unavailable glyph when no
    /// amount is stored. Derived metrics follow their formula; ratios and percentages with
    /// a missing or zero denominator are unavailable.
    #[must_use]
    pub fn evaluate(&self, record: &PeriodRecord, metric: &MetricDefinition) -> MetricValue {
        match metric {
            MetricDefinition::Direct { key } => {
                let cell = record.get(*key);
                match cell.amount {
                    Some(amount) => MetricValue {
                        amount: Some(amount),
                        formatted: cell.formatted.clone(),
                    },
                    None => self.unavailable(),
                }
            }
            MetricDefinition::Derived(derived) => self.evaluate_formula(record, &derived.formula),
        }
    }

    /// Evaluates a formula for one record.
    #[must_use]
    pub fn evaluate_formula(&self, record: &PeriodRecord, formula: &Formula) -> MetricValue {
        let value = match formula {
            Formula::Sum(terms) => {
                let total: f64 = terms
                    .iter()
                    .map(|t| {
                        let v = record.amount(t.key).unwrap_or(0.0);
                        if t.negate { -v } else { v }
                    })
                    .sum();
                Some((total, format_grouped(total, 0)))
            }
            Formula::Ratio {
                numerator,
                denominator,
            } => divide(record, *numerator, *denominator).map(|r| (r, format_ratio(r))),
            Formula::Percentage {
                numerator,
                denominator,
            } => divide(record, *numerator, *denominator)
                .map(|r| r * 100.0)
                .map(|p| (p, format_percentage(p))),
        };

        match value {
            Some((amount, formatted)) if amount.is_finite() => MetricValue {
                amount: Some(amount),
                formatted,
            },
            _ => self.unavailable(),
        }
    }

    fn unavailable(&self) -> MetricValue {
        MetricValue {
            amount: None,
            formatted: self.unavailable_glyph.clone(),
        }
    }
}

fn divide(record: &PeriodRecord, numerator: MetricKey, denominator: MetricKey) -> Option<f64> {
    let d = record.amount(denominator)?;
    if d == 0.0 {
        return None;
    }
    let n = record.amount(numerator).unwrap_or(0.0);
    Some(n / d)
}

/// Discovery entry for one metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    /// Request identifier.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Formula text, for derived metrics.
    pub formula: Option<String>,
    /// Description, for derived metrics.
    pub description: Option<String>,
}

/// Every metric available for comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricCatalog {
    /// Every stored column.
    pub direct: Vec<MetricInfo>,
    /// Curated subset of stored columns.
    pub featured: Vec<MetricInfo>,
    /// Computed metrics.
    pub derived: Vec<MetricInfo>,
}

const FEATURED: [MetricKey; 12] = [
    MetricKey::OperatingRevenue,
    MetricKey::CostOfGoodsSold,
    MetricKey::GrossProfit,
    MetricKey::SellingAdminExpenses,
    MetricKey::OtherIncome,
    MetricKey::NonOperatingIncome,
    MetricKey::OperatingProfit,
    MetricKey::FinancialExpenses,
    MetricKey::NetProfit,
    MetricKey::BasicEps,
    MetricKey::DilutedEps,
    MetricKey::Capital,
];

/// Registry of direct and derived metrics.
#[derive(Clone, Debug)]
pub struct MetricRegistry {
    labels: Vec<(MetricKey, String)>,
    derived: Vec<DerivedMetric>,
}

impl MetricRegistry {
    /// Creates a registry with display labels from a dictionary and the given derived metrics.
    ///
    /// Derived keys must be unique and must not shadow a stored column.
    pub fn new(dictionary: &MetricDictionary, derived: Vec<DerivedMetric>) -> Result<Self> {
        for (i, metric) in derived.iter().enumerate() {
            if metric.key.parse::<MetricKey>().is_ok() {
                return Err(StatementsError::Config(format!(
                    "derived metric {} shadows a stored column",
                    metric.key
                )));
            }
            if derived[..i].iter().any(|m| m.key == metric.key) {
                return Err(StatementsError::Config(format!(
                    "duplicate derived metric {}",
                    metric.key
                )));
            }
        }

        Ok(Self {
            labels: labels(dictionary),
            derived,
        })
    }

    /// Returns the built-in registry.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            labels: labels(&MetricDictionary::standard()),
            derived: standard_derived(),
        }
    }

    /// Resolves a request identifier to a metric definition.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<MetricDefinition> {
        let name = name.trim();
        if let Ok(key) = name.parse::<MetricKey>() {
            return Some(MetricDefinition::Direct { key });
        }
        self.derived
            .iter()
            .find(|m| m.key == name)
            .cloned()
            .map(MetricDefinition::Derived)
    }

    /// Resolves every identifier, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<MetricDefinition>> {
        names
            .iter()
            .map(|n| {
                self.resolve(n.as_ref())
                    .ok_or_else(|| StatementsError::UnknownMetric(n.as_ref().to_string()))
            })
            .collect()
    }

    /// Returns the derived metrics.
    #[must_use]
    pub fn derived(&self) -> &[DerivedMetric] {
        &self.derived
    }

    /// Returns the display name of a metric identifier.
    #[must_use]
    pub fn display_name(&self, name: &str) -> Option<&str> {
        let name = name.trim();
        if let Some((_, label)) = self.labels.iter().find(|(k, _)| k.as_str() == name) {
            return Some(label.as_str());
        }
        self.derived
            .iter()
            .find(|m| m.key == name)
            .map(|m| m.name.as_str())
    }

    /// Lists every metric for discovery.
    #[must_use]
    pub fn catalog(&self) -> MetricCatalog {
        let info = |key: MetricKey| MetricInfo {
            key: key.as_str().to_string(),
            name: self
                .labels
                .iter()
                .find(|(k, _)| *k == key)
                .map_or_else(|| key.as_str().to_string(), |(_, l)| l.clone()),
            formula: None,
            description: None,
        };

        MetricCatalog {
            direct: MetricKey::ALL.into_iter().map(info).collect(),
            featured: FEATURED.into_iter().map(info).collect(),
            derived: self
                .derived
                .iter()
                .map(|m| MetricInfo {
                    key: m.key.clone(),
                    name: m.name.clone(),
                    formula: Some(m.formula.to_string()),
                    description: Some(m.description.clone()),
                })
                .collect(),
        }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn labels(dictionary: &MetricDictionary) -> Vec<(MetricKey, String)> {
    MetricKey::ALL
        .into_iter()
        .map(|key| (key, dictionary.display_label(key).to_string()))
        .collect()
}

fn standard_derived() -> Vec<DerivedMetric> {
    vec![
        DerivedMetric::new(
            "revenue_plus_cogs",
            "درآمد + بهای تمام شده",
            "مجموع درآمد عملیاتی و بهای تمام شده کالای فروخته شده",
            Formula::Sum(vec![
                Term::plus(MetricKey::OperatingRevenue),
                Term::plus(MetricKey::CostOfGoodsSold),
            ]),
        ),
        DerivedMetric::new(
            "total_expenses",
            "کل هزینه\u{200c}های عملیاتی",
            "مجموع بهای تمام شده و هزینه\u{200c}های فروش و اداری",
            Formula::Sum(vec![
                Term::plus(MetricKey::CostOfGoodsSold),
                Term::plus(MetricKey::SellingAdminExpenses),
            ]),
        ),
        DerivedMetric::new(
            "total_other_income",
            "کل سایر درآمدها",
            "مجموع سایر درآمدها و درآمدهای غیرعملیاتی",
            Formula::Sum(vec![
                Term::plus(MetricKey::OtherIncome),
                Term::plus(MetricKey::NonOperatingIncome),
            ]),
        ),
        DerivedMetric::new(
            "net_operating_result",
            "نتیجه عملیاتی خالص",
            "سود عملیاتی منهای هزینه\u{200c}های مالی",
            Formula::Sum(vec![
                Term::plus(MetricKey::OperatingProfit),
                Term::minus(MetricKey::FinancialExpenses),
            ]),
        ),
        DerivedMetric::new(
            "revenue_to_capital_ratio",
            "نسبت درآمد به سرمایه",
            "درآمد عملیاتی تقسیم بر سرمایه",
            Formula::Ratio {
                numerator: MetricKey::OperatingRevenue,
                denominator: MetricKey::Capital,
            },
        ),
        DerivedMetric::new(
            "gross_profit_margin",
            "حاشیه سود ناخالص (درصد)",
            "درصد حاشیه سود ناخالص نسبت به درآمد",
            Formula::Percentage {
                numerator: MetricKey::GrossProfit,
                denominator: MetricKey::OperatingRevenue,
            },
        ),
        DerivedMetric::new(
            "net_profit_margin",
            "حاشیه سود خالص (درصد)",
            "درصد حاشیه سود خالص نسبت به درآمد",
            Formula::Percentage {
                numerator: MetricKey::NetProfit,
                denominator: MetricKey::OperatingRevenue,
            },
        ),
        DerivedMetric::new(
            "operating_profit_margin",
            "حاشیه سود عملیاتی (درصد)",
            "درصد سود عملیاتی نسبت به درآمد",
            Formula::Percentage {
                numerator: MetricKey::OperatingProfit,
                denominator: MetricKey::OperatingRevenue,
            },
        ),
        DerivedMetric::new(
            "return_on_capital",
            "بازده سرمایه (درصد)",
            "درصد سود خالص نسبت به سرمایه",
            Formula::Percentage {
                numerator: MetricKey::NetProfit,
                denominator: MetricKey::Capital,
            },
        ),
    ]
}
