//! Ordered label dictionary mapping source row labels to canonical metric keys.
//!
//! Source tables spell the same line item in several Unicode-distinct ways (Arabic versus
//! Persian yeh and kaf, zero-width non-joiner versus space, spacing around parentheses).
//! [`MetricDictionary`] holds an explicit ordered list of [`LabelRule`]s and matches the
//! trimmed label exactly against them, first rule wins. More specific phrases are listed
//! before the shorter phrases they contain.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, StatementsError},
    metric::MetricKey,
};

/// One dictionary entry: an exact source label and the key it maps to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRule {
    /// Source label, matched exactly after trimming.
    pub label: String,
    /// Canonical key.
    pub key: MetricKey,
}

impl LabelRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(label: impl Into<String>, key: MetricKey) -> Self {
        Self {
            label: label.into(),
            key,
        }
    }
}

const STANDARD_RULES: &[(&str, MetricKey)] = &[
    ("سایر درآمدها و هزینه\u{200c}های غیرعملیاتی- درآمد سرمایه\u{200c}گذاری\u{200c}ها", MetricKey::InvestmentIncome),
    ("سایر درآمدها و هزینه\u{200c}های غیرعملیاتی- اقلام متفرقه", MetricKey::MiscellaneousIncome),
    ("ساير درآمدها و هزينه هاى غيرعملياتى", MetricKey::NonOperatingIncome),
    ("هزینه کاهش ارزش دریافتنی\u{200c}ها (هزینه استثنایی)", MetricKey::ImpairmentExpense),
    ("هزينه کاهش ارزش دريافتني ها (هزينه استثنايي)", MetricKey::ImpairmentExpense),
    ("سود (زيان) عمليات در حال تداوم قبل از ماليات", MetricKey::ProfitBeforeTax),
    ("سود(زيان) عمليات در حال تداوم قبل از ماليات", MetricKey::ProfitBeforeTax),
    ("سود (زيان) خالص عمليات در حال تداوم", MetricKey::NetProfitContinuing),
    ("سود(زيان) خالص عمليات در حال تداوم", MetricKey::NetProfitContinuing),
    ("سود (زیان) خالص عملیات متوقف شده", MetricKey::NetProfitDiscontinued),
    ("سود (زيان) خالص عمليات متوقف شده", MetricKey::NetProfitDiscontinued),
    ("هزينه\u{200c}هاى فروش، ادارى و عمومى", MetricKey::SellingAdminExpenses),
    ("هزينه هاى فروش، ادارى و عمومى", MetricKey::SellingAdminExpenses),
    ("بهاى تمام شده درآمدهای عملیاتی", MetricKey::CostOfGoodsSold),
    ("بهاى تمام شده درآمدهاي عملياتي", MetricKey::CostOfGoodsSold),
    ("ناشی از عملیات در حال تداوم", MetricKey::EpsContinuing),
    ("ناشي از عمليات در حال تداوم", MetricKey::EpsContinuing),
    ("ناشی از عملیات متوقف شده", MetricKey::EpsDiscontinued),
    ("ناشي از عمليات متوقف شده", MetricKey::EpsDiscontinued),
    ("سود (زیان) خالص هر سهم\u{2013} ریال", MetricKey::DilutedEps),
    ("سود (زيان) خالص هر سهم \u{2013} ريال", MetricKey::DilutedEps),
    ("سود (زيان) پايه هر سهم", MetricKey::BasicEps),
    ("سود(زيان) پايه هر سهم", MetricKey::BasicEps),
    ("درآمدهای عملیاتی", MetricKey::OperatingRevenue),
    ("درآمدهاي عملياتي", MetricKey::OperatingRevenue),
    ("سود (زيان) ناخالص", MetricKey::GrossProfit),
    ("سود(زيان) ناخالص", MetricKey::GrossProfit),
    ("ساير درآمدها", MetricKey::OtherIncome),
    ("سایر هزینه\u{200c}ها", MetricKey::OtherExpenses),
    ("ساير هزينه\u{200c}ها", MetricKey::OtherExpenses),
    ("سود (زيان) عملياتي", MetricKey::OperatingProfit),
    ("سود(زيان) عملياتى", MetricKey::OperatingProfit),
    ("هزينه\u{200c}هاى مالى", MetricKey::FinancialExpenses),
    ("هزينه هاى مالى", MetricKey::FinancialExpenses),
    ("سال جاری", MetricKey::CurrentYearTax),
    ("سال جاري", MetricKey::CurrentYearTax),
    ("سال\u{200c}های قبل", MetricKey::PriorYearsTax),
    ("سال\u{200c}هاي قبل", MetricKey::PriorYearsTax),
    ("سود (زيان) خالص", MetricKey::NetProfit),
    ("سود(زيان) خالص", MetricKey::NetProfit),
    ("عملیاتی (ریال)", MetricKey::OperationalEps),
    ("عملياتي (ريال)", MetricKey::OperationalEps),
    ("غیرعملیاتی (ریال)", MetricKey::NonOperationalEps),
    ("غيرعملياتي (ريال)", MetricKey::NonOperationalEps),
    ("سرمایه", MetricKey::Capital),
    ("سرمايه", MetricKey::Capital),
];

/// Ordered set of label rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricDictionary {
    rules: Vec<LabelRule>,
}

impl MetricDictionary {
    /// Builds a dictionary from rules in priority order.
    ///
    /// Labels are trimmed. An empty label, or one label mapped to two different keys,
    /// is a configuration error. A label repeated for the same key is kept once.
    pub fn new(rules: Vec<LabelRule>) -> Result<Self> {
        let mut accepted: Vec<LabelRule> = Vec::with_capacity(rules.len());

        for rule in rules {
            let label = rule.label.trim().to_string();
            if label.is_empty() {
                return Err(StatementsError::Config(format!(
                    "empty label for metric {}",
                    rule.key
                )));
            }

            match accepted.iter().find(|r| r.label == label) {
                Some(existing) if existing.key == rule.key => continue,
                Some(existing) => {
                    return Err(StatementsError::Config(format!(
                        "label '{}' maps to both {} and {}",
                        label, existing.key, rule.key
                    )));
                }
                None => accepted.push(LabelRule::new(label, rule.key)),
            }
        }

        Ok(Self { rules: accepted })
    }

    /// Returns the built-in Persian income statement dictionary.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES
                .iter()
                .map(|(label, key)| LabelRule::new(*label, *key))
                .collect(),
        }
    }

    /// Resolves a raw source label to its metric key.
    ///
    /// Matching is exact on the trimmed label. Unmapped labels yield `None`.
    #[must_use]
    pub fn resolve(&self, raw_label: &str) -> Option<MetricKey> {
        let label = raw_label.trim();
        let key = self.rules.iter().find(|r| r.label == label).map(|r| r.key);
        if key.is_none() {
            debug!(label, "Unmapped statement label");
        }
        key
    }

    /// Returns the rules in priority order.
    #[must_use]
    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }

    /// Returns every metric key in declaration order.
    ///
    /// Keys appear in the order of their first rule; keys without any rule follow in
    /// column order.
    #[must_use]
    pub fn keys(&self) -> Vec<MetricKey> {
        let mut keys: Vec<MetricKey> = Vec::with_capacity(MetricKey::COUNT);
        for rule in &self.rules {
            if !keys.contains(&rule.key) {
                keys.push(rule.key);
            }
        }
        for key in MetricKey::ALL {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Returns the display label for a key: its first registered variant, or the key name.
    #[must_use]
    pub fn display_label(&self, key: MetricKey) -> &str {
        self.rules
            .iter()
            .find(|r| r.key == key)
            .map_or(key.as_str(), |r| r.label.as_str())
    }

    /// Returns every label registered for a key, in priority order.
    #[must_use]
    pub fn variants(&self, key: MetricKey) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|r| r.key == key)
            .map(|r| r.label.as_str())
            .collect()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the dictionary has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for MetricDictionary {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rules_are_valid() {
        let standard = MetricDictionary::standard();
        let rebuilt = MetricDictionary::new(standard.rules().to_vec()).unwrap();
        assert_eq!(rebuilt, standard);
        assert_eq!(standard.len(), 46);
    }

    #[test]
    fn test_every_key_has_a_rule() {
        let dictionary = MetricDictionary::standard();
        for key in MetricKey::ALL {
            assert!(!dictionary.variants(key).is_empty(), "no rule for {}", key);
        }
    }

    #[test]
    fn test_spelling_variants_resolve_to_same_key() {
        let dictionary = MetricDictionary::standard();
        assert_eq!(
            dictionary.resolve("درآمدهای عملیاتی"),
            Some(MetricKey::OperatingRevenue)
        );
        assert_eq!(
            dictionary.resolve("درآمدهاي عملياتي"),
            Some(MetricKey::OperatingRevenue)
        );
        assert_eq!(
            dictionary.resolve("هزينه\u{200c}هاى مالى"),
            Some(MetricKey::FinancialExpenses)
        );
        assert_eq!(
            dictionary.resolve("هزينه هاى مالى"),
            Some(MetricKey::FinancialExpenses)
        );
        assert_eq!(
            dictionary.resolve("  سود(زيان) خالص "),
            Some(MetricKey::NetProfit)
        );
    }

    #[test]
    fn test_longer_label_is_not_captured_by_shorter_rule() {
        let dictionary = MetricDictionary::standard();
        assert_eq!(
            dictionary.resolve("ساير درآمدها و هزينه هاى غيرعملياتى"),
            Some(MetricKey::NonOperatingIncome)
        );
        assert_eq!(dictionary.resolve("ساير درآمدها"), Some(MetricKey::OtherIncome));
        assert_eq!(
            dictionary.resolve("سود (زيان) خالص عمليات در حال تداوم"),
            Some(MetricKey::NetProfitContinuing)
        );
        assert_eq!(
            dictionary.resolve("سود (زيان) خالص"),
            Some(MetricKey::NetProfit)
        );
    }

    #[test]
    fn test_unmapped_label() {
        let dictionary = MetricDictionary::standard();
        assert_eq!(dictionary.resolve("جمع کل"), None);
        assert_eq!(dictionary.resolve("درآمدهای"), None);
    }

    #[test]
    fn test_conflicting_rules_rejected() {
        let result = MetricDictionary::new(vec![
            LabelRule::new("A", MetricKey::GrossProfit),
            LabelRule::new(" A ", MetricKey::NetProfit),
        ]);
        assert!(matches!(result, Err(StatementsError::Config(_))));

        let empty = MetricDictionary::new(vec![LabelRule::new("  ", MetricKey::Capital)]);
        assert!(empty.is_err());
    }

    #[test]
    fn test_duplicate_rule_is_idempotent() {
        let dictionary = MetricDictionary::new(vec![
            LabelRule::new("A", MetricKey::Capital),
            LabelRule::new("A", MetricKey::Capital),
        ])
        .unwrap();
        assert_eq!(dictionary.len(), 1);
    }

    #[test]
    fn test_keys_follow_declaration_order() {
        let dictionary = MetricDictionary::new(vec![
            LabelRule::new("Net", MetricKey::NetProfit),
            LabelRule::new("Revenue", MetricKey::OperatingRevenue),
            LabelRule::new("Net income", MetricKey::NetProfit),
        ])
        .unwrap();
        let keys = dictionary.keys();
        assert_eq!(keys.len(), MetricKey::COUNT);
        assert_eq!(keys[0], MetricKey::NetProfit);
        assert_eq!(keys[1], MetricKey::OperatingRevenue);
        assert_eq!(keys[2], MetricKey::CostOfGoodsSold);

        assert_eq!(dictionary.display_label(MetricKey::NetProfit), "Net");
        assert_eq!(dictionary.display_label(MetricKey::Capital), "capital");
        assert_eq!(
            dictionary.variants(MetricKey::NetProfit),
            vec!["Net", "Net income"]
        );
    }

    #[test]
    fn test_standard_key_order_starts_with_most_specific_rules() {
        let keys = MetricDictionary::standard().keys();
        assert_eq!(keys[0], MetricKey::InvestmentIncome);
        assert_eq!(keys[1], MetricKey::MiscellaneousIncome);
        assert_eq!(keys[2], MetricKey::NonOperatingIncome);
        assert_eq!(keys.last(), Some(&MetricKey::Capital));
    }
}
