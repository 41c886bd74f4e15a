//! Engine configuration.
//!
//! [`StatementsConfig`] gathers every tunable of the engine: display glyphs, the non-data
//! marker periods, title keyword lists, date patterns and batch concurrency. It is loaded
//! once, validated, and shared read-only between components.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    dictionary::{LabelRule, MetricDictionary},
    error::{Result, StatementsError},
};

/// Keywords that identify the period length in a disclosure title.
///
/// Lists are checked from the longest period to the shortest, so a title naming both
/// a fiscal year and a quarter classifies as a fiscal year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodKeywords {
    /// Full fiscal year keywords.
    pub full_year: Vec<String>,
    /// Nine-month keywords.
    pub nine_month: Vec<String>,
    /// Six-month keywords.
    pub half_year: Vec<String>,
    /// Three-month keywords.
    pub quarter: Vec<String>,
}

impl Default for PeriodKeywords {
    fn default() -> Self {
        Self {
            full_year: strings(&["سال مالی", "سالیانه", "سالانه", "12ماهه", "12 ماهه"]),
            nine_month: strings(&["9 ماهه", "۹ ماهه", "نه ماهه", "9ماهه"]),
            half_year: strings(&["6 ماهه", "۶ ماهه", "شش ماهه", "شیش ماهه", "6ماهه"]),
            quarter: strings(&["3 ماهه", "۳ ماهه", "سه ماهه", "3ماهه"]),
        }
    }
}

/// Keywords that identify the audit status in a disclosure title.
///
/// Checked in the order restated, unaudited, audited.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditKeywords {
    /// Restated statement keywords.
    pub restated: Vec<String>,
    /// Unaudited statement keywords.
    pub unaudited: Vec<String>,
    /// Audited statement keywords.
    pub audited: Vec<String>,
}

impl Default for AuditKeywords {
    fn default() -> Self {
        Self {
            restated: strings(&["تجدید ارائه", "restated", "revised"]),
            unaudited: strings(&["حسابرسی نشده", "unaudited"]),
            audited: strings(&["حسابرسی شده", "audited"]),
        }
    }
}

/// Configuration for the statement engine.
///
/// Every field has a default, so a JSON document only needs the keys it overrides.
///
/// # Example
///
/// ```
/// use statements_core::StatementsConfig;
///
/// let config = StatementsConfig::from_json_str(r#"{"max_concurrent_extractions": 4}"#).unwrap();
/// assert_eq!(config.max_concurrent_extractions, 4);
/// assert_eq!(config.zero_glyph, "۰");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementsConfig {
    /// Display text stored for a metric with no source value.
    pub zero_glyph: String,
    /// Display text for a metric that cannot be evaluated.
    pub unavailable_glyph: String,
    /// Period labels that are table annotations rather than data periods.
    pub non_data_periods: Vec<String>,
    /// Title substring that marks an amendment disclosure.
    pub amendment_marker: String,
    /// Period length keywords.
    pub period_keywords: PeriodKeywords,
    /// Audit status keywords.
    pub audit_keywords: AuditKeywords,
    /// Date regexes with one capture group each, tried in order against the digit-folded title.
    pub date_patterns: Vec<String>,
    /// Title substrings that identify a financial statement disclosure.
    pub financial_title_patterns: Vec<String>,
    /// Maximum number of documents extracted at once in a batch.
    pub max_concurrent_extractions: usize,
    /// Replacement label rules; the built-in dictionary is used when absent.
    pub dictionary: Option<Vec<LabelRule>>,
}

impl Default for StatementsConfig {
    fn default() -> Self {
        Self {
            zero_glyph: "۰".to_string(),
            unavailable_glyph: "N/A".to_string(),
            non_data_periods: strings(&["حسابرسی شده", "حسابرسی نشده"]),
            amendment_marker: "اصلاحیه".to_string(),
            period_keywords: PeriodKeywords::default(),
            audit_keywords: AuditKeywords::default(),
            date_patterns: strings(&[
                r"([0-9]{4}/[0-9]{1,2}/[0-9]{1,2})",
                r"([0-9]{4}-[0-9]{1,2}-[0-9]{1,2})",
                r"([0-9]{2}/[0-9]{1,2}/[0-9]{4})",
                r"([0-9]{4}\.[0-9]{1,2}\.[0-9]{1,2})",
            ]),
            financial_title_patterns: strings(&[
                "اطلاعات و صورت\u{200c}های مالی",
                "اطلاعات و صورتهای مالی",
                "صورت های سال مالی",
                "صورتهای سال مالی",
                "اطلاعات مالی",
                "گزارش مالی",
                "صورت\u{200c}های مالی سال مالی",
                "صورت\u{200c}های مالی تلفیقی سال مالی",
            ]),
            max_concurrent_extractions: 2,
            dictionary: None,
        }
    }
}

impl StatementsConfig {
    /// Parses and validates a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StatementsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| StatementsError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Checks limits, glyphs and patterns.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_extractions == 0 {
            return Err(StatementsError::Config(
                "max_concurrent_extractions must be at least 1".to_string(),
            ));
        }
        if self.zero_glyph.is_empty() || self.unavailable_glyph.is_empty() {
            return Err(StatementsError::Config(
                "display glyphs must not be empty".to_string(),
            ));
        }
        if self.amendment_marker.trim().is_empty() {
            return Err(StatementsError::Config(
                "amendment_marker must not be empty".to_string(),
            ));
        }
        for pattern in &self.date_patterns {
            let re = regex::Regex::new(pattern)
                .map_err(|e| StatementsError::Config(format!("date pattern {}: {}", pattern, e)))?;
            if re.captures_len() < 2 {
                return Err(StatementsError::Config(format!(
                    "date pattern {} has no capture group",
                    pattern
                )));
            }
        }
        if let Some(rules) = &self.dictionary {
            MetricDictionary::new(rules.clone())?;
        }
        Ok(())
    }

    /// Builds the label dictionary: the configured rules, or the built-in one.
    pub fn build_dictionary(&self) -> Result<MetricDictionary> {
        match &self.dictionary {
            Some(rules) => MetricDictionary::new(rules.clone()),
            None => Ok(MetricDictionary::standard()),
        }
    }

    /// Returns true if a period label is a table annotation rather than a data period.
    #[must_use]
    pub fn is_non_data_period(&self, period_name: &str) -> bool {
        let name = period_name.trim();
        self.non_data_periods.iter().any(|p| p.trim() == name)
    }

    /// Sets the zero glyph.
    #[must_use]
    pub fn with_zero_glyph(mut self, glyph: impl Into<String>) -> Self {
        self.zero_glyph = glyph.into();
        self
    }

    /// Sets the non-data marker periods.
    #[must_use]
    pub fn with_non_data_periods(mut self, periods: Vec<String>) -> Self {
        self.non_data_periods = periods;
        self
    }

    /// Sets the amendment marker.
    #[must_use]
    pub fn with_amendment_marker(mut self, marker: impl Into<String>) -> Self {
        self.amendment_marker = marker.into();
        self
    }

    /// Sets the batch concurrency limit.
    #[must_use]
    pub const fn with_max_concurrent_extractions(mut self, max: usize) -> Self {
        self.max_concurrent_extractions = max;
        self
    }

    /// Replaces the built-in label rules.
    #[must_use]
    pub fn with_dictionary(mut self, rules: Vec<LabelRule>) -> Self {
        self.dictionary = Some(rules);
        self
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKey;

    #[test]
    fn test_defaults_are_valid() {
        let config = StatementsConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_non_data_period(" حسابرسی شده "));
        assert!(!config.is_non_data_period("1403/12/29"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            StatementsConfig::from_json_str(r#"{"unavailable_glyph": "-", "non_data_periods": []}"#)
                .unwrap();
        assert_eq!(config.unavailable_glyph, "-");
        assert!(config.non_data_periods.is_empty());
        assert_eq!(config.amendment_marker, "اصلاحیه");
        assert_eq!(config.max_concurrent_extractions, 2);
    }

    #[test]
    fn test_validation_failures() {
        let zero = StatementsConfig::default().with_max_concurrent_extractions(0);
        assert!(matches!(zero.validate(), Err(StatementsError::Config(_))));

        let bad_regex = StatementsConfig {
            date_patterns: vec!["([0-9".to_string()],
            ..Default::default()
        };
        assert!(bad_regex.validate().is_err());

        let no_group = StatementsConfig {
            date_patterns: vec!["[0-9]{4}".to_string()],
            ..Default::default()
        };
        assert!(no_group.validate().is_err());

        assert!(StatementsConfig::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_custom_dictionary() {
        let config = StatementsConfig::default()
            .with_dictionary(vec![LabelRule::new("Revenue", MetricKey::OperatingRevenue)]);
        let dictionary = config.build_dictionary().unwrap();
        assert_eq!(dictionary.resolve("Revenue"), Some(MetricKey::OperatingRevenue));
        assert_eq!(dictionary.resolve("درآمدهای عملیاتی"), None);

        let conflicting = StatementsConfig::default().with_dictionary(vec![
            LabelRule::new("X", MetricKey::GrossProfit),
            LabelRule::new("X", MetricKey::NetProfit),
        ]);
        assert!(conflicting.validate().is_err());
    }
}
