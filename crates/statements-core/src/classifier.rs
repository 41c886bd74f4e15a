//! Disclosure title classification.
//!
//! Period type, audit status and period date are not part of the extracted table; they
//! are read from the disclosure title. Each attribute has its own keyword classifier and
//! the first matching keyword list (or date pattern) wins.

use regex::Regex;

use crate::{
    config::{AuditKeywords, PeriodKeywords, StatementsConfig},
    error::{Result, StatementsError},
    period::{AuditStatus, PeriodDate, PeriodType, fold_digits},
};

/// Attributes read from one disclosure title.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TitleInfo {
    /// Period length.
    pub period_type: PeriodType,
    /// Assurance level.
    pub audit_status: AuditStatus,
    /// Period end date printed in the title.
    pub period_date: Option<PeriodDate>,
    /// True if the title carries the amendment marker.
    pub is_amendment: bool,
}

/// Keyword and pattern based classifier for disclosure titles.
#[derive(Clone, Debug)]
pub struct TitleClassifier {
    period_keywords: PeriodKeywords,
    audit_keywords: AuditKeywords,
    date_patterns: Vec<Regex>,
    financial_title_patterns: Vec<String>,
    amendment_marker: String,
}

impl TitleClassifier {
    /// Builds a classifier from configuration, compiling the date patterns.
    pub fn new(config: &StatementsConfig) -> Result<Self> {
        let date_patterns = config
            .date_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| StatementsError::Config(format!("date pattern {}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            period_keywords: config.period_keywords.clone(),
            audit_keywords: config.audit_keywords.clone(),
            date_patterns,
            financial_title_patterns: config.financial_title_patterns.clone(),
            amendment_marker: config.amendment_marker.clone(),
        })
    }

    /// Classifies every attribute of a title at once.
    #[must_use]
    pub fn classify(&self, title: &str) -> TitleInfo {
        TitleInfo {
            period_type: self.period_type(title),
            audit_status: self.audit_status(title),
            period_date: self.period_date(title),
            is_amendment: self.is_amendment(title),
        }
    }

    /// Returns the period length named in the title.
    #[must_use]
    pub fn period_type(&self, title: &str) -> PeriodType {
        let haystack = normalize(title);
        let kw = &self.period_keywords;
        [
            (PeriodType::FullYear, &kw.full_year),
            (PeriodType::NineMonth, &kw.nine_month),
            (PeriodType::HalfYear, &kw.half_year),
            (PeriodType::Quarter, &kw.quarter),
        ]
        .into_iter()
        .find(|(_, keywords)| contains_any(&haystack, keywords))
        .map_or(PeriodType::Unknown, |(pt, _)| pt)
    }

    /// Returns the audit status named in the title.
    #[must_use]
    pub fn audit_status(&self, title: &str) -> AuditStatus {
        let haystack = normalize(title);
        let kw = &self.audit_keywords;
        [
            (AuditStatus::Restated, &kw.restated),
            (AuditStatus::Unaudited, &kw.unaudited),
            (AuditStatus::Audited, &kw.audited),
        ]
        .into_iter()
        .find(|(_, keywords)| contains_any(&haystack, keywords))
        .map_or(AuditStatus::Unknown, |(status, _)| status)
    }

    /// Returns the first date in the title matched by the configured patterns.
    #[must_use]
    pub fn period_date(&self, title: &str) -> Option<PeriodDate> {
        let folded = fold_digits(title);
        self.date_patterns.iter().find_map(|re| {
            re.captures(&folded)
                .and_then(|caps| caps.get(1))
                .and_then(|m| PeriodDate::parse(m.as_str()))
        })
    }

    /// Returns true if the title carries the amendment marker.
    #[must_use]
    pub fn is_amendment(&self, title: &str) -> bool {
        title.contains(&self.amendment_marker)
    }

    /// Returns true if the title announces a financial statement disclosure.
    #[must_use]
    pub fn is_financial_statement(&self, title: &str) -> bool {
        let haystack = normalize(title);
        contains_any(&haystack, &self.financial_title_patterns)
    }
}

fn normalize(text: &str) -> String {
    fold_digits(&text.to_lowercase())
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| !k.is_empty() && haystack.contains(normalize(k).as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> TitleClassifier {
        TitleClassifier::new(&StatementsConfig::default()).unwrap()
    }

    #[test]
    fn test_period_type_keywords() {
        let c = classifier();
        assert_eq!(
            c.period_type("اطلاعات و صورت\u{200c}های مالی 3 ماهه منتهی به 1403/03/31 (حسابرسی نشده)"),
            PeriodType::Quarter
        );
        assert_eq!(c.period_type("میاندوره\u{200c}ای ۶ ماهه"), PeriodType::HalfYear);
        assert_eq!(c.period_type("نه ماهه منتهی به"), PeriodType::NineMonth);
        assert_eq!(c.period_type("صورت\u{200c}های مالی سال مالی منتهی به"), PeriodType::FullYear);
        assert_eq!(c.period_type("گزارش فعالیت ماهانه"), PeriodType::Unknown);
    }

    #[test]
    fn test_full_year_checked_before_shorter_periods() {
        let c = classifier();
        assert_eq!(c.period_type("سال مالی شامل 3 ماهه چهارم"), PeriodType::FullYear);
    }

    #[test]
    fn test_audit_status_keywords() {
        let c = classifier();
        assert_eq!(c.audit_status("(حسابرسی شده)"), AuditStatus::Audited);
        assert_eq!(c.audit_status("(حسابرسی نشده)"), AuditStatus::Unaudited);
        assert_eq!(c.audit_status("تجدید ارائه شده (حسابرسی شده)"), AuditStatus::Restated);
        assert_eq!(c.audit_status("Restated figures"), AuditStatus::Restated);
        assert_eq!(c.audit_status("بدون وضعیت"), AuditStatus::Unknown);
    }

    #[test]
    fn test_period_date_patterns() {
        let c = classifier();
        assert_eq!(
            c.period_date("منتهی به 1403/12/29"),
            PeriodDate::new(1403, 12, 29)
        );
        assert_eq!(
            c.period_date("منتهی به ۱۴۰۳/۰۶/۳۱ (حسابرسی شده)"),
            PeriodDate::new(1403, 6, 31)
        );
        assert_eq!(c.period_date("منتهی به 1402-9-30"), PeriodDate::new(1402, 9, 30));
        assert_eq!(c.period_date("منتهی به 1402.9.30"), PeriodDate::new(1402, 9, 30));
        assert_eq!(c.period_date("بدون تاریخ"), None);
    }

    #[test]
    fn test_financial_statement_titles() {
        let c = classifier();
        assert!(c.is_financial_statement(
            "اطلاعات و صورت\u{200c}های مالی میاندوره\u{200c}ای 6 ماهه منتهی به 1403/06/31"
        ));
        assert!(c.is_financial_statement("صورتهای سال مالی منتهی به 1402/12/29"));
        assert!(!c.is_financial_statement("گزارش فعالیت ماهانه دوره 1 ماهه"));
    }

    #[test]
    fn test_classify_amendment() {
        let info = classifier().classify("اصلاحیه اطلاعات و صورتهای مالی 9 ماهه منتهی به 1403/09/30 (حسابرسی نشده)");
        assert!(info.is_amendment);
        assert_eq!(info.period_type, PeriodType::NineMonth);
        assert_eq!(info.audit_status, AuditStatus::Unaudited);
        assert_eq!(info.period_date, PeriodDate::new(1403, 9, 30));
    }
}
