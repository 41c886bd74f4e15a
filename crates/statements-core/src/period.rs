//! Reporting period definitions.
//!
//! This module defines [`PeriodType`] for the length of a reporting interval,
//! [`AuditStatus`] for its assurance level and [`PeriodDate`] for the calendar
//! reference extracted from a disclosure title.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StatementsError;

/// Length of a reporting period, derived from the source title.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    /// Three-month interim period.
    Quarter,
    /// Six-month interim period.
    HalfYear,
    /// Nine-month interim period.
    NineMonth,
    /// Full fiscal year.
    FullYear,
    /// The title did not name a known period length.
    #[default]
    Unknown,
}

impl PeriodType {
    /// All period types.
    pub const ALL: [Self; 5] = [
        Self::Quarter,
        Self::HalfYear,
        Self::NineMonth,
        Self::FullYear,
        Self::Unknown,
    ];

    /// Returns the storage code of this period type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quarter => "quarter",
            Self::HalfYear => "half_year",
            Self::NineMonth => "nine_month",
            Self::FullYear => "full_year",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the label used in disclosure titles.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Quarter => "3 ماهه",
            Self::HalfYear => "6 ماهه",
            Self::NineMonth => "9 ماهه",
            Self::FullYear => "سال مالی",
            Self::Unknown => "نامشخص",
        }
    }

    /// Returns true for interim (shorter than a fiscal year) periods.
    #[must_use]
    pub const fn is_interim(&self) -> bool {
        matches!(self, Self::Quarter | Self::HalfYear | Self::NineMonth)
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodType {
    type Err = StatementsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|pt| pt.as_str() == s || pt.label() == s)
            .ok_or_else(|| StatementsError::Parse(format!("Invalid period type: {}", s)))
    }
}

/// Assurance level of a disclosure, derived from the source title.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Audited statements.
    Audited,
    /// Unaudited statements.
    Unaudited,
    /// Restated (re-presented) statements.
    Restated,
    /// The title did not state an audit status.
    #[default]
    Unknown,
}

impl AuditStatus {
    /// All audit statuses.
    pub const ALL: [Self; 4] = [Self::Audited, Self::Unaudited, Self::Restated, Self::Unknown];

    /// Returns the storage code of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Audited => "audited",
            Self::Unaudited => "unaudited",
            Self::Restated => "restated",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the label used in disclosure titles.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Audited => "حسابرسی شده",
            Self::Unaudited => "حسابرسی نشده",
            Self::Restated => "تجدید ارائه شده",
            Self::Unknown => "نامشخص",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = StatementsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s || status.label() == s)
            .ok_or_else(|| StatementsError::Parse(format!("Invalid audit status: {}", s)))
    }
}

/// Calendar reference of a reporting period.
///
/// Dates are kept as plain year/month/day triples because disclosures use the Solar Hijri
/// calendar, whose first six months have 31 days. Ordering is chronological.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodDate {
    /// Year.
    pub year: u16,
    /// Month (1-12).
    pub month: u8,
    /// Day (1-31).
    pub day: u8,
}

impl PeriodDate {
    /// Creates a date, returning `None` if month or day is out of range.
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        if month == 0 || month > 12 || day == 0 || day > 31 {
            return None;
        }
        Some(Self { year, month, day })
    }

    /// Parses a date written as `Y/M/D`, `Y-M-D`, `Y.M.D` or `D/M/Y`.
    ///
    /// Persian and Arabic-Indic digits are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let folded = fold_digits(s.trim());
        let parts: Vec<&str> = folded.split(['/', '-', '.']).collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        let (year, month, day) = if parts[0].len() == 4 {
            (parts[0], parts[1], parts[2])
        } else if parts[2].len() == 4 {
            (parts[2], parts[1], parts[0])
        } else {
            return None;
        };

        Self::new(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
    }
}

impl fmt::Display for PeriodDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for PeriodDate {
    type Err = StatementsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StatementsError::Parse(format!("Invalid period date: {}", s)))
    }
}

impl Serialize for PeriodDate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeriodDate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Replaces Persian and Arabic-Indic digits with their ASCII equivalents.
#[must_use]
pub fn fold_digits(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
            '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_type_codes_and_labels() {
        for pt in PeriodType::ALL {
            assert_eq!(pt.as_str().parse::<PeriodType>().unwrap(), pt);
            assert_eq!(pt.label().parse::<PeriodType>().unwrap(), pt);
        }
        assert!(PeriodType::HalfYear.is_interim());
        assert!(!PeriodType::FullYear.is_interim());
    }

    #[test]
    fn test_audit_status_codes_and_labels() {
        for status in AuditStatus::ALL {
            assert_eq!(status.as_str().parse::<AuditStatus>().unwrap(), status);
            assert_eq!(status.label().parse::<AuditStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_period_date_formats() {
        let expected = PeriodDate::new(1403, 12, 29).unwrap();
        assert_eq!(PeriodDate::parse("1403/12/29"), Some(expected));
        assert_eq!(PeriodDate::parse("1403-12-29"), Some(expected));
        assert_eq!(PeriodDate::parse("1403.12.29"), Some(expected));
        assert_eq!(PeriodDate::parse("29/12/1403"), Some(expected));
        assert_eq!(PeriodDate::parse("۱۴۰۳/۱۲/۲۹"), Some(expected));
    }

    #[test]
    fn test_period_date_allows_31_day_months() {
        assert!(PeriodDate::parse("1404/03/31").is_some());
        assert!(PeriodDate::parse("1404/13/01").is_none());
        assert!(PeriodDate::parse("1404/03").is_none());
    }

    #[test]
    fn test_period_date_ordering_and_display() {
        let a = PeriodDate::parse("1402/12/29").unwrap();
        let b = PeriodDate::parse("1403/3/31").unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "1403/03/31");

        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "\"1403/03/31\"");
        let back: PeriodDate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn test_fold_digits() {
        assert_eq!(fold_digits("۱۴۰۳"), "1403");
        assert_eq!(fold_digits("١٤٠٣"), "1403");
        assert_eq!(fold_digits("abc 12"), "abc 12");
    }
}
