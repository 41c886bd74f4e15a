//! Canonical metric keys and per-period metric cells.
//!
//! [`MetricKey`] is the closed set of income-statement line items tracked by the wide
//! schema. Every [`PeriodRecord`](crate::record::PeriodRecord) carries one [`MetricCell`]
//! per key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StatementsError;

/// Canonical identifier of one financial line item, independent of source spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    /// Operating revenue.
    OperatingRevenue,
    /// Cost of operating revenue.
    CostOfGoodsSold,
    /// Gross profit (loss).
    GrossProfit,
    /// Selling, general and administrative expenses.
    SellingAdminExpenses,
    /// Impairment of receivables (exceptional expense).
    ImpairmentExpense,
    /// Other operating income.
    OtherIncome,
    /// Other operating expenses.
    OtherExpenses,
    /// Operating profit (loss).
    OperatingProfit,
    /// Finance costs.
    FinancialExpenses,
    /// Other non-operating income and expenses.
    NonOperatingIncome,
    /// Non-operating income from investments.
    InvestmentIncome,
    /// Non-operating miscellaneous items.
    MiscellaneousIncome,
    /// Profit (loss) from continuing operations before tax.
    ProfitBeforeTax,
    /// Income tax for the current year.
    CurrentYearTax,
    /// Income tax relating to prior years.
    PriorYearsTax,
    /// Net profit (loss) from continuing operations.
    NetProfitContinuing,
    /// Net profit (loss) from discontinued operations.
    NetProfitDiscontinued,
    /// Net profit (loss).
    NetProfit,
    /// Operating earnings per share.
    OperationalEps,
    /// Non-operating earnings per share.
    NonOperationalEps,
    /// Earnings per share from continuing operations.
    EpsContinuing,
    /// Earnings per share from discontinued operations.
    EpsDiscontinued,
    /// Basic earnings per share.
    BasicEps,
    /// Net (diluted) earnings per share.
    DilutedEps,
    /// Share capital.
    Capital,
}

impl MetricKey {
    /// Number of canonical keys.
    pub const COUNT: usize = 25;

    /// Every key, in column order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::OperatingRevenue,
        Self::CostOfGoodsSold,
        Self::GrossProfit,
        Self::SellingAdminExpenses,
        Self::ImpairmentExpense,
        Self::OtherIncome,
        Self::OtherExpenses,
        Self::OperatingProfit,
        Self::FinancialExpenses,
        Self::NonOperatingIncome,
        Self::InvestmentIncome,
        Self::MiscellaneousIncome,
        Self::ProfitBeforeTax,
        Self::CurrentYearTax,
        Self::PriorYearsTax,
        Self::NetProfitContinuing,
        Self::NetProfitDiscontinued,
        Self::NetProfit,
        Self::OperationalEps,
        Self::NonOperationalEps,
        Self::EpsContinuing,
        Self::EpsDiscontinued,
        Self::BasicEps,
        Self::DilutedEps,
        Self::Capital,
    ];

    /// Position of this key in [`MetricKey::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the snake_case column name of this key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperatingRevenue => "operating_revenue",
            Self::CostOfGoodsSold => "cost_of_goods_sold",
            Self::GrossProfit => "gross_profit",
            Self::SellingAdminExpenses => "selling_admin_expenses",
            Self::ImpairmentExpense => "impairment_expense",
            Self::OtherIncome => "other_income",
            Self::OtherExpenses => "other_expenses",
            Self::OperatingProfit => "operating_profit",
            Self::FinancialExpenses => "financial_expenses",
            Self::NonOperatingIncome => "non_operating_income",
            Self::InvestmentIncome => "investment_income",
            Self::MiscellaneousIncome => "miscellaneous_income",
            Self::ProfitBeforeTax => "profit_before_tax",
            Self::CurrentYearTax => "current_year_tax",
            Self::PriorYearsTax => "prior_years_tax",
            Self::NetProfitContinuing => "net_profit_continuing",
            Self::NetProfitDiscontinued => "net_profit_discontinued",
            Self::NetProfit => "net_profit",
            Self::OperationalEps => "operational_eps",
            Self::NonOperationalEps => "non_operational_eps",
            Self::EpsContinuing => "eps_continuing",
            Self::EpsDiscontinued => "eps_discontinued",
            Self::BasicEps => "basic_eps",
            Self::DilutedEps => "diluted_eps",
            Self::Capital => "capital",
        }
    }

    /// Returns true if this key is a subtotal or total line of the statement.
    #[must_use]
    pub const fn is_total_line(self) -> bool {
        matches!(
            self,
            Self::GrossProfit
                | Self::OperatingProfit
                | Self::ProfitBeforeTax
                | Self::NetProfitContinuing
                | Self::NetProfit
                | Self::EpsContinuing
                | Self::BasicEps
                | Self::DilutedEps
        )
    }

    /// Returns true for per-share figures.
    #[must_use]
    pub const fn is_per_share(self) -> bool {
        matches!(
            self,
            Self::OperationalEps
                | Self::NonOperationalEps
                | Self::EpsContinuing
                | Self::EpsDiscontinued
                | Self::BasicEps
                | Self::DilutedEps
        )
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKey {
    type Err = StatementsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| StatementsError::UnknownMetric(s.to_string()))
    }
}

/// One metric value for one period: the parsed amount and its display text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricCell {
    /// Numeric amount, `None` when the source had no value.
    pub amount: Option<f64>,
    /// Display text as extracted, or the zero glyph when absent.
    pub formatted: String,
}

impl MetricCell {
    /// Creates a cell with an amount and its display text.
    #[must_use]
    pub fn new(amount: Option<f64>, formatted: impl Into<String>) -> Self {
        Self {
            amount,
            formatted: formatted.into(),
        }
    }

    /// Creates an absent cell rendered with the given zero glyph.
    #[must_use]
    pub fn absent(zero_glyph: &str) -> Self {
        Self {
            amount: None,
            formatted: zero_glyph.to_string(),
        }
    }

    /// Returns true if the cell holds a numeric amount.
    #[must_use]
    pub const fn has_amount(&self) -> bool {
        self.amount.is_some()
    }
}
