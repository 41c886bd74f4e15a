//! Polars exports of records and comparisons.

use polars::prelude::*;

use crate::{
    comparison::Comparison,
    error::{Result, StatementsError},
    metric::MetricKey,
    record::PeriodRecord,
};

/// Converts period records to a wide DataFrame.
///
/// Columns: source_id, symbol, company_name, period_name, period_order, period_type,
/// audit_status, period_date, then one nullable f64 column per metric key.
pub fn records_to_frame(records: &[PeriodRecord]) -> Result<DataFrame> {
    let mut columns = vec![
        Column::new(
            "source_id".into(),
            records.iter().map(|r| r.source_id.get()).collect::<Vec<u64>>(),
        ),
        Column::new(
            "symbol".into(),
            records
                .iter()
                .map(|r| r.symbol.to_string())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "company_name".into(),
            records
                .iter()
                .map(|r| r.company_name.clone())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "period_name".into(),
            records
                .iter()
                .map(|r| r.period_name.clone())
                .collect::<Vec<String>>(),
        ),
        Column::new(
            "period_order".into(),
            records.iter().map(|r| r.period_order).collect::<Vec<u32>>(),
        ),
        Column::new(
            "period_type".into(),
            records
                .iter()
                .map(|r| r.period_type.as_str())
                .collect::<Vec<&str>>(),
        ),
        Column::new(
            "audit_status".into(),
            records
                .iter()
                .map(|r| r.audit_status.as_str())
                .collect::<Vec<&str>>(),
        ),
        Column::new(
            "period_date".into(),
            records
                .iter()
                .map(|r| r.period_date.map(|d| d.to_string()))
                .collect::<Vec<Option<String>>>(),
        ),
    ];

    for key in MetricKey::ALL {
        columns.push(Column::new(
            key.as_str().into(),
            records
                .iter()
                .map(|r| r.amount(key))
                .collect::<Vec<Option<f64>>>(),
        ));
    }

    DataFrame::new(columns).map_err(|e| StatementsError::Other(e.to_string()))
}

impl Comparison {
    /// Converts the comparison to a long DataFrame, one row per symbol, period and metric.
    ///
    /// Columns: symbol, source_id, period_name, period_date, metric, amount, formatted.
    /// Symbols without data contribute no rows.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut symbols = Vec::new();
        let mut source_ids = Vec::new();
        let mut period_names = Vec::new();
        let mut period_dates: Vec<Option<String>> = Vec::new();
        let mut metric_keys = Vec::new();
        let mut amounts: Vec<Option<f64>> = Vec::new();
        let mut formatted = Vec::new();

        for series in &self.series {
            for point in &series.points {
                for (metric, value) in self.metrics.iter().zip(&point.values) {
                    symbols.push(series.symbol.to_string());
                    source_ids.push(point.source_id.get());
                    period_names.push(point.period_name.clone());
                    period_dates.push(point.period_date.map(|d| d.to_string()));
                    metric_keys.push(metric.key.clone());
                    amounts.push(value.amount);
                    formatted.push(value.formatted.clone());
                }
            }
        }

        DataFrame::new(vec![
            Column::new("symbol".into(), symbols),
            Column::new("source_id".into(), source_ids),
            Column::new("period_name".into(), period_names),
            Column::new("period_date".into(), period_dates),
            Column::new("metric".into(), metric_keys),
            Column::new("amount".into(), amounts),
            Column::new("formatted".into(), formatted),
        ])
        .map_err(|e| StatementsError::Other(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        comparison::{ComparisonMetric, ComparisonPoint, SymbolSeries},
        metric::MetricCell,
        metrics::MetricValue,
        period::{AuditStatus, PeriodDate, PeriodType},
        types::{SourceDocument, SourceId, Symbol},
    };

    #[test]
    fn test_records_to_frame() {
        let source = SourceDocument::new(SourceId(5), "شپنا", "Pars Oil", "title");
        let records = vec![
            PeriodRecord::new(&source, "P1", 0, "۰")
                .with_metric(MetricKey::NetProfit, MetricCell::new(Some(12.5), "12.5")),
            PeriodRecord::new(&source, "P2", 1, "۰"),
        ];

        let df = records_to_frame(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 8 + MetricKey::COUNT);

        let net = df.column("net_profit").unwrap().f64().unwrap();
        assert_eq!(net.get(0), Some(12.5));
        assert_eq!(net.get(1), None);
    }

    #[test]
    fn test_comparison_to_frame() {
        let comparison = Comparison {
            period_type: PeriodType::FullYear,
            metrics: vec![
                ComparisonMetric {
                    key: "capital".to_string(),
                    name: "سرمایه".to_string(),
                    derived: false,
                },
                ComparisonMetric {
                    key: "net_profit_margin".to_string(),
                    name: "margin".to_string(),
                    derived: true,
                },
            ],
            series: vec![
                SymbolSeries {
                    symbol: Symbol::new("فولاد"),
                    company_name: Some("Steel".to_string()),
                    points: vec![ComparisonPoint {
                        source_id: SourceId(1),
                        period_name: "1402/12/29".to_string(),
                        period_date: PeriodDate::new(1402, 12, 29),
                        audit_status: AuditStatus::Audited,
                        title: "t".to_string(),
                        values: vec![
                            MetricValue {
                                amount: Some(100.0),
                                formatted: "100".to_string(),
                            },
                            MetricValue {
                                amount: None,
                                formatted: "N/A".to_string(),
                            },
                        ],
                    }],
                },
                SymbolSeries {
                    symbol: Symbol::new("شپنا"),
                    company_name: None,
                    points: vec![],
                },
            ],
        };

        let df = comparison.to_frame().unwrap();
        assert_eq!(df.height(), 2);
        let amounts = df.column("amount").unwrap().f64().unwrap();
        assert_eq!(amounts.get(0), Some(100.0));
        assert_eq!(amounts.get(1), None);
    }
}
