//! Chart series and tabular encodings of the analysis results.

use crate::domain::model::{
    AnalysisReport, ChartPoint, CustomerAggregate, Forecast, InactiveCustomer, MonthlyAggregate,
    MonthlyMargin,
};
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDateTime;

/// Actual vs. forecast points for a line chart.
///
/// Historical months carry the actual value. Forecast months carry the
/// projection. The last actual month also carries its own value as a
/// forecast so the two lines join.
pub fn chart_series(actual: &[MonthlyAggregate], forecast: Option<&Forecast>) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = actual
        .iter()
        .map(|m| ChartPoint {
            period: m.period,
            actual: Some(m.amount),
            forecast: None,
        })
        .collect();

    let Some(forecast) = forecast.filter(|f| !f.points.is_empty()) else {
        return points;
    };

    if let Some(last) = points.last_mut() {
        last.forecast = last.actual;
    }
    points.extend(forecast.points.iter().map(|p| ChartPoint {
        period: p.period,
        actual: None,
        forecast: Some(p.value),
    }));
    points
}

/// CSV tables written by the load phase, keyed by file name.
pub fn csv_tables(report: &AnalysisReport) -> Result<Vec<(String, Vec<u8>)>> {
    let mut tables = vec![
        ("monthly_sales.csv".to_string(), monthly_sales_csv(&report.monthly_sales)?),
        ("monthly_margin.csv".to_string(), monthly_margin_csv(&report.monthly_margin)?),
        ("top_customers.csv".to_string(), top_customers_csv(&report.top_customers)?),
        (
            "inactive_customers.csv".to_string(),
            inactive_customers_csv(&report.inactive_customers)?,
        ),
        ("chart_series.csv".to_string(), chart_series_csv(&report.chart)?),
    ];
    if let Some(forecast) = &report.forecast {
        tables.push(("forecast.csv".to_string(), forecast_csv(forecast)?));
    }
    Ok(tables)
}

pub fn monthly_sales_csv(rows: &[MonthlyAggregate]) -> Result<Vec<u8>> {
    write_table(
        &["period", "amount"],
        rows.iter()
            .map(|r| vec![r.period.to_string(), money(r.amount)]),
    )
}

pub fn monthly_margin_csv(rows: &[MonthlyMargin]) -> Result<Vec<u8>> {
    write_table(
        &["period", "sales", "cost", "margin_percent"],
        rows.iter().map(|r| {
            vec![
                r.period.to_string(),
                money(r.sales),
                money(r.cost),
                optional(r.margin_percent),
            ]
        }),
    )
}

pub fn top_customers_csv(rows: &[CustomerAggregate]) -> Result<Vec<u8>> {
    write_table(
        &["rank", "customer_id", "total_amount", "order_count", "last_order_at"],
        rows.iter().map(|r| {
            vec![
                r.rank.to_string(),
                r.customer_id.clone(),
                money(r.total_amount),
                r.order_count.to_string(),
                timestamp(r.last_order_at),
            ]
        }),
    )
}

pub fn inactive_customers_csv(rows: &[InactiveCustomer]) -> Result<Vec<u8>> {
    write_table(
        &["customer_id", "total_amount", "last_order_at", "days_inactive"],
        rows.iter().map(|r| {
            vec![
                r.customer_id.clone(),
                money(r.total_amount),
                timestamp(r.last_order_at),
                r.days_inactive.map(|d| d.to_string()).unwrap_or_default(),
            ]
        }),
    )
}

pub fn forecast_csv(forecast: &Forecast) -> Result<Vec<u8>> {
    write_table(
        &["period", "forecast"],
        forecast
            .points
            .iter()
            .map(|p| vec![p.period.to_string(), money(p.value)]),
    )
}

pub fn chart_series_csv(rows: &[ChartPoint]) -> Result<Vec<u8>> {
    write_table(
        &["period", "actual", "forecast"],
        rows.iter().map(|r| {
            vec![
                r.period.to_string(),
                optional(r.actual),
                optional(r.forecast),
            ]
        }),
    )
}

fn write_table<I>(header: &[&str], rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

fn money(value: f64) -> String {
    format!("{:.2}", value)
}

fn optional(value: Option<f64>) -> String {
    value.map(money).unwrap_or_default()
}

fn timestamp(value: Option<NaiveDateTime>) -> String {
    value
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ForecastPoint, Seasonality, SmoothingParams, YearMonth};

    fn monthly(values: &[(i32, u32, f64)]) -> Vec<MonthlyAggregate> {
        values
            .iter()
            .map(|&(y, m, amount)| MonthlyAggregate {
                period: YearMonth::new(y, m).unwrap(),
                amount,
            })
            .collect()
    }

    fn forecast_of(points: &[(i32, u32, f64)]) -> Forecast {
        Forecast {
            params: SmoothingParams {
                alpha: 0.3,
                beta: 0.1,
                gamma: 0.2,
                period: 12,
                seasonality: Seasonality::Additive,
            },
            sse: 0.0,
            points: points
                .iter()
                .map(|&(y, m, value)| ForecastPoint {
                    period: YearMonth::new(y, m).unwrap(),
                    value,
                })
                .collect(),
        }
    }

    #[test]
    fn test_chart_series_joins_actual_and_forecast() {
        let actual = monthly(&[(2024, 11, 10.0), (2024, 12, 12.0)]);
        let forecast = forecast_of(&[(2025, 1, 13.0), (2025, 2, 14.0)]);
        let chart = chart_series(&actual, Some(&forecast));

        assert_eq!(chart.len(), 4);
        assert_eq!(chart[0].forecast, None);
        assert_eq!(chart[1].actual, Some(12.0));
        assert_eq!(chart[1].forecast, Some(12.0));
        assert_eq!(chart[2].actual, None);
        assert_eq!(chart[3].forecast, Some(14.0));
    }

    #[test]
    fn test_chart_series_without_forecast() {
        let actual = monthly(&[(2024, 1, 5.0)]);
        let chart = chart_series(&actual, None);
        assert_eq!(chart.len(), 1);
        assert!(chart[0].forecast.is_none());
    }

    #[test]
    fn test_chart_series_csv_leaves_missing_cells_empty() {
        let actual = monthly(&[(2024, 12, 12.0)]);
        let forecast = forecast_of(&[(2025, 1, 13.456)]);
        let csv = chart_series_csv(&chart_series(&actual, Some(&forecast))).unwrap();
        let text = String::from_utf8(csv).unwrap();

        assert_eq!(
            text,
            "period,actual,forecast\n2024-12,12.00,12.00\n2025-01,,13.46\n"
        );
    }

    #[test]
    fn test_monthly_margin_csv_blank_margin() {
        let rows = vec![MonthlyMargin {
            period: YearMonth::new(2024, 4).unwrap(),
            sales: 0.0,
            cost: 5.0,
            margin_percent: None,
        }];
        let text = String::from_utf8(monthly_margin_csv(&rows).unwrap()).unwrap();
        assert_eq!(text, "period,sales,cost,margin_percent\n2024-04,0.00,5.00,\n");
    }
}
