use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar month used as the grouping key for every monthly table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        let (year, month) = value
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got '{}'", value))?;
        let year = year.parse::<i32>().map_err(|e| e.to_string())?;
        let month = month.parse::<u32>().map_err(|e| e.to_string())?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in '{}'", value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// `None` when the source value could not be parsed as a date.
    pub ordered_at: Option<NaiveDateTime>,
    pub customer_id: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoodsLine {
    pub shipped_at: Option<NaiveDateTime>,
    pub unit_price: f64,
    pub quantity: f64,
    pub unit_cost: f64,
}

impl GoodsLine {
    pub fn sales(&self) -> f64 {
        self.unit_price * self.quantity
    }

    pub fn cost(&self) -> f64 {
        self.unit_cost * self.quantity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub missing_dates: usize,
    pub missing_customers: usize,
}

/// Loaded input, before any aggregation.
#[derive(Debug, Clone, Default)]
pub struct SalesTable {
    pub orders: Vec<OrderRecord>,
    pub goods: Vec<GoodsLine>,
    pub order_stats: LoadStats,
    pub goods_stats: LoadStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub period: YearMonth,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMargin {
    pub period: YearMonth,
    pub sales: f64,
    pub cost: f64,
    /// Absent for months without sales.
    pub margin_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub customer_id: String,
    pub total_amount: f64,
    pub order_count: usize,
    pub last_order_at: Option<NaiveDateTime>,
    /// 1-based; 0 until the customer has been ranked.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InactiveCustomer {
    pub customer_id: String,
    pub total_amount: f64,
    pub last_order_at: Option<NaiveDateTime>,
    /// `None` when the customer has no dated order at all.
    pub days_inactive: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seasonality {
    Additive,
    Multiplicative,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
    pub period: usize,
    pub seasonality: Seasonality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: YearMonth,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub params: SmoothingParams,
    /// Sum of squared one-step-ahead errors over the fitted range.
    pub sse: f64,
    pub points: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub period: YearMonth,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}

/// Everything the transform phase produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub as_of: Option<NaiveDateTime>,
    pub order_stats: LoadStats,
    pub goods_stats: LoadStats,
    pub total_sales: f64,
    pub monthly_sales: Vec<MonthlyAggregate>,
    pub monthly_margin: Vec<MonthlyMargin>,
    pub top_customers: Vec<CustomerAggregate>,
    pub inactive_customers: Vec<InactiveCustomer>,
    pub forecast: Option<Forecast>,
    pub chart: Vec<ChartPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_succ_wraps_year() {
        let dec = YearMonth::new(2023, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::new(2024, 1).unwrap());
        assert_eq!(YearMonth::new(2024, 5).unwrap().succ().month, 6);
    }

    #[test]
    fn test_year_month_ordering_and_display() {
        let a = YearMonth::new(2023, 11).unwrap();
        let b = YearMonth::new(2024, 2).unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "2024-02");
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_year_month_serializes_as_string() {
        let ym = YearMonth::new(2024, 3).unwrap();
        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2024-03\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym);
    }

    #[test]
    fn test_goods_line_sales_and_cost() {
        let line = GoodsLine {
            shipped_at: None,
            unit_price: 12.5,
            quantity: 4.0,
            unit_cost: 7.5,
        };
        assert_eq!(line.sales(), 50.0);
        assert_eq!(line.cost(), 30.0);
    }
}
