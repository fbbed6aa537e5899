//! Reads delimited order tables into typed records.
//!
//! Dates that cannot be parsed become `None` and are counted in
//! [`LoadStats`]; numbers that cannot be parsed fail the load.

use crate::domain::model::{GoodsLine, LoadStats, OrderRecord};
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Header names of the source table, keyed by the field they feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub order_date: String,
    pub customer_id: String,
    pub amount: String,
    pub ship_date: String,
    pub unit_price: String,
    pub quantity: String,
    pub unit_cost: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            order_date: "order_date".to_string(),
            customer_id: "customer_id".to_string(),
            amount: "amount".to_string(),
            ship_date: "ship_date".to_string(),
            unit_price: "unit_price".to_string(),
            quantity: "quantity".to_string(),
            unit_cost: "unit_cost".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TableReader {
    delimiter: u8,
    extra_formats: Vec<String>,
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new(b',', Vec::new())
    }
}

impl TableReader {
    pub fn new(delimiter: u8, extra_formats: Vec<String>) -> Self {
        Self {
            delimiter,
            extra_formats,
        }
    }

    pub fn read_orders(
        &self,
        data: &[u8],
        columns: &ColumnMapping,
    ) -> Result<(Vec<OrderRecord>, LoadStats)> {
        let mut reader = self.reader(data);
        let headers = reader.headers()?.clone();
        let date_idx = column_index(&headers, "orders", &columns.order_date)?;
        let customer_idx = column_index(&headers, "orders", &columns.customer_id)?;
        let amount_idx = column_index(&headers, "orders", &columns.amount)?;

        let mut stats = LoadStats::default();
        let mut orders = Vec::new();

        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let row_number = index + 1;
            stats.rows_read += 1;

            let ordered_at = self.parse_timestamp(field(&row, date_idx));
            if ordered_at.is_none() {
                stats.missing_dates += 1;
                tracing::debug!(
                    "Row {}: unparseable {} '{}'",
                    row_number,
                    columns.order_date,
                    field(&row, date_idx)
                );
            }

            let customer_id = field(&row, customer_idx).to_string();
            if customer_id.is_empty() {
                stats.missing_customers += 1;
            }

            let amount = parse_number(field(&row, amount_idx), row_number, &columns.amount)?;

            orders.push(OrderRecord {
                ordered_at,
                customer_id,
                amount,
            });
        }

        Ok((orders, stats))
    }

    pub fn read_goods(
        &self,
        data: &[u8],
        columns: &ColumnMapping,
    ) -> Result<(Vec<GoodsLine>, LoadStats)> {
        let mut reader = self.reader(data);
        let headers = reader.headers()?.clone();
        let ship_idx = column_index(&headers, "goods", &columns.ship_date)?;
        let price_idx = column_index(&headers, "goods", &columns.unit_price)?;
        let quantity_idx = column_index(&headers, "goods", &columns.quantity)?;
        let cost_idx = column_index(&headers, "goods", &columns.unit_cost)?;

        let mut stats = LoadStats::default();
        let mut lines = Vec::new();

        for (index, row) in reader.records().enumerate() {
            let row = row?;
            let row_number = index + 1;
            stats.rows_read += 1;

            let shipped_at = self.parse_timestamp(field(&row, ship_idx));
            if shipped_at.is_none() {
                stats.missing_dates += 1;
            }

            lines.push(GoodsLine {
                shipped_at,
                unit_price: parse_number(field(&row, price_idx), row_number, &columns.unit_price)?,
                quantity: parse_number(field(&row, quantity_idx), row_number, &columns.quantity)?,
                unit_cost: parse_number(field(&row, cost_idx), row_number, &columns.unit_cost)?,
            });
        }

        Ok((lines, stats))
    }

    /// Parses the supported date and date-time layouts. Anything else,
    /// including an empty cell, yields `None`.
    pub fn parse_timestamp(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_local());
        }

        // 自訂格式優先
        self.extra_formats
            .iter()
            .find_map(|format| parse_with(text, format))
            .or_else(|| {
                DATETIME_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            })
            .or_else(|| {
                DATE_FORMATS.iter().find_map(|format| {
                    NaiveDate::parse_from_str(text, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
            })
    }

    fn reader<'a>(&self, data: &'a [u8]) -> csv::Reader<&'a [u8]> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(data)
    }
}

fn column_index(headers: &StringRecord, table: &str, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| EtlError::MissingColumnError {
            table: table.to_string(),
            column: name.to_string(),
        })
}

fn parse_with(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn field(row: &StringRecord, index: usize) -> &str {
    row.get(index).unwrap_or("").trim()
}

fn parse_number(text: &str, row: usize, column: &str) -> Result<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| EtlError::DataParseError {
            row,
            column: column.to_string(),
            value: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const ORDERS: &str = "\
order_date,customer_id,amount
2024-01-05 10:30:00,C001,120.50
2024/01/20,C002,\"1,000.00\"
not a date,C001,30
,C003,15
2024-02-01T08:00:00Z,C002,80
";

    #[test]
    fn test_read_orders_drops_bad_dates_to_none() {
        let reader = TableReader::default();
        let (orders, stats) = reader
            .read_orders(ORDERS.as_bytes(), &ColumnMapping::default())
            .unwrap();

        assert_eq!(orders.len(), 5);
        assert_eq!(stats.rows_read, 5);
        assert_eq!(stats.missing_dates, 2);
        assert_eq!(orders[1].amount, 1000.0);
        assert!(orders[2].ordered_at.is_none());
        assert!(orders[3].ordered_at.is_none());
        assert_eq!(orders[4].ordered_at.unwrap().month(), 2);
    }

    #[test]
    fn test_read_orders_with_mapped_columns() {
        let data = "OrderTime;Buyer;Total\n2023-12-31;B1;10,5\n";
        let columns = ColumnMapping {
            order_date: "OrderTime".to_string(),
            customer_id: "Buyer".to_string(),
            amount: "Total".to_string(),
            ..ColumnMapping::default()
        };
        let reader = TableReader::new(b';', Vec::new());
        let (orders, _) = reader.read_orders(data.as_bytes(), &columns).unwrap();

        assert_eq!(orders[0].customer_id, "B1");
        // 千分位逗號會被移除
        assert_eq!(orders[0].amount, 105.0);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let data = "date,customer_id,amount\n2024-01-01,C1,1\n";
        let err = TableReader::default()
            .read_orders(data.as_bytes(), &ColumnMapping::default())
            .unwrap_err();
        assert!(matches!(err, EtlError::MissingColumnError { ref column, .. } if column == "order_date"));
    }

    #[test]
    fn test_bad_number_names_row_and_column() {
        let data = "order_date,customer_id,amount\n2024-01-01,C1,1\n2024-01-02,C2,abc\n";
        let err = TableReader::default()
            .read_orders(data.as_bytes(), &ColumnMapping::default())
            .unwrap_err();
        match err {
            EtlError::DataParseError { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "amount");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_goods() {
        let data = "\
ship_date,unit_price,quantity,unit_cost
2024-03-01,10,3,6
bad,5,2,4
";
        let (lines, stats) = TableReader::default()
            .read_goods(data.as_bytes(), &ColumnMapping::default())
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(stats.missing_dates, 1);
        assert_eq!(lines[0].sales(), 30.0);
        assert_eq!(lines[0].cost(), 18.0);
    }

    #[test]
    fn test_extra_date_format() {
        let reader = TableReader::new(b',', vec!["%d.%m.%Y".to_string()]);
        let parsed = reader.parse_timestamp("17.10.2024").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 10, 17));
        assert_eq!(parsed.hour(), 0);
        assert!(TableReader::default().parse_timestamp("17.10.2024").is_none());
    }
}
