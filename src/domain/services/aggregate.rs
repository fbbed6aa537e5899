use crate::domain::model::{CustomerAggregate, MonthlyAggregate, OrderRecord, YearMonth};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};

/// Sums order amounts per calendar month.
///
/// Orders without a valid date are skipped. The result runs from the first
/// to the last month seen, with empty months reported as zero, so it can be
/// fed straight into the forecaster.
pub fn monthly_sales(orders: &[OrderRecord]) -> Vec<MonthlyAggregate> {
    let mut sums: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for order in orders {
        if let Some(ordered_at) = &order.ordered_at {
            *sums.entry(YearMonth::of(ordered_at)).or_insert(0.0) += order.amount;
        }
    }

    fill_months(&sums)
        .into_iter()
        .map(|(period, amount)| MonthlyAggregate { period, amount })
        .collect()
}

/// Total of all dated orders; equals the sum of [`monthly_sales`].
pub fn total_sales(orders: &[OrderRecord]) -> f64 {
    orders
        .iter()
        .filter(|o| o.ordered_at.is_some())
        .map(|o| o.amount)
        .sum()
}

pub fn latest_order_at(orders: &[OrderRecord]) -> Option<NaiveDateTime> {
    orders.iter().filter_map(|o| o.ordered_at).max()
}

/// Per-customer spend, order count and most recent order.
///
/// Orders with an empty customer id are ignored. Undated orders still count
/// toward spend. Output is sorted by customer id and left unranked.
pub fn customer_totals(orders: &[OrderRecord]) -> Vec<CustomerAggregate> {
    let mut by_customer: HashMap<&str, CustomerAggregate> = HashMap::new();

    for order in orders.iter().filter(|o| !o.customer_id.is_empty()) {
        let entry = by_customer
            .entry(order.customer_id.as_str())
            .or_insert_with(|| CustomerAggregate {
                customer_id: order.customer_id.clone(),
                total_amount: 0.0,
                order_count: 0,
                last_order_at: None,
                rank: 0,
            });

        entry.total_amount += order.amount;
        entry.order_count += 1;
        entry.last_order_at = entry.last_order_at.max(order.ordered_at);
    }

    let mut totals: Vec<CustomerAggregate> = by_customer.into_values().collect();
    totals.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
    totals
}

fn fill_months(sums: &BTreeMap<YearMonth, f64>) -> Vec<(YearMonth, f64)> {
    let (Some(first), Some(last)) = (sums.keys().next(), sums.keys().next_back()) else {
        return Vec::new();
    };

    let mut filled = Vec::new();
    let mut current = *first;
    while current <= *last {
        filled.push((current, sums.get(&current).copied().unwrap_or(0.0)));
        current = current.succ();
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn order(date: Option<(i32, u32, u32)>, customer: &str, amount: f64) -> OrderRecord {
        OrderRecord {
            ordered_at: date.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap()
            }),
            customer_id: customer.to_string(),
            amount,
        }
    }

    fn sample_orders() -> Vec<OrderRecord> {
        vec![
            order(Some((2023, 11, 3)), "A", 100.0),
            order(Some((2023, 11, 28)), "B", 50.0),
            order(Some((2024, 2, 1)), "A", 25.5),
            order(None, "C", 999.0),
            order(Some((2024, 1, 15)), "", 10.0),
        ]
    }

    #[test]
    fn test_monthly_sales_fills_gaps_and_skips_undated() {
        let monthly = monthly_sales(&sample_orders());
        let periods: Vec<String> = monthly.iter().map(|m| m.period.to_string()).collect();
        assert_eq!(periods, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(monthly[0].amount, 150.0);
        assert_eq!(monthly[1].amount, 0.0);
        assert_eq!(monthly[2].amount, 10.0);
        assert_eq!(monthly[3].amount, 25.5);
    }

    #[test]
    fn test_monthly_sum_equals_total_sales() {
        let orders = sample_orders();
        let monthly_sum: f64 = monthly_sales(&orders).iter().map(|m| m.amount).sum();
        assert!((monthly_sum - total_sales(&orders)).abs() < 1e-9);
        assert!((total_sales(&orders) - 185.5).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_sales_empty() {
        assert!(monthly_sales(&[]).is_empty());
        assert!(monthly_sales(&[order(None, "A", 1.0)]).is_empty());
    }

    #[test]
    fn test_customer_totals() {
        let totals = customer_totals(&sample_orders());
        assert_eq!(totals.len(), 3);

        let a = &totals[0];
        assert_eq!(a.customer_id, "A");
        assert_eq!(a.total_amount, 125.5);
        assert_eq!(a.order_count, 2);
        assert_eq!(
            a.last_order_at.unwrap().date(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );

        let c = &totals[2];
        assert_eq!(c.customer_id, "C");
        assert_eq!(c.total_amount, 999.0);
        assert!(c.last_order_at.is_none());
    }

    #[test]
    fn test_latest_order_at() {
        let latest = latest_order_at(&sample_orders()).unwrap();
        assert_eq!(latest.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert!(latest_order_at(&[]).is_none());
    }
}
