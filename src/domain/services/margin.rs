use crate::domain::model::{GoodsLine, MonthlyMargin, YearMonth};
use std::collections::BTreeMap;

/// Gross profit margin in percent: `(sales - cost) / sales * 100`.
/// Undefined, and therefore `None`, when there were no sales.
pub fn gross_margin(sales: f64, cost: f64) -> Option<f64> {
    if sales == 0.0 {
        None
    } else {
        Some((sales - cost) / sales * 100.0)
    }
}

/// Sales, cost and margin per ship month, oldest first. Lines without a
/// ship date are left out.
pub fn monthly_margin(goods: &[GoodsLine]) -> Vec<MonthlyMargin> {
    let mut sums: BTreeMap<YearMonth, (f64, f64)> = BTreeMap::new();
    for line in goods {
        if let Some(shipped_at) = &line.shipped_at {
            let entry = sums.entry(YearMonth::of(shipped_at)).or_insert((0.0, 0.0));
            entry.0 += line.sales();
            entry.1 += line.cost();
        }
    }

    sums.into_iter()
        .map(|(period, (sales, cost))| MonthlyMargin {
            period,
            sales,
            cost,
            margin_percent: gross_margin(sales, cost),
        })
        .collect()
}
