use crate::domain::model::{CustomerAggregate, InactiveCustomer};
use chrono::{Duration, NaiveDateTime};
use std::cmp::{Ordering, Reverse};

/// Ranks customers by total spend, highest first, and keeps at most `n`.
/// Ties are broken by customer id so the ranking is stable across runs.
pub fn top_customers(totals: &[CustomerAggregate], n: usize) -> Vec<CustomerAggregate> {
    let mut ranked = totals.to_vec();
    ranked.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    ranked.truncate(n);

    for (index, customer) in ranked.iter_mut().enumerate() {
        customer.rank = index + 1;
    }
    ranked
}

/// Customers with no order on or after `as_of - window_days`.
///
/// Customers that never placed a dated order are always inactive and are
/// listed first, followed by the longest-silent customers. A window reaching
/// past the representable calendar has no cutoff, so nobody is inactive.
pub fn inactive_customers(
    totals: &[CustomerAggregate],
    as_of: NaiveDateTime,
    window_days: i64,
) -> Vec<InactiveCustomer> {
    let Some(cutoff) =
        Duration::try_days(window_days).and_then(|window| as_of.checked_sub_signed(window))
    else {
        return Vec::new();
    };

    let mut inactive: Vec<InactiveCustomer> = totals
        .iter()
        .filter(|c| c.last_order_at.map_or(true, |last| last < cutoff))
        .map(|c| InactiveCustomer {
            customer_id: c.customer_id.clone(),
            total_amount: c.total_amount,
            last_order_at: c.last_order_at,
            days_inactive: c.last_order_at.map(|last| (as_of - last).num_days()),
        })
        .collect();

    inactive.sort_by_key(|c| {
        (
            Reverse(c.days_inactive.unwrap_or(i64::MAX)),
            c.customer_id.clone(),
        )
    });
    inactive
}
