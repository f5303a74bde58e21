//! Groups purchases into one bucket per day with daily and running totals.
//!
//! The calendar, the weekly overview and the monthly page all render from the
//! buckets produced here.

use rust_decimal::Decimal;
use time::Date;

use crate::{
    category::{Category, resolve_icon},
    purchase::Purchase,
};

/// A purchase annotated with the icon of its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketItem {
    pub purchase: Purchase,
    /// Empty when the purchase refers to an unknown category.
    pub category_icon: String,
}

/// The purchases made on a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBucket {
    pub date: Date,
    /// In the order they were supplied to [aggregate].
    pub items: Vec<BucketItem>,
    pub daily_total: Decimal,
    /// The sum of daily totals from the start of the period up to and including this day.
    pub cumulative_total: Decimal,
}

/// Split `purchases` into `period_length_in_days` consecutive daily buckets
/// starting at `period_start`.
///
/// Every day gets a bucket even when nothing was bought. Purchases dated
/// outside the period are ignored, but the caller is expected to have
/// queried only the purchases in range. Amounts are summed exactly as given.
pub fn aggregate(
    period_start: Date,
    period_length_in_days: u32,
    purchases: &[Purchase],
    categories: &[Category],
) -> Vec<DayBucket> {
    let mut cumulative_total = Decimal::ZERO;

    std::iter::successors(Some(period_start), |date| date.next_day())
        .take(period_length_in_days as usize)
        .map(|date| {
            let items: Vec<BucketItem> = purchases
                .iter()
                .filter(|purchase| purchase.date == date)
                .map(|purchase| BucketItem {
                    purchase: purchase.clone(),
                    category_icon: resolve_icon(categories, &purchase.category),
                })
                .collect();

            let daily_total: Decimal = items.iter().map(|item| item.purchase.amount).sum();
            cumulative_total += daily_total;

            DayBucket {
                date,
                items,
                daily_total,
                cumulative_total,
            }
        })
        .collect()
}
