//! Renders day buckets as a calendar grid.

use maud::{Markup, html};
use rust_decimal::Decimal;
use time::Weekday;

use crate::{
    aggregation::{BucketItem, DayBucket},
    endpoints,
    html::{HTMX_SSE_SCRIPT, HeadElement, format_currency},
    period::Period,
};

/// The SSE event name that carries a freshly rendered grid.
pub const CALENDAR_EVENT: &str = "calendar";

const WEEKDAY_HEADERS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

const DAY_CELL_STYLE: &str = "min-h-24 p-1 border border-gray-200 dark:border-gray-700 \
    bg-white dark:bg-gray-800 flex flex-col gap-1";

fn leading_blank_cells(first_day: Weekday) -> u8 {
    first_day.number_days_from_sunday()
}

fn item_view(item: &BucketItem) -> Markup {
    html! {
        li class="flex justify-between gap-1 text-xs" title=(item.purchase.description)
        {
            span class="truncate"
            {
                @if !item.category_icon.is_empty() {
                    (item.category_icon) " "
                }
                (item.purchase.purchase)
            }
            span class="whitespace-nowrap" { (format_currency(item.purchase.amount)) }
        }
    }
}

fn day_view(bucket: &DayBucket) -> Markup {
    html! {
        div class=(DAY_CELL_STYLE) data-date=(bucket.date)
        {
            div class="flex justify-between text-xs"
            {
                span class="font-semibold text-gray-900 dark:text-white" { (bucket.date.day()) }

                @if bucket.daily_total > Decimal::ZERO {
                    span class="text-gray-500 dark:text-gray-400" data-daily-total
                    {
                        (format_currency(bucket.daily_total))
                    }
                }
            }

            ul class="space-y-0.5 grow"
            {
                @for item in &bucket.items {
                    (item_view(item))
                }
            }

            div
                class="text-right text-xs text-gray-400 dark:text-gray-500"
                title="Running total"
                data-cumulative-total
            {
                (format_currency(bucket.cumulative_total))
            }
        }
    }
}

/// A Sunday to Saturday grid of `buckets` with the period's running total underneath.
///
/// `buckets` are expected to start on the first day of the period, so the grid
/// is padded with blank cells up to that weekday.
pub fn calendar_grid(buckets: &[DayBucket]) -> Markup {
    let blank_cells = buckets
        .first()
        .map(|bucket| leading_blank_cells(bucket.date.weekday()))
        .unwrap_or_default();
    let total = buckets
        .last()
        .map(|bucket| bucket.cumulative_total)
        .unwrap_or_default();

    html! {
        div class="space-y-2"
        {
            div class="grid grid-cols-7 text-center text-xs font-semibold uppercase text-gray-700 dark:text-gray-400"
            {
                @for header in WEEKDAY_HEADERS {
                    div class="py-1" { (header) }
                }
            }

            div class="grid grid-cols-7"
            {
                @for _ in 0..blank_cells {
                    div data-blank {}
                }

                @for bucket in buckets {
                    (day_view(bucket))
                }
            }

            div class="flex justify-end gap-2 text-sm font-semibold text-gray-900 dark:text-white"
            {
                span { "Total" }
                span id="calendar-total" { (format_currency(total)) }
            }
        }
    }
}

/// The URL of the live stream for `period`.
pub fn stream_url(period: &Period) -> String {
    format!(
        "{}?anchor={}&view={}",
        endpoints::CALENDAR_STREAM,
        period.start,
        period.kind.as_query_value()
    )
}

/// Wraps `initial_grid` in a container that swaps in every grid the stream
/// for `period` sends.
pub fn live_calendar(period: &Period, initial_grid: Markup) -> Markup {
    html! {
        div
            id="live-calendar"
            hx-ext="sse"
            sse-connect=(stream_url(period))
            sse-swap=(CALENDAR_EVENT)
        {
            (initial_grid)
        }
    }
}

/// The scripts a page with a [live_calendar] needs.
pub fn live_calendar_head_elements() -> HeadElement {
    HeadElement::ScriptLink(HTMX_SSE_SCRIPT.to_owned())
}
