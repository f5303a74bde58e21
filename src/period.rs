//! Calendar periods (a month or a week) and the previous/next navigation between them.

use std::ops::RangeInclusive;

use maud::{Markup, html};
use serde::{Deserialize, Deserializer, de};
use time::{
    Date, Duration, Month,
    macros::{date, format_description},
};

/// Purchases cannot be viewed before this date.
pub const EARLIEST_DATE: Date = date!(2022 - 01 - 01);

/// The message shown when the previous period is out of range.
pub const PREVIOUS_DISABLED_REASON: &str = "Minimum date must be in the year 2022";

/// The message shown when the next period is in the future.
pub const NEXT_DISABLED_REASON: &str = "Cannot view dates in the future";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodKind {
    #[default]
    Month,
    Week,
}

impl PeriodKind {
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Week => "week",
        }
    }
}

/// The query string accepted by pages that show a period.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// Any date inside the period to display. Defaults to today.
    #[serde(default, deserialize_with = "deserialize_anchor")]
    pub anchor: Option<Date>,
}

/// Parse an anchor given as a date ("2024-03-17") or as a month ("2024-03"),
/// which is what a month input submits. A month means its first day and an
/// empty value means no anchor.
pub fn deserialize_anchor<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();

    if raw.is_empty() {
        return Ok(None);
    }

    let parsed = if raw.len() == "YYYY-MM".len() {
        Date::parse(&format!("{raw}-01"), format_description!("[year]-[month]-[day]"))
    } else {
        Date::parse(raw, format_description!("[year]-[month]-[day]"))
    };

    parsed
        .map(Some)
        .map_err(|error| de::Error::custom(format!("invalid anchor \"{raw}\": {error}")))
}

/// A run of consecutive days starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub kind: PeriodKind,
    pub start: Date,
    pub length_in_days: u32,
}

impl Period {
    /// The month or week (Sunday to Saturday) that contains `anchor`.
    pub fn containing(kind: PeriodKind, anchor: Date) -> Self {
        match kind {
            PeriodKind::Month => Self {
                kind,
                start: anchor.saturating_sub(Duration::days(i64::from(anchor.day()) - 1)),
                length_in_days: u32::from(last_day_of_month(anchor.year(), anchor.month())),
            },
            PeriodKind::Week => Self {
                kind,
                start: anchor.saturating_sub(Duration::days(i64::from(
                    anchor.weekday().number_days_from_sunday(),
                ))),
                length_in_days: 7,
            },
        }
    }

    /// The last day of the period.
    pub fn end(&self) -> Date {
        self.start
            .saturating_add(Duration::days(i64::from(self.length_in_days) - 1))
    }

    /// All the days of the period, for use in date range queries.
    pub fn range(&self) -> RangeInclusive<Date> {
        self.start..=self.end()
    }

    pub fn previous(&self) -> Self {
        Self::containing(self.kind, self.start.saturating_sub(Duration::days(1)))
    }

    pub fn next(&self) -> Self {
        Self::containing(self.kind, self.end().saturating_add(Duration::days(1)))
    }

    /// A human readable label, e.g. "March 2024" or "03 Mar 2024 - 09 Mar 2024".
    pub fn label(&self) -> String {
        match self.kind {
            PeriodKind::Month => format!("{} {}", self.start.month(), self.start.year()),
            PeriodKind::Week => format!(
                "{} - {}",
                format_date_label(self.start),
                format_date_label(self.end())
            ),
        }
    }
}

/// Resolve the requested anchor to a date that can be viewed.
///
/// A missing anchor means today, anchors in the future are moved back to
/// today and anchors before [EARLIEST_DATE] are moved forward to it.
pub fn clamp_anchor(anchor: Option<Date>, today: Date) -> Date {
    anchor.unwrap_or(today).min(today).max(EARLIEST_DATE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavLink {
    Enabled { href: String },
    Disabled { reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodNavigation {
    pub period: Period,
    pub prev: NavLink,
    pub next: NavLink,
}

impl PeriodNavigation {
    /// Links to the periods either side of `period` on the page at `path`.
    pub fn new(period: Period, today: Date, path: &str) -> Self {
        let prev_period = period.previous();
        let next_period = period.next();

        let prev = if prev_period.end() < EARLIEST_DATE {
            NavLink::Disabled {
                reason: PREVIOUS_DISABLED_REASON,
            }
        } else {
            NavLink::Enabled {
                href: anchor_href(path, prev_period.start),
            }
        };

        let next = if next_period.start > today {
            NavLink::Disabled {
                reason: NEXT_DISABLED_REASON,
            }
        } else {
            NavLink::Enabled {
                href: anchor_href(path, next_period.start),
            }
        };

        Self { period, prev, next }
    }
}

pub fn anchor_href(path: &str, anchor: Date) -> String {
    format!("{path}?anchor={anchor}")
}

fn nav_link_view(link: &NavLink, label: &str) -> Markup {
    html! {
        @match link {
            NavLink::Enabled { href } => {
                a
                    class="inline-flex min-w-[5rem] items-center justify-center px-2 py-1 rounded text-blue-600 hover:underline"
                    href=(href)
                { (label) }
            }
            NavLink::Disabled { reason } => {
                span
                    class="inline-flex min-w-[5rem] items-center justify-center px-2 py-1 rounded text-gray-400 dark:text-gray-500 cursor-not-allowed"
                    aria-disabled="true"
                    title=(reason)
                { (label) }
            }
        }
    }
}

/// The period label flanked by previous and next links.
pub fn period_navigation_view(navigation: &PeriodNavigation) -> Markup {
    html! {
        div class="flex items-center justify-between gap-2 text-sm text-gray-600 dark:text-gray-300"
        {
            (nav_link_view(&navigation.prev, "Previous"))

            span class="font-semibold text-gray-900 dark:text-white" data-period-label
            {
                (navigation.period.label())
            }

            (nav_link_view(&navigation.next, "Next"))
        }
    }
}

fn month_input_value(date: Date) -> String {
    format!("{:04}-{:02}", date.year(), u8::from(date.month()))
}

/// A form for jumping straight to any viewable month on the page at `path`.
pub fn month_picker_view(path: &str, period: &Period, today: Date) -> Markup {
    html! {
        form method="get" action=(path) class="flex items-center justify-end gap-2 text-sm"
        {
            label for="month-picker" class="text-gray-600 dark:text-gray-300" { "Go to month" }

            input
                type="month"
                id="month-picker"
                name="anchor"
                value=(month_input_value(period.start))
                min=(month_input_value(EARLIEST_DATE))
                max=(month_input_value(today))
                required
                class="rounded border border-gray-300 px-2 py-1 dark:bg-gray-700 dark:border-gray-600 dark:text-white";

            button type="submit" class="px-2 py-1 rounded text-blue-600 hover:underline" { "Go" }
        }
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn format_date_label(date: Date) -> String {
    format!(
        "{:02} {} {}",
        date.day(),
        month_abbrev(date.month()),
        date.year()
    )
}

/// Short month names, e.g. "Mar".
pub fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

#[cfg(test)]
mod period_tests {
    use time::macros::date;

    use super::{EARLIEST_DATE, Period, PeriodKind, clamp_anchor};

    #[test]
    fn month_starts_on_first_and_spans_month() {
        let period = Period::containing(PeriodKind::Month, date!(2024 - 03 - 17));

        assert_eq!(period.start, date!(2024 - 03 - 01));
        assert_eq!(period.length_in_days, 31);
        assert_eq!(period.end(), date!(2024 - 03 - 31));
    }

    #[test]
    fn february_length_accounts_for_leap_years() {
        let leap = Period::containing(PeriodKind::Month, date!(2024 - 02 - 10));
        let common = Period::containing(PeriodKind::Month, date!(2023 - 02 - 10));

        assert_eq!(leap.length_in_days, 29);
        assert_eq!(common.length_in_days, 28);
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2024-03-06 is a Wednesday.
        let period = Period::containing(PeriodKind::Week, date!(2024 - 03 - 06));

        assert_eq!(period.start, date!(2024 - 03 - 03));
        assert_eq!(period.end(), date!(2024 - 03 - 09));
    }

    #[test]
    fn week_containing_sunday_starts_that_day() {
        let period = Period::containing(PeriodKind::Week, date!(2024 - 03 - 03));

        assert_eq!(period.start, date!(2024 - 03 - 03));
    }

    #[test]
    fn previous_and_next_months_cross_year_boundaries() {
        let january = Period::containing(PeriodKind::Month, date!(2024 - 01 - 15));

        assert_eq!(january.previous().start, date!(2023 - 12 - 01));
        assert_eq!(january.previous().next(), january);
    }

    #[test]
    fn labels() {
        let month = Period::containing(PeriodKind::Month, date!(2024 - 03 - 17));
        let week = Period::containing(PeriodKind::Week, date!(2024 - 03 - 06));

        assert_eq!(month.label(), "March 2024");
        assert_eq!(week.label(), "03 Mar 2024 - 09 Mar 2024");
    }

    #[test]
    fn clamp_anchor_defaults_to_today() {
        let today = date!(2024 - 03 - 17);

        assert_eq!(clamp_anchor(None, today), today);
    }

    #[test]
    fn clamp_anchor_moves_future_dates_to_today() {
        let today = date!(2024 - 03 - 17);

        assert_eq!(clamp_anchor(Some(date!(2030 - 01 - 01)), today), today);
    }

    #[test]
    fn clamp_anchor_moves_early_dates_to_earliest() {
        let today = date!(2024 - 03 - 17);

        assert_eq!(clamp_anchor(Some(date!(2019 - 05 - 01)), today), EARLIEST_DATE);
    }
}


#[cfg(test)]
mod anchor_query_tests {
    use scraper::{Html, Selector};
    use time::macros::date;

    use super::{Period, PeriodKind, PeriodQuery, month_picker_view};

    fn parse(query: &str) -> Result<PeriodQuery, serde_urlencoded::de::Error> {
        serde_urlencoded::from_str(query)
    }

    #[test]
    fn accepts_full_dates() {
        assert_eq!(parse("anchor=2024-03-17").unwrap().anchor, Some(date!(2024 - 03 - 17)));
    }

    #[test]
    fn month_means_its_first_day() {
        assert_eq!(parse("anchor=2024-03").unwrap().anchor, Some(date!(2024 - 03 - 01)));
    }

    #[test]
    fn missing_or_empty_anchor_is_none() {
        assert_eq!(parse("").unwrap().anchor, None);
        assert_eq!(parse("anchor=").unwrap().anchor, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("anchor=March").is_err());
        assert!(parse("anchor=2024-13").is_err());
    }

    #[test]
    fn month_picker_submits_anchor_to_page() {
        let period = Period::containing(PeriodKind::Month, date!(2024 - 03 - 17));

        let html = Html::parse_fragment(
            &month_picker_view("/purchases", &period, date!(2024 - 05 - 02)).into_string(),
        );

        let form = html
            .select(&Selector::parse("form").unwrap())
            .next()
            .expect("No form found");
        assert_eq!(form.value().attr("method"), Some("get"));
        assert_eq!(form.value().attr("action"), Some("/purchases"));

        let input = form
            .select(&Selector::parse("input[type=month]").unwrap())
            .next()
            .expect("No month input found");
        assert_eq!(input.value().attr("name"), Some("anchor"));
        assert_eq!(input.value().attr("value"), Some("2024-03"));
        assert_eq!(input.value().attr("min"), Some("2022-01"));
        assert_eq!(input.value().attr("max"), Some("2024-05"));
    }
}
