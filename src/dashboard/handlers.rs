//! Dashboard HTTP handlers and view rendering.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
};
use futures::{Stream, StreamExt};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::Session,
    calendar::{CALENDAR_EVENT, calendar_grid, live_calendar_head_elements},
    charts::{category_charts, chart_head_element, charts_view},
    dashboard::tables::{NO_RECENT_PURCHASES_MESSAGE, recent_purchases_table},
    endpoints,
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    period::{
        Period, PeriodKind, PeriodNavigation, PeriodQuery, clamp_anchor, period_navigation_view,
    },
    purchase::Purchase,
    subscription::{
        LiveView, LiveViewState, Snapshot, SubscriptionFilter, live_events, load_snapshot,
    },
    timezone::local_today,
};

/// The SSE event name that carries the recent purchases and chart of the week.
pub const WEEK_SUMMARY_EVENT: &str = "week-summary";

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn week_period(query: &PeriodQuery, today: Date) -> Period {
    Period::containing(PeriodKind::Week, clamp_anchor(query.anchor, today))
}

fn stream_url(period: &Period) -> String {
    format!("{}?anchor={}", endpoints::DASHBOARD_STREAM, period.start)
}

/// The week's recent purchases table and category chart.
fn week_summary(period: &Period, snapshot: &Snapshot) -> Markup {
    // Snapshots are oldest first.
    let recent_purchases: Vec<Purchase> = snapshot.purchases.iter().rev().cloned().collect();
    let charts = category_charts(&period.label(), &snapshot.purchases, &snapshot.categories);

    html! {
        (recent_purchases_table(&recent_purchases, &snapshot.categories))

        (charts_view(&charts, NO_RECENT_PURCHASES_MESSAGE))
    }
}

/// Every live part of the dashboard rendered from `snapshot`.
fn live_views(period: &Period, snapshot: &Snapshot) -> Vec<LiveView> {
    vec![
        (CALENDAR_EVENT, calendar_grid(&snapshot.buckets).into_string()),
        (WEEK_SUMMARY_EVENT, week_summary(period, snapshot).into_string()),
    ]
}

fn dashboard_view(session: &Session, navigation: &PeriodNavigation, snapshot: &Snapshot) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();
    let period = &navigation.period;

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div
                id="live-dashboard"
                class="w-full max-w-5xl space-y-8"
                hx-ext="sse"
                sse-connect=(stream_url(period))
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-2xl font-bold" { "Hello, " (session.username) }

                    a href=(endpoints::NEW_PURCHASE_VIEW) class=(LINK_STYLE)
                    {
                        "Add Purchase"
                    }
                }

                section class="space-y-4"
                {
                    h2 class="text-xl font-semibold" { "Weekly Overview" }

                    (period_navigation_view(navigation))

                    div id="live-calendar" sse-swap=(CALENDAR_EVENT)
                    {
                        (calendar_grid(&snapshot.buckets))
                    }
                }

                div id="week-summary" class="space-y-8" sse-swap=(WEEK_SUMMARY_EVENT)
                {
                    (week_summary(period, snapshot))
                }
            }
        }
    };

    base(
        "Dashboard",
        &[live_calendar_head_elements(), chart_head_element()],
        &content,
    )
}

/// Display an overview of the week containing the `anchor` query date.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let filter = SubscriptionFilter {
        user_id: session.user_id,
        period: week_period(&query, today),
    };

    let snapshot = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_snapshot(&filter, &connection)?
    };

    let navigation = PeriodNavigation::new(filter.period, today, endpoints::DASHBOARD_VIEW);

    Ok(dashboard_view(&session, &navigation, &snapshot).into_response())
}

/// Streams the week grid as `calendar` events and the recent purchases with
/// the chart as `week-summary` events.
pub async fn get_dashboard_stream(
    State(state): State<LiveViewState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let today = local_today(&state.local_timezone)?;
    let period = week_period(&query, today);

    let views = state
        .snapshots(SubscriptionFilter {
            user_id: session.user_id,
            period,
        })
        .map(move |snapshot| live_views(&period, &snapshot));

    Ok(live_events(views))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
    };
    use rust_decimal_macros::dec;
    use scraper::{Html, Selector};
    use time::{OffsetDateTime, macros::date};

    use crate::{
        auth::{Session, User},
        category::create_default_categories,
        endpoints,
        period::PeriodQuery,
        purchase::{DraftPurchase, create_purchase},
        test_utils::{
            assert_status_ok, assert_valid_html, create_test_user, get_test_connection,
            parse_html_document,
        },
    };

    use super::{DashboardState, get_dashboard_page};

    fn get_state() -> (DashboardState, User) {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_default_categories(user.id, &connection).unwrap();
        let today = OffsetDateTime::now_utc().date();

        // The week of 03 Mar 2024 to 09 Mar 2024, plus one purchase the week after.
        for (name, amount, date, category) in [
            ("Muffin", dec!(4.20), date!(2024 - 03 - 04), "food"),
            ("Pharmacy", dec!(15), date!(2024 - 03 - 07), "health"),
            ("Train", dec!(6), date!(2024 - 03 - 10), "transportation"),
        ] {
            create_purchase(
                user.id,
                DraftPurchase::build(name, amount, date)
                    .category(category)
                    .finalize(today)
                    .unwrap(),
                &connection,
            )
            .unwrap();
        }

        let state = DashboardState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, user)
    }

    async fn render(anchor: Option<time::Date>) -> Html {
        let (state, user) = get_state();

        let response = get_dashboard_page(
            State(state),
            Extension(Session::from(user)),
            Query(PeriodQuery { anchor }),
        )
        .await
        .unwrap();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        html
    }

    #[tokio::test]
    async fn greets_user_and_links_to_new_purchase() {
        let html = render(Some(date!(2024 - 03 - 05))).await;

        let heading: String = html
            .select(&Selector::parse("h1").unwrap())
            .next()
            .unwrap()
            .text()
            .collect();
        assert_eq!(heading, "Hello, test_user");
        assert!(
            html.select(&Selector::parse(&format!("a[href=\"{}\"]", endpoints::NEW_PURCHASE_VIEW)).unwrap())
                .next()
                .is_some()
        );
    }

    #[tokio::test]
    async fn weekly_overview_follows_week_stream() {
        let html = render(Some(date!(2024 - 03 - 05))).await;

        let label: String = html
            .select(&Selector::parse("[data-period-label]").unwrap())
            .next()
            .unwrap()
            .text()
            .collect();
        let container = html
            .select(&Selector::parse("#live-dashboard").unwrap())
            .next()
            .unwrap();
        let swaps: Vec<&str> = container
            .select(&Selector::parse("[sse-swap]").unwrap())
            .filter_map(|element| element.value().attr("sse-swap"))
            .collect();
        let days = html.select(&Selector::parse("#live-calendar [data-date]").unwrap()).count();

        assert_eq!(label.trim(), "03 Mar 2024 - 09 Mar 2024");
        assert_eq!(
            container.value().attr("sse-connect"),
            Some("/api/dashboard/stream?anchor=2024-03-03")
        );
        assert_eq!(swaps, ["calendar", "week-summary"]);
        assert_eq!(days, 7);
    }

    #[tokio::test]
    async fn recent_purchases_are_newest_first() {
        let html = render(Some(date!(2024 - 03 - 05))).await;

        let rows: Vec<String> = html
            .select(&Selector::parse("#recent-purchases tbody tr").unwrap())
            .map(|row| {
                row.text()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect();

        assert_eq!(rows, ["Mar 07 | 💊 Pharmacy | $15.00", "Mar 04 | 🍔 Muffin | $4.20"]);
        assert!(html.select(&Selector::parse("#category-chart").unwrap()).next().is_some());
    }

    #[tokio::test]
    async fn empty_week_shows_message() {
        let html = render(Some(date!(2023 - 01 - 10))).await;

        assert!(html.select(&Selector::parse("#recent-purchases").unwrap()).next().is_none());
        assert!(html.select(&Selector::parse("#category-chart").unwrap()).next().is_none());
        let text = html.root_element().text().collect::<String>();
        assert_eq!(text.matches("No purchases available.").count(), 2);
    }
}

#[cfg(test)]
mod stream_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Extension,
        extract::{Query, State},
        response::IntoResponse,
    };
    use futures::StreamExt;
    use rust_decimal_macros::dec;
    use scraper::{Html, Selector};
    use time::{OffsetDateTime, macros::date};
    use tokio::time::timeout;

    use crate::{
        auth::{Session, User},
        calendar::CALENDAR_EVENT,
        category::create_default_categories,
        period::{Period, PeriodKind, PeriodQuery},
        purchase::{DraftPurchase, create_purchase},
        subscription::{Change, LiveViewState, PurchaseFeed, SubscriptionFilter},
        test_utils::{assert_content_type, assert_status_ok, create_test_user, get_test_connection},
    };

    use super::{WEEK_SUMMARY_EVENT, get_dashboard_stream, live_views};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn get_state() -> (LiveViewState, User) {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_default_categories(user.id, &connection).unwrap();

        let state = LiveViewState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
            purchase_feed: PurchaseFeed::new(),
        };

        (state, user)
    }

    fn recent_rows(summary: &str) -> Vec<String> {
        Html::parse_fragment(summary)
            .select(&Selector::parse("#recent-purchases tbody tr").unwrap())
            .map(|row| {
                row.text()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect()
    }

    #[tokio::test]
    async fn new_purchase_refreshes_grid_and_summary() {
        let (state, user) = get_state();
        let week = Period::containing(PeriodKind::Week, date!(2024 - 03 - 05));
        let mut views = Box::pin(
            state
                .snapshots(SubscriptionFilter {
                    user_id: user.id,
                    period: week,
                })
                .map(move |snapshot| live_views(&week, &snapshot)),
        );

        let first = timeout(TIMEOUT, views.next()).await.unwrap().unwrap();
        let events: Vec<&str> = first.iter().map(|(event, _)| *event).collect();
        assert_eq!(events, [CALENDAR_EVENT, WEEK_SUMMARY_EVENT]);
        assert!(recent_rows(&first[1].1).is_empty());

        {
            let connection = state.db_connection.lock().unwrap();
            let today = OffsetDateTime::now_utc().date();
            for (name, amount, date) in [
                ("Muffin", dec!(4.20), date!(2024 - 03 - 04)),
                ("Pharmacy", dec!(15), date!(2024 - 03 - 07)),
            ] {
                let draft = DraftPurchase::build(name, amount, date)
                    .category("food")
                    .finalize(today)
                    .unwrap();
                create_purchase(user.id, draft, &connection).unwrap();
            }
        }
        state.purchase_feed.notify(user.id, Change::Purchases);

        let second = timeout(TIMEOUT, views.next()).await.unwrap().unwrap();
        assert!(second[0].1.contains("Muffin"), "{}", second[0].1);
        assert_eq!(
            recent_rows(&second[1].1),
            ["Mar 07 | 🍔 Pharmacy | $15.00", "Mar 04 | 🍔 Muffin | $4.20"]
        );
        assert!(second[1].1.contains("category-chart"), "{}", second[1].1);
    }

    #[tokio::test]
    async fn handler_responds_with_event_stream() {
        let (state, user) = get_state();

        let response = get_dashboard_stream(
            State(state.clone()),
            Extension(Session::from(user.clone())),
            Query(PeriodQuery {
                anchor: Some(date!(2024 - 03 - 05)),
            }),
        )
        .await
        .unwrap()
        .into_response();

        assert_status_ok(&response);
        assert_content_type(&response, "text/event-stream");
        assert_eq!(state.purchase_feed.subscriber_count(user.id), 1);
    }
}
