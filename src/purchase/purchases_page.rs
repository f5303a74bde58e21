//! The monthly purchases page: a table of the month's purchases, the month
//! total and a pie chart of spending by category.
//!
//! Everything below the navigation is re-rendered from a fresh snapshot
//! whenever the user's purchases change, see [get_purchases_stream].

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
    category::{Category, resolve_label},
    charts::{category_charts, chart_head_element, charts_view},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, CATEGORY_BADGE_STYLE, HTMX_SSE_SCRIPT, HeadElement, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        format_currency,
    },
    navigation::NavBar,
    period::{
        Period, PeriodKind, PeriodNavigation, PeriodQuery, clamp_anchor, month_abbrev,
        month_picker_view, period_navigation_view,
    },
    purchase::Purchase,
    subscription::{LiveViewState, Snapshot, SubscriptionFilter, live_events, load_snapshot},
    timezone::local_today,
};

/// Shown in the table and chart areas for a month without purchases.
pub const NO_PURCHASES_MESSAGE: &str = "No purchases available.";

/// The confirmation prompt shown before a purchase is deleted.
pub const DELETE_CONFIRMATION: &str =
    "Are you sure you want to delete this purchase? This action cannot be undone.";

/// The SSE event name that carries a freshly rendered month summary.
pub const PURCHASES_EVENT: &str = "purchases";

const TABLE_COLUMNS: u8 = 6;

/// The state needed for the purchases page.
#[derive(Debug, Clone)]
pub struct PurchasesPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PurchasesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn month_period(query: &PeriodQuery, today: Date) -> Period {
    Period::containing(PeriodKind::Month, clamp_anchor(query.anchor, today))
}

fn stream_url(period: &Period) -> String {
    format!("{}?anchor={}", endpoints::PURCHASES_STREAM, period.start)
}

fn purchase_row(purchase: &Purchase, categories: &[Category]) -> Markup {
    let edit_url = format_endpoint(endpoints::EDIT_PURCHASE_VIEW, purchase.id);
    let delete_url = format_endpoint(endpoints::PURCHASE, purchase.id);
    let category_label = resolve_label(categories, &purchase.category);

    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE)
            {
                (month_abbrev(purchase.date.month())) " " (format!("{:02}", purchase.date.day()))
            }

            td class=(TABLE_CELL_STYLE)
            {
                @if !category_label.is_empty() {
                    span class=(CATEGORY_BADGE_STYLE) { (category_label) }
                }
            }

            td class=(TABLE_CELL_STYLE) { (purchase.purchase) }

            td class={ (TABLE_CELL_STYLE) " max-w-xs truncate" } title=(purchase.description)
            {
                (purchase.description)
            }

            td class={ (TABLE_CELL_STYLE) " text-right" }
            {
                (format_currency(purchase.amount))
            }

            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                    button
                        hx-delete=(delete_url)
                        hx-confirm=(DELETE_CONFIRMATION)
                        hx-target="closest tr"
                        hx-target-error="#alert-container"
                        hx-swap="delete"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    )
}

fn purchases_table(snapshot: &Snapshot) -> Markup {
    let total = snapshot
        .buckets
        .last()
        .map(|bucket| bucket.cumulative_total)
        .unwrap_or_default();

    html!(
        div class="dark:bg-gray-800 overflow-x-auto"
        {
            table class="w-full text-sm text-left rtl:text-right
                text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Purchase" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for purchase in &snapshot.purchases {
                        (purchase_row(purchase, &snapshot.categories))
                    }

                    @if snapshot.purchases.is_empty() {
                        tr
                        {
                            td
                                colspan=(TABLE_COLUMNS)
                                class="px-6 py-4 text-center
                                    text-gray-500 dark:text-gray-400"
                            {
                                (NO_PURCHASES_MESSAGE)
                            }
                        }
                    }
                }

                tfoot
                {
                    tr class="font-semibold text-gray-900 dark:text-white"
                    {
                        th scope="row" colspan=(TABLE_COLUMNS - 2) class=(TABLE_CELL_STYLE) { "Total" }
                        td class={ (TABLE_CELL_STYLE) " text-right" } id="month-total"
                        {
                            (format_currency(total))
                        }
                        td {}
                    }
                }
            }
        }
    )
}

/// The table and chart for `period`, as sent to the live container.
fn purchases_summary(period: &Period, snapshot: &Snapshot) -> Markup {
    let charts = category_charts(&period.label(), &snapshot.purchases, &snapshot.categories);

    html!(
        (purchases_table(snapshot))

        (charts_view(&charts, NO_PURCHASES_MESSAGE))
    )
}

fn purchases_view(navigation: &PeriodNavigation, today: Date, snapshot: &Snapshot) -> Markup {
    let nav_bar = NavBar::new(endpoints::PURCHASES_VIEW).into_html();
    let period = &navigation.period;

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="relative space-y-4"
            {
                div class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Monthly Purchases" }

                    a href=(endpoints::NEW_PURCHASE_VIEW) class=(LINK_STYLE)
                    {
                        "Add Purchase"
                    }
                }

                (period_navigation_view(navigation))

                (month_picker_view(endpoints::PURCHASES_VIEW, period, today))

                div
                    id="live-purchases"
                    class="space-y-4"
                    hx-ext="sse"
                    sse-connect=(stream_url(period))
                    sse-swap=(PURCHASES_EVENT)
                {
                    (purchases_summary(period, snapshot))
                }
            }
        }
    );

    let head_elements = [
        HeadElement::ScriptLink(HTMX_SSE_SCRIPT.to_owned()),
        chart_head_element(),
    ];

    base("Purchases", &head_elements, &content)
}

/// Renders the purchases of the month containing the `anchor` query date.
pub async fn get_purchases_page(
    State(state): State<PurchasesPageState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let filter = SubscriptionFilter {
        user_id: session.user_id,
        period: month_period(&query, today),
    };

    let snapshot = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_snapshot(&filter, &connection)?
    };

    let navigation = PeriodNavigation::new(filter.period, today, endpoints::PURCHASES_VIEW);

    Ok(purchases_view(&navigation, today, &snapshot).into_response())
}

/// Streams the table and chart of the month in the query as `purchases`
/// events, once straight away and again after every change.
pub async fn get_purchases_stream(
    State(state): State<LiveViewState>,
    Extension(session): Extension<Session>,
    Query(query): Query<PeriodQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let today = local_today(&state.local_timezone)?;
    let period = month_period(&query, today);

    let summaries = state
        .snapshots(SubscriptionFilter {
            user_id: session.user_id,
            period,
        })
        .map(move |snapshot| {
            vec![(
                PURCHASES_EVENT,
                purchases_summary(&period, &snapshot).into_string(),
            )]
        });

    Ok(live_events(summaries))
}


#[cfg(test)]
mod purchases_stream_tests {
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
        category::create_default_categories,
        period::{Period, PeriodKind, PeriodQuery},
        purchase::{DraftPurchase, PurchaseId, create_purchase, delete_purchase},
        subscription::{Change, LiveViewState, PurchaseFeed, SubscriptionFilter},
        test_utils::{assert_content_type, assert_status_ok, create_test_user, get_test_connection},
    };

    use super::{get_purchases_stream, purchases_summary};

    const TIMEOUT: Duration = Duration::from_secs(1);

    fn get_state() -> (LiveViewState, User, PurchaseId) {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_default_categories(user.id, &connection).unwrap();
        let today = OffsetDateTime::now_utc().date();

        let groceries = create_purchase(
            user.id,
            DraftPurchase::build("Groceries", dec!(40.10), date!(2024 - 03 - 02))
                .category("grocery")
                .finalize(today)
                .unwrap(),
            &connection,
        )
        .unwrap();
        create_purchase(
            user.id,
            DraftPurchase::build("Bus", dec!(2.50), date!(2024 - 03 - 15))
                .category("transportation")
                .finalize(today)
                .unwrap(),
            &connection,
        )
        .unwrap();

        let state = LiveViewState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
            purchase_feed: PurchaseFeed::new(),
        };

        (state, user, groceries.id)
    }

    fn month_total(summary: &str) -> String {
        Html::parse_fragment(summary)
            .select(&Selector::parse("#month-total").unwrap())
            .next()
            .expect("No month total found")
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn total_and_chart_refresh_after_delete() {
        let (state, user, groceries_id) = get_state();
        let march = Period::containing(PeriodKind::Month, date!(2024 - 03 - 20));
        let mut summaries = Box::pin(
            state
                .snapshots(SubscriptionFilter {
                    user_id: user.id,
                    period: march,
                })
                .map(move |snapshot| purchases_summary(&march, &snapshot).into_string()),
        );

        let before = timeout(TIMEOUT, summaries.next()).await.unwrap().unwrap();
        assert_eq!(month_total(&before), "$42.60");
        assert!(before.contains("🥦 Grocery ($40.10)"), "{before}");

        delete_purchase(user.id, groceries_id, &state.db_connection.lock().unwrap()).unwrap();
        state.purchase_feed.notify(user.id, Change::Purchases);

        let after = timeout(TIMEOUT, summaries.next()).await.unwrap().unwrap();
        assert_eq!(month_total(&after), "$2.50");
        assert!(!after.contains("Groceries"), "{after}");
        assert!(!after.contains("🥦 Grocery"), "{after}");
        assert!(after.contains("🚗 Transportation ($2.50)"), "{after}");
    }

    #[tokio::test]
    async fn handler_responds_with_event_stream() {
        let (state, user, _) = get_state();

        let response = get_purchases_stream(
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
