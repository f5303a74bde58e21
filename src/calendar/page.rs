//! The calendar page.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Session,
    calendar::{CalendarQuery, calendar_grid, live_calendar, live_calendar_head_elements},
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base},
    navigation::NavBar,
    period::{Period, PeriodNavigation, period_navigation_view},
    subscription::{Snapshot, SubscriptionFilter, load_snapshot},
    timezone::local_today,
};

/// The state needed for the calendar page.
#[derive(Debug, Clone)]
pub struct CalendarPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CalendarPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

fn calendar_view(navigation: &PeriodNavigation, period: &Period, snapshot: &Snapshot) -> Markup {
    let nav_bar = NavBar::new(endpoints::CALENDAR_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl space-y-4"
            {
                h1 class="text-xl font-bold" { "Calendar" }

                (period_navigation_view(navigation))

                (live_calendar(period, calendar_grid(&snapshot.buckets)))
            }
        }
    };

    base("Calendar", &[live_calendar_head_elements()], &content)
}

/// Renders the month grid for the `anchor` query date. The grid then follows
/// the live stream for the same month.
pub async fn get_calendar_page(
    State(state): State<CalendarPageState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CalendarQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let period = query.period(today);
    let filter = SubscriptionFilter {
        user_id: session.user_id,
        period,
    };

    let snapshot = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_snapshot(&filter, &connection)?
    };

    let navigation = PeriodNavigation::new(period, today, endpoints::CALENDAR_VIEW);

    Ok(calendar_view(&navigation, &period, &snapshot).into_response())
}
