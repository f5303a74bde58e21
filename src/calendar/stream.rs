//! Server-sent events that push a fresh calendar grid whenever the user's
//! purchases change.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures::{Stream, StreamExt};
use rusqlite::Connection;

use crate::{
    Error,
    auth::Session,
    calendar::{CALENDAR_EVENT, CalendarQuery, calendar_grid},
    subscription::{
        LiveViewState, SubscriptionFilter, SubscriptionHandle, live_events, snapshot_stream,
    },
    timezone::local_today,
};

fn grid_stream(
    handle: SubscriptionHandle,
    db_connection: Arc<Mutex<Connection>>,
) -> impl Stream<Item = String> {
    snapshot_stream(handle, db_connection)
        .map(|snapshot| calendar_grid(&snapshot.buckets).into_string())
}

/// Streams the calendar grid for the period in the query as `calendar` events.
pub async fn get_calendar_stream(
    State(state): State<LiveViewState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CalendarQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let today = local_today(&state.local_timezone)?;
    let handle = state.purchase_feed.start(SubscriptionFilter {
        user_id: session.user_id,
        period: query.period(today),
    });

    let grids = grid_stream(handle, state.db_connection).map(|grid| vec![(CALENDAR_EVENT, grid)]);

    Ok(live_events(grids))
}
