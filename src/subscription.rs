//! Live subscriptions to a user's purchases.
//!
//! A view that wants to stay current calls [PurchaseFeed::start] with the
//! period it shows and waits on [SubscriptionHandle::changed]. Each write to
//! the user's purchases or categories calls [PurchaseFeed::notify], after which
//! the view reloads the whole period with [load_snapshot]. Changes are never
//! patched in incrementally.
//!
//! A handle is released by [PurchaseFeed::stop] or by dropping it, so a view
//! that closes or switches to another period always gives up its subscription.

use std::{
    collections::HashMap,
    convert::Infallible,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use axum::{
    extract::FromRef,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use rusqlite::Connection;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};

use crate::{
    AppState, Error,
    aggregation::{DayBucket, aggregate},
    auth::UserID,
    category::{Category, get_all_categories},
    period::Period,
    purchase::{Purchase, get_purchases_in_range},
};

/// Pending notifications kept per user before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 16;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// What kind of data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Purchases,
    Categories,
}

/// Which data a subscription is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub user_id: UserID,
    pub period: Period,
}

#[derive(Debug)]
struct Channel {
    sender: broadcast::Sender<Change>,
    generation: u64,
}

#[derive(Debug, Default)]
struct Channels {
    by_user: HashMap<UserID, Channel>,
    next_generation: u64,
}

/// Fans out change notifications to every live subscription of a user.
///
/// Cloning the feed is cheap and all clones share the same subscriptions.
#[derive(Debug, Clone, Default)]
pub struct PurchaseFeed {
    channels: Arc<Mutex<Channels>>,
}

impl PurchaseFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        // The map is only ever modified by single insert or remove calls, so
        // it is still consistent after a panic elsewhere.
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to changes matching `filter`.
    pub fn start(&self, filter: SubscriptionFilter) -> SubscriptionHandle {
        let mut channels = self.lock();
        let generation = channels.next_generation;

        let channel = channels
            .by_user
            .entry(filter.user_id)
            .or_insert_with(|| Channel {
                sender: broadcast::channel(CHANNEL_CAPACITY).0,
                generation,
            });
        let receiver = channel.sender.subscribe();
        let channel_generation = channel.generation;

        if channel_generation == generation {
            channels.next_generation += 1;
        }

        tracing::debug!(
            "Started subscription for user {} from {} to {}",
            filter.user_id,
            filter.period.start,
            filter.period.end()
        );

        SubscriptionHandle {
            filter,
            receiver: Some(receiver),
            generation: channel_generation,
            feed: self.clone(),
        }
    }

    /// Release `handle`. Dropping the handle has the same effect.
    pub fn stop(&self, handle: SubscriptionHandle) {
        drop(handle);
    }

    /// Wake every subscription of the user with `user_id`.
    pub fn notify(&self, user_id: UserID, change: Change) {
        let channels = self.lock();

        if let Some(channel) = channels.by_user.get(&user_id) {
            // Sending only fails when there are no subscribers, which is fine.
            let _ = channel.sender.send(change);
            tracing::debug!("Notified subscriptions of user {user_id} of {change:?}");
        }
    }

    /// End every subscription of the user with `user_id`, e.g. on log out.
    pub fn close_user(&self, user_id: UserID) {
        if self.lock().by_user.remove(&user_id).is_some() {
            tracing::debug!("Closed subscriptions of user {user_id}");
        }
    }

    /// The number of live subscriptions for the user with `user_id`.
    pub fn subscriber_count(&self, user_id: UserID) -> usize {
        self.lock()
            .by_user
            .get(&user_id)
            .map(|channel| channel.sender.receiver_count())
            .unwrap_or_default()
    }

    /// Remove the user's channel once no receiver is left on it. The caller's
    /// own receiver must already be dropped.
    fn release(&self, user_id: UserID, generation: u64) {
        let mut channels = self.lock();

        let is_unused = channels.by_user.get(&user_id).is_some_and(|channel| {
            channel.generation == generation && channel.sender.receiver_count() == 0
        });

        if is_unused {
            channels.by_user.remove(&user_id);
        }

        tracing::debug!("Released subscription for user {user_id}");
    }
}

/// A live subscription. Released when dropped.
#[derive(Debug)]
pub struct SubscriptionHandle {
    filter: SubscriptionFilter,
    /// Only `None` while the handle is being dropped.
    receiver: Option<broadcast::Receiver<Change>>,
    generation: u64,
    feed: PurchaseFeed,
}

impl SubscriptionHandle {
    pub fn filter(&self) -> SubscriptionFilter {
        self.filter
    }

    /// Wait until the subscribed data changes.
    ///
    /// Notifications that piled up in the meantime are merged into one, since
    /// each wake-up reloads everything anyway. Returns `false` once the feed
    /// has been closed for the user and no more changes will arrive.
    pub async fn changed(&mut self) -> bool {
        let Some(receiver) = self.receiver.as_mut() else {
            return false;
        };

        match receiver.recv().await {
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!("Subscription lagged behind by {skipped} changes");
            }
            Err(RecvError::Closed) => return false,
        }

        while let Ok(_) | Err(TryRecvError::Lagged(_)) = receiver.try_recv() {}

        true
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.feed.release(self.filter.user_id, self.generation);
    }
}

/// The full current state of the data a subscription covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// The purchases in the period, oldest first.
    pub purchases: Vec<Purchase>,
    pub categories: Vec<Category>,
    pub buckets: Vec<DayBucket>,
}

/// Query and aggregate everything `filter` covers.
pub fn load_snapshot(filter: &SubscriptionFilter, connection: &Connection) -> Result<Snapshot, Error> {
    let purchases = get_purchases_in_range(
        filter.user_id,
        filter.period.range(),
        connection,
    )?;
    let categories = get_all_categories(filter.user_id, connection)?;
    let buckets = aggregate(
        filter.period.start,
        filter.period.length_in_days,
        &purchases,
        &categories,
    );

    Ok(Snapshot {
        purchases,
        categories,
        buckets,
    })
}

fn load_locked_snapshot(
    filter: &SubscriptionFilter,
    db_connection: &Mutex<Connection>,
) -> Option<Snapshot> {
    let connection = match db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return None;
        }
    };

    load_snapshot(filter, &connection)
        .inspect_err(|error| {
            tracing::error!(
                "could not load snapshot for user {}: {error}",
                filter.user_id
            )
        })
        .ok()
}

/// A snapshot of the handle's period, once straight away and again after
/// every change.
///
/// The stream ends when the feed closes or the data can no longer be loaded.
/// Dropping the stream releases `handle`.
pub fn snapshot_stream(
    handle: SubscriptionHandle,
    db_connection: Arc<Mutex<Connection>>,
) -> impl Stream<Item = Snapshot> {
    stream::unfold(
        (handle, db_connection, true),
        |(mut handle, db_connection, is_first)| async move {
            if !is_first && !handle.changed().await {
                return None;
            }

            let snapshot = load_locked_snapshot(&handle.filter(), &db_connection)?;

            Some((snapshot, (handle, db_connection, false)))
        },
    )
}

/// The state needed by the streams that keep live views current.
#[derive(Debug, Clone)]
pub struct LiveViewState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
    pub purchase_feed: PurchaseFeed,
}

impl FromRef<AppState> for LiveViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
            purchase_feed: state.purchase_feed.clone(),
        }
    }
}

impl LiveViewState {
    /// Subscribe to `filter` and stream its snapshots, see [snapshot_stream].
    pub fn snapshots(&self, filter: SubscriptionFilter) -> impl Stream<Item = Snapshot> + use<> {
        snapshot_stream(self.purchase_feed.start(filter), self.db_connection.clone())
    }
}

/// A rendered part of a live view and the name of the SSE event that carries it.
pub type LiveView = (&'static str, String);

/// Sends every view of each item in `views` as an SSE event.
pub fn live_events(
    views: impl Stream<Item = Vec<LiveView>> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = views.flat_map(|views| {
        stream::iter(
            views
                .into_iter()
                .map(|(event, view)| Ok(Event::default().event(event).data(view))),
        )
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("ping"),
    )
}

#[cfg(test)]
mod feed_tests {
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    use time::macros::date;
    use tokio::time::timeout;

    use crate::{
        auth::UserID,
        period::{Period, PeriodKind},
    };

    use super::{Change, PurchaseFeed, SubscriptionFilter};

    fn filter(user_id: i64) -> SubscriptionFilter {
        SubscriptionFilter {
            user_id: UserID::new(user_id),
            period: Period::containing(PeriodKind::Month, date!(2024 - 03 - 01)),
        }
    }

    #[tokio::test]
    async fn notify_wakes_subscription() {
        let feed = PurchaseFeed::new();
        let mut handle = feed.start(filter(1));

        feed.notify(UserID::new(1), Change::Purchases);

        assert!(handle.changed().await);
    }

    #[tokio::test]
    async fn notify_does_not_wake_other_users() {
        let feed = PurchaseFeed::new();
        let mut handle = feed.start(filter(1));
        let _other = feed.start(filter(2));

        feed.notify(UserID::new(2), Change::Purchases);

        let result = timeout(Duration::from_millis(50), handle.changed()).await;
        assert!(result.is_err(), "subscription of user 1 should not be woken");
    }

    #[tokio::test]
    async fn pending_changes_are_merged() {
        let feed = PurchaseFeed::new();
        let mut handle = feed.start(filter(1));

        for _ in 0..3 {
            feed.notify(UserID::new(1), Change::Purchases);
        }

        assert!(handle.changed().await);
        let result = timeout(Duration::from_millis(50), handle.changed()).await;
        assert!(result.is_err(), "merged changes should only wake once");
    }

    #[tokio::test]
    async fn lagging_subscription_still_wakes() {
        let feed = PurchaseFeed::new();
        let mut handle = feed.start(filter(1));

        for _ in 0..(super::CHANNEL_CAPACITY * 2) {
            feed.notify(UserID::new(1), Change::Categories);
        }

        assert!(handle.changed().await);
    }

    #[test]
    fn stop_releases_subscription() {
        let feed = PurchaseFeed::new();
        let first = feed.start(filter(1));
        let second = feed.start(filter(1));
        assert_eq!(feed.subscriber_count(UserID::new(1)), 2);

        feed.stop(first);
        assert_eq!(feed.subscriber_count(UserID::new(1)), 1);

        drop(second);
        assert_eq!(feed.subscriber_count(UserID::new(1)), 0);
    }

    #[test]
    fn last_release_removes_channel() {
        let feed = PurchaseFeed::new();
        let first = feed.start(filter(1));
        let second = feed.start(filter(1));

        drop(first);
        assert!(feed.lock().by_user.contains_key(&UserID::new(1)));

        drop(second);
        assert!(!feed.lock().by_user.contains_key(&UserID::new(1)));
    }

    #[test]
    fn concurrent_releases_remove_channel() {
        for _ in 0..200 {
            let feed = PurchaseFeed::new();
            let barrier = Arc::new(Barrier::new(2));

            let threads: Vec<_> = [feed.start(filter(1)), feed.start(filter(1))]
                .into_iter()
                .map(|handle| {
                    let barrier = barrier.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        drop(handle);
                    })
                })
                .collect();

            for thread in threads {
                thread.join().unwrap();
            }

            assert!(!feed.lock().by_user.contains_key(&UserID::new(1)));
        }
    }

    #[tokio::test]
    async fn close_user_ends_subscriptions() {
        let feed = PurchaseFeed::new();
        let mut handle = feed.start(filter(1));

        feed.close_user(UserID::new(1));

        assert!(!handle.changed().await);
    }

    #[test]
    fn releasing_closed_handle_keeps_newer_subscriptions() {
        let feed = PurchaseFeed::new();
        let stale = feed.start(filter(1));
        feed.close_user(UserID::new(1));
        let _fresh = feed.start(filter(1));

        drop(stale);

        assert_eq!(feed.subscriber_count(UserID::new(1)), 1);
    }

    #[test]
    fn notify_without_subscribers_is_ignored() {
        let feed = PurchaseFeed::new();

        feed.notify(UserID::new(1), Change::Purchases);

        assert_eq!(feed.subscriber_count(UserID::new(1)), 0);
    }
}
