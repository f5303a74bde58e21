//! Defines the endpoint for recording a new purchase.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Session,
    endpoints,
    purchase::{create_purchase, form::PurchaseForm},
    subscription::{Change, PurchaseFeed},
    timezone::local_today,
};

/// The state needed to record a purchase.
#[derive(Debug, Clone)]
pub struct CreatePurchaseState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// Notified after the purchase is stored.
    pub purchase_feed: PurchaseFeed,
}

impl FromRef<AppState> for CreatePurchaseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            purchase_feed: state.purchase_feed.clone(),
        }
    }
}

/// A route handler for recording a purchase, redirects to the purchases view on success.
pub async fn create_purchase_endpoint(
    State(state): State<CreatePurchaseState>,
    Extension(session): Extension<Session>,
    Form(form): Form<PurchaseForm>,
) -> Response {
    let today = match local_today(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let draft = match form.to_draft(today) {
        Ok(draft) => draft,
        Err(error) => {
            tracing::debug!("rejected purchase from user {}: {error}", session.user_id);
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let purchase = match create_purchase(session.user_id, draft, &connection) {
        Ok(purchase) => purchase,
        Err(error) => {
            tracing::error!("could not create purchase: {error}");
            return error.into_alert_response();
        }
    };
    drop(connection);

    tracing::info!("User {} recorded purchase {}", session.user_id, purchase.id);
    state
        .purchase_feed
        .notify(session.user_id, Change::Purchases);

    (
        HxRedirect(endpoints::PURCHASES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
