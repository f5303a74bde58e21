//! Purchase deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::Session,
    purchase::{PurchaseId, delete_purchase},
    subscription::{Change, PurchaseFeed},
};

/// The state needed for deleting a purchase.
#[derive(Debug, Clone)]
pub struct DeletePurchaseState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub purchase_feed: PurchaseFeed,
}

impl FromRef<AppState> for DeletePurchaseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            purchase_feed: state.purchase_feed.clone(),
        }
    }
}

/// Handle purchase deletion.
///
/// The deleted row removes itself, so the success alert is swapped in out of
/// band. Errors are returned as a plain alert for `hx-target-error`.
pub async fn delete_purchase_endpoint(
    State(state): State<DeletePurchaseState>,
    Extension(session): Extension<Session>,
    Path(purchase_id): Path<PurchaseId>,
) -> Response {
    let result = match state.db_connection.lock() {
        Ok(connection) => delete_purchase(session.user_id, purchase_id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match result {
        Ok(()) => {
            state
                .purchase_feed
                .notify(session.user_id, Change::Purchases);

            Alert::SuccessSimple {
                message: "Purchase deleted successfully".to_owned(),
            }
            .into_oob_html()
            .into_response()
        }
        Err(Error::DeleteMissingPurchase) => Error::DeleteMissingPurchase.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting purchase {purchase_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
