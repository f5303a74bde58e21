//! The endpoint for saving changes to a purchase.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{Session, UserID},
    endpoints,
    purchase::{PurchaseId, form::PurchaseForm, get_purchase, update_purchase},
    subscription::{Change, PurchaseFeed},
    timezone::local_today,
};

/// The state needed to edit a purchase.
#[derive(Debug, Clone)]
pub struct EditPurchaseState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub purchase_feed: PurchaseFeed,
}

impl FromRef<AppState> for EditPurchaseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            purchase_feed: state.purchase_feed.clone(),
        }
    }
}

fn save_changes(
    user_id: UserID,
    purchase_id: PurchaseId,
    form: &PurchaseForm,
    local_timezone: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let draft = form.to_draft(local_today(local_timezone)?)?;

    let stored = match get_purchase(user_id, purchase_id, connection) {
        Err(Error::NotFound) => return Err(Error::UpdateMissingPurchase),
        result => result?,
    };

    if !draft.differs_from(&stored) {
        return Err(Error::UnchangedPurchase);
    }

    update_purchase(user_id, purchase_id, draft, connection)?;

    Ok(())
}

/// A route handler for updating a purchase, redirects to the purchases view on success.
pub async fn edit_purchase_endpoint(
    State(state): State<EditPurchaseState>,
    Extension(session): Extension<Session>,
    Path(purchase_id): Path<PurchaseId>,
    Form(form): Form<PurchaseForm>,
) -> Response {
    let result = match state.db_connection.lock() {
        Ok(connection) => save_changes(
            session.user_id,
            purchase_id,
            &form,
            &state.local_timezone,
            &connection,
        ),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    if let Err(error) = result {
        tracing::debug!("could not update purchase {purchase_id}: {error}");
        return error.into_alert_response();
    }

    state
        .purchase_feed
        .notify(session.user_id, Change::Purchases);

    (
        HxRedirect(endpoints::PURCHASES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
