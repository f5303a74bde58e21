//! The page for editing an existing purchase.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::Session,
    category::{Category, get_all_categories},
    endpoints::{self, format_endpoint},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner},
    navigation::NavBar,
    purchase::{
        Purchase, PurchaseId,
        form::{PurchaseFormDefaults, purchase_form_fields},
        get_purchase,
    },
    timezone::local_today,
};

fn edit_purchase_view(purchase: &Purchase, today: Date, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_PURCHASE_VIEW).into_html();
    let fields = purchase_form_fields(
        &PurchaseFormDefaults {
            purchase: Some(purchase.purchase.as_ref()),
            amount: Some(purchase.amount),
            date: purchase.date,
            category: Some(&purchase.category),
            description: (!purchase.description.is_empty()).then_some(purchase.description.as_str()),
            max_date: today,
        },
        categories,
    );
    let edit_endpoint = format_endpoint(endpoints::PURCHASE, purchase.id);

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(edit_endpoint)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Edit Purchase" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span id="indicator" class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " Save Changes"
                }
            }
        }
    };

    base("Edit Purchase", &[dollar_input_styles()], &content)
}

/// The state needed for the edit purchase page.
#[derive(Debug, Clone)]
pub struct EditPurchasePageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditPurchasePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for editing a purchase, or the 404 page if the user has
/// no purchase with that ID.
pub async fn get_edit_purchase_page(
    State(state): State<EditPurchasePageState>,
    Extension(session): Extension<Session>,
    Path(purchase_id): Path<PurchaseId>,
) -> Result<Response, Error> {
    let (purchase, categories) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let purchase = get_purchase(session.user_id, purchase_id, &connection)?;
        let categories = get_all_categories(session.user_id, &connection)?;

        (purchase, categories)
    };

    let today = local_today(&state.local_timezone)?;

    Ok(edit_purchase_view(&purchase, today, &categories).into_response())
}
