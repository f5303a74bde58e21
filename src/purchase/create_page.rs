//! Defines the route handler for the page for recording a new purchase.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::Session,
    category::{Category, get_all_categories},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, dollar_input_styles, loading_spinner},
    navigation::NavBar,
    purchase::form::{PurchaseFormDefaults, purchase_form_fields},
    timezone::local_today,
};

fn create_purchase_view(today: Date, categories: &[Category]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_PURCHASE_VIEW).into_html();
    let fields = purchase_form_fields(
        &PurchaseFormDefaults {
            purchase: None,
            amount: None,
            date: today,
            category: None,
            description: None,
            max_date: today,
        },
        categories,
    );

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(endpoints::PURCHASES_API)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "New Purchase" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span id="indicator" class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " Add Purchase"
                }
            }
        }
    };

    base("New Purchase", &[dollar_input_styles()], &content)
}

/// The state needed for the new purchase page.
#[derive(Debug, Clone)]
pub struct CreatePurchasePageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for reading the user's categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreatePurchasePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the page for recording a purchase.
pub async fn get_create_purchase_page(
    State(state): State<CreatePurchasePageState>,
    Extension(session): Extension<Session>,
) -> Result<Response, Error> {
    let categories = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_all_categories(session.user_id, &connection).inspect_err(|error| {
            tracing::error!("Failed to retrieve categories for new purchase page: {error}")
        })?
    };

    let today = local_today(&state.local_timezone)?;

    Ok(create_purchase_view(today, &categories).into_response())
}

#[cfg(test)]
mod view_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use scraper::Selector;
    use time::OffsetDateTime;

    use crate::{
        auth::Session,
        category::create_default_categories,
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_input_with_value,
            assert_form_submit_button, assert_hx_endpoint, assert_status_ok, assert_valid_html,
            create_test_user, get_test_connection, must_get_form, parse_html_document,
        },
    };

    use super::{CreatePurchasePageState, get_create_purchase_page};

    #[tokio::test]
    async fn new_purchase_returns_form() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        create_default_categories(user.id, &connection).unwrap();
        let state = CreatePurchasePageState {
            local_timezone: "Etc/UTC".to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_create_purchase_page(State(state), Extension(Session::from(user)))
            .await
            .unwrap();

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::PURCHASES_API, "hx-post");
        assert_form_input(&form, "purchase", "text");
        assert_form_input(&form, "amount", "number");
        let today = OffsetDateTime::now_utc().date().to_string();
        assert_form_input_with_value(&form, "date", "date", &today);
        assert_form_submit_button(&form);

        let options = form
            .select(&Selector::parse("select[name=category] option").unwrap())
            .count();
        assert_eq!(options, 8, "want a placeholder plus the 7 default categories");
    }
}
