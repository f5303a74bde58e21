//! Alerts for reporting the outcome of htmx requests.
//!
//! Forms target `#alert-container` with `hx-target-error`, so an alert rendered
//! here replaces the contents of that container.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

use crate::html::{ALERT_CONTAINER_POSITION, ALERT_CONTAINER_STYLE};

/// A success or error message shown at the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    Success { message: String, details: String },
    SuccessSimple { message: String },
    Error { message: String, details: String },
}

impl Alert {
    fn view(&self) -> Markup {
        let (container_style, message, details) = match self {
            Alert::Success { message, details } => (
                "text-green-800 border-green-300 bg-green-50 dark:text-green-400 dark:border-green-800",
                message,
                Some(details),
            ),
            Alert::SuccessSimple { message } => (
                "text-green-800 border-green-300 bg-green-50 dark:text-green-400 dark:border-green-800",
                message,
                None,
            ),
            Alert::Error { message, details } => (
                "text-red-800 border-red-300 bg-red-50 dark:text-red-400 dark:border-red-800",
                message,
                Some(details),
            ),
        };

        html! {
            div
                role="alert"
                class={ "flex items-start justify-between p-4 mb-4 text-sm border rounded-lg dark:bg-gray-800 " (container_style) }
            {
                div
                {
                    p class="font-medium" { (message) }

                    @if let Some(details) = details.filter(|details| !details.is_empty())
                    {
                        p class="mt-1" { (details) }
                    }
                }

                button
                    type="button"
                    aria-label="Dismiss"
                    class="ms-3 font-bold"
                    onclick="this.closest('#alert-container').classList.add('hidden')"
                {
                    "×"
                }
            }
        }
    }

    pub fn into_html(self) -> Html<String> {
        Html(self.view().into_string())
    }

    /// Render the alert as a visible `#alert-container` that htmx swaps in
    /// out of band, for responses whose main content is swapped elsewhere.
    pub fn into_oob_html(self) -> Html<String> {
        let container = html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class=(ALERT_CONTAINER_STYLE)
                style=(ALERT_CONTAINER_POSITION)
            {
                (self.view())
            }
        };

        Html(container.into_string())
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
