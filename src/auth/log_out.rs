//! Log-out route handler that invalidates authentication cookies and redirects users.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};

use crate::{
    AppState,
    auth::{cookie::get_token_from_cookies, invalidate_auth_cookie},
    endpoints,
    subscription::PurchaseFeed,
};

/// The state needed to log out.
#[derive(Debug, Clone)]
pub struct LogOutState {
    pub cookie_key: Key,
    /// Live views of the user are closed on log out.
    pub purchase_feed: PurchaseFeed,
}

impl FromRef<AppState> for LogOutState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            purchase_feed: state.purchase_feed.clone(),
        }
    }
}

impl FromRef<LogOutState> for Key {
    fn from_ref(state: &LogOutState) -> Self {
        state.cookie_key.clone()
    }
}

/// Invalidate the auth cookie, end the user's live subscriptions and redirect
/// the client to the log-in page.
pub async fn get_log_out(State(state): State<LogOutState>, jar: PrivateCookieJar) -> Response {
    if let Ok(token) = get_token_from_cookies(&jar) {
        state.purchase_feed.close_user(token.user_id);
        tracing::info!("User {} logged out", token.user_id);
    }

    let jar = invalidate_auth_cookie(jar);

    (jar, Redirect::to(endpoints::LOG_IN_VIEW)).into_response()
}
