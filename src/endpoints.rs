//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/purchases/{purchase_id}/edit', use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a month of purchases as a table and chart.
pub const PURCHASES_VIEW: &str = "/purchases";
/// The page for recording a new purchase.
pub const NEW_PURCHASE_VIEW: &str = "/purchases/new";
/// The page for editing an existing purchase.
pub const EDIT_PURCHASE_VIEW: &str = "/purchases/{purchase_id}/edit";
/// The page for displaying a month of purchases as a calendar.
pub const CALENDAR_VIEW: &str = "/calendar";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for instructions for resetting the user's password.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";
/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to access users.
pub const USERS: &str = "/api/users";
/// The route to create purchases.
pub const PURCHASES_API: &str = "/api/purchases";
/// The route to update or delete a single purchase.
pub const PURCHASE: &str = "/api/purchases/{purchase_id}";
/// The server-sent event stream of calendar snapshots.
pub const CALENDAR_STREAM: &str = "/api/calendar/stream";
/// The server-sent event stream that keeps the monthly purchases page current.
pub const PURCHASES_STREAM: &str = "/api/purchases/stream";
/// The server-sent event stream that keeps the dashboard current.
pub const DASHBOARD_STREAM: &str = "/api/dashboard/stream";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/purchases/{purchase_id}', '{purchase_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
