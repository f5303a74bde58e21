//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_forgot_password_page, get_log_in_page, get_log_out,
        get_register_page, post_log_in, register_user,
    },
    calendar::{get_calendar_page, get_calendar_stream},
    dashboard::{get_dashboard_page, get_dashboard_stream},
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    purchase::{
        create_purchase_endpoint, delete_purchase_endpoint, edit_purchase_endpoint,
        get_create_purchase_page, get_edit_purchase_page, get_purchases_page, get_purchases_stream,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    // The live view streams are opened by an EventSource rather than htmx, so
    // they get a plain redirect like the pages.
    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::PURCHASES_VIEW, get(get_purchases_page))
        .route(endpoints::NEW_PURCHASE_VIEW, get(get_create_purchase_page))
        .route(endpoints::EDIT_PURCHASE_VIEW, get(get_edit_purchase_page))
        .route(endpoints::CALENDAR_VIEW, get(get_calendar_page))
        .route(endpoints::CALENDAR_STREAM, get(get_calendar_stream))
        .route(endpoints::PURCHASES_STREAM, get(get_purchases_stream))
        .route(endpoints::DASHBOARD_STREAM, get(get_dashboard_stream))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::PURCHASES_API, post(create_purchase_endpoint))
            .route(
                endpoints::PURCHASE,
                put(edit_purchase_endpoint).delete(delete_purchase_endpoint),
            )
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState,
        auth::{COOKIE_TOKEN, RegisterForm},
        endpoints::{self, format_endpoint},
    };

    use super::build_router;

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().expect("Could not open in-memory database"),
            "foobar",
            "Etc/UTC",
        )
        .expect("Could not create app state");

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn coffee_is_a_teapot() {
        let server = get_test_server();

        server
            .get(endpoints::COFFEE)
            .await
            .assert_status(StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server
            .get("/definitely/not/a/page")
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn pages_redirect_to_log_in_when_logged_out() {
        let server = get_test_server();

        for page in [
            endpoints::DASHBOARD_VIEW,
            endpoints::PURCHASES_VIEW,
            endpoints::CALENDAR_VIEW,
            endpoints::CALENDAR_STREAM,
            endpoints::PURCHASES_STREAM,
            endpoints::DASHBOARD_STREAM,
        ] {
            let response = server.get(page).await;

            response.assert_status_see_other();
            let location = response.header("location");
            assert!(
                location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW),
                "{page} redirected to {location:?}"
            );
        }
    }

    #[tokio::test]
    async fn api_routes_use_htmx_redirect_when_logged_out() {
        let server = get_test_server();

        let response = server
            .delete(&format_endpoint(endpoints::PURCHASE, 1))
            .await;

        let location = response.header("hx-redirect");
        assert!(location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW));
    }

    #[tokio::test]
    async fn registered_user_can_open_every_page() {
        let server = get_test_server();

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "piggy".to_owned(),
                email: "piggy@example.com".to_owned(),
                password: "trough-of-golden-acorns-42".to_owned(),
                confirm_password: "trough-of-golden-acorns-42".to_owned(),
            })
            .await;
        response.assert_status_see_other();
        let cookie = response.cookie(COOKIE_TOKEN);

        for page in [
            endpoints::DASHBOARD_VIEW,
            endpoints::PURCHASES_VIEW,
            endpoints::NEW_PURCHASE_VIEW,
            endpoints::CALENDAR_VIEW,
        ] {
            server
                .get(page)
                .add_cookie(cookie.clone())
                .await
                .assert_status_ok();
        }
    }
}
