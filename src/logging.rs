//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{
        Method,
        header::{CONTENT_TYPE, HeaderMap},
        request, response,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of bytes of a body shown in the `info` level logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Form fields whose values never appear in the logs.
const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated
/// and the full body is logged at the `debug` level. Password fields in
/// submitted forms are redacted. Event streams never end, so only their
/// headers are logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = match read_request(request).await {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    if parts.method == Method::POST && has_content_type(&parts.headers, FORM_CONTENT_TYPE) {
        log_request(&parts, &redact_form_fields(&body_text, &REDACTED_FIELDS));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    if has_content_type(response.headers(), EVENT_STREAM_CONTENT_TYPE) {
        tracing::info!("Opening event stream: {:#?}", response.headers());
        return response;
    }

    let (parts, body_text) = match read_response(response).await {
        Ok(response) => response,
        Err(error) => return error.into_response(),
    };
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

fn has_content_type(headers: &HeaderMap, content_type: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(content_type))
}

/// Replace the values of `field_names` in the URL encoded `form_text` with asterisks.
fn redact_form_fields(form_text: &str, field_names: &[&str]) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if field_names.contains(&name) => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn body_to_text(body: Body) -> Result<String, Error> {
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .inspect_err(|error| tracing::error!("could not read body: {error}"))
        .map_err(|error| Error::BodyReadError(error.to_string()))?;

    Ok(String::from_utf8_lossy(&body_bytes).into_owned())
}

async fn read_request(request: Request) -> Result<(request::Parts, String), Error> {
    let (parts, body) = request.into_parts();

    Ok((parts, body_to_text(body).await?))
}

async fn read_response(response: Response) -> Result<(response::Parts, String), Error> {
    let (parts, body) = response.into_parts();

    Ok((parts, body_to_text(body).await?))
}

/// The longest prefix of `text` that fits in `limit` bytes without splitting a character.
fn truncate(text: &str, limit: usize) -> &str {
    let end = text
        .char_indices()
        .map(|(index, character)| index + character.len_utf8())
        .take_while(|&end| end <= limit)
        .last()
        .unwrap_or_default();

    &text[..end]
}

fn log_request(parts: &request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {parts:#?}\nbody: {:}...",
            truncate(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {parts:#?}\nbody: {:}...",
            truncate(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, middleware, routing::post};
    use axum_test::TestServer;

    use super::{REDACTED_FIELDS, logging_middleware, redact_form_fields, truncate};

    #[test]
    fn redacts_password_fields_only() {
        let form = "username=piggy&password=hunter2&confirm_password=hunter2&email=a%40b.c";

        let redacted = redact_form_fields(form, &REDACTED_FIELDS);

        assert_eq!(
            redacted,
            "username=piggy&password=********&confirm_password=********&email=a%40b.c"
        );
    }

    #[test]
    fn field_names_must_match_exactly() {
        let form = "old_password=keep&passwords=keep";

        assert_eq!(redact_form_fields(form, &REDACTED_FIELDS), form);
    }

    #[test]
    fn truncate_respects_character_boundaries() {
        assert_eq!(truncate("abc", 64), "abc");
        assert_eq!(truncate("ab🍔", 3), "ab");
        assert_eq!(truncate("ab🍔", 6), "ab🍔");
    }

    #[tokio::test]
    async fn passes_bodies_through_unchanged() {
        let app = Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let body = "x".repeat(200);

        let response = server.post("/echo").text(body.clone()).await;

        response.assert_status_ok();
        response.assert_text(body);
    }
}
