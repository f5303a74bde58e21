//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use time::Date;

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFoundError};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email and password that do not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request,
    /// or the token inside it has expired.
    #[error("no valid auth cookie in the cookie jar")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username does not follow the username rules. The string describes
    /// which rule was broken.
    #[error("{0}")]
    InvalidUsername(String),

    /// The email address is not of the form `name@example.com`.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// Another user has already registered the username.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// Another user has already registered the email address.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The purchase label was empty or only whitespace.
    #[error("Purchase cannot be empty")]
    EmptyPurchaseName,

    /// The purchase label was longer than the limit (in graphemes).
    #[error("Purchase must be at most {0} characters")]
    PurchaseNameTooLong(usize),

    /// A purchase amount was below zero.
    #[error("{0} is a negative amount, which is not allowed")]
    NegativeAmount(Decimal),

    /// A date in the future was used to create a purchase.
    ///
    /// Purchases record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// An edit was submitted with exactly the same values as the stored purchase.
    #[error("no data has been edited")]
    UnchangedPurchase,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A request or response body could not be read into memory.
    #[error("could not read body: {0}")]
    BodyReadError(String),

    /// Tried to delete a purchase that does not exist
    #[error("tried to delete a purchase that is not in the database")]
    DeleteMissingPurchase,

    /// Tried to update a purchase that does not exist
    #[error("tried to update a purchase that is not in the database")]
    UpdateMissingPurchase,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::FutureDate(date) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid purchase date".to_owned(),
                    details: format!(
                        "{date} is a date in the future, which is not allowed. \
                        Change the date to today or earlier."
                    ),
                },
            ),
            Error::EmptyPurchaseName => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Invalid purchase".to_owned(),
                    details: "Purchase is required.".to_owned(),
                },
            ),
            Error::PurchaseNameTooLong(limit) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Invalid purchase".to_owned(),
                    details: format!("Purchase must be at most {limit} characters."),
                },
            ),
            Error::NegativeAmount(amount) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: format!("{amount} is below zero. Enter an amount of $0.00 or more."),
                },
            ),
            Error::UnchangedPurchase => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "No data has been edited".to_owned(),
                    details: "Change at least one field before saving.".to_owned(),
                },
            ),
            Error::UpdateMissingPurchase => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update purchase".to_owned(),
                    details: "Purchase ID cannot be found.".to_owned(),
                },
            ),
            Error::DeleteMissingPurchase => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete purchase".to_owned(),
                    details: "Purchase ID cannot be found. \
                    Try refreshing the page to see if the purchase has already been deleted."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}
