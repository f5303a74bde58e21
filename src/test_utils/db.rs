use rusqlite::Connection;

use crate::{
    auth::{Email, PasswordHash, User, Username, create_user},
    db::initialize,
};

/// An in-memory database with every table created.
#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert the user "test_user" with a placeholder password hash.
#[track_caller]
pub(crate) fn create_test_user(connection: &Connection) -> User {
    create_user(
        Username::new_unchecked("test_user"),
        Email::new_unchecked("test@example.com"),
        PasswordHash::new_unchecked("hunter2"),
        connection,
    )
    .expect("Could not create test user")
}
