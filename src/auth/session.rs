//! The logged in user, as seen by route handlers.

use crate::auth::{User, UserID, Username};

/// Who is making the request.
///
/// The auth guards insert a session into the request extensions once the
/// auth cookie has been checked against the user table. Protected handlers
/// receive it with `Extension(session): Extension<Session>` and scope every
/// query by [Session::user_id].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserID,
    pub username: Username,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
        }
    }
}
