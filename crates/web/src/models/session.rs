//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use yelp_hotspring_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user and
/// render the navigation bar without a database round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name.
    pub username: String,
}

impl CurrentUser {
    /// Whether this user is the given author or reviewer.
    #[must_use]
    pub fn owns(&self, owner: UserId) -> bool {
        self.id == owner
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
