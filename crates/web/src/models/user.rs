//! User domain types.

use chrono::{DateTime, Utc};

use yelp_hotspring_core::{Email, UserId};

/// A registered user (domain type).
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name shown on listings and reviews.
    pub username: String,
    /// Login email address.
    pub email: Email,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub password_hash: String,
}
