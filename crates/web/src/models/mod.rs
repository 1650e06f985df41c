//! Domain models for the hot spring site.
//!
//! Row types live next to their queries in `db`; these are the validated
//! shapes handlers and templates work with.

pub mod hot_spring;
pub mod review;
pub mod session;
pub mod user;

pub use hot_spring::{HotSpring, HotSpringImage, HotSpringSummary, NewHotSpring, NewImage};
pub use review::{NewReview, Review, ReviewWithReviewer};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, User};
