//! Core types for YelpHotSpring.
//!
//! This module provides type-safe wrappers for the domain's primitive values.

pub mod email;
pub mod id;
pub mod image;
pub mod price;
pub mod rating;

pub use email::{Email, EmailError};
pub use id::*;
pub use image::{ExternalImageId, ExternalImageIdError};
pub use price::{NightlyPrice, PriceError};
pub use rating::{Rating, RatingAverage, RatingError};
