//! YelpHotSpring Core - Shared domain types.
//!
//! Used by:
//! - `web` - The server-rendered hot spring listing site
//! - `cli` - Migrations and seed data
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Validation that can be expressed as a type lives here
//! so handlers and stores only ever see checked values.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, ratings, prices, and image references

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
