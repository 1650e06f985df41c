//! Custom Askama template filters and display helpers.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use chrono::{DateTime, FixedOffset, Utc};

use yelp_hotspring_core::{Rating, RatingAverage};

/// Timestamps are shown in Japan Standard Time.
const JST_OFFSET_SECONDS: i32 = 9 * 60 * 60;

/// `yyyy年MM月dd日 HH時mm分`
const TIMESTAMP_FORMAT: &str = "%Y年%m月%d日 %H時%M分";

/// Something drawn as a row of five stars.
pub trait StarCount {
    /// Filled stars, 0..=5.
    fn filled_stars(&self) -> u8;
}

impl StarCount for Rating {
    fn filled_stars(&self) -> u8 {
        self.get()
    }
}

impl StarCount for RatingAverage {
    fn filled_stars(&self) -> u8 {
        Self::filled_stars(*self)
    }
}

impl<T: StarCount + ?Sized> StarCount for &T {
    fn filled_stars(&self) -> u8 {
        (**self).filled_stars()
    }
}

/// Renders a rating or an average as five stars, filled to the nearest whole star.
///
/// Usage in templates: `{{ average|stars }}`
#[askama::filter_fn]
pub fn stars(value: impl StarCount, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(star_string(value.filled_stars()))
}

/// Returns the content hash for main.css.
///
/// The hash is computed at build time from the CSS file content.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

fn star_string(filled: u8) -> String {
    let filled = usize::from(filled.min(Rating::MAX));

    let mut out = "★".repeat(filled);
    out.push_str(&"☆".repeat(5 - filled));
    out
}

/// Format a timestamp for display, e.g. `2024年03月01日 21時05分`.
#[must_use]
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    FixedOffset::east_opt(JST_OFFSET_SECONDS).map_or_else(
        || at.format(TIMESTAMP_FORMAT).to_string(),
        |jst| at.with_timezone(&jst).format(TIMESTAMP_FORMAT).to_string(),
    )
}
