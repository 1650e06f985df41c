//! Star ratings and their per-listing average.

use core::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Error returned when a rating falls outside 1..=5.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rating must be between {min} and {max} (got {value})", min = Rating::MIN, max = Rating::MAX)]
pub struct RatingError {
    value: i64,
}

/// A review's star rating, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct Rating(u8);

impl Rating {
    /// Lowest accepted rating.
    pub const MIN: u8 = 1;
    /// Highest accepted rating.
    pub const MAX: u8 = 5;

    /// Create a rating.
    ///
    /// # Errors
    ///
    /// Returns `RatingError` if `value` is not within 1..=5.
    pub fn new(value: i64) -> Result<Self, RatingError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN..=Self::MAX).contains(v))
            .map(Self)
            .ok_or(RatingError { value })
    }

    /// The rating as a plain number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i16> for Rating {
    type Error = RatingError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        Self::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Stored as SMALLINT.
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Rating {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i16 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i16 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Rating {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i16 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::try_from(raw)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Rating {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&i16::from(*self), buf)
    }
}

/// Mean rating of a listing's reviews, rounded to two decimal places.
///
/// A listing without reviews averages exactly zero rather than null.
///
/// ```
/// use rust_decimal::Decimal;
/// use yelp_hotspring_core::RatingAverage;
///
/// assert_eq!(RatingAverage::from_mean(None).to_string(), "0.00");
/// assert_eq!(
///     RatingAverage::from_mean(Some(Decimal::new(43_333, 4))).to_string(),
///     "4.33"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingAverage(Decimal);

impl Default for RatingAverage {
    fn default() -> Self {
        Self::from_mean(None)
    }
}

impl RatingAverage {
    /// Decimal places kept after rounding.
    pub const SCALE: u32 = 2;

    /// Build an average from a raw mean, as returned by `AVG(rating)`.
    ///
    /// `None` (no rows) becomes zero. Midpoints round away from zero, so
    /// 4.125 becomes 4.13.
    #[must_use]
    pub fn from_mean(mean: Option<Decimal>) -> Self {
        let mut value = mean
            .unwrap_or(Decimal::ZERO)
            .round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero);
        value.rescale(Self::SCALE);
        Self(value)
    }

    /// Average a set of ratings in memory.
    #[must_use]
    pub fn from_ratings(ratings: &[Rating]) -> Self {
        if ratings.is_empty() {
            return Self::from_mean(None);
        }
        let sum: Decimal = ratings.iter().map(|r| Decimal::from(r.get())).sum();
        Self::from_mean(Some(sum / Decimal::from(ratings.len())))
    }

    /// The rounded value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }

    /// Number of filled stars when drawing this average (rounded to nearest).
    #[must_use]
    pub fn filled_stars(self) -> u8 {
        let rounded = self
            .0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        rounded.to_u8().unwrap_or(0).min(Rating::MAX)
    }
}

impl fmt::Display for RatingAverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ratings(values: &[i64]) -> Vec<Rating> {
        values.iter().map(|v| Rating::new(*v).unwrap()).collect()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-1).is_err());
        assert_eq!(Rating::new(1).unwrap().get(), 1);
        assert_eq!(Rating::new(5).unwrap().get(), 5);
    }

    #[test]
    fn test_rating_error_message() {
        let err = Rating::new(9).unwrap_err();
        assert_eq!(err.to_string(), "rating must be between 1 and 5 (got 9)");
    }

    #[test]
    fn test_rating_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert_eq!(serde_json::from_str::<Rating>("4").unwrap().get(), 4);
    }

    #[test]
    fn test_average_without_reviews_is_zero() {
        let avg = RatingAverage::from_mean(None);
        assert_eq!(avg.value(), Decimal::ZERO);
        assert_eq!(avg.to_string(), "0.00");
        assert_eq!(RatingAverage::from_ratings(&[]), avg);
        assert_eq!(RatingAverage::default().to_string(), "0.00");
    }

    #[test]
    fn test_average_single_review() {
        let avg = RatingAverage::from_ratings(&ratings(&[5]));
        assert_eq!(avg.to_string(), "5.00");
    }

    #[test]
    fn test_average_two_reviews() {
        let avg = RatingAverage::from_ratings(&ratings(&[5, 3]));
        assert_eq!(avg.to_string(), "4.00");
    }

    #[test]
    fn test_average_rounds_to_two_places() {
        // 13 / 3 = 4.333...
        let avg = RatingAverage::from_ratings(&ratings(&[5, 4, 4]));
        assert_eq!(avg.to_string(), "4.33");

        // 11 / 3 = 3.666...
        let avg = RatingAverage::from_ratings(&ratings(&[5, 5, 1]));
        assert_eq!(avg.to_string(), "3.67");
    }

    #[test]
    fn test_average_midpoint_rounds_away_from_zero() {
        let avg = RatingAverage::from_mean(Some(Decimal::new(4125, 3)));
        assert_eq!(avg.to_string(), "4.13");
    }

    #[test]
    fn test_filled_stars() {
        assert_eq!(RatingAverage::from_mean(None).filled_stars(), 0);
        assert_eq!(RatingAverage::from_ratings(&ratings(&[5, 4])).filled_stars(), 5);
        assert_eq!(RatingAverage::from_ratings(&ratings(&[4, 4, 3])).filled_stars(), 4);
        assert_eq!(RatingAverage::from_ratings(&ratings(&[1])).filled_stars(), 1);
    }
}
