//! Nightly price of a hot spring stay, in whole yen.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a price is not a positive whole number of yen.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("price must be at least {min} (got {value})", min = NightlyPrice::MIN)]
pub struct PriceError {
    value: i64,
}

/// Price per night in yen. Always at least 1.
///
/// Renders the way listing pages show it:
///
/// ```
/// use yelp_hotspring_core::NightlyPrice;
///
/// let price = NightlyPrice::new(50).unwrap();
/// assert_eq!(price.to_string(), "50円/泊");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NightlyPrice(i32);

impl NightlyPrice {
    /// Smallest accepted price.
    pub const MIN: i32 = 1;

    /// Create a price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if `value` is below 1 or does not fit in an `i32`.
    pub fn new(value: i64) -> Result<Self, PriceError> {
        i32::try_from(value)
            .ok()
            .filter(|v| *v >= Self::MIN)
            .map(Self)
            .ok_or(PriceError { value })
    }

    /// Amount in yen.
    #[must_use]
    pub const fn yen(self) -> i32 {
        self.0
    }
}

impl TryFrom<i64> for NightlyPrice {
    type Error = PriceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NightlyPrice> for i64 {
    fn from(price: NightlyPrice) -> Self {
        Self::from(price.0)
    }
}

impl fmt::Display for NightlyPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}円/泊", self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for NightlyPrice {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i32 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for NightlyPrice {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <i32 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(i64::from(raw))?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for NightlyPrice {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_price_must_be_positive() {
        assert!(NightlyPrice::new(0).is_err());
        assert!(NightlyPrice::new(-50).is_err());
        assert_eq!(NightlyPrice::new(1).unwrap().yen(), 1);
    }

    #[test]
    fn test_price_overflow_rejected() {
        assert!(NightlyPrice::new(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_price_display() {
        assert_eq!(NightlyPrice::new(12_000).unwrap().to_string(), "12000円/泊");
    }
}
