//! References to assets stored on the remote image host.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned for an unusable external image id.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExternalImageIdError {
    /// The id is empty.
    #[error("external image id cannot be empty")]
    Empty,
    /// The id is longer than the host allows.
    #[error("external image id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Identifier the image host assigned to an uploaded asset.
///
/// Needed to delete the asset later. Unique across all listings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExternalImageId(String);

impl ExternalImageId {
    /// Maximum accepted length.
    pub const MAX_LENGTH: usize = 255;

    /// Parse an id, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or too long.
    pub fn parse(s: &str) -> Result<Self, ExternalImageIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ExternalImageIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ExternalImageIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExternalImageId {
    type Error = ExternalImageIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExternalImageId> for String {
    fn from(id: ExternalImageId) -> Self {
        id.0
    }
}

impl fmt::Display for ExternalImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ExternalImageId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ExternalImageId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ExternalImageId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
