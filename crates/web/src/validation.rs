//! Declarative validation of submitted forms.
//!
//! Each form is a `validator::Validate` struct holding the raw strings as
//! submitted. Handlers call `parse` to get either the typed, validated value
//! or a [`FieldErrors`] map to re-render the form with. Nothing here touches
//! the database or the image host.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use yelp_hotspring_core::{Email, HotSpringId, NightlyPrice, Rating, UserId};

use crate::models::{NewHotSpring, NewReview};
use crate::services::PendingUpload;

/// Largest accepted image file (3 MiB).
pub const MAX_IMAGE_BYTES: usize = 3 * 1024 * 1024;

/// Most images accepted in one submission.
pub const MAX_IMAGES: usize = 5;

pub const MSG_USERNAME_TOO_SHORT: &str = "4文字以上で入力してください。";
pub const MSG_TOO_LONG_20: &str = "20文字以下で入力してください。";
pub const MSG_PASSWORD_TOO_SHORT: &str = "5文字以上で入力してください。";
pub const MSG_EMAIL: &str = "正しいメールアドレスの形式で入力してください。";
pub const MSG_REQUIRED: &str = "入力してください。";
pub const MSG_TOO_LONG_100: &str = "100文字以下で入力してください。";
pub const MSG_DESCRIPTION_TOO_SHORT: &str = "10文字以上で入力してください。";
pub const MSG_PRICE: &str = "1以上の数値を指定してください";
pub const MSG_RATING: &str = "評価を選択してください。";
pub const MSG_COMMENT_TOO_SHORT: &str = "5文字以上で入力してください。";
pub const MSG_TOO_MANY_IMAGES: &str = "ファイルは最大5つまでしかアップロードできません。";
pub const MSG_NO_IMAGES: &str = "画像を1枚以上選択してください。";
pub const MSG_NOT_AN_IMAGE: &str = "画像ファイルを選択してください。";
pub const MSG_IMAGE_TOO_LARGE: &str = "ファイルサイズが大きすぎます。3MB以下にしてください。";

/// Field name to messages, in a stable order for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Record a message against a field.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// First message for a field, for display under the input.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a field has any message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Fold another set of errors into this one.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Self::default();
        for (field, errors) in errors.field_errors() {
            for error in errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                out.push(&field, message);
            }
        }
        out
    }
}

fn error_with(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Character-count bounds with separate messages for each end.
fn bounded_chars(
    value: &str,
    min: usize,
    max: usize,
    too_short: &'static str,
    too_long: &'static str,
) -> Result<(), ValidationError> {
    let count = value.chars().count();
    if count < min {
        return Err(error_with("length", too_short));
    }
    if count > max {
        return Err(error_with("length", too_long));
    }
    Ok(())
}

fn validate_username(value: &str) -> Result<(), ValidationError> {
    bounded_chars(value.trim(), 4, 20, MSG_USERNAME_TOO_SHORT, MSG_TOO_LONG_20)
}

/// Same rules as [`Email::parse`], so a form that passes here is never
/// rejected again by the account store.
fn validate_email(value: &str) -> Result<(), ValidationError> {
    Email::parse(value)
        .map(|_| ())
        .map_err(|_| error_with("email", MSG_EMAIL))
}

fn validate_password(value: &str) -> Result<(), ValidationError> {
    bounded_chars(value, 5, 20, MSG_PASSWORD_TOO_SHORT, MSG_TOO_LONG_20)
}

fn validate_short_text(value: &str) -> Result<(), ValidationError> {
    bounded_chars(value.trim(), 1, 100, MSG_REQUIRED, MSG_TOO_LONG_100)
}

fn validate_price(value: &str) -> Result<(), ValidationError> {
    parse_price(value)
        .map(|_| ())
        .ok_or_else(|| error_with("price", MSG_PRICE))
}

fn validate_rating(value: &str) -> Result<(), ValidationError> {
    parse_rating(value)
        .map(|_| ())
        .ok_or_else(|| error_with("rating", MSG_RATING))
}

fn parse_price(value: &str) -> Option<NightlyPrice> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| NightlyPrice::new(v).ok())
}

fn parse_rating(value: &str) -> Option<Rating> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|v| Rating::new(v).ok())
}

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

impl RegisterForm {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any rule fails.
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// Login form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(custom(function = "validate_email"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

impl LoginForm {
    /// Validate the submission.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any rule fails.
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }
}

/// Text fields of the listing create/edit form, as submitted.
#[derive(Debug, Clone, Default, Validate)]
pub struct HotSpringFields {
    #[validate(custom(function = "validate_short_text"))]
    pub title: String,
    #[validate(length(min = 10, message = "10文字以上で入力してください。"))]
    pub description: String,
    #[validate(custom(function = "validate_price"))]
    pub price: String,
    #[validate(custom(function = "validate_short_text"))]
    pub location: String,
}

impl HotSpringFields {
    /// Validate and convert to typed listing fields.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any rule fails.
    pub fn parse(&self) -> Result<NewHotSpring, FieldErrors> {
        self.validate()?;
        let price = parse_price(&self.price).ok_or_else(|| {
            let mut errors = FieldErrors::default();
            errors.push("price", MSG_PRICE);
            errors
        })?;

        Ok(NewHotSpring {
            title: self.title.trim().to_owned(),
            description: self.description.clone(),
            price,
            location: self.location.trim().to_owned(),
        })
    }
}

/// Review fields from the detail page, as submitted.
#[derive(Debug, Clone, Default, Validate)]
pub struct ReviewFields {
    #[validate(custom(function = "validate_rating"))]
    pub rating: String,
    #[validate(length(min = 5, message = "5文字以上で入力してください。"))]
    pub comment: String,
}

impl ReviewFields {
    /// Validate and convert to a review ready to insert.
    ///
    /// # Errors
    ///
    /// Returns the field errors if any rule fails.
    pub fn parse(
        &self,
        reviewer_id: UserId,
        hot_spring_id: HotSpringId,
    ) -> Result<NewReview, FieldErrors> {
        self.validate()?;
        let rating = parse_rating(&self.rating).ok_or_else(|| {
            let mut errors = FieldErrors::default();
            errors.push("rating", MSG_RATING);
            errors
        })?;

        Ok(NewReview {
            rating,
            comment: self.comment.clone(),
            reviewer_id,
            hot_spring_id,
        })
    }
}

/// Check uploaded files: count within `min..=MAX_IMAGES`, each an image of
/// at most [`MAX_IMAGE_BYTES`]. Messages go under the `images` field.
pub fn check_images(files: &[PendingUpload], min: usize, errors: &mut FieldErrors) {
    if files.len() < min {
        errors.push("images", MSG_NO_IMAGES);
    }
    if files.len() > MAX_IMAGES {
        errors.push("images", MSG_TOO_MANY_IMAGES);
    }
    if files.iter().any(|f| !f.content_type.starts_with("image/")) {
        errors.push("images", MSG_NOT_AN_IMAGE);
    }
    if files.iter().any(|f| f.bytes.len() > MAX_IMAGE_BYTES) {
        errors.push("images", MSG_IMAGE_TOO_LARGE);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    fn listing(title: &str, description: &str, price: &str, location: &str) -> HotSpringFields {
        HotSpringFields {
            title: title.to_owned(),
            description: description.to_owned(),
            price: price.to_owned(),
            location: location.to_owned(),
        }
    }

    fn upload(content_type: &str, size: usize) -> PendingUpload {
        PendingUpload {
            file_name: "onsen.jpg".to_owned(),
            content_type: content_type.to_owned(),
            bytes: Bytes::from(vec![0_u8; size]),
        }
    }

    #[test]
    fn test_register_form_valid() {
        let form = RegisterForm {
            username: "onsen_taro".to_owned(),
            email: "taro@example.jp".to_owned(),
            password: "password".to_owned(),
        };
        assert!(form.check().is_ok());
    }

    #[test]
    fn test_register_form_messages() {
        let form = RegisterForm {
            username: "abc".to_owned(),
            email: "not-an-email".to_owned(),
            password: "x".repeat(21),
        };
        let errors = form.check().unwrap_err();

        assert_eq!(errors.first("username"), Some(MSG_USERNAME_TOO_SHORT));
        assert_eq!(errors.first("email"), Some(MSG_EMAIL));
        assert_eq!(errors.first("password"), Some(MSG_TOO_LONG_20));
    }

    #[test]
    fn test_register_email_matches_account_rules() {
        // A single-label domain would be refused when the account is stored.
        let form = RegisterForm {
            username: "onsen_taro".to_owned(),
            email: "taro@localhost".to_owned(),
            password: "password".to_owned(),
        };
        let errors = form.check().unwrap_err();
        assert_eq!(errors.first("email"), Some(MSG_EMAIL));

        let form = LoginForm {
            email: "taro@localhost".to_owned(),
            password: "password".to_owned(),
        };
        assert_eq!(form.check().unwrap_err().first("email"), Some(MSG_EMAIL));
    }

    #[test]
    fn test_username_counts_characters_not_bytes() {
        let form = RegisterForm {
            username: "温泉太郎".to_owned(),
            email: "taro@example.jp".to_owned(),
            password: "password".to_owned(),
        };
        assert!(form.check().is_ok());
    }

    #[test]
    fn test_login_form_short_password() {
        let form = LoginForm {
            email: "user1@test.com".to_owned(),
            password: "pass".to_owned(),
        };
        let errors = form.check().unwrap_err();
        assert_eq!(errors.first("password"), Some(MSG_PASSWORD_TOO_SHORT));
        assert!(!errors.has("email"));
    }

    #[test]
    fn test_listing_fields_parse_valid() {
        let parsed = listing("Onsen A", "twelve chars", "50", "Hakone")
            .parse()
            .unwrap();

        assert_eq!(parsed.title, "Onsen A");
        assert_eq!(parsed.price.to_string(), "50円/泊");
    }

    #[test]
    fn test_listing_fields_messages() {
        let errors = listing("", "short", "0", &"x".repeat(101))
            .parse()
            .unwrap_err();

        assert_eq!(errors.first("title"), Some(MSG_REQUIRED));
        assert_eq!(errors.first("description"), Some(MSG_DESCRIPTION_TOO_SHORT));
        assert_eq!(errors.first("price"), Some(MSG_PRICE));
        assert_eq!(errors.first("location"), Some(MSG_TOO_LONG_100));
    }

    #[test]
    fn test_listing_price_must_be_a_number() {
        let errors = listing("Onsen A", "twelve chars", "abc", "Hakone")
            .parse()
            .unwrap_err();
        assert_eq!(errors.first("price"), Some(MSG_PRICE));
    }

    #[test]
    fn test_review_fields_rating_bounds() {
        for rating in ["", "0", "6", "x"] {
            let fields = ReviewFields {
                rating: rating.to_owned(),
                comment: "とても良い湯でした".to_owned(),
            };
            let errors = fields
                .parse(UserId::new(1), HotSpringId::new(1))
                .unwrap_err();
            assert_eq!(errors.first("rating"), Some(MSG_RATING), "rating {rating:?}");
        }
    }

    #[test]
    fn test_review_fields_parse_valid() {
        let fields = ReviewFields {
            rating: "4".to_owned(),
            comment: "good bath".to_owned(),
        };
        let review = fields.parse(UserId::new(2), HotSpringId::new(7)).unwrap();

        assert_eq!(review.rating.get(), 4);
        assert_eq!(review.reviewer_id, UserId::new(2));
        assert_eq!(review.hot_spring_id, HotSpringId::new(7));
    }

    #[test]
    fn test_review_comment_too_short() {
        let fields = ReviewFields {
            rating: "5".to_owned(),
            comment: "good".to_owned(),
        };
        let errors = fields
            .parse(UserId::new(1), HotSpringId::new(1))
            .unwrap_err();
        assert_eq!(errors.first("comment"), Some(MSG_COMMENT_TOO_SHORT));
    }

    #[test]
    fn test_check_images_count_bounds() {
        let mut errors = FieldErrors::default();
        check_images(&[], 1, &mut errors);
        assert_eq!(errors.first("images"), Some(MSG_NO_IMAGES));

        let six: Vec<PendingUpload> = (0..6).map(|_| upload("image/png", 10)).collect();
        let mut errors = FieldErrors::default();
        check_images(&six, 1, &mut errors);
        assert_eq!(errors.first("images"), Some(MSG_TOO_MANY_IMAGES));

        let mut errors = FieldErrors::default();
        check_images(&[], 0, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_check_images_type_and_size() {
        let mut errors = FieldErrors::default();
        check_images(&[upload("application/pdf", 10)], 1, &mut errors);
        assert_eq!(errors.first("images"), Some(MSG_NOT_AN_IMAGE));

        let mut errors = FieldErrors::default();
        check_images(&[upload("image/jpeg", MAX_IMAGE_BYTES + 1)], 1, &mut errors);
        assert_eq!(errors.first("images"), Some(MSG_IMAGE_TOO_LARGE));

        let mut errors = FieldErrors::default();
        check_images(&[upload("image/jpeg", MAX_IMAGE_BYTES)], 1, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_field_errors_merge() {
        let mut a = FieldErrors::default();
        a.push("title", MSG_REQUIRED);
        let mut b = FieldErrors::default();
        b.push("images", MSG_NO_IMAGES);

        a.merge(b);
        assert!(a.has("title"));
        assert!(a.has("images"));
        assert!(!a.is_empty());
    }
}
