//! Hot spring listing types.

use chrono::{DateTime, Utc};

use yelp_hotspring_core::{ExternalImageId, HotSpringId, HotSpringImageId, NightlyPrice, UserId};

/// A listing with its author and images, as shown on the detail page.
#[derive(Debug, Clone)]
pub struct HotSpring {
    pub id: HotSpringId,
    pub title: String,
    pub description: String,
    pub price: NightlyPrice,
    pub location: String,
    pub author_id: UserId,
    pub author_username: String,
    pub images: Vec<HotSpringImage>,
    pub updated_at: DateTime<Utc>,
}

impl HotSpring {
    /// Images of this listing whose external id is in `requested`.
    ///
    /// Used to drop ids that belong to some other listing before anything
    /// is deleted.
    #[must_use]
    pub fn owned_image_ids<'a, I>(&self, requested: I) -> Vec<ExternalImageId>
    where
        I: IntoIterator<Item = &'a ExternalImageId>,
    {
        let requested: Vec<&ExternalImageId> = requested.into_iter().collect();
        self.images
            .iter()
            .filter(|image| requested.contains(&&image.external_id))
            .map(|image| image.external_id.clone())
            .collect()
    }
}

/// One uploaded image attached to a listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HotSpringImage {
    pub id: HotSpringImageId,
    pub url: String,
    pub external_id: ExternalImageId,
}

/// Summary projection used on the listing index.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HotSpringSummary {
    pub id: HotSpringId,
    pub title: String,
    pub location: String,
    /// First uploaded image, if any.
    pub cover_url: Option<String>,
    pub review_count: i64,
}

/// Validated listing fields for create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHotSpring {
    pub title: String,
    pub description: String,
    pub price: NightlyPrice,
    pub location: String,
}

/// An uploaded image ready to be recorded against a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub url: String,
    pub external_id: ExternalImageId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn image(id: i32, external_id: &str) -> HotSpringImage {
        HotSpringImage {
            id: HotSpringImageId::new(id),
            url: format!("https://res.cloudinary.com/demo/{external_id}.jpg"),
            external_id: ExternalImageId::parse(external_id).unwrap(),
        }
    }

    #[test]
    fn test_owned_image_ids_filters_foreign_ids() {
        let listing = HotSpring {
            id: HotSpringId::new(1),
            title: "Onsen A".to_owned(),
            description: "a quiet outdoor bath".to_owned(),
            price: NightlyPrice::new(50).unwrap(),
            location: "Hakone".to_owned(),
            author_id: UserId::new(1),
            author_username: "user1".to_owned(),
            images: vec![image(1, "HotSprings/a"), image(2, "HotSprings/b")],
            updated_at: Utc::now(),
        };

        let requested = [
            ExternalImageId::parse("HotSprings/b").unwrap(),
            ExternalImageId::parse("HotSprings/other-listing").unwrap(),
        ];

        let owned = listing.owned_image_ids(&requested);
        assert_eq!(owned, vec![ExternalImageId::parse("HotSprings/b").unwrap()]);
    }
}
