//! Seed the database with demo data.
//!
//! Everything in `users`, `hot_springs` and `reviews` is deleted first
//! (images go with their listings by cascade). The demo accounts are
//! `user1@test.com` and `user2@test.com`, both with the password `password`.
//! Seeded listings have no images.

use yelp_hotspring_core::{Email, HotSpringId, NightlyPrice, Rating, UserId};
use yelp_hotspring_web::db::{HotSpringRepository, RepositoryError, ReviewRepository, UserRepository};
use yelp_hotspring_web::models::{NewHotSpring, NewReview, NewUser};
use yelp_hotspring_web::services::auth::hash_password;

use super::{CommandError, connect};

const SEED_PASSWORD: &str = "password";

struct SeedListing {
    title: &'static str,
    description: &'static str,
    price: i64,
    location: &'static str,
}

const LISTINGS: [SeedListing; 3] = [
    SeedListing {
        title: "Relaxing Springs",
        description: "A serene hot spring for ultimate relaxation.",
        price: 50,
        location: "Mountain Valley",
    },
    SeedListing {
        title: "Adventure Spa",
        description: "An adventurous hot spring for thrill-seekers.",
        price: 70,
        location: "Jungle Oasis",
    },
    SeedListing {
        title: "Tranquil Waters",
        description: "A peaceful hot spring with calming waters.",
        price: 60,
        location: "Lakeside Retreat",
    },
];

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid seed data: {0}")]
    InvalidData(String),

    #[error("Failed to hash password")]
    PasswordHash,
}

/// Replace all site data with the demo set.
///
/// # Errors
///
/// Returns `SeedError` if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), SeedError> {
    let pool = connect().await?;

    tracing::info!("Clearing existing data...");
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM hot_springs").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM users").execute(&mut *tx).await?;
    tx.commit().await?;

    let password_hash = hash_password(SEED_PASSWORD).map_err(|_| SeedError::PasswordHash)?;

    let users = UserRepository::new(&pool);
    let mut user_ids = Vec::with_capacity(2);
    for name in ["user1", "user2"] {
        let email = Email::parse(&format!("{name}@test.com"))
            .map_err(|e| SeedError::InvalidData(e.to_string()))?;
        let user = users
            .create(&NewUser {
                username: name.to_owned(),
                email,
                password_hash: password_hash.clone(),
            })
            .await?;
        tracing::info!(user_id = %user.id, email = %user.email, "Created user");
        user_ids.push(user.id);
    }
    let [user1, user2] = <[UserId; 2]>::try_from(user_ids)
        .map_err(|_| SeedError::InvalidData("expected two users".to_owned()))?;

    let listings = HotSpringRepository::new(&pool);
    let mut hot_spring_ids = Vec::with_capacity(LISTINGS.len());
    for (seed, author) in LISTINGS.iter().zip([user1, user1, user2]) {
        let listing = NewHotSpring {
            title: seed.title.to_owned(),
            description: seed.description.to_owned(),
            price: NightlyPrice::new(seed.price)
                .map_err(|e| SeedError::InvalidData(e.to_string()))?,
            location: seed.location.to_owned(),
        };
        let id = listings.create(author, &listing, &[]).await?;
        tracing::info!(hot_spring_id = %id, title = seed.title, "Created listing");
        hot_spring_ids.push(id);
    }

    // Each listing gets one review from the account that didn't post it.
    let reviews = ReviewRepository::new(&pool);
    let review_data: [(&str, i64, UserId); 3] = [
        ("Amazing experience! Highly recommended.", 5, user2),
        ("Great place for an adventure!", 4, user2),
        ("Peaceful and relaxing atmosphere.", 5, user1),
    ];
    for (hot_spring_id, (comment, rating, reviewer_id)) in
        hot_spring_ids.iter().copied().zip(review_data)
    {
        create_review(&reviews, hot_spring_id, reviewer_id, rating, comment).await?;
    }

    tracing::info!("Database has been seeded.");
    Ok(())
}

async fn create_review(
    reviews: &ReviewRepository<'_>,
    hot_spring_id: HotSpringId,
    reviewer_id: UserId,
    rating: i64,
    comment: &str,
) -> Result<(), SeedError> {
    let review = NewReview {
        rating: Rating::new(rating).map_err(|e| SeedError::InvalidData(e.to_string()))?,
        comment: comment.to_owned(),
        reviewer_id,
        hot_spring_id,
    };
    reviews.create(&review).await?;
    Ok(())
}
