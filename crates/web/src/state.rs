//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::{CloudinaryClient, ImageHostError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the database pool and the image host client, both created once at startup.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    images: CloudinaryClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Site configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the image host client cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, ImageHostError> {
        let images = CloudinaryClient::new(&config.cloudinary)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                images,
            }),
        })
    }

    /// Get a reference to the site configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the image host client.
    #[must_use]
    pub fn images(&self) -> &CloudinaryClient {
        &self.inner.images
    }
}
