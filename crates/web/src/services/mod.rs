//! Business logic services.
//!
//! - `auth` - Registration, login and password hashing
//! - `cloudinary` - Signed Cloudinary upload API client
//! - `images` - Upload/delete flows over any `ImageHost`

pub mod auth;
pub mod cloudinary;
pub mod images;

pub use cloudinary::{CloudinaryClient, ImageHostError};
pub use images::{DeletionReport, ImageHost, PendingUpload, UploadedImage};
