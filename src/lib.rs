// vidgallery - video gallery metadata store and orientation classifier

pub mod constants;
pub mod error;
pub mod config;
pub mod tools;
pub mod session;
pub mod db;
pub mod metadata;
pub mod ingest;
pub mod scan;
pub mod jobs;
pub mod catalog;
pub mod admin;
pub mod gallery;

pub use admin::{AdminAuthority, AdminToken};
pub use config::GalleryConfig;
pub use error::{GalleryError, Result};
pub use gallery::Gallery;
pub use metadata::{Classifier, MediaProbe, Orientation, VideoInfo};
pub use session::SessionId;
