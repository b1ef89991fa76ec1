//! Asset management
//!
//! Memoized asynchronous asset loading. [`ResourceCache`] provides the
//! single-flight primitive, [`AssetStore`] applies it to named assets, and
//! [`AssetContainer`] templates are instantiated into the scene graph.

pub mod asset_store;
pub mod container;
pub mod loader;
pub mod resource_cache;

use thiserror::Error;

pub use asset_store::{AssetResult, AssetStore, UrlMapper};
pub use container::{AssetContainer, AssetNode};
pub use loader::{AssetLoader, InMemoryAssetLoader, RonAssetLoader};
pub use resource_cache::{ResourceCache, SharedLoad};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Nothing exists at the URL
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset exists but could not be decoded
    #[error("Failed to parse asset {url}: {message}")]
    Parse {
        /// Requested URL
        url: String,
        /// Decoder message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
