//! Asset loaders
//!
//! Decoding is outside this crate; loaders only have to hand back an
//! [`AssetContainer`] for a URL.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use super::container::AssetContainer;
use super::AssetError;

/// Source of asset containers
pub trait AssetLoader {
    /// Start loading the container at `url`
    fn load(&self, url: &str) -> LocalBoxFuture<'static, Result<AssetContainer, AssetError>>;
}

/// Loader serving pre-registered containers
#[derive(Default)]
pub struct InMemoryAssetLoader {
    containers: HashMap<String, AssetContainer>,
    loads: Rc<Cell<usize>>,
}

impl InMemoryAssetLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `container` under `url`
    pub fn with_asset(mut self, url: impl Into<String>, container: AssetContainer) -> Self {
        self.containers.insert(url.into(), container);
        self
    }

    /// Counter of `load` calls, shared with the loader
    pub fn load_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.loads)
    }
}

impl AssetLoader for InMemoryAssetLoader {
    fn load(&self, url: &str) -> LocalBoxFuture<'static, Result<AssetContainer, AssetError>> {
        self.loads.set(self.loads.get() + 1);
        let result = self
            .containers
            .get(url)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(url.to_owned()));
        future::ready(result).boxed_local()
    }
}

/// Loader reading RON container templates below a root directory
#[derive(Debug, Clone)]
pub struct RonAssetLoader {
    root: PathBuf,
}

impl RonAssetLoader {
    /// Resolve URLs relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetLoader for RonAssetLoader {
    fn load(&self, url: &str) -> LocalBoxFuture<'static, Result<AssetContainer, AssetError>> {
        let path = self.root.join(url);
        let url = url.to_owned();
        async move {
            if !path.exists() {
                return Err(AssetError::NotFound(url));
            }
            let contents = std::fs::read_to_string(&path)?;
            ron::from_str(&contents).map_err(|e| AssetError::Parse {
                url,
                message: e.to_string(),
            })
        }
        .boxed_local()
    }
}
