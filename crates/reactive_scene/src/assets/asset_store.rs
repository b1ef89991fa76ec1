//! Asset store
//!
//! Name-keyed front of an [`AssetLoader`]: maps asset names to URLs and
//! makes sure each asset is requested from the loader once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::FutureExt;

use super::container::AssetContainer;
use super::loader::AssetLoader;
use super::resource_cache::{ResourceCache, SharedLoad};
use super::AssetError;

/// Outcome of a load, shareable between every requester
pub type AssetResult = Result<Rc<AssetContainer>, Rc<AssetError>>;

/// Maps an asset name to the URL handed to the loader
pub type UrlMapper = Rc<dyn Fn(&str) -> String>;

struct AssetStoreInner {
    loader: Rc<dyn AssetLoader>,
    url_mapper: Option<UrlMapper>,
    cache: RefCell<ResourceCache<String, AssetResult>>,
    log_loads: bool,
}

/// Shared, memoizing asset store
#[derive(Clone)]
pub struct AssetStore {
    inner: Rc<AssetStoreInner>,
}

impl fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStore")
            .field("cached", &self.inner.cache.borrow().len())
            .finish()
    }
}

impl AssetStore {
    /// Store loading through `loader`, asset names used as URLs
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        Self::build(Rc::new(loader), None, true)
    }

    /// Store with an asset name to URL mapping
    pub fn with_url_mapper(loader: impl AssetLoader + 'static, mapper: impl Fn(&str) -> String + 'static) -> Self {
        Self::build(Rc::new(loader), Some(Rc::new(mapper)), true)
    }

    pub(crate) fn build(loader: Rc<dyn AssetLoader>, url_mapper: Option<UrlMapper>, log_loads: bool) -> Self {
        Self {
            inner: Rc::new(AssetStoreInner {
                loader,
                url_mapper,
                cache: RefCell::new(ResourceCache::new()),
                log_loads,
            }),
        }
    }

    /// URL the loader receives for `asset`
    pub fn url_for(&self, asset: &str) -> String {
        match &self.inner.url_mapper {
            Some(mapper) => mapper(asset),
            None => asset.to_owned(),
        }
    }

    /// Shared load of `asset`; only the first request reaches the loader
    pub fn get_asset(&self, asset: &str) -> SharedLoad<AssetResult> {
        let key = asset.to_owned();
        let mut cache = self.inner.cache.borrow_mut();
        cache.get(&key, |asset| {
            let url = self.url_for(asset);
            if self.inner.log_loads {
                log::debug!("AssetStore: loading asset {url} ...");
            }
            self.inner
                .loader
                .load(&url)
                .map(|result| result.map(Rc::new).map_err(Rc::new))
        })
    }

    /// Whether `asset` has been requested
    pub fn is_cached(&self, asset: &str) -> bool {
        self.inner.cache.borrow().contains(&asset.to_owned())
    }

    /// Number of distinct assets requested
    pub fn cached_count(&self) -> usize {
        self.inner.cache.borrow().len()
    }
}
