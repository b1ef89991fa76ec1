//! Asset store provider

use std::rc::Rc;

use crate::assets::{AssetLoader, AssetStore, RonAssetLoader, UrlMapper};
use crate::config::AssetConfig;
use crate::scene::Scope;

use super::{mount_children, mount_scoped, Children, MountError, Mounted};

/// Provides one memoizing [`AssetStore`] to its children
pub struct AssetStoreProvider {
    loader: Rc<dyn AssetLoader>,
    url_mapper: Option<UrlMapper>,
    children: Option<Children>,
}

impl AssetStoreProvider {
    /// Store loading through `loader`
    pub fn new(loader: impl AssetLoader + 'static) -> Self {
        Self {
            loader: Rc::new(loader),
            url_mapper: None,
            children: None,
        }
    }

    /// Store reading RON templates from the configured asset root
    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(RonAssetLoader::new(config.root.clone()))
    }

    /// Map asset names to the URLs handed to the loader
    pub fn url_mapper(mut self, mapper: impl Fn(&str) -> String + 'static) -> Self {
        self.url_mapper = Some(Rc::new(mapper));
        self
    }

    /// Components able to load assets
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`
    pub fn mount(self, scope: &Scope) -> Result<(Mounted, AssetStore), MountError> {
        mount_scoped(scope, move |scope| {
            let store = AssetStore::build(self.loader, self.url_mapper, scope.config().assets.log_loads);
            mount_children(self.children, &scope.with_assets(store.clone()))?;
            Ok((Mounted::new(scope.owner().clone(), None), store))
        })
    }
}
