//! Asset instantiation

use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::{AssetResult, AssetStore};
use crate::foundation::collections::NodeId;
use crate::foundation::math::Vec3;
use crate::reactive::{Owner, Prop, Signal};
use crate::scene::{Scope, TransformProps};

use super::{mount_children, mount_scoped, Children, MountError, Mounted};

/// Loads an asset from the nearest store and instantiates it, whole or
/// filtered by node name.
///
/// Instantiated roots are named `name`, `name_1`, `name_2`, ... and all
/// receive the transform props. Only a single-root instance attaches to the
/// enclosing node and parents the children; with several roots a warning is
/// logged and children stay unattached.
pub struct MeshAsset {
    asset: Prop<String>,
    name: Option<Prop<String>>,
    names_to_instantiate: Option<Vec<String>>,
    transform: TransformProps,
    children: Option<Children>,
}

/// Handle of a mounted [`MeshAsset`]
#[derive(Clone)]
pub struct MountedAsset {
    mounted: Mounted,
    roots: Signal<Vec<NodeId>>,
}

impl MountedAsset {
    /// Component handle
    pub fn mounted(&self) -> &Mounted {
        &self.mounted
    }

    /// Roots of the current instance, empty while loading or after a failed load
    pub fn roots(&self) -> &Signal<Vec<NodeId>> {
        &self.roots
    }

    /// Tear the instance and its children down
    pub fn unmount(&self) {
        self.mounted.unmount();
    }
}

impl MeshAsset {
    /// Instance of the asset named `asset`; changing it reloads
    pub fn new(asset: impl Into<Prop<String>>) -> Self {
        Self {
            asset: asset.into(),
            name: None,
            names_to_instantiate: None,
            transform: TransformProps::default(),
            children: None,
        }
    }

    /// Root name, `MeshAsset_{uid}` by default
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Only instantiate nodes with these names
    pub fn names_to_instantiate<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.names_to_instantiate = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Local position of every root
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.transform.position = position.into();
        self
    }

    /// Local Euler rotation of every root
    pub fn rotation(mut self, rotation: impl Into<Prop<Vec3>>) -> Self {
        self.transform.rotation = rotation.into();
        self
    }

    /// Local scale of every root
    pub fn scale(mut self, scale: impl Into<Prop<Vec3>>) -> Self {
        self.transform.scale = scale.into();
        self
    }

    /// Components attached to the single root
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`; fails outside [`AssetStoreProvider`](super::AssetStoreProvider)
    pub fn mount(self, scope: &Scope) -> Result<MountedAsset, MountError> {
        let store = scope.assets()?;
        mount_scoped(scope, move |scope| {
            let instance = Rc::new(AssetInstance {
                scope: scope.clone(),
                store,
                name: self.name,
                names_to_instantiate: self.names_to_instantiate,
                transform: self.transform,
                roots: scope.runtime().signal(Vec::new()),
                anchor: scope.runtime().signal(None),
                load: RefCell::new(None),
            });

            let (loader, asset) = (Rc::clone(&instance), self.asset);
            scope.effect(&asset.sources(), move || loader.reload(asset.get()));

            mount_children(self.children, &scope.with_parent(instance.anchor.clone()))?;
            Ok(MountedAsset {
                mounted: Mounted::new(scope.owner().clone(), None),
                roots: instance.roots.clone(),
            })
        })
    }
}

struct AssetInstance {
    scope: Scope,
    store: AssetStore,
    name: Option<Prop<String>>,
    names_to_instantiate: Option<Vec<String>>,
    transform: TransformProps,
    roots: Signal<Vec<NodeId>>,
    anchor: Signal<Option<NodeId>>,
    load: RefCell<Option<Owner>>,
}

impl AssetInstance {
    fn reload(self: &Rc<Self>, asset: String) {
        let previous = self.load.borrow_mut().take();
        if let Some(previous) = previous {
            previous.dispose();
            self.anchor.set_if_changed(None);
            self.roots.set_if_changed(Vec::new());
        }

        let load_scope = self.scope.child();
        *self.load.borrow_mut() = Some(load_scope.owner().clone());

        let pending = self.store.get_asset(&asset);
        let (instance, scope, url) = (Rc::clone(self), load_scope.clone(), asset.clone());
        let spawned = load_scope.spawn_local(async move {
            let result = pending.await;
            instance.instantiate(&scope, &url, result);
        });
        if let Err(err) = spawned {
            log::error!("MeshAsset: cannot load {asset}: {err}");
        }
    }

    fn instantiate(&self, scope: &Scope, asset: &str, result: AssetResult) {
        if scope.owner().is_disposed() {
            return;
        }
        let container = match result {
            Ok(container) => container,
            Err(err) => {
                log::error!("MeshAsset: failed to load {asset}: {err}");
                return;
            }
        };

        let graph = Rc::clone(scope.graph());
        let roots = {
            let include = |name: &str| {
                self.names_to_instantiate
                    .as_ref()
                    .map_or(true, |names| names.iter().any(|n| n == name))
            };
            container.instantiate(&mut graph.borrow_mut(), &include)
        };
        // Only the instantiated nodes are freed; children attached later survive a reload
        let instantiated = {
            let graph = graph.borrow();
            let mut nodes = Vec::new();
            let mut stack = roots.clone();
            while let Some(node) = stack.pop() {
                nodes.push(node);
                stack.extend(graph.children(node).iter().copied());
            }
            nodes
        };
        {
            let graph = Rc::clone(&graph);
            scope.owner().on_cleanup(move || {
                let mut graph = graph.borrow_mut();
                for node in instantiated.into_iter().rev() {
                    if graph.contains(node) {
                        if let Err(err) = graph.dispose(node) {
                            log::warn!("MeshAsset: {err}");
                        }
                    }
                }
            });
        }

        let default_name = format!(
            "MeshAsset_{}",
            roots
                .first()
                .and_then(|root| graph.borrow().uid(*root))
                .unwrap_or_default()
        );
        let name = self.name.clone().unwrap_or(Prop::Value(default_name));
        {
            let (graph, roots, name) = (Rc::clone(&graph), roots.clone(), name.clone());
            scope.effect(&name.sources(), move || {
                let base = name.get();
                let mut graph = graph.borrow_mut();
                for (i, root) in roots.iter().enumerate() {
                    let root_name = if i == 0 { base.clone() } else { format!("{base}_{i}") };
                    if let Err(err) = graph.set_name(*root, root_name) {
                        log::warn!("MeshAsset: {err}");
                    }
                }
            });
        }

        for &root in &roots {
            scope.bind_transform(root, &self.transform);
        }
        match roots.len() {
            0 => log::warn!("MeshAsset: {asset} produced no nodes"),
            1 => {
                scope.bind_parent(roots[0]);
                self.anchor.set(Some(roots[0]));
            }
            count => log::warn!(
                "{} has multiple roots ({count}), you cannot attach children to it",
                name.get()
            ),
        }
        for &root in &roots {
            scope.announce(root);
        }
        log::debug!("MeshAsset: instantiated {asset} with {} roots", roots.len());
        self.roots.set(roots);
    }
}
