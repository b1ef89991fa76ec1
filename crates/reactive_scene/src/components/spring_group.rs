//! Spring-smoothed group

use std::rc::Rc;

use crate::foundation::math::Vec3;
use crate::reactive::{FramePhase, Prop};
use crate::scene::{NodeKind, Scope, TransformProps};
use crate::spring::{SpringParams, SpringSignals};

use super::{create_named_node, dispose_node_on_cleanup, mount_children, mount_scoped, Children, MountError, Mounted};

/// Group whose children lag behind it on a spring.
///
/// The group node is placed like any other node. Its children hang from a
/// separate root anchor that springs towards the group's absolute position
/// every frame.
#[derive(Default)]
pub struct SpringGroup {
    name: Option<Prop<String>>,
    params: Option<SpringParams>,
    transform: TransformProps,
    children: Option<Children>,
}

impl SpringGroup {
    /// Spring group using the scene's default spring parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Node name, `SpringGroup_{uid}` by default; the anchor gets an `_anchor` suffix
    pub fn name(mut self, name: impl Into<Prop<String>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Spring coefficients, read once at mount
    pub fn params(mut self, params: impl Into<SpringParams>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// Local position of the group node
    pub fn position(mut self, position: impl Into<Prop<Vec3>>) -> Self {
        self.transform.position = position.into();
        self
    }

    /// Components hanging from the anchor
    pub fn children(mut self, children: impl FnOnce(&Scope) -> Result<(), MountError> + 'static) -> Self {
        self.children = Some(Box::new(children));
        self
    }

    /// Mount under `scope`
    pub fn mount(self, scope: &Scope) -> Result<Mounted, MountError> {
        mount_scoped(scope, move |scope| {
            let node = create_named_node(scope, self.name.as_ref(), "SpringGroup", NodeKind::Transform);
            scope.bind_parent(node);
            scope.bind_transform(node, &self.transform);

            let graph = Rc::clone(scope.graph());
            let (anchor, initial) = {
                let mut graph = graph.borrow_mut();
                let name = format!("{}_anchor", graph.name(node).unwrap_or_default());
                let anchor = graph.create_node(name, NodeKind::Transform);
                let initial = graph.absolute_position(node)?;
                graph.set_position(anchor, initial)?;
                (anchor, initial)
            };
            if let Some(name) = &self.name {
                let (graph, name) = (Rc::clone(&graph), name.clone());
                scope.effect(&name.sources(), move || {
                    if let Err(err) = graph.borrow_mut().set_name(anchor, format!("{}_anchor", name.get())) {
                        log::warn!("SpringGroup: {err}");
                    }
                });
            }
            scope.announce(node);
            scope.announce(anchor);
            dispose_node_on_cleanup(scope, anchor, "SpringGroup");
            dispose_node_on_cleanup(scope, node, "SpringGroup");

            let params = self.params.unwrap_or(scope.config().spring);
            let spring = Rc::new(SpringSignals::new(scope.owner(), scope.clock(), initial.into(), params));
            spring.set_max_step(scope.config().animation.max_step_secs);

            {
                let (graph, values) = (Rc::clone(&graph), spring.values().clone());
                scope.effect(&[values.source()], move || {
                    let position = Vec3::from(values.get());
                    if let Err(err) = graph.borrow_mut().set_absolute_position(anchor, position) {
                        log::warn!("SpringGroup: {err}");
                    }
                });
            }

            let follower = Rc::clone(&spring);
            scope.frame_effect(FramePhase::Animation, move |_| {
                let target = graph.borrow().absolute_position(node);
                match target {
                    Ok(target) => follower.set_target(target.into()),
                    Err(err) => log::warn!("SpringGroup: {err}"),
                }
            });

            mount_children(self.children, &scope.with_node_parent(anchor))?;
            Ok(Mounted::new(scope.owner().clone(), Some(node)))
        })
    }
}
