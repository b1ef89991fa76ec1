//! Scenario tests mounting whole component trees on a headless canvas

mod physics_scenes;

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use crate::config::SceneConfig;
use crate::foundation::logging;
use crate::foundation::math::{matrix_translation, Vec3};
use crate::physics::ColliderDesc;
use crate::scene::{ContextError, NullRenderer, RenderLog};
use crate::spring::SpringPreset;

use super::{Canvas, DynamicBody, Group, MountError, Mesh, SpringGroup};

pub(super) const FRAME_MS: f32 = 1000.0 / 60.0;

pub(super) fn canvas() -> (Canvas, Rc<RefCell<RenderLog>>) {
    logging::init_for_tests();
    let (renderer, log) = NullRenderer::with_log();
    (Canvas::with_config(SceneConfig::default(), Box::new(renderer)), log)
}

pub(super) fn run_frames(canvas: &mut Canvas, frames: usize) {
    for _ in 0..frames {
        canvas.frame(FRAME_MS);
    }
}

#[test]
fn test_nested_groups_compose_world_transforms() {
    let (mut canvas, render) = canvas();
    let mounted = canvas
        .mount(|scope| {
            Group::new()
                .name("outer")
                .position([1.0, 0.0, 0.0])
                .children(|scope| {
                    Group::new()
                        .name("inner")
                        .position([0.0, 2.0, 0.0])
                        .children(|scope| {
                            Mesh::cuboid(Vec3::new(0.5, 0.5, 0.5))
                                .name("box")
                                .position([0.0, 0.0, 3.0])
                                .mount(scope)?;
                            Ok(())
                        })
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    {
        let graph = canvas.graph();
        let outer = graph.find_by_name("outer").unwrap();
        let inner = graph.find_by_name("inner").unwrap();
        let mesh = graph.find_by_name("box").unwrap();
        assert_eq!(mounted.node(), Some(outer));
        assert_eq!(graph.parent(inner), Some(outer));
        assert_eq!(graph.parent(mesh), Some(inner));
        assert_relative_eq!(graph.absolute_position(mesh).unwrap(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    canvas.frame(FRAME_MS);
    {
        let render = render.borrow();
        assert_eq!(render.live(), 1);
        let world = render.transforms.values().next().unwrap();
        assert_relative_eq!(matrix_translation(world), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-6);
    }

    mounted.unmount();
    assert!(mounted.is_unmounted());
    assert!(canvas.graph().is_empty());
    assert_eq!(render.borrow().live(), 0);
}

#[test]
fn test_reparenting_through_parent_signal() {
    let (canvas, _) = canvas();
    let (a, b) = canvas
        .mount(|scope| {
            let a = Group::new().position([5.0, 5.0, 5.0]).mount(scope)?;
            let b = Group::new().position([8.0, 8.0, 8.0]).mount(scope)?;
            Ok((a.node().unwrap(), b.node().unwrap()))
        })
        .unwrap();

    let parent = canvas.runtime().signal(Some(a));
    let child = canvas
        .mount(|scope| Mesh::cuboid(Vec3::new(1.0, 1.0, 1.0)).mount(&scope.with_parent(parent.clone())))
        .unwrap();
    let child = child.node().unwrap();
    assert_relative_eq!(canvas.graph().absolute_position(child).unwrap(), Vec3::new(5.0, 5.0, 5.0));

    parent.set(Some(b));
    assert_eq!(canvas.graph().parent(child), Some(b));
    assert!(canvas.graph().children(a).is_empty());
    assert_relative_eq!(canvas.graph().absolute_position(child).unwrap(), Vec3::new(8.0, 8.0, 8.0));
}

#[test]
fn test_moving_container_moves_item() {
    let (mut canvas, _) = canvas();
    let container_position = canvas.runtime().signal(Vec3::new(3.0, 3.0, 3.0));
    canvas
        .mount(|scope| {
            Group::new()
                .name("container")
                .position(&container_position)
                .children(|scope| {
                    Mesh::cuboid(Vec3::new(0.5, 0.5, 0.5))
                        .name("item")
                        .position([2.0, 2.0, 2.0])
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();
    let item = canvas.graph().find_by_name("item").unwrap();
    assert_relative_eq!(canvas.graph().absolute_position(item).unwrap(), Vec3::new(5.0, 5.0, 5.0), epsilon = 1e-6);

    container_position.set(Vec3::new(6.0, 6.0, 6.0));
    canvas.frame(FRAME_MS);
    assert_relative_eq!(canvas.graph().absolute_position(item).unwrap(), Vec3::new(8.0, 8.0, 8.0), epsilon = 1e-6);
}

#[test]
fn test_default_names_use_node_uid() {
    let (canvas, _) = canvas();
    let name = canvas.runtime().signal(String::from("first"));
    let (unnamed, named) = canvas
        .mount(|scope| {
            let unnamed = Group::new().mount(scope)?;
            let named = Group::new().name(&name).mount(scope)?;
            Ok((unnamed.node().unwrap(), named.node().unwrap()))
        })
        .unwrap();

    let uid = canvas.graph().uid(unnamed).unwrap();
    assert_eq!(canvas.graph().name(unnamed), Some(format!("Group_{uid}").as_str()));
    assert_eq!(canvas.graph().name(named), Some("first"));
    name.set(String::from("second"));
    assert_eq!(canvas.graph().name(named), Some("second"));
}

#[test]
fn test_spring_group_settles_on_target() {
    let (mut canvas, _) = canvas();
    let target = canvas.runtime().signal(Vec3::zeros());
    let mounted = canvas
        .mount(|scope| {
            SpringGroup::new()
                .name("follow")
                .params(SpringPreset::Wobbly)
                .position(&target)
                .children(|scope| {
                    Mesh::cuboid(Vec3::new(0.5, 0.5, 0.5)).name("payload").mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();
    let (anchor, payload) = {
        let graph = canvas.graph();
        (graph.find_by_name("follow_anchor").unwrap(), graph.find_by_name("payload").unwrap())
    };
    assert_eq!(canvas.graph().parent(payload), Some(anchor));
    assert_eq!(canvas.clock().len(), 1);

    target.set(Vec3::new(10.0, 0.0, -4.0));
    run_frames(&mut canvas, 10);
    let midway = canvas.graph().absolute_position(anchor).unwrap();
    assert!(midway.x > 0.0 && midway.x != 10.0);
    assert_eq!(canvas.clock().len(), 2);

    run_frames(&mut canvas, 300);
    assert_relative_eq!(canvas.graph().absolute_position(anchor).unwrap(), Vec3::new(10.0, 0.0, -4.0), epsilon = 1e-6);
    assert_relative_eq!(canvas.graph().absolute_position(payload).unwrap(), Vec3::new(10.0, 0.0, -4.0), epsilon = 1e-6);
    assert_eq!(canvas.clock().len(), 1);

    mounted.unmount();
    assert!(canvas.clock().is_empty());
    assert!(canvas.graph().is_empty());
}

#[test]
fn test_spring_group_clamps_long_frames() {
    let (mut canvas, _) = canvas();
    let target = canvas.runtime().signal(Vec3::zeros());
    canvas
        .mount(|scope| SpringGroup::new().name("lagging").position(&target).mount(scope))
        .unwrap();
    let anchor = canvas.graph().find_by_name("lagging_anchor").unwrap();

    target.set(Vec3::new(1.0, 0.0, 0.0));
    run_frames(&mut canvas, 2);
    canvas.frame(1000.0);

    let x = canvas.graph().absolute_position(anchor).unwrap().x;
    assert!(x > 0.0 && x <= 2.0, "anchor x after a 1 s frame: {x}");
}

#[test]
fn test_missing_provider_is_reported_and_nothing_leaks() {
    let (canvas, render) = canvas();
    let err = canvas
        .mount(|scope| DynamicBody::new(ColliderDesc::ball(0.5)).mount(scope))
        .err();
    assert_eq!(err, Some(MountError::Context(ContextError::MissingProvider("Physics"))));

    let err = canvas
        .mount(|scope| {
            Group::new()
                .children(|scope| {
                    Mesh::cuboid(Vec3::new(1.0, 1.0, 1.0)).mount(scope)?;
                    DynamicBody::new(ColliderDesc::ball(0.5)).mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .err();
    assert_eq!(err, Some(MountError::Context(ContextError::MissingProvider("Physics"))));
    assert!(canvas.graph().is_empty());
    assert_eq!(render.borrow().live(), 0);
    assert_eq!(canvas.runtime().effect_count(), 0);
}
