use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;

use crate::components::{CharacterController, DynamicBody, Group, Mesh, MountError, Mounted, Physics, StaticBody};
use crate::foundation::math::{utils::deg_to_rad, Vec3};
use crate::physics::{BodyDesc, ColliderDesc, ColliderHandle};
use crate::scene::Scope;

use super::{canvas, run_frames};

fn ground(scope: &Scope) -> Result<(), MountError> {
    StaticBody::new()
        .children(|scope| {
            Mesh::cuboid(Vec3::new(5.0, 0.5, 5.0)).name("ground").mount(scope)?;
            Ok(())
        })
        .mount(scope)?;
    Ok(())
}

fn recorder() -> (Rc<RefCell<Vec<ColliderHandle>>>, impl Fn(ColliderHandle) + 'static) {
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&hits);
    (hits, move |other| sink.borrow_mut().push(other))
}

#[test]
fn test_dynamic_body_comes_to_rest_on_static_trimesh() {
    let (mut canvas, _) = canvas();
    let (ball_hits, on_ball) = recorder();
    let (ground_hits, on_ground) = recorder();

    let (_, bridge) = canvas
        .mount(|scope| {
            Physics::new()
                .children(move |scope| {
                    StaticBody::new()
                        .on_start_collide(on_ground)
                        .children(|scope| {
                            Mesh::cuboid(Vec3::new(5.0, 0.5, 5.0)).name("ground").mount(scope)?;
                            Ok(())
                        })
                        .mount(scope)?;
                    DynamicBody::new(ColliderDesc::ball(0.5))
                        .name("ball")
                        .position([0.0, 3.0, 0.0])
                        .on_start_collide(on_ball)
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();
    assert_eq!(bridge.world().body_count(), 2);
    assert_eq!(bridge.world().collider_count(), 2);

    let ball = canvas.graph().find_by_name("ball").unwrap();
    let mut heights = Vec::with_capacity(180);
    let mut contact_frame = None;
    for frame in 0..180 {
        canvas.frame(super::FRAME_MS);
        heights.push(canvas.graph().absolute_position(ball).unwrap().y);
        if contact_frame.is_none() && !ball_hits.borrow().is_empty() {
            contact_frame = Some(frame);
        }
    }

    let contact = contact_frame.expect("ball never touched the ground");
    assert!(heights[0] < 3.0);
    for (frame, pair) in heights[..contact].windows(2).enumerate() {
        assert!(pair[1] < pair[0], "ball rose from {} to {} before contact (frame {frame})", pair[0], pair[1]);
    }
    let settled = &heights[150..];
    let (low, high) = settled
        .iter()
        .fold((f32::MAX, f32::MIN), |(low, high), y| (low.min(*y), high.max(*y)));
    assert!(high - low < 1e-3, "ball still moving between {low} and {high}");
    let y = heights[179];
    assert!(y > 0.9 && y < 1.1, "ball rests at {y}");

    let (ball_hits, ground_hits) = (ball_hits.borrow(), ground_hits.borrow());
    assert!(!ball_hits.is_empty());
    assert_eq!(ball_hits.len(), ground_hits.len());
    assert_ne!(ball_hits[0], ground_hits[0]);
    assert!(bridge.world().collider(ball_hits[0]).is_some());
    assert!(bridge.world().collider(ground_hits[0]).is_some());
}

#[test]
fn test_body_unmounted_from_its_own_collision_callback() {
    let (mut canvas, _) = canvas();
    let slot: Rc<RefCell<Option<Mounted>>> = Rc::new(RefCell::new(None));
    let (ground_hits, on_ground) = recorder();

    let (_, bridge) = {
        let slot = Rc::clone(&slot);
        canvas
            .mount(|scope| {
                Physics::new()
                    .children(move |scope| {
                        StaticBody::new()
                            .on_start_collide(on_ground)
                            .children(|scope| {
                                Mesh::cuboid(Vec3::new(5.0, 0.5, 5.0)).mount(scope)?;
                                Ok(())
                            })
                            .mount(scope)?;
                        let unmount = Rc::clone(&slot);
                        let ball = DynamicBody::new(ColliderDesc::ball(0.5))
                            .name("ball")
                            .position([0.0, 2.0, 0.0])
                            .on_start_collide(move |_| {
                                let mounted = unmount.borrow_mut().take();
                                if let Some(mounted) = mounted {
                                    mounted.unmount();
                                }
                            })
                            .mount(scope)?;
                        *slot.borrow_mut() = Some(ball);
                        Ok(())
                    })
                    .mount(scope)
            })
            .unwrap()
    };

    run_frames(&mut canvas, 120);

    assert!(slot.borrow().is_none());
    assert!(canvas.graph().find_by_name("ball").is_none());
    assert_eq!(bridge.world().body_count(), 1);
    assert_eq!(bridge.world().collider_count(), 1);
    assert_eq!(bridge.registration_counts(), (0, 0, 1));
    assert!(!ground_hits.borrow().is_empty());
}

#[test]
fn test_static_trimesh_follows_rotated_ancestors() {
    let (mut canvas, _) = canvas();
    let yaw = canvas.runtime().signal(Vec3::new(0.0, deg_to_rad(90.0), 0.0));

    let (_, bridge) = canvas
        .mount(|scope| {
            let yaw = yaw.clone();
            Physics::new()
                .children(move |scope| {
                    Group::new()
                        .position([1.0, 0.0, 0.0])
                        .rotation(&yaw)
                        .children(|scope| {
                            Group::new()
                                .position([0.0, 2.0, 0.0])
                                .rotation([deg_to_rad(45.0), 0.0, 0.0])
                                .children(|scope| {
                                    StaticBody::new()
                                        .children(|scope| {
                                            Mesh::cuboid(Vec3::new(1.0, 0.2, 1.0))
                                                .name("plate")
                                                .position([0.0, 0.0, 3.0])
                                                .mount(scope)?;
                                            Ok(())
                                        })
                                        .mount(scope)?;
                                    Ok(())
                                })
                                .mount(scope)?;
                            Ok(())
                        })
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    let collider = bridge.world().collider_handles()[0];
    let plate = canvas.graph().find_by_name("plate").unwrap();
    let assert_collider_matches_plate = |canvas: &crate::components::Canvas| {
        let pose = *bridge.world().collider(collider).unwrap().position();
        let graph = canvas.graph();
        assert_relative_eq!(pose.translation.vector, graph.absolute_position(plate).unwrap(), epsilon = 1e-4);
        assert!(pose.rotation.angle_to(&graph.world_rotation(plate).unwrap()) < 1e-3);
    };

    canvas.frame(super::FRAME_MS);
    assert_collider_matches_plate(&canvas);
    let before = bridge.world().collider(collider).unwrap().position().translation.vector;

    yaw.set(Vec3::new(0.0, deg_to_rad(-30.0), 0.0));
    canvas.frame(super::FRAME_MS);
    assert_collider_matches_plate(&canvas);
    let after = bridge.world().collider(collider).unwrap().position().translation.vector;
    assert!((after - before).norm() > 0.5);
}

#[test]
fn test_character_controller_is_blocked_by_wall() {
    let (mut canvas, _) = canvas();
    let (applied, on_frame) = {
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        (applied, move |movement: Vec3| sink.borrow_mut().push(movement))
    };

    canvas
        .mount(|scope| {
            Physics::new()
                .children(move |scope| {
                    StaticBody::new()
                        .children(|scope| {
                            Mesh::cuboid(Vec3::new(0.5, 2.0, 2.0))
                                .name("wall")
                                .position([2.5, 0.0, 0.0])
                                .mount(scope)?;
                            Ok(())
                        })
                        .mount(scope)?;
                    CharacterController::new(ColliderDesc::ball(0.5))
                        .name("hero")
                        .movement([0.05, 0.0, 0.0])
                        .on_frame(on_frame)
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    run_frames(&mut canvas, 120);

    let hero = canvas.graph().find_by_name("hero").unwrap();
    let x = canvas.graph().absolute_position(hero).unwrap().x;
    assert!(x > 1.0 && x < 1.55, "character stopped at {x}");

    let applied = applied.borrow();
    assert_eq!(applied.len(), 120);
    assert_relative_eq!(applied[0].x, 0.05, epsilon = 1e-4);
    assert!(applied[119].x.abs() < 1e-3);
}

#[test]
fn test_character_node_lags_body_by_one_frame() {
    let (mut canvas, _) = canvas();
    let (applied, on_frame) = {
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        (applied, move |movement: Vec3| sink.borrow_mut().push(movement))
    };

    canvas
        .mount(|scope| {
            Physics::new()
                .children(move |scope| {
                    CharacterController::new(ColliderDesc::ball(0.5))
                        .name("hero")
                        .movement([0.1, 0.0, 0.0])
                        .on_frame(on_frame)
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    let hero = canvas.graph().find_by_name("hero").unwrap();
    for frame in 1..=10 {
        canvas.frame(super::FRAME_MS);
        let applied = applied.borrow();
        assert_eq!(applied.len(), frame);
        let before_this_frame: f32 = applied[..frame - 1].iter().map(|m| m.x).sum();
        let x = canvas.graph().absolute_position(hero).unwrap().x;
        assert_relative_eq!(x, before_this_frame, epsilon = 1e-4);
    }
    assert!(applied.borrow()[9].x > 0.05);
}

#[test]
fn test_descriptor_swap_keeps_pose() {
    let (mut canvas, _) = canvas();
    let desc = canvas.runtime().signal(BodyDesc::dynamic());

    let (_, bridge) = canvas
        .mount(|scope| {
            let desc = desc.clone();
            Physics::new()
                .children(move |scope| {
                    DynamicBody::new(ColliderDesc::ball(0.5))
                        .name("ball")
                        .position([0.0, 10.0, 0.0])
                        .body_desc(&desc)
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    run_frames(&mut canvas, 20);
    let ball = canvas.graph().find_by_name("ball").unwrap();
    let before = canvas.graph().absolute_position(ball).unwrap();
    assert!(before.y < 10.0);

    desc.set(BodyDesc::dynamic().with_linear_damping(0.5));
    assert_eq!(bridge.world().body_count(), 1);
    assert_eq!(bridge.world().collider_count(), 1);

    canvas.frame(super::FRAME_MS);
    let after = canvas.graph().absolute_position(ball).unwrap();
    assert!(after.y <= before.y + 1e-4 && after.y > before.y - 0.5, "jumped from {before} to {after}");
    assert_relative_eq!(after.x, before.x, epsilon = 1e-4);
}

#[test]
fn test_unmount_releases_every_registration() {
    let (mut canvas, render) = canvas();
    let (physics, bridge) = canvas
        .mount(|scope| {
            Physics::new()
                .gravity([0.0, -5.0, 0.0])
                .children(|scope| {
                    ground(scope)?;
                    DynamicBody::new(ColliderDesc::ball(0.5))
                        .position([0.0, 3.0, 0.0])
                        .children(|scope| {
                            Mesh::cuboid(Vec3::new(0.2, 0.2, 0.2)).mount(scope)?;
                            Ok(())
                        })
                        .mount(scope)?;
                    CharacterController::new(ColliderDesc::capsule_y(0.5, 0.3))
                        .position([3.0, 2.0, 0.0])
                        .movement([0.0, -0.05, 0.0])
                        .mount(scope)?;
                    Ok(())
                })
                .mount(scope)
        })
        .unwrap();

    run_frames(&mut canvas, 10);
    assert_relative_eq!(bridge.world().gravity(), Vec3::new(0.0, -5.0, 0.0));
    assert_eq!(bridge.world().body_count(), 3);
    assert_eq!(bridge.registration_counts(), (1, 1, 1));
    assert_eq!(render.borrow().live(), 2);

    physics.unmount();
    assert_eq!(bridge.world().body_count(), 0);
    assert_eq!(bridge.world().collider_count(), 0);
    assert_eq!(bridge.registration_counts(), (0, 0, 0));
    assert!(canvas.graph().is_empty());
    assert!(canvas.clock().is_empty());
    assert_eq!(canvas.runtime().effect_count(), 0);
    assert_eq!(render.borrow().live(), 0);

    run_frames(&mut canvas, 2);
}
