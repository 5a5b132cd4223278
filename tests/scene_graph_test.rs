use std::rc::Rc;

use layer_ngin::{
    Category, Scene, SceneConfig, SceneError,
    camera::LookFromCamera,
    data_structures::{light::LightPool, texture::ProgramId},
};

use crate::common::test_utils::{
    LoggingProgram, RED, centred_context, facing_quad, frame_log, recorder,
};

mod common;

#[test]
fn should_render_every_pass_in_order() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, sky) = recorder("skybox", &log, None);
    let (_, opaque) = recorder("opaque", &log, None);
    let (_, shaded) = recorder("shaded", &log, None);
    let (_, blended) = recorder("blended", &log, None);
    let (_, always) = recorder("always", &log, None);
    let (_, overlay) = recorder("overlay", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_2d(&overlay);
    scene.add_3d_always(&always);
    scene.add_3d_blend(&blended);
    scene.add_3d_shader(&shaded);
    scene.add_3d(&opaque);
    scene.add_skybox(Some(sky));
    scene.set_shader(Rc::new(LoggingProgram {
        id: ProgramId(3),
        log: log.clone(),
    }));

    let camera = LookFromCamera::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    scene.render(&mut ctx, Some(&camera));

    assert_eq!(
        *log.borrow(),
        vec!["skybox", "opaque", "program 3", "shaded", "blended", "always", "overlay"]
    );
    assert_eq!(ctx.target.program(), None);
    assert_eq!(ctx.target.stack_depth(), 0);
    assert_eq!(scene.last_stats().draws, 6);
}

#[test]
fn should_keep_insertion_order_within_a_pass() {
    let mut ctx = centred_context();
    let log = frame_log();
    let nodes: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| recorder(name, &log, None).1)
        .collect();
    let (_, d) = recorder("d", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_2d(&nodes);
    scene.add_2d(d);
    scene.render(&mut ctx, None);

    assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
}

#[test]
fn should_not_render_removed_objects() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, kept) = recorder("kept", &log, None);
    let (_, removed) = recorder("removed", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_3d_blend([kept.clone(), removed.clone()]);
    scene.remove_3d_blend(&removed).unwrap();
    scene.render(&mut ctx, None);

    assert_eq!(*log.borrow(), vec!["kept"]);
    assert!(!scene.graph().contains(Category::Blended, &removed));
    assert_eq!(scene.graph().len(), 1);
}

#[test]
fn should_fail_to_remove_absent_object() {
    let log = frame_log();
    let (_, opaque) = recorder("opaque", &log, None);
    let (_, stranger) = recorder("stranger", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_3d(&opaque);

    assert_eq!(
        scene.remove_3d(&stranger),
        Err(SceneError::NotFound {
            category: Category::Opaque
        })
    );
    // filed under another category
    assert_eq!(
        scene.remove_3d_always(&opaque),
        Err(SceneError::NotFound {
            category: Category::AlwaysOnTop
        })
    );
    assert!(scene.graph().contains(Category::Opaque, &opaque));
}

#[test]
fn should_remove_nothing_when_part_of_a_batch_is_absent() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, a) = recorder("a", &log, None);
    let (_, b) = recorder("b", &log, None);
    let (_, stranger) = recorder("stranger", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_2d([a.clone(), b.clone()]);
    assert!(scene.remove_2d([a.clone(), stranger]).is_err());
    scene.render(&mut ctx, None);
    assert_eq!(*log.borrow(), vec!["a", "b"]);

    scene.remove_2d(vec![a, b]).unwrap();
    assert!(scene.graph().is_empty());
}

#[test]
fn should_remove_one_occurrence_per_listed_node() {
    let (_, a) = recorder("a", &frame_log(), None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_3d(&a);
    assert_eq!(
        scene.remove_3d([a.clone(), a.clone()]),
        Err(SceneError::NotFound {
            category: Category::Opaque
        })
    );
    assert!(scene.graph().contains(Category::Opaque, &a));

    scene.add_3d(&a);
    scene.remove_3d([a.clone(), a.clone()]).unwrap();
    assert!(scene.graph().is_empty());
}

#[test]
fn should_register_the_skybox_once() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, sky) = recorder("skybox", &log, None);
    let camera = LookFromCamera::new([0.0, 0.0, 0.0], [0.0, 30.0, 0.0]);

    let mut scene = Scene::new(LightPool::new());
    scene.add_skybox(None);
    assert!(scene.graph().skybox().is_none());

    scene.add_skybox(Some(sky.clone()));
    scene.add_skybox(Some(sky.clone()));
    scene.render(&mut ctx, Some(&camera));
    assert_eq!(*log.borrow(), vec!["skybox"]);

    scene.add_skybox(None);
    scene.render(&mut ctx, Some(&camera));
    assert_eq!(*log.borrow(), vec!["skybox"]);
}

#[test]
fn should_skip_skybox_without_camera_but_not_without_3d() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, sky) = recorder("skybox", &log, None);
    let (_, opaque) = recorder("opaque", &log, None);

    let mut scene = Scene::with_config(
        LightPool::new(),
        SceneConfig {
            render_3d: false,
            ..Default::default()
        },
    );
    scene.add_skybox(Some(sky));
    scene.add_3d(&opaque);

    scene.render(&mut ctx, None);
    assert!(log.borrow().is_empty());

    let camera = LookFromCamera::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    scene.render(&mut ctx, Some(&camera));
    assert_eq!(*log.borrow(), vec!["skybox"]);
}

#[test]
fn should_skip_overlays_when_2d_is_off() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, overlay) = recorder("overlay", &log, None);
    let (_, opaque) = recorder("opaque", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_2d(&overlay);
    scene.add_3d(&opaque);
    scene.config.render_2d = false;
    scene.render(&mut ctx, None);

    assert_eq!(*log.borrow(), vec!["opaque"]);
}

#[test]
fn should_render_static_graph_identically_twice() {
    let log = frame_log();
    let (_, wall) = recorder("wall", &log, Some(facing_quad(-5.0, RED)));
    let (_, glass) = recorder("glass", &log, Some(facing_quad(-4.0, [0.0, 1.0, 0.0, 0.3])));
    let mut scene = Scene::with_config(
        LightPool::new(),
        SceneConfig {
            pick: true,
            ..Default::default()
        },
    );
    scene.add_3d(&wall);
    scene.add_3d_blend(&glass);

    let mut first = centred_context();
    let first_pick = scene.render(&mut first, None);
    let first_log = log.replace(Vec::new());

    let mut second = centred_context();
    let second_pick = scene.render(&mut second, None);

    assert_eq!(first_log, *log.borrow());
    assert_eq!(first_pick, second_pick);
    assert_eq!(first.target.color_buffer(), second.target.color_buffer());
}

#[test]
fn should_skip_object_that_is_borrowed_during_render() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (busy, busy_node) = recorder("busy", &log, None);
    let (_, free) = recorder("free", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_3d([busy_node, free]);

    let guard = busy.borrow_mut();
    scene.render(&mut ctx, None);
    drop(guard);

    assert_eq!(*log.borrow(), vec!["free"]);
    assert_eq!(scene.last_stats().draws, 1);
}

#[test]
fn should_hand_out_a_scene_tag_on_add() {
    let log = frame_log();
    let (element, node) = recorder("element", &log, None);
    let (sky, sky_node) = recorder("skybox", &log, None);

    let mut scene = Scene::new(LightPool::new());
    let other = Scene::new(LightPool::new());
    scene.add_2d(&node);
    scene.add_skybox(Some(sky_node));

    let tag = element.borrow().tag.clone().unwrap();
    assert_eq!(tag.scene(), scene.id());
    assert_ne!(tag.scene(), other.id());
    assert_eq!(sky.borrow().tag.as_ref().map(|t| t.scene()), Some(scene.id()));
}
