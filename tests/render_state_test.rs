use std::mem::size_of;

use layer_ngin::{
    RenderTarget, Scene, SceneConfig,
    camera::{CameraUniform, LookAtCamera, LookFromCamera},
    context::{Projection, Quad},
    data_structures::{light::LightPool, texture::Texture},
    pipelines::{
        PassKind, PassState,
        light::{LightBlock, LightUniform},
    },
};

use crate::common::test_utils::{
    BLUE, RED, centred_context, facing_quad, frame_log, recorder, rgba,
};

mod common;

#[test]
fn should_draw_each_category_with_its_pass_state() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (sky, sky_node) = recorder("skybox", &log, None);
    let (opaque, opaque_node) = recorder("opaque", &log, None);
    let (shaded, shaded_node) = recorder("shaded", &log, None);
    let (blended, blended_node) = recorder("blended", &log, None);
    let (always, always_node) = recorder("always", &log, None);
    let (overlay, overlay_node) = recorder("overlay", &log, None);

    let mut scene = Scene::new(LightPool::new());
    scene.add_skybox(Some(sky_node));
    scene.add_3d(&opaque_node);
    scene.add_3d_shader(&shaded_node);
    scene.add_3d_blend(&blended_node);
    scene.add_3d_always(&always_node);
    scene.add_2d(&overlay_node);

    let camera = LookFromCamera::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    ctx.display.set_lighting(false);
    scene.render(&mut ctx, Some(&camera));

    let expected = [
        (sky, PassKind::Skybox),
        (opaque, PassKind::Opaque),
        (shaded, PassKind::Shader),
        (blended, PassKind::Blend),
        (always, PassKind::AlwaysOnTop),
        (overlay, PassKind::Overlay),
    ];
    for (element, kind) in expected {
        assert_eq!(element.borrow().states, vec![kind.state(false)], "{} pass", kind);
    }
}

#[test]
fn should_never_write_depth_for_the_skybox() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, sky) = recorder("skybox", &log, Some(Quad::rect(-10.0, -10.0, 20.0, 20.0, -2.0, BLUE)));
    let (_, far) = recorder("far", &log, Some(facing_quad(-50.0, RED)));

    let mut scene = Scene::new(LightPool::new());
    scene.add_skybox(Some(sky));
    scene.add_3d(&far);
    let camera = LookFromCamera::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
    scene.render(&mut ctx, Some(&camera));

    let fb = &ctx.target;
    assert_eq!(fb.pixel(5, 5), Some(rgba(BLUE)));
    assert_eq!(fb.depth_at(5, 5), Some(1.0));
    // the far object is not occluded by the nearer skybox geometry
    assert_eq!(fb.pixel(320, 240), Some(rgba(RED)));
    assert!(fb.depth_at(320, 240).unwrap() < 1.0);
}

#[test]
fn should_discard_translucent_fragments_only_in_opaque_passes() {
    let mut ctx = centred_context();
    let log = frame_log();
    let (_, faint) = recorder("faint", &log, Some(facing_quad(-5.0, [1.0, 0.0, 0.0, 0.3])));
    let mut scene = Scene::with_config(
        LightPool::new(),
        SceneConfig {
            pick: true,
            ..Default::default()
        },
    );
    scene.add_3d(&faint);

    assert_eq!(scene.render(&mut ctx, None), None);
    assert_eq!(ctx.target.pixel(320, 240), Some(image::Rgba([0, 0, 0, 0])));

    scene.remove_3d(&faint).unwrap();
    scene.add_3d_blend(&faint);
    assert_eq!(scene.render(&mut ctx, None), Some(faint));
    assert_ne!(ctx.target.pixel(320, 240), Some(image::Rgba([0, 0, 0, 0])));
}

#[test]
fn should_look_at_the_origin_with_both_cameras() {
    let from = LookFromCamera::new([0.0, 0.0, 5.0], [0.0, 0.0, 0.0]);
    let at = LookAtCamera::new([0.0, 0.0, 0.0], 5.0);
    let cameras: [&dyn layer_ngin::camera::Camera; 2] = [&from, &at];
    for camera in cameras {
        let mut ctx = centred_context();
        let log = frame_log();
        let (_, target) = recorder("target", &log, Some(facing_quad(0.0, RED)));
        let mut scene = Scene::new(LightPool::new());
        scene.add_3d(&target);
        scene.render(&mut ctx, Some(camera));
        assert_eq!(ctx.target.pixel(320, 240), Some(rgba(RED)));
        assert_eq!(ctx.target.stack_depth(), 0);
    }
}

#[test]
fn should_map_pass_states_to_wgpu_pipelines() {
    let format = Texture::DEPTH_FORMAT;
    let opaque = PassKind::Opaque.state(true).depth_stencil(format);
    assert_eq!(opaque.depth_write_enabled, Some(true));
    assert_eq!(opaque.depth_compare, Some(wgpu::CompareFunction::LessEqual));

    for kind in [PassKind::Blend, PassKind::Skybox] {
        let state = kind.state(true).depth_stencil(format);
        assert_eq!(state.depth_write_enabled, Some(false), "{} pass", kind);
        assert_eq!(state.depth_compare, Some(wgpu::CompareFunction::LessEqual));
    }
    for kind in [PassKind::AlwaysOnTop, PassKind::Overlay] {
        let state = kind.state(true).depth_stencil(format);
        assert_eq!(state.depth_write_enabled, Some(false), "{} pass", kind);
        assert_eq!(state.depth_compare, Some(wgpu::CompareFunction::Always));
    }

    let target = PassState::default().color_target(Texture::COLOR_FORMAT);
    let blend = target.blend.unwrap();
    assert_eq!(blend.color, blend.alpha);
    assert_eq!(blend.alpha.src_factor, wgpu::BlendFactor::SrcAlpha);
    assert_eq!(blend.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    assert_eq!(PassKind::Opaque.state(true).alpha_cutoff(), Some(0.5));
    assert_eq!(PassKind::Blend.state(true).alpha_cutoff(), None);
    assert!(!PassKind::AlwaysOnTop.state(true).writes_depth());
}

#[test]
fn should_lay_out_uniforms_for_gpu_upload() {
    assert_eq!(size_of::<LightUniform>(), 80);
    assert_eq!(size_of::<LightBlock>(), 656);
    assert_eq!(size_of::<CameraUniform>(), 64);

    let camera = LookFromCamera::new([0.0, 0.0, 5.0], [0.0, 0.0, 0.0]);
    let mut uniform = CameraUniform::new();
    uniform.update_view_proj(
        &camera,
        &Projection::Orthographic {
            width: 2.0,
            height: 2.0,
        },
    );
    assert_eq!(bytemuck::bytes_of(&uniform).len(), 64);
    assert_ne!(uniform.view_proj, CameraUniform::default().view_proj);
}

#[test]
fn should_drop_nodes_that_are_no_longer_shared() {
    let log = frame_log();
    let (element, node) = recorder("element", &log, None);
    let mut scene = Scene::new(LightPool::new());
    scene.add_3d(node.clone());
    assert_eq!(std::rc::Rc::strong_count(&element), 3);
    scene.remove_3d(&node).unwrap();
    drop(node);
    assert_eq!(std::rc::Rc::strong_count(&element), 1);
}

#[test]
fn should_activate_the_shader_program_only_for_the_shader_pass() {
    use layer_ngin::data_structures::texture::{Program, ProgramId};

    let mut ctx = centred_context();
    let log = frame_log();
    let (_, shaded) = recorder("shaded", &log, None);
    let mut scene = Scene::new(LightPool::new());
    scene.add_3d_shader(&shaded);
    scene.set_shader(std::rc::Rc::new(Program(ProgramId(2))));

    ctx.target.use_program(Some(ProgramId(9)));
    scene.render(&mut ctx, None);
    assert_eq!(ctx.target.program(), None);

    scene.remove_shader();
    assert!(scene.graph().shader_program().is_none());
    ctx.target.use_program(Some(ProgramId(9)));
    scene.render(&mut ctx, None);
    // without a program the scene leaves the active one alone
    assert_eq!(ctx.target.program(), Some(ProgramId(9)));
    assert_eq!(*log.borrow(), vec!["shaded", "shaded"]);
}

#[test]
fn should_bind_textures_on_the_target() {
    use layer_ngin::data_structures::texture::TextureId;

    let mut ctx = centred_context();
    let texture = Texture::new(TextureId(4), [16, 16]);
    texture.bind(&mut ctx.target);
    assert_eq!(ctx.target.texture(), Some(TextureId(4)));
    ctx.target.bind_texture(None);
    assert_eq!(ctx.target.texture(), None);
}

#[test]
fn should_resize_framebuffer_with_the_display() {
    let mut ctx = centred_context();
    ctx.resize(200, 100);
    assert_eq!(ctx.target.size(), layer_ngin::PhysicalSize::new(200, 100));
    assert_eq!(ctx.display.size(), layer_ngin::PhysicalSize::new(200, 100));
    ctx.resize(0, 100);
    assert_eq!(ctx.target.size(), layer_ngin::PhysicalSize::new(200, 100));
}
