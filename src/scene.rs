//! Scenes and the per-frame pass orchestration.
//!
//! A [`Scene`] owns a [`Tree`] of renderables and draws it with
//! [`Scene::render`]. Every frame runs the same fixed sequence:
//!
//! 1. Enter 3D: perspective projection, depth testing on
//! 2. Skybox, drawn without depth writes or lighting using the camera rotation only
//! 3. Opaque pass: push the camera, bind lights to slots, alpha test, depth pick
//! 4. Shader pass: like opaque while the scene's shader program is active
//! 5. Blend pass: no depth writes, colour pick
//! 6. Always-on-top pass: no depth test, colour pick
//! 7. Release the light slots and pop the camera
//! 8. Enter 2D: orthographic projection scaled from the logical 2D space to the
//!    framebuffer, lighting off, overlay elements in insertion order and without
//!    the camera
//!
//! The frame returns the picked node when picking is enabled.
//!
//! Mutating the tree requires `&mut Scene` and thus can't happen while a frame is
//! in flight. Renderables are shared handles though: a node that is still
//! borrowed by the application when its pass comes up is skipped and logged.

use std::{cell::Cell, rc::Rc};

use cgmath::Matrix4;
use instant::{Duration, Instant};

use crate::{
    camera::Camera,
    context::{Context, RenderTarget},
    data_structures::{
        light::{LightPool, LightSlot, SharedLight},
        scene_graph::Tree,
        texture::ShaderProgram,
    },
    error::SceneError,
    pick::Picker,
    pipelines::{PassKind, PassState},
    render::{Category, IntoNodes, Node, SceneId, SceneTag, ScreenTransform},
};

/// Switches of a scene, changed freely between frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneConfig {
    /// Draw the 3D passes from opaque to always-on-top. The skybox does not
    /// depend on it.
    pub render_3d: bool,
    /// Draw the overlay pass.
    pub render_2d: bool,
    /// Sample the framebuffer at the cursor and return the picked node.
    pub pick: bool,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            render_3d: true,
            render_2d: true,
            pick: false,
        }
    }
}

/// What the last frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Render calls of visible nodes, the skybox included.
    pub draws: usize,
    /// Framebuffer readbacks issued for picking.
    pub samples: usize,
    /// Lights bound to a slot.
    pub lights: usize,
    pub elapsed: Duration,
}

pub struct Scene {
    pub config: SceneConfig,
    graph: Tree,
    pool: LightPool,
    id: SceneId,
    screen: Rc<Cell<ScreenTransform>>,
    stats: RenderStats,
}

/// Draw state of one frame.
struct Frame<'a> {
    target: &'a mut dyn RenderTarget,
    camera: Option<&'a dyn Camera>,
    picker: Option<Picker>,
    draws: usize,
}

impl Frame<'_> {
    fn draw(&mut self, node: &Node) -> bool {
        match node.try_render(self.target, self.camera) {
            Ok(drawn) => {
                self.draws += usize::from(drawn);
                drawn
            }
            Err(e) => {
                log::error!("{}, skipping {:?}", e, node);
                false
            }
        }
    }

    fn depth_tested(&mut self, kind: PassKind, nodes: &[Node]) {
        log::trace!("{} pass with {} nodes", kind, nodes.len());
        for node in nodes {
            if self.draw(node) {
                if let Some(picker) = self.picker.as_mut() {
                    picker.sample_depth(self.target, node);
                }
            }
        }
    }

    fn color_tested(&mut self, kind: PassKind, nodes: &[Node]) {
        log::trace!("{} pass with {} nodes", kind, nodes.len());
        for node in nodes {
            if self.draw(node) {
                if let Some(picker) = self.picker.as_mut() {
                    picker.sample_color(self.target, node);
                }
            }
        }
    }
}

impl Scene {
    /// A scene binding its lights to slots of `pool`.
    pub fn new(pool: LightPool) -> Self {
        Self::with_config(pool, SceneConfig::default())
    }

    pub fn with_config(pool: LightPool, config: SceneConfig) -> Self {
        Self {
            config,
            graph: Tree::new(),
            pool,
            id: SceneId::next(),
            screen: Rc::new(Cell::new(ScreenTransform::default())),
            stats: RenderStats::default(),
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn graph(&self) -> &Tree {
        &self.graph
    }

    pub fn light_pool(&self) -> &LightPool {
        &self.pool
    }

    pub fn last_stats(&self) -> RenderStats {
        self.stats
    }

    fn tag(&self) -> SceneTag {
        SceneTag::new(self.id, self.screen.clone())
    }

    fn add(&mut self, category: Category, nodes: impl IntoNodes) {
        let nodes = nodes.into_nodes();
        let tag = self.tag();
        nodes.iter().for_each(|node| node.attach(&tag));
        log::debug!("adding {} nodes to the {} pass", nodes.len(), category);
        self.graph.push(category, nodes);
    }

    fn remove(&mut self, category: Category, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.graph.remove(category, &nodes.into_nodes())
    }

    /// Adds 2D overlay elements.
    pub fn add_2d(&mut self, nodes: impl IntoNodes) {
        self.add(Category::Overlay, nodes);
    }

    pub fn remove_2d(&mut self, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.remove(Category::Overlay, nodes)
    }

    /// Adds opaque, depth tested 3D objects.
    pub fn add_3d(&mut self, nodes: impl IntoNodes) {
        self.add(Category::Opaque, nodes);
    }

    pub fn remove_3d(&mut self, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.remove(Category::Opaque, nodes)
    }

    /// Adds opaque 3D objects drawn with the scene's shader program.
    pub fn add_3d_shader(&mut self, nodes: impl IntoNodes) {
        self.add(Category::Shader, nodes);
    }

    pub fn remove_3d_shader(&mut self, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.remove(Category::Shader, nodes)
    }

    /// Adds blended 3D objects; depth tested without writing depth.
    pub fn add_3d_blend(&mut self, nodes: impl IntoNodes) {
        self.add(Category::Blended, nodes);
    }

    pub fn remove_3d_blend(&mut self, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.remove(Category::Blended, nodes)
    }

    /// Adds blended 3D objects drawn without depth testing, always visible.
    pub fn add_3d_always(&mut self, nodes: impl IntoNodes) {
        self.add(Category::AlwaysOnTop, nodes);
    }

    pub fn remove_3d_always(&mut self, nodes: impl IntoNodes) -> Result<(), SceneError> {
        self.remove(Category::AlwaysOnTop, nodes)
    }

    /// Sets the skybox (or skyball). `None` removes it.
    pub fn add_skybox(&mut self, skybox: Option<Node>) {
        if let Some(node) = &skybox {
            node.attach(&self.tag());
        }
        self.graph.set_skybox(skybox);
    }

    pub fn add_light(&mut self, light: SharedLight) -> Result<(), SceneError> {
        self.graph.add_light(light)
    }

    /// Removes a light if the scene holds it. Returns whether it did.
    pub fn remove_light(&mut self, light: &SharedLight) -> bool {
        self.graph.remove_light(light)
    }

    pub fn set_shader(&mut self, program: Rc<dyn ShaderProgram>) {
        self.graph.set_shader_program(Some(program));
    }

    pub fn remove_shader(&mut self) {
        self.graph.set_shader_program(None);
    }

    /// Binds every scene light to a free slot and switches it on.
    fn shine_lights(&self, target: &mut dyn RenderTarget) -> Vec<(SharedLight, LightSlot)> {
        let mut shining = Vec::with_capacity(self.graph.lights().len());
        for light in self.graph.lights() {
            let Some(slot) = self.pool.claim() else {
                log::warn!("no free light slot left, a light of {:?} stays dark", self.id);
                break;
            };
            match light.try_borrow_mut() {
                Ok(mut l) => {
                    l.bind(slot);
                    l.shine(target);
                    shining.push((light.clone(), slot));
                }
                Err(_) => {
                    log::error!("light is borrowed while the scene renders, it stays dark");
                    self.pool.release(slot);
                }
            }
        }
        shining
    }

    /// Switches the units of `shining` off and hands their slots back to the
    /// pool, also for lights that are borrowed elsewhere by now.
    fn hide_lights(&self, target: &mut dyn RenderTarget, shining: Vec<(SharedLight, LightSlot)>) {
        for (light, slot) in shining {
            match light.try_borrow_mut() {
                Ok(mut l) => {
                    l.hide(target);
                }
                Err(_) => {
                    log::error!(
                        "light is borrowed while the scene renders, {} goes off without it",
                        slot
                    );
                    target.disable_light(slot);
                }
            }
            self.pool.release(slot);
        }
    }

    /// Renders one frame into `ctx` and returns the picked node, if picking is
    /// enabled and an object is under the cursor.
    pub fn render<T: RenderTarget>(
        &mut self,
        ctx: &mut Context<T>,
        camera: Option<&dyn Camera>,
    ) -> Option<Node> {
        let start = Instant::now();
        let display = &ctx.display;
        let lighting = display.lighting();
        let screen = display.screen_transform();
        self.screen.set(screen);

        let picker = self.config.pick.then(|| Picker::new(display.cursor_pixel()));
        let mut frame = Frame {
            target: &mut ctx.target,
            camera,
            picker,
            draws: 0,
        };

        frame.target.set_projection(display.perspective());
        frame.target.apply(PassKind::Opaque.state(lighting));

        if let (Some(skybox), Some(camera)) = (self.graph.skybox(), camera) {
            frame.target.apply(PassKind::Skybox.state(lighting));
            frame.target.push_matrix();
            camera.set_skybox_data(frame.target);
            frame.draw(skybox);
            frame.target.pop_matrix();
            frame.target.apply(PassKind::Opaque.state(lighting));
        }

        let mut lights = 0;
        if self.config.render_3d {
            if let Some(camera) = camera {
                camera.push(frame.target);
            }
            let shining = self.shine_lights(frame.target);
            lights = shining.len();

            frame.target.apply(PassKind::Opaque.state(lighting));
            frame.depth_tested(PassKind::Opaque, self.graph.nodes(Category::Opaque));

            let program = self.graph.shader_program();
            if let Some(program) = program {
                program.run(frame.target);
            }
            frame.target.apply(PassKind::Shader.state(lighting));
            frame.depth_tested(PassKind::Shader, self.graph.nodes(Category::Shader));
            if program.is_some() {
                frame.target.use_program(None);
            }

            frame.target.apply(PassKind::Blend.state(lighting));
            if let Some(picker) = frame.picker.as_mut() {
                picker.sample_background(frame.target);
            }
            frame.color_tested(PassKind::Blend, self.graph.nodes(Category::Blended));

            frame.target.apply(PassKind::AlwaysOnTop.state(lighting));
            frame.color_tested(PassKind::AlwaysOnTop, self.graph.nodes(Category::AlwaysOnTop));
            frame.target.apply(PassState {
                depth_test: true,
                ..PassKind::AlwaysOnTop.state(lighting)
            });

            self.hide_lights(frame.target, shining);
            if let Some(camera) = camera {
                camera.pop(frame.target);
            }
        }

        if self.config.render_2d {
            frame.target.set_projection(display.orthographic());
            frame.target.push_matrix();
            frame
                .target
                .mul_matrix(Matrix4::from_nonuniform_scale(screen.scale.x, screen.scale.y, 1.0));
            frame.target.apply(PassKind::Overlay.state(lighting));
            frame.camera = None;
            log::trace!("overlay pass with {} nodes", self.graph.nodes(Category::Overlay).len());
            for node in self.graph.nodes(Category::Overlay) {
                frame.draw(node);
            }
            frame.target.pop_matrix();
            frame
                .target
                .apply(PassKind::Overlay.state(lighting).with_lighting(lighting));
        }

        let samples = frame.picker.as_ref().map_or(0, Picker::samples);
        let pick = frame.picker.and_then(Picker::finish);
        self.stats = RenderStats {
            draws: frame.draws,
            samples,
            lights,
            elapsed: start.elapsed(),
        };
        log::trace!("{:?} rendered: {:?}, picked {:?}", self.id, self.stats, pick);
        pick
    }
}
