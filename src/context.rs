//! The render target abstraction and the per-window context a frame renders into.
//!
//! [`RenderTarget`] is the fixed-function state machine every pass talks to:
//! projection, a modelview matrix stack, pass switches, light units, the active
//! program and texture, quad drawing and single pixel readback.
//! [`Context`] bundles a target with the [`Display`] it presents on.

use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, SquareMatrix, Vector4};
use winit::dpi::PhysicalSize;

use crate::{
    data_structures::{
        light::{LightSlot, MAX_LIGHTS},
        texture::{ProgramId, TextureId},
    },
    display::{Display, DisplayConfig},
    headless::Framebuffer,
    pipelines::{
        PassState,
        light::{LightBlock, LightUniform},
    },
};

/// Projection of the active pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Perspective {
        fovy: Deg<f32>,
        aspect: f32,
        znear: f32,
        zfar: f32,
    },
    /// Pixel aligned projection with the origin in the top left corner.
    Orthographic { width: f32, height: f32 },
}

impl Projection {
    /// Depth range of the orthographic projection.
    pub const ORTHO_DEPTH: f32 = 50.0;

    pub fn to_matrix(&self) -> Matrix4<f32> {
        match *self {
            Projection::Perspective {
                fovy,
                aspect,
                znear,
                zfar,
            } => cgmath::perspective(fovy, aspect, znear, zfar),
            Projection::Orthographic { width, height } => cgmath::ortho(
                0.0,
                width,
                height,
                0.0,
                -Self::ORTHO_DEPTH,
                Self::ORTHO_DEPTH,
            ),
        }
    }
}

/// A quad in model space with a flat colour, the unit of drawing.
///
/// Corners are given in order around the quad. Mesh collaborators break their
/// geometry down into quads (a triangle repeats its last corner).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub corners: [Point3<f32>; 4],
    pub color: [f32; 4],
}

impl Quad {
    /// Axis aligned rectangle at depth `z`, the usual shape of overlay elements.
    pub fn rect(x: f32, y: f32, width: f32, height: f32, z: f32, color: [f32; 4]) -> Self {
        Self {
            corners: [
                Point3::new(x, y, z),
                Point3::new(x + width, y, z),
                Point3::new(x + width, y + height, z),
                Point3::new(x, y + height, z),
            ],
            color,
        }
    }
}

/// Fixed-function render target.
///
/// Pixel coordinates have their origin in the top left corner. Depth values are
/// window depths in `0.0..=1.0` where smaller is nearer.
pub trait RenderTarget {
    fn size(&self) -> PhysicalSize<u32>;

    /// Loads `projection` and resets the modelview matrix and its stack.
    fn set_projection(&mut self, projection: Projection);

    fn apply(&mut self, state: PassState);

    fn state(&self) -> PassState;

    fn push_matrix(&mut self);

    fn pop_matrix(&mut self);

    /// Post-multiplies the current modelview matrix.
    fn mul_matrix(&mut self, matrix: Matrix4<f32>);

    fn enable_light(&mut self, slot: LightSlot, light: &LightUniform);

    fn disable_light(&mut self, slot: LightSlot);

    fn use_program(&mut self, program: Option<ProgramId>);

    fn bind_texture(&mut self, texture: Option<TextureId>);

    fn draw_quad(&mut self, quad: &Quad);

    /// Depth at a pixel, `None` outside the target.
    fn read_depth(&mut self, x: u32, y: u32) -> Option<f32>;

    /// RGBA colour at a pixel, `None` outside the target.
    fn read_color(&mut self, x: u32, y: u32) -> Option<[f32; 4]>;

    /// Clears colour to `color` and depth to the far plane.
    fn clear(&mut self, color: wgpu::Color);
}

/// Projection, matrix stack and switches a target keeps between draws.
///
/// Targets embed it and forward the state part of [`RenderTarget`] to it.
#[derive(Debug)]
pub struct FixedFunction {
    projection: Matrix4<f32>,
    modelview: Matrix4<f32>,
    stack: Vec<Matrix4<f32>>,
    pub state: PassState,
    pub lights: [Option<LightUniform>; MAX_LIGHTS],
    pub program: Option<ProgramId>,
    pub texture: Option<TextureId>,
}

impl Default for FixedFunction {
    fn default() -> Self {
        Self {
            projection: Matrix4::identity(),
            modelview: Matrix4::identity(),
            stack: Vec::new(),
            state: PassState::default(),
            lights: [None; MAX_LIGHTS],
            program: None,
            texture: None,
        }
    }
}

impl FixedFunction {
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection.to_matrix();
        self.modelview = Matrix4::identity();
        self.stack.clear();
    }

    pub fn push_matrix(&mut self) {
        self.stack.push(self.modelview);
    }

    pub fn pop_matrix(&mut self) {
        match self.stack.pop() {
            Some(matrix) => self.modelview = matrix,
            None => log::warn!("modelview stack underflow"),
        }
    }

    pub fn mul_matrix(&mut self, matrix: Matrix4<f32>) {
        self.modelview = self.modelview * matrix;
    }

    /// Number of saved matrices on the modelview stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// OpenGL style clip coordinates of a model space point.
    pub fn to_clip(&self, point: Point3<f32>) -> Vector4<f32> {
        self.projection * self.modelview * point.to_vec().extend(1.0)
    }

    pub fn enable_light(&mut self, slot: LightSlot, light: &LightUniform) {
        self.lights[slot.index()] = Some(*light);
    }

    pub fn disable_light(&mut self, slot: LightSlot) {
        self.lights[slot.index()] = None;
    }

    /// The light units currently switched on.
    pub fn light_block(&self) -> LightBlock {
        LightBlock::from_slots(&self.lights)
    }
}

/// A display and the target frames are drawn into.
#[derive(Debug)]
pub struct Context<T: RenderTarget = Framebuffer> {
    pub display: Display,
    pub target: T,
}

impl Context<Framebuffer> {
    /// A context that renders into a software framebuffer of the display size.
    pub fn headless(config: DisplayConfig) -> Self {
        let target = Framebuffer::new(config.size);
        Self {
            display: Display::new(config),
            target,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.display.resize(PhysicalSize::new(width, height));
            self.target.resize(PhysicalSize::new(width, height));
        }
    }
}

impl<T: RenderTarget> Context<T> {
    pub fn new(display: Display, target: T) -> Self {
        Self { display, target }
    }

    /// Clears the target with the display's clear colour.
    pub fn clear(&mut self) {
        self.target.clear(self.display.config().clear_colour);
    }
}
