//! Texture and shader program handles.
//!
//! Loading images and compiling shaders happens elsewhere. The scene and the
//! renderables only need opaque handles they can bind on a [`RenderTarget`].

use crate::context::RenderTarget;

/// Handle of a texture object owned by the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Handle of a linked shader program owned by the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// A texture that renderables bind before drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub size: [u32; 2],
}

impl Texture {
    /// Depth format used by pipelines built from pass states.
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    /// Colour format of the headless framebuffer and default surface pipelines.
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    pub fn new(id: TextureId, size: [u32; 2]) -> Self {
        Self { id, size }
    }

    pub fn bind(&self, target: &mut dyn RenderTarget) {
        target.bind_texture(Some(self.id));
    }
}

/// A program the scene activates for the shader pass.
///
/// `run` activates the program. Deactivating it again is the scene's job.
pub trait ShaderProgram {
    fn run(&self, target: &mut dyn RenderTarget);
}

/// A plain linked program without per-frame uniforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Program(pub ProgramId);

impl ShaderProgram for Program {
    fn run(&self, target: &mut dyn RenderTarget) {
        target.use_program(Some(self.0));
    }
}
