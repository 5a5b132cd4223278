//! layer-ngin
//!
//! A small multi-pass scene engine. A scene keeps shared handles to renderable
//! objects filed by pass category and draws them every frame in a fixed order
//! of render states: skybox, opaque, shader, blended, always-on-top and finally
//! the 2D overlay. While drawing it can determine which object lies under the
//! cursor by reading the framebuffer back after each object.
//!
//! Rendering goes through the [`context::RenderTarget`] trait. The crate ships a
//! software [`headless::Framebuffer`] which is used by tests and screenshots, and
//! [`gpu::GpuTarget`], which draws offscreen with one `wgpu` pipeline per pass state.
//!
//! High-level modules
//! - `camera`: camera trait, first person and orbit cameras, camera uniform
//! - `context`: render target trait, projections, quads and the frame context
//! - `data_structures`: pass tree, lights and light slots, texture handles
//! - `display`: framebuffer size, logical 2D space, cursor and global settings
//! - `error`: errors of scene graph operations and the GPU target
//! - `gpu`: the wgpu render target
//! - `headless`: the software framebuffer
//! - `pick`: readback based picking
//! - `pipelines`: pass states and their wgpu equivalents, light uniforms
//! - `render`: the renderable trait and node handles
//! - `scene`: scenes and the frame orchestration
//!

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod display;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
pub use winit::event::WindowEvent;

pub use context::{Context, RenderTarget};
pub use display::{Display, DisplayConfig};
pub use error::{GpuError, SceneError};
pub use render::{Category, IntoNodes, Node, Renderable};
pub use scene::{RenderStats, Scene, SceneConfig};
