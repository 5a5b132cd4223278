//! A software render target.
//!
//! [`Framebuffer`] keeps an 8 bit RGBA colour buffer and a float depth buffer and
//! rasterizes convex quads with the same rules as a fixed-function pipeline:
//! `LEQUAL` depth testing, depth writes only while the depth test is on, an alpha
//! test at [`crate::pipelines::ALPHA_CUTOFF`] and `src_alpha, one_minus_src_alpha`
//! blending. It backs tests, screenshots and hosts without a GPU.

use std::path::Path;

use cgmath::{Matrix4, Vector2, Vector3};
use image::{ImageBuffer, Luma, Rgba, RgbaImage};
use winit::dpi::PhysicalSize;

use crate::{
    context::{FixedFunction, Projection, Quad, RenderTarget},
    data_structures::{
        light::LightSlot,
        texture::{ProgramId, TextureId},
    },
    pipelines::{
        PassState,
        light::{LightBlock, LightUniform},
    },
};

pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Counters of the work a framebuffer was asked to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FramebufferStats {
    pub draws: usize,
    pub reads: usize,
}

#[derive(Debug)]
pub struct Framebuffer {
    color: RgbaImage,
    depth: DepthImage,
    fixed: FixedFunction,
    stats: FramebufferStats,
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn to_f32(v: u8) -> f32 {
    f32::from(v) / 255.0
}

/// Signed area of the parallelogram spanned by `a -> b` and `a -> p`.
fn edge(a: Vector2<f32>, b: Vector2<f32>, p: Vector2<f32>) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Depth plane `z = a * x + b * y + c` through three window space points.
fn depth_plane(p: Vector3<f32>, q: Vector3<f32>, r: Vector3<f32>) -> Option<Vector3<f32>> {
    let u = q - p;
    let v = r - p;
    let n = u.cross(v);
    if n.z.abs() <= f32::EPSILON {
        return None;
    }
    let a = -n.x / n.z;
    let b = -n.y / n.z;
    Some(Vector3::new(a, b, p.z - a * p.x - b * p.y))
}

impl Framebuffer {
    pub fn new(size: PhysicalSize<u32>) -> Self {
        let (width, height) = (size.width.max(1), size.height.max(1));
        Self {
            color: RgbaImage::new(width, height),
            depth: DepthImage::from_pixel(width, height, Luma([1.0])),
            fixed: FixedFunction::default(),
            stats: FramebufferStats::default(),
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        let (width, height) = (size.width.max(1), size.height.max(1));
        self.color = RgbaImage::new(width, height);
        self.depth = DepthImage::from_pixel(width, height, Luma([1.0]));
    }

    /// Colour at a pixel without counting as a readback.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.color.get_pixel_checked(x, y).copied()
    }

    /// Depth at a pixel without counting as a readback.
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        self.depth.get_pixel_checked(x, y).map(|d| d.0[0])
    }

    pub fn color_buffer(&self) -> &RgbaImage {
        &self.color
    }

    /// The light units currently switched on.
    pub fn lights(&self) -> LightBlock {
        self.fixed.light_block()
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.fixed.program
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.fixed.texture
    }

    /// Number of saved matrices on the modelview stack.
    pub fn stack_depth(&self) -> usize {
        self.fixed.stack_depth()
    }

    pub fn stats(&self) -> FramebufferStats {
        self.stats
    }

    /// Writes the colour buffer to an image file, e.g. a PNG screenshot.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        self.color.save(path)
    }

    fn to_window(&self, clip: cgmath::Vector4<f32>) -> Option<Vector3<f32>> {
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let (width, height) = self.color.dimensions();
        Some(Vector3::new(
            (ndc.x + 1.0) * 0.5 * width as f32,
            (1.0 - ndc.y) * 0.5 * height as f32,
            (ndc.z + 1.0) * 0.5,
        ))
    }

    fn shade(&mut self, x: u32, y: u32, depth: f32, color: [f32; 4]) {
        if self.fixed.state.depth_test {
            let stored = self.depth.get_pixel(x, y).0[0];
            if depth > stored {
                return;
            }
            if self.fixed.state.depth_write {
                self.depth.put_pixel(x, y, Luma([depth]));
            }
        }
        let dst = self.color.get_pixel(x, y).0;
        let alpha = color[3].clamp(0.0, 1.0);
        let mut out = [0u8; 4];
        for (channel, (src, dst)) in out.iter_mut().zip(color.iter().zip(dst.iter())) {
            *channel = to_u8(src * alpha + to_f32(*dst) * (1.0 - alpha));
        }
        self.color.put_pixel(x, y, Rgba(out));
    }
}

impl RenderTarget for Framebuffer {
    fn size(&self) -> PhysicalSize<u32> {
        let (width, height) = self.color.dimensions();
        PhysicalSize::new(width, height)
    }

    fn set_projection(&mut self, projection: Projection) {
        self.fixed.set_projection(projection);
    }

    fn apply(&mut self, state: PassState) {
        self.fixed.state = state;
    }

    fn state(&self) -> PassState {
        self.fixed.state
    }

    fn push_matrix(&mut self) {
        self.fixed.push_matrix();
    }

    fn pop_matrix(&mut self) {
        self.fixed.pop_matrix();
    }

    fn mul_matrix(&mut self, matrix: Matrix4<f32>) {
        self.fixed.mul_matrix(matrix);
    }

    fn enable_light(&mut self, slot: LightSlot, light: &LightUniform) {
        self.fixed.enable_light(slot, light);
    }

    fn disable_light(&mut self, slot: LightSlot) {
        self.fixed.disable_light(slot);
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.fixed.program = program;
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.fixed.texture = texture;
    }

    fn draw_quad(&mut self, quad: &Quad) {
        self.stats.draws += 1;
        if let Some(cutoff) = self.fixed.state.alpha_cutoff() {
            if quad.color[3] < cutoff {
                return;
            }
        }
        let mut window = [Vector3::new(0.0, 0.0, 0.0); 4];
        for (corner, out) in quad.corners.iter().zip(window.iter_mut()) {
            match self.to_window(self.fixed.to_clip(*corner)) {
                Some(point) => *out = point,
                None => {
                    log::trace!("quad crosses the eye plane and is skipped");
                    return;
                }
            }
        }
        let Some(plane) = depth_plane(window[0], window[1], window[2])
            .or_else(|| depth_plane(window[0], window[2], window[3]))
        else {
            // seen edge on
            return;
        };

        let (width, height) = self.color.dimensions();
        let min_x = window.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = window.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let min_y = window.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = window.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        if max_x < 0.0 || max_y < 0.0 || min_x >= width as f32 || min_y >= height as f32 {
            return;
        }
        let x0 = min_x.max(0.0).floor() as u32;
        let y0 = min_y.max(0.0).floor() as u32;
        let x1 = (max_x.ceil() as u32).min(width);
        let y1 = (max_y.ceil() as u32).min(height);

        let corners = window.map(|p| p.truncate());
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vector2::new(x as f32 + 0.5, y as f32 + 0.5);
                let sides = (0..4).map(|i| edge(corners[i], corners[(i + 1) % 4], p));
                let (mut front, mut back) = (true, true);
                for side in sides {
                    front &= side >= 0.0;
                    back &= side <= 0.0;
                }
                if !(front || back) {
                    continue;
                }
                let depth = plane.x * p.x + plane.y * p.y + plane.z;
                if !(0.0..=1.0).contains(&depth) {
                    continue;
                }
                self.shade(x, y, depth, quad.color);
            }
        }
    }

    fn read_depth(&mut self, x: u32, y: u32) -> Option<f32> {
        self.stats.reads += 1;
        self.depth_at(x, y)
    }

    fn read_color(&mut self, x: u32, y: u32) -> Option<[f32; 4]> {
        self.stats.reads += 1;
        self.pixel(x, y).map(|pixel| pixel.0.map(to_f32))
    }

    fn clear(&mut self, color: wgpu::Color) {
        let rgba = [color.r, color.g, color.b, color.a].map(|v| to_u8(v as f32));
        self.color.pixels_mut().for_each(|pixel| *pixel = Rgba(rgba));
        self.depth.pixels_mut().for_each(|depth| *depth = Luma([1.0]));
    }
}
