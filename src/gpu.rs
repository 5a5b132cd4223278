//! A render target on the GPU.
//!
//! [`GpuTarget`] renders offscreen into a colour and a depth texture with the
//! rules of [`crate::headless::Framebuffer`]: one pipeline per [`PassState`],
//! `LEQUAL` depth testing, alpha discard in the fragment shader and
//! `src_alpha, one_minus_src_alpha` blending. Quads are recorded and submitted
//! in batches. Every readback submits the pending draws and then copies the
//! texel under the cursor into a mappable buffer.

use std::{collections::HashMap, iter, path::Path};

use cgmath::Matrix4;
use image::RgbaImage;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    context::{Context, FixedFunction, Projection, Quad, RenderTarget},
    data_structures::{
        light::LightSlot,
        texture::{ProgramId, Texture, TextureId},
    },
    display::{Display, DisplayConfig},
    error::GpuError,
    pipelines::{
        PassKind, PassState,
        flat::{FlatVertex, mk_flat_pipeline},
        light::LightUniform,
    },
};

/// Colour format of the offscreen texture. Linear, so blending matches the
/// software framebuffer byte for byte.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const ROW_ALIGNMENT: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// Corner order of the two triangles of a quad.
const QUAD_INDICES: [usize; 6] = [0, 1, 2, 0, 2, 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attachment {
    Color,
    Depth,
}

/// Consecutive draws under the same state.
#[derive(Debug)]
struct Batch {
    state: PassState,
    first: u32,
    count: u32,
}

#[derive(Debug)]
pub struct GpuTarget {
    device: wgpu::Device,
    queue: wgpu::Queue,
    size: PhysicalSize<u32>,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    pipelines: HashMap<PassState, wgpu::RenderPipeline>,
    fixed: FixedFunction,
    vertices: Vec<FlatVertex>,
    batches: Vec<Batch>,
}

fn mk_attachment(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
    format: wgpu::TextureFormat,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn begin_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    load_color: wgpu::LoadOp<wgpu::Color>,
    load_depth: wgpu::LoadOp<f32>,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Scene Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: load_color,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: load_depth,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

/// Maps `buffer` and copies its contents out.
async fn read_buffer(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Result<Vec<u8>, GpuError> {
    let slice = buffer.slice(..);
    // map first, then poll, then await
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        tx.send(result).ok();
    });
    device.poll(wgpu::PollType::wait_indefinitely())?;
    rx.receive().await.ok_or(GpuError::Cancelled)??;

    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    Ok(data)
}

impl GpuTarget {
    /// Requests an adapter and a device and sets up offscreen attachments of
    /// `size`.
    pub async fn new(size: PhysicalSize<u32>) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("rendering offscreen on {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Scene Device"),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await?;

        Ok(Self::with_device(device, queue, size))
    }

    /// A target on an existing device, e.g. the one a window surface uses.
    pub fn with_device(device: wgpu::Device, queue: wgpu::Queue, size: PhysicalSize<u32>) -> Self {
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        let (color, color_view) = mk_attachment(&device, size, COLOR_FORMAT, "Scene Colour");
        let (depth, depth_view) =
            mk_attachment(&device, size, Texture::DEPTH_FORMAT, "Scene Depth");

        let mut pipelines = HashMap::new();
        for kind in PassKind::ALL {
            let state = kind.state(false);
            pipelines.entry(state).or_insert_with(|| {
                mk_flat_pipeline(&device, state, COLOR_FORMAT, Texture::DEPTH_FORMAT)
            });
        }
        log::debug!("built {} pipelines for {} passes", pipelines.len(), PassKind::ALL.len());

        Self {
            device,
            queue,
            size,
            color,
            color_view,
            depth,
            depth_view,
            pipelines,
            fixed: FixedFunction::default(),
            vertices: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Recreates the attachments. Their content is lost.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));
        self.discard();
        (self.color, self.color_view) =
            mk_attachment(&self.device, size, COLOR_FORMAT, "Scene Colour");
        (self.depth, self.depth_view) =
            mk_attachment(&self.device, size, Texture::DEPTH_FORMAT, "Scene Depth");
        self.size = size;
    }

    /// Number of pipelines built so far, one per distinct pass state.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Reads the whole colour texture back.
    pub fn snapshot(&mut self) -> Result<RgbaImage, GpuError> {
        self.flush();
        let PhysicalSize { width, height } = self.size;
        let padded_row = (width * 4).div_ceil(ROW_ALIGNMENT) * ROW_ALIGNMENT;
        let data = self.copy_out(Attachment::Color, (0, 0), (width, height), padded_row)?;

        let row = (width * 4) as usize;
        let expected = padded_row as usize * height as usize;
        if data.len() < expected {
            return Err(GpuError::ShortRead {
                got: data.len(),
                expected,
            });
        }
        let pixels = data
            .chunks(padded_row as usize)
            .take(height as usize)
            .flat_map(|chunk| &chunk[..row])
            .copied()
            .collect();
        RgbaImage::from_raw(width, height, pixels).ok_or(GpuError::ShortRead {
            got: data.len(),
            expected,
        })
    }

    /// Writes the colour texture to an image file, e.g. a PNG screenshot.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        self.snapshot()?.save(path)?;
        Ok(())
    }

    fn discard(&mut self) {
        self.vertices.clear();
        self.batches.clear();
    }

    /// Submits the recorded quads.
    fn flush(&mut self) {
        if self.batches.is_empty() {
            return;
        }
        let device = &self.device;
        for batch in &self.batches {
            let key = batch.state.with_lighting(false);
            self.pipelines.entry(key).or_insert_with(|| {
                log::debug!("building a pipeline for {:?}", key);
                mk_flat_pipeline(device, key, COLOR_FORMAT, Texture::DEPTH_FORMAT)
            });
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Buffer"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Draw Encoder"),
        });
        {
            let mut pass = begin_pass(
                &mut encoder,
                &self.color_view,
                &self.depth_view,
                wgpu::LoadOp::Load,
                wgpu::LoadOp::Load,
            );
            pass.set_vertex_buffer(0, buffer.slice(..));
            for batch in &self.batches {
                if let Some(pipeline) = self.pipelines.get(&batch.state.with_lighting(false)) {
                    pass.set_pipeline(pipeline);
                    pass.draw(batch.first..batch.first + batch.count, 0..1);
                }
            }
        }
        self.queue.submit(iter::once(encoder.finish()));
        log::trace!(
            "submitted {} quads in {} batches",
            self.vertices.len() / QUAD_INDICES.len(),
            self.batches.len()
        );
        self.discard();
    }

    /// Copies a region of an attachment into a buffer and maps it.
    fn copy_out(
        &self,
        attachment: Attachment,
        (x, y): (u32, u32),
        (width, height): (u32, u32),
        bytes_per_row: u32,
    ) -> Result<Vec<u8>, GpuError> {
        let (texture, aspect) = match attachment {
            Attachment::Color => (&self.color, wgpu::TextureAspect::All),
            Attachment::Depth => (&self.depth, wgpu::TextureAspect::DepthOnly),
        };
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: u64::from(bytes_per_row) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(iter::once(encoder.finish()));

        futures::executor::block_on(read_buffer(&self.device, &buffer))
    }

    /// The four bytes of one texel.
    fn read_texel(&mut self, attachment: Attachment, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.flush();
        let texel = self
            .copy_out(attachment, (x, y), (1, 1), ROW_ALIGNMENT)
            .and_then(|data| {
                data.get(..4)
                    .and_then(|bytes| <[u8; 4]>::try_from(bytes).ok())
                    .ok_or(GpuError::ShortRead {
                        got: data.len(),
                        expected: 4,
                    })
            });
        match texel {
            Ok(texel) => Some(texel),
            Err(e) => {
                log::error!("reading {:?} at ({}, {}) failed: {}", attachment, x, y, e);
                None
            }
        }
    }
}

impl RenderTarget for GpuTarget {
    fn size(&self) -> PhysicalSize<u32> {
        self.size
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
        let state = self.fixed.state;
        let cutoff = state.alpha_cutoff().unwrap_or(0.0);
        let corners = quad.corners.map(|corner| FlatVertex {
            position: (OPENGL_TO_WGPU_MATRIX * self.fixed.to_clip(corner)).into(),
            color: quad.color,
            cutoff,
        });

        let first = self.vertices.len() as u32;
        self.vertices.extend(QUAD_INDICES.map(|i| corners[i]));
        match self.batches.last_mut() {
            Some(batch) if batch.state == state => batch.count += QUAD_INDICES.len() as u32,
            _ => self.batches.push(Batch {
                state,
                first,
                count: QUAD_INDICES.len() as u32,
            }),
        }
    }

    fn read_depth(&mut self, x: u32, y: u32) -> Option<f32> {
        self.read_texel(Attachment::Depth, x, y).map(f32::from_le_bytes)
    }

    fn read_color(&mut self, x: u32, y: u32) -> Option<[f32; 4]> {
        self.read_texel(Attachment::Color, x, y)
            .map(|texel| texel.map(|v| f32::from(v) / 255.0))
    }

    fn clear(&mut self, color: wgpu::Color) {
        self.discard();
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        drop(begin_pass(
            &mut encoder,
            &self.color_view,
            &self.depth_view,
            wgpu::LoadOp::Clear(color),
            wgpu::LoadOp::Clear(1.0),
        ));
        self.queue.submit(iter::once(encoder.finish()));
    }
}

impl Context<GpuTarget> {
    /// A context rendering offscreen on the GPU. Blocks until a device is ready.
    pub fn gpu(config: DisplayConfig) -> Result<Self, GpuError> {
        let target = futures::executor::block_on(GpuTarget::new(config.size))?;
        Ok(Self::new(Display::new(config), target))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.display.resize(PhysicalSize::new(width, height));
            self.target.resize(PhysicalSize::new(width, height));
        }
    }
}
