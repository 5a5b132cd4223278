//! Window facing state: framebuffer size, the logical 2D space, the cursor and
//! the global render settings the scene reads every frame.

use cgmath::{Deg, Vector2};
use winit::{
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::WindowEvent,
};

use crate::{context::Projection, render::ScreenTransform};

/// Settings of a display, applied in code by the application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayConfig {
    /// Framebuffer size in pixels.
    pub size: PhysicalSize<u32>,
    /// Size of the coordinate space overlays are laid out in.
    pub size_2d: LogicalSize<u32>,
    pub lighting: bool,
    pub view_angle: Deg<f32>,
    pub close_view: f32,
    pub far_view: f32,
    pub clear_colour: wgpu::Color,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            size: PhysicalSize::new(640, 480),
            size_2d: LogicalSize::new(640, 480),
            lighting: true,
            view_angle: Deg(45.0),
            close_view: 0.1,
            far_view: 100.0,
            clear_colour: wgpu::Color::TRANSPARENT,
        }
    }
}

impl DisplayConfig {
    /// A config whose logical 2D space matches the framebuffer.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            size: PhysicalSize::new(width, height),
            size_2d: LogicalSize::new(width, height),
            ..Default::default()
        }
    }
}

/// The display a scene renders for.
#[derive(Clone, Debug)]
pub struct Display {
    config: DisplayConfig,
    cursor: Option<PhysicalPosition<f64>>,
}

impl Display {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            cursor: None,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.config.size
    }

    pub fn size_2d(&self) -> LogicalSize<u32> {
        self.config.size_2d
    }

    pub fn lighting(&self) -> bool {
        self.config.lighting
    }

    pub fn set_lighting(&mut self, lighting: bool) {
        self.config.lighting = lighting;
    }

    pub fn toggle_lighting(&mut self) {
        self.config.lighting = !self.config.lighting;
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.config.size = size;
        }
    }

    pub fn set_cursor(&mut self, position: PhysicalPosition<f64>) {
        self.cursor = Some(position);
    }

    pub fn clear_cursor(&mut self) {
        self.cursor = None;
    }

    pub fn cursor(&self) -> Option<PhysicalPosition<f64>> {
        self.cursor
    }

    /// The framebuffer pixel under the cursor, `None` if the cursor is unknown
    /// or outside the framebuffer.
    pub fn cursor_pixel(&self) -> Option<(u32, u32)> {
        let cursor = self.cursor?;
        let size = self.config.size;
        if cursor.x < 0.0 || cursor.y < 0.0 {
            return None;
        }
        let (x, y) = (cursor.x as u32, cursor.y as u32);
        (x < size.width && y < size.height).then_some((x, y))
    }

    /// Cursor position in the logical 2D space.
    pub fn cursor_2d(&self) -> Option<Vector2<f32>> {
        self.cursor
            .map(|cursor| self.screen_transform().to_logical(cursor))
    }

    pub fn screen_transform(&self) -> ScreenTransform {
        ScreenTransform::new(self.config.size, self.config.size_2d)
    }

    pub fn perspective(&self) -> Projection {
        let size = self.config.size;
        Projection::Perspective {
            fovy: self.config.view_angle,
            aspect: size.width as f32 / size.height.max(1) as f32,
            znear: self.config.close_view,
            zfar: self.config.far_view,
        }
    }

    pub fn orthographic(&self) -> Projection {
        Projection::Orthographic {
            width: self.config.size.width as f32,
            height: self.config.size.height as f32,
        }
    }

    /// Tracks size and cursor changes. Returns whether the event was used.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.resize(*size);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.set_cursor(*position);
                true
            }
            WindowEvent::CursorLeft { .. } => {
                self.clear_cursor();
                true
            }
            _ => false,
        }
    }
}
