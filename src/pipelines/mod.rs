//! Fixed-function pass states and their GPU pipeline equivalents.
//!
//! Every pass of a frame runs under one [`PassState`]. Software targets such as
//! [`crate::headless::Framebuffer`] interpret the flags directly; GPU hosts turn
//! each state into a `wgpu` pipeline via [`PassState::depth_stencil`] and
//! [`PassState::color_target`] and cache one pipeline per [`PassKind`].

pub mod flat;
pub mod light;

use std::fmt;

/// Fragments whose alpha is below this value are discarded while alpha testing.
pub const ALPHA_CUTOFF: f32 = 0.5;

const BLEND_COMPONENT: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::SrcAlpha,
    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
    operation: wgpu::BlendOperation::Add,
};

/// The blend of every pass, applied to all four channels.
pub const BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: BLEND_COMPONENT,
    alpha: BLEND_COMPONENT,
};

/// The stages of a frame in the order the scene runs them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    Skybox,
    Opaque,
    Shader,
    Blend,
    AlwaysOnTop,
    Overlay,
}

impl PassKind {
    pub const ALL: [PassKind; 6] = [
        PassKind::Skybox,
        PassKind::Opaque,
        PassKind::Shader,
        PassKind::Blend,
        PassKind::AlwaysOnTop,
        PassKind::Overlay,
    ];

    /// The render state of this pass. `lighting` is the display wide lighting
    /// switch; passes that never light ignore it.
    pub fn state(self, lighting: bool) -> PassState {
        match self {
            PassKind::Skybox => PassState {
                depth_test: true,
                depth_write: false,
                alpha_test: false,
                lighting: false,
            },
            PassKind::Opaque | PassKind::Shader => PassState {
                depth_test: true,
                depth_write: true,
                alpha_test: true,
                lighting,
            },
            PassKind::Blend => PassState {
                depth_test: true,
                depth_write: false,
                alpha_test: false,
                lighting,
            },
            PassKind::AlwaysOnTop => PassState {
                depth_test: false,
                depth_write: true,
                alpha_test: false,
                lighting,
            },
            PassKind::Overlay => PassState {
                depth_test: false,
                depth_write: true,
                alpha_test: false,
                lighting: false,
            },
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassKind::Skybox => "skybox",
            PassKind::Opaque => "opaque",
            PassKind::Shader => "shader",
            PassKind::Blend => "blend",
            PassKind::AlwaysOnTop => "always-on-top",
            PassKind::Overlay => "overlay",
        };
        f.write_str(name)
    }
}

/// Fixed-function switches in effect while a pass draws.
///
/// Blending is not part of the state: it is always on with
/// `src_alpha, one_minus_src_alpha`, so opaque geometry simply draws with alpha 1.
/// Depth writes only happen while depth testing is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PassState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub alpha_test: bool,
    pub lighting: bool,
}

impl Default for PassState {
    fn default() -> Self {
        PassKind::Opaque.state(true)
    }
}

impl PassState {
    pub fn with_lighting(self, lighting: bool) -> Self {
        Self { lighting, ..self }
    }

    /// Whether a fragment with this state ends up in the depth buffer.
    pub fn writes_depth(&self) -> bool {
        self.depth_test && self.depth_write
    }

    pub fn alpha_cutoff(&self) -> Option<f32> {
        self.alpha_test.then_some(ALPHA_CUTOFF)
    }

    /// Depth configuration of an equivalent wgpu pipeline.
    ///
    /// A disabled depth test still needs an attachment-compatible state, so it
    /// maps to `Always` without writes.
    pub fn depth_stencil(&self, format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = if self.depth_test {
            (self.depth_write, wgpu::CompareFunction::LessEqual)
        } else {
            (false, wgpu::CompareFunction::Always)
        };
        wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(depth_write_enabled),
            depth_compare: Some(depth_compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    /// Colour target of an equivalent wgpu pipeline. Alpha testing has no
    /// pipeline state in wgpu and is left to the fragment shader via
    /// [`PassState::alpha_cutoff`].
    ///
    /// Colour and alpha both blend with `src_alpha, one_minus_src_alpha`.
    pub fn color_target(&self, format: wgpu::TextureFormat) -> wgpu::ColorTargetState {
        wgpu::ColorTargetState {
            format,
            blend: Some(BLENDING),
            write_mask: wgpu::ColorWrites::ALL,
        }
    }
}
