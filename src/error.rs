//! Errors raised by scene graph operations and the GPU target.

use thiserror::Error;

use crate::render::Category;

/// Everything that can go wrong while building or rendering a [`crate::scene::Scene`].
///
/// All variants are local to the call that produced them: a failed removal or an
/// overfull light list never poisons the scene or the next frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The scene already holds the maximum number of lights.
    #[error("too many lights, a scene can hold at most {max}")]
    CapacityExceeded { max: usize },

    /// The element to remove is not part of the given pass category.
    #[error("renderable is not registered in the {category} pass")]
    NotFound { category: Category },

    /// The scene graph was used in a way the frame loop does not allow, e.g. a
    /// node was still mutably borrowed while its pass was rendering.
    #[error("precondition violated: {0}")]
    PreconditionViolated(String),
}

/// Failures of the GPU render target: setting up a device or reading pixels back.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("waiting for the device failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("mapping the readback buffer failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),

    /// The map callback was dropped without reporting.
    #[error("readback was cancelled")]
    Cancelled,

    #[error("readback returned {got} bytes, expected {expected}")]
    ShortRead { got: usize, expected: usize },
}
