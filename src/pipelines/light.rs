use bytemuck::Zeroable;

use crate::data_structures::light::MAX_LIGHTS;

/// GPU layout of one hardware light unit.
///
/// `position.w` follows the fixed-function convention: `0.0` marks a directional
/// light (xyz is a direction), `1.0` a positional one.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub spot_direction: [f32; 3],
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: u32,
}

/// All light units of a frame packed for a single uniform buffer upload.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightBlock {
    pub lights: [LightUniform; MAX_LIGHTS],
    /// Bit `n` is set when slot `n` is shining.
    pub enabled: u32,
    pub _padding: [u32; 3],
}

impl LightBlock {
    pub fn from_slots(slots: &[Option<LightUniform>; MAX_LIGHTS]) -> Self {
        let mut block = LightBlock::zeroed();
        for (idx, slot) in slots.iter().enumerate() {
            if let Some(uniform) = slot {
                block.lights[idx] = *uniform;
                block.enabled |= 1 << idx;
            }
        }
        block
    }

    pub fn is_enabled(&self, slot: usize) -> bool {
        slot < MAX_LIGHTS && self.enabled & (1 << slot) != 0
    }
}
