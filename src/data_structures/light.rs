//! Lights and the pool of hardware light slots they are bound to while rendering.

use std::{cell::RefCell, fmt, rc::Rc};

use cgmath::Vector3;

use crate::{context::RenderTarget, pipelines::light::LightUniform};

/// Number of light units a fixed-function pipeline offers at the same time.
pub const MAX_LIGHTS: usize = 8;

/// Identifier of one hardware light unit, `0..MAX_LIGHTS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LightSlot(u8);

impl LightSlot {
    pub fn new(index: usize) -> Option<Self> {
        (index < MAX_LIGHTS).then(|| LightSlot(index as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for LightSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LIGHT{}", self.0)
    }
}

/// The set of free light slots, shared by every scene constructed with it.
///
/// Cloning the pool clones the handle, not the slots. Slots are claimed from the
/// end, so the first light of a frame always gets the last slot. Released slots
/// go back to their sorted position which keeps the assignment identical from
/// one frame to the next.
///
/// The pool is `!Send`: claiming and releasing is not synchronised, so scenes
/// sharing one pool must render on the same thread.
#[derive(Clone, Debug)]
pub struct LightPool {
    free: Rc<RefCell<Vec<LightSlot>>>,
}

impl LightPool {
    pub fn new() -> Self {
        let free = (0..MAX_LIGHTS).filter_map(LightSlot::new).collect();
        Self {
            free: Rc::new(RefCell::new(free)),
        }
    }

    pub fn claim(&self) -> Option<LightSlot> {
        self.free.borrow_mut().pop()
    }

    pub fn release(&self, slot: LightSlot) {
        let mut free = self.free.borrow_mut();
        match free.binary_search(&slot) {
            Ok(_) => log::warn!("{} was released twice", slot),
            Err(idx) => free.insert(idx, slot),
        }
    }

    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }

    /// Whether both handles point at the same pool.
    pub fn same_pool(&self, other: &LightPool) -> bool {
        Rc::ptr_eq(&self.free, &other.free)
    }
}

impl Default for LightPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A light shared between the code that animates it and the scenes it shines in.
pub type SharedLight = Rc<RefCell<Light>>;

/// A fixed-function light source.
///
/// Colours are RGBA. For directional lights `position` is the direction the light
/// comes from.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub spot_direction: Vector3<f32>,
    pub directional: bool,
    slot: Option<LightSlot>,
}

impl Light {
    pub fn new(
        position: Vector3<f32>,
        ambient: [f32; 4],
        diffuse: [f32; 4],
        specular: [f32; 4],
        spot_direction: Vector3<f32>,
        directional: bool,
    ) -> Self {
        Self {
            position,
            ambient,
            diffuse,
            specular,
            spot_direction,
            directional,
            slot: None,
        }
    }

    /// A white positional light.
    pub fn point(position: Vector3<f32>) -> Self {
        Self::new(
            position,
            [0.2, 0.2, 0.2, 1.0],
            [1.0, 1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0, 1.0],
            Vector3::new(0.0, 0.0, 0.0),
            false,
        )
    }

    pub fn shared(self) -> SharedLight {
        Rc::new(RefCell::new(self))
    }

    /// The slot this light is bound to during the current pass.
    pub fn slot(&self) -> Option<LightSlot> {
        self.slot
    }

    pub(crate) fn bind(&mut self, slot: LightSlot) {
        self.slot = Some(slot);
    }

    /// Enables the bound light unit with this light's parameters.
    pub fn shine(&self, target: &mut dyn RenderTarget) {
        match self.slot {
            Some(slot) => target.enable_light(slot, &self.uniform()),
            None => log::warn!("tried to shine a light that is not bound to a slot"),
        }
    }

    /// Switches the bound light unit off and gives up the slot, which is
    /// returned so the caller can hand it back to its pool.
    pub fn hide(&mut self, target: &mut dyn RenderTarget) -> Option<LightSlot> {
        let slot = self.slot.take();
        if let Some(slot) = slot {
            target.disable_light(slot);
        }
        slot
    }

    pub fn uniform(&self) -> LightUniform {
        let w = if self.directional { 0.0 } else { 1.0 };
        LightUniform {
            position: [self.position.x, self.position.y, self.position.z, w],
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            spot_direction: self.spot_direction.into(),
            _padding: 0,
        }
    }
}
