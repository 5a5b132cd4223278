//! Readback based object picking.
//!
//! The picker piggybacks on the normal frame: after each renderable is drawn it
//! reads the framebuffer at the cursor and decides whether that draw touched the
//! pixel. Two rules are used depending on the pass:
//!
//! 1. Depth passes (opaque, shader): the object becomes the candidate when the
//!    depth under the cursor dropped strictly below the smallest depth seen so
//!    far. The nearest object wins regardless of draw order.
//! 2. Colour passes (blend, always-on-top): the object becomes the candidate when
//!    the colour under the cursor differs from the last recorded colour. The last
//!    draw that changes the pixel wins.
//!
//! Colour comparison is exact. A draw that leaves the pixel with the very same
//! colour, e.g. a sprite of the background colour, is not detected.
//!
//! Each test costs one readback per rendered object.

use crate::{context::RenderTarget, render::Node};

/// Per-frame picking state.
#[derive(Debug)]
pub struct Picker {
    cursor: Option<(u32, u32)>,
    last_depth: f32,
    last_color: Option<[f32; 4]>,
    candidate: Option<Node>,
    samples: usize,
}

impl Picker {
    /// A picker sampling at `cursor`. Without a cursor nothing can be picked.
    pub fn new(cursor: Option<(u32, u32)>) -> Self {
        Self {
            cursor,
            last_depth: 1.0,
            last_color: None,
            candidate: None,
            samples: 0,
        }
    }

    /// Depth test after `node` was drawn.
    pub fn sample_depth(&mut self, target: &mut dyn RenderTarget, node: &Node) {
        let Some((x, y)) = self.cursor else {
            return;
        };
        self.samples += 1;
        if let Some(depth) = target.read_depth(x, y) {
            if depth < self.last_depth {
                log::trace!("{:?} is nearest at depth {}", node, depth);
                self.last_depth = depth;
                self.candidate = Some(node.clone());
            }
        }
    }

    /// Records the colour under the cursor before a colour tested pass.
    pub fn sample_background(&mut self, target: &mut dyn RenderTarget) {
        let Some((x, y)) = self.cursor else {
            return;
        };
        self.samples += 1;
        self.last_color = target.read_color(x, y);
    }

    /// Colour test after `node` was drawn.
    pub fn sample_color(&mut self, target: &mut dyn RenderTarget, node: &Node) {
        let Some((x, y)) = self.cursor else {
            return;
        };
        self.samples += 1;
        let Some(color) = target.read_color(x, y) else {
            return;
        };
        if self.last_color != Some(color) {
            log::trace!("{:?} changed the cursor pixel to {:?}", node, color);
            self.last_color = Some(color);
            self.candidate = Some(node.clone());
        }
    }

    /// Number of readbacks issued so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn finish(self) -> Option<Node> {
        self.candidate
    }
}
