//! Engine data structures: the pass tree, lights and texture handles.
//!
//! - `scene_graph` holds the per-pass sequences of renderables a scene draws
//! - `light` contains lights and the shared pool of hardware light slots
//! - `texture` contains texture and shader program handles

pub mod light;
pub mod scene_graph;
pub mod texture;
