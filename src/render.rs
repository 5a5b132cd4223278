//! The renderable capability and the handles scenes keep to renderables.
//!
//! A scene never owns what it draws. It keeps [`Node`]s, shared handles to
//! `dyn Renderable` objects whose lifetime is controlled by whoever created them.
//! Each node is filed under one [`Category`] which decides the pass it draws in:
//!
//! - `Opaque` depth tested and depth writing, alpha tested
//! - `Shader` like opaque but drawn while the scene's shader program is active
//! - `Blended` depth tested without depth writes
//! - `AlwaysOnTop` drawn without depth testing over the 3D world
//! - `Overlay` screen space 2D elements drawn last with an orthographic projection
//!

use std::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::Vector2;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};

use crate::{camera::Camera, context::RenderTarget, error::SceneError};

/// Anything a scene can draw.
///
/// Concrete shapes (meshes, cubes, images, text, skyboxes) implement this trait;
/// the scene only ever talks to them through it.
pub trait Renderable {
    /// Invisible renderables are skipped by every pass and can't be picked.
    fn visible(&self) -> bool {
        true
    }

    /// Issues the draw calls for this object on `target`.
    ///
    /// `camera` is the camera of the frame in the skybox and 3D passes, if any,
    /// with the view transform already applied. Overlay elements get `None`.
    fn render(&mut self, target: &mut dyn RenderTarget, camera: Option<&dyn Camera>);

    /// Called when the renderable is added to a scene.
    fn attach(&mut self, _scene: &SceneTag) {}
}

/// Shared, non-owning handle to a renderable.
///
/// Two nodes are equal when they point at the same renderable.
#[derive(Clone)]
pub struct Node(Rc<RefCell<dyn Renderable>>);

impl Node {
    pub fn new<R: Renderable + 'static>(renderable: R) -> Self {
        Node(Rc::new(RefCell::new(renderable)))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn borrow(&self) -> Ref<'_, dyn Renderable> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, dyn Renderable> {
        self.0.borrow_mut()
    }

    /// Renders the node if it is visible. Returns whether a draw happened.
    pub(crate) fn try_render(
        &self,
        target: &mut dyn RenderTarget,
        camera: Option<&dyn Camera>,
    ) -> Result<bool, SceneError> {
        let mut renderable = self.0.try_borrow_mut().map_err(|_| {
            SceneError::PreconditionViolated(
                "renderable is borrowed while the scene renders it".to_string(),
            )
        })?;
        if !renderable.visible() {
            return Ok(false);
        }
        renderable.render(target, camera);
        Ok(true)
    }

    pub(crate) fn attach(&self, tag: &SceneTag) {
        match self.0.try_borrow_mut() {
            Ok(mut renderable) => renderable.attach(tag),
            Err(_) => log::warn!("renderable is borrowed, it was added without a scene tag"),
        }
    }
}

impl<R: Renderable + 'static> From<Rc<RefCell<R>>> for Node {
    fn from(renderable: Rc<RefCell<R>>) -> Self {
        Node(renderable)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// One node or a batch of nodes, accepted by every `add_*` / `remove_*` call.
pub trait IntoNodes {
    fn into_nodes(self) -> Vec<Node>;
}

impl IntoNodes for Node {
    fn into_nodes(self) -> Vec<Node> {
        vec![self]
    }
}

impl IntoNodes for &Node {
    fn into_nodes(self) -> Vec<Node> {
        vec![self.clone()]
    }
}

impl IntoNodes for Vec<Node> {
    fn into_nodes(self) -> Vec<Node> {
        self
    }
}

impl IntoNodes for &Vec<Node> {
    fn into_nodes(self) -> Vec<Node> {
        self.clone()
    }
}

impl IntoNodes for &[Node] {
    fn into_nodes(self) -> Vec<Node> {
        self.to_vec()
    }
}

impl<const N: usize> IntoNodes for [Node; N] {
    fn into_nodes(self) -> Vec<Node> {
        self.into()
    }
}

/// The pass category a node is filed under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Opaque,
    Shader,
    Blended,
    AlwaysOnTop,
    Overlay,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Opaque,
        Category::Shader,
        Category::Blended,
        Category::AlwaysOnTop,
        Category::Overlay,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Opaque => "opaque",
            Category::Shader => "shader",
            Category::Blended => "blended",
            Category::AlwaysOnTop => "always-on-top",
            Category::Overlay => "overlay",
        };
        f.write_str(name)
    }
}

/// Maps the logical 2D coordinate space of overlays to framebuffer pixels.
///
/// Both spaces have their origin in the top left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenTransform {
    pub scale: Vector2<f32>,
    pub framebuffer: PhysicalSize<u32>,
}

impl ScreenTransform {
    pub fn new(framebuffer: PhysicalSize<u32>, logical: LogicalSize<u32>) -> Self {
        let ratio = |physical: u32, logical: u32| {
            if logical == 0 {
                1.0
            } else {
                physical as f32 / logical as f32
            }
        };
        Self {
            scale: Vector2::new(
                ratio(framebuffer.width, logical.width),
                ratio(framebuffer.height, logical.height),
            ),
            framebuffer,
        }
    }

    pub fn to_framebuffer(&self, x: f32, y: f32) -> PhysicalPosition<f32> {
        PhysicalPosition::new(x * self.scale.x, y * self.scale.y)
    }

    pub fn to_logical(&self, position: PhysicalPosition<f64>) -> Vector2<f32> {
        Vector2::new(
            position.x as f32 / self.scale.x,
            position.y as f32 / self.scale.y,
        )
    }

    /// Scissor rectangle `[x, y, width, height]` in framebuffer pixels for a
    /// logical rectangle, clamped to the framebuffer.
    ///
    /// A negative width or height extends the rectangle to the left or upwards.
    pub fn clip_rect(&self, x: f32, y: f32, width: f32, height: f32) -> [u32; 4] {
        let clamp = |v: f32, max: u32| (v.max(0.0) as u32).min(max);
        let (x0, x1) = (x.min(x + width), x.max(x + width));
        let (y0, y1) = (y.min(y + height), y.max(y + height));
        let left = clamp(x0 * self.scale.x, self.framebuffer.width);
        let top = clamp(y0 * self.scale.y, self.framebuffer.height);
        let right = clamp(x1 * self.scale.x, self.framebuffer.width);
        let bottom = clamp(y1 * self.scale.y, self.framebuffer.height);
        [left, top, right.saturating_sub(left), bottom.saturating_sub(top)]
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self {
            scale: Vector2::new(1.0, 1.0),
            framebuffer: PhysicalSize::new(0, 0),
        }
    }
}

/// Unique id of a scene within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SceneId(u64);

impl SceneId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        SceneId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Back-reference a renderable receives when it is added to a scene.
///
/// Overlay elements keep it to translate their logical coordinates into screen
/// space, e.g. for clipping. The screen transform is refreshed every frame.
#[derive(Clone, Debug)]
pub struct SceneTag {
    id: SceneId,
    screen: Rc<Cell<ScreenTransform>>,
}

impl SceneTag {
    pub(crate) fn new(id: SceneId, screen: Rc<Cell<ScreenTransform>>) -> Self {
        Self { id, screen }
    }

    pub fn scene(&self) -> SceneId {
        self.id
    }

    pub fn screen(&self) -> ScreenTransform {
        self.screen.get()
    }
}
