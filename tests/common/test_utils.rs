use std::{cell::RefCell, rc::Rc};

use layer_ngin::{
    camera::Camera,
    context::{Context, Quad, RenderTarget},
    data_structures::{
        light::SharedLight,
        texture::{ProgramId, ShaderProgram},
    },
    display::DisplayConfig,
    pipelines::PassState,
    render::{Node, Renderable, SceneTag},
};

pub const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
pub const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
pub const BLUE: [f32; 4] = [0.0, 0.0, 1.0, 1.0];
pub const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Names of the renderables in the order they were drawn.
pub type FrameLog = Rc<RefCell<Vec<String>>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn frame_log() -> FrameLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// A headless 640x480 context, cleared, with the cursor in the centre.
pub fn centred_context() -> Context {
    init_logger();
    let mut ctx = Context::headless(DisplayConfig::default());
    ctx.clear();
    ctx.display
        .set_cursor(layer_ngin::PhysicalPosition::new(320.0, 240.0));
    ctx
}

/// A square of side 2 around the view axis at eye depth `z` (negative is in
/// front of the camera).
pub fn facing_quad(z: f32, color: [f32; 4]) -> Quad {
    Quad::rect(-1.0, -1.0, 2.0, 2.0, z, color)
}

/// A renderable that logs its draws and the state it was drawn in.
pub struct Recorder {
    pub name: String,
    pub log: FrameLog,
    pub quad: Option<Quad>,
    pub visible: bool,
    pub states: Vec<PassState>,
    /// Whether a camera was passed, per draw.
    pub cameras: Vec<bool>,
    pub tag: Option<SceneTag>,
}

impl Recorder {
    pub fn new(name: &str, log: &FrameLog, quad: Option<Quad>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            name: name.to_string(),
            log: log.clone(),
            quad,
            visible: true,
            states: Vec::new(),
            cameras: Vec::new(),
            tag: None,
        }))
    }
}

impl Renderable for Recorder {
    fn visible(&self) -> bool {
        self.visible
    }

    fn render(&mut self, target: &mut dyn RenderTarget, camera: Option<&dyn Camera>) {
        self.log.borrow_mut().push(self.name.clone());
        self.states.push(target.state());
        self.cameras.push(camera.is_some());
        if let Some(quad) = &self.quad {
            target.draw_quad(quad);
        }
    }

    fn attach(&mut self, scene: &SceneTag) {
        self.tag = Some(scene.clone());
    }
}

/// A recorder and the node handle a scene keeps to it.
pub fn recorder(name: &str, log: &FrameLog, quad: Option<Quad>) -> (Rc<RefCell<Recorder>>, Node) {
    let recorder = Recorder::new(name, log, quad);
    let node = Node::from(recorder.clone());
    (recorder, node)
}

/// Records the slot of every light while it is drawn.
pub struct LightSpy {
    pub lights: Vec<SharedLight>,
    pub seen: Vec<Vec<Option<usize>>>,
}

impl Renderable for LightSpy {
    fn render(&mut self, _target: &mut dyn RenderTarget, _camera: Option<&dyn Camera>) {
        let slots = self
            .lights
            .iter()
            .map(|light| light.borrow().slot().map(|slot| slot.index()))
            .collect();
        self.seen.push(slots);
    }
}

/// A shader program that logs when it is activated.
pub struct LoggingProgram {
    pub id: ProgramId,
    pub log: FrameLog,
}

impl ShaderProgram for LoggingProgram {
    fn run(&self, target: &mut dyn RenderTarget) {
        self.log.borrow_mut().push(format!("program {}", self.id.0));
        target.use_program(Some(self.id));
    }
}

pub fn rgba(color: [f32; 4]) -> image::Rgba<u8> {
    let f_to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba(color.map(f_to_u8))
}
