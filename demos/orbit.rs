//! Orbits a camera around a cube behind a pane of glass, picks whatever is
//! under the window centre each frame and writes the last frame to `orbit.png`.
//!
//! Run with `RUST_LOG=debug cargo run --example orbit`, add `-- --gpu` to draw
//! with the wgpu target instead of the software framebuffer.

use std::{cell::RefCell, rc::Rc};

use layer_ngin::{
    Context, Deg, DisplayConfig, Matrix4, PhysicalPosition, Point3, Renderable, Scene,
    SceneConfig, Transform, Vector3,
    camera::{Camera, LookAtCamera},
    context::{Quad, RenderTarget},
    data_structures::light::{Light, LightPool},
    render::Node,
};

struct Cube {
    name: &'static str,
    size: f32,
    spin: Deg<f32>,
}

impl Cube {
    fn faces(&self) -> [Quad; 6] {
        let s = self.size / 2.0;
        let p = |x: f32, y: f32, z: f32| Point3::new(x * s, y * s, z * s);
        let face = |corners: [Point3<f32>; 4], color: [f32; 4]| Quad { corners, color };
        [
            face(
                [p(-1., -1., 1.), p(1., -1., 1.), p(1., 1., 1.), p(-1., 1., 1.)],
                [0.9, 0.2, 0.2, 1.0],
            ),
            face(
                [p(-1., -1., -1.), p(-1., 1., -1.), p(1., 1., -1.), p(1., -1., -1.)],
                [0.2, 0.9, 0.2, 1.0],
            ),
            face(
                [p(-1., 1., -1.), p(-1., 1., 1.), p(1., 1., 1.), p(1., 1., -1.)],
                [0.2, 0.2, 0.9, 1.0],
            ),
            face(
                [p(-1., -1., -1.), p(1., -1., -1.), p(1., -1., 1.), p(-1., -1., 1.)],
                [0.9, 0.9, 0.2, 1.0],
            ),
            face(
                [p(1., -1., -1.), p(1., 1., -1.), p(1., 1., 1.), p(1., -1., 1.)],
                [0.9, 0.2, 0.9, 1.0],
            ),
            face(
                [p(-1., -1., -1.), p(-1., -1., 1.), p(-1., 1., 1.), p(-1., 1., -1.)],
                [0.2, 0.9, 0.9, 1.0],
            ),
        ]
    }
}

impl Renderable for Cube {
    fn render(&mut self, target: &mut dyn RenderTarget, _camera: Option<&dyn Camera>) {
        target.push_matrix();
        target.mul_matrix(Matrix4::from_angle_y(self.spin));
        for face in self.faces() {
            target.draw_quad(&face);
        }
        target.pop_matrix();
    }
}

struct Sprite {
    quad: Quad,
}

impl Renderable for Sprite {
    fn render(&mut self, target: &mut dyn RenderTarget, _camera: Option<&dyn Camera>) {
        target.draw_quad(&self.quad);
    }
}

/// Renders the orbit into `ctx` and returns the camera of the last frame.
fn run<T: RenderTarget>(ctx: &mut Context<T>) -> anyhow::Result<LookAtCamera> {
    let size = ctx.display.size();
    ctx.display.set_cursor(PhysicalPosition::new(
        f64::from(size.width) / 2.0,
        f64::from(size.height) / 2.0,
    ));

    let mut scene = Scene::with_config(
        LightPool::new(),
        SceneConfig {
            pick: true,
            ..Default::default()
        },
    );
    let cube = Rc::new(RefCell::new(Cube {
        name: "cube",
        size: 2.0,
        spin: Deg(0.0),
    }));
    scene.add_3d(Node::from(cube.clone()));
    let glass = Node::new(Sprite {
        quad: Quad::rect(-0.5, -0.5, 1.0, 1.0, 2.5, [0.8, 0.9, 1.0, 0.35]),
    });
    scene.add_3d_blend(&glass);
    scene.add_2d(Node::new(Sprite {
        quad: Quad::rect(8.0, 8.0, 96.0, 12.0, 0.0, [1.0, 1.0, 1.0, 0.8]),
    }));
    scene.add_light(Light::point(Vector3::new(0.0, 4.0, 4.0)).shared())?;

    let mut camera = LookAtCamera::new([0.0, 0.0, 0.0], 8.0);
    camera.rotation.x = 20.0;
    for frame in 0..36 {
        camera.rotation.y = frame as f32 * 10.0;
        cube.borrow_mut().spin = Deg(frame as f32 * 5.0);

        ctx.clear();
        let picked = scene.render(ctx, Some(&camera));
        let name = match picked {
            Some(node) if node == glass => "glass",
            Some(_) => cube.borrow().name,
            None => "nothing",
        };
        let stats = scene.last_stats();
        log::info!(
            "frame {:2}: {} under the cursor, {} draws, {} samples in {:?}",
            frame,
            name,
            stats.draws,
            stats.samples,
            stats.elapsed
        );
    }
    Ok(camera)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = DisplayConfig {
        clear_colour: wgpu::Color {
            r: 0.05,
            g: 0.05,
            b: 0.1,
            a: 1.0,
        },
        ..DisplayConfig::default()
    };

    let camera = if std::env::args().any(|arg| arg == "--gpu") {
        let mut ctx = Context::gpu(config)?;
        let camera = run(&mut ctx)?;
        ctx.target.save("orbit.png")?;
        camera
    } else {
        let mut ctx = Context::headless(config);
        let camera = run(&mut ctx)?;
        ctx.target.save("orbit.png")?;
        camera
    };

    let eye = camera
        .view_matrix()
        .inverse_transform()
        .map(|m| m.transform_point(Point3::new(0.0, 0.0, 0.0)));
    log::debug!("final eye position {:?}", eye);
    log::info!("wrote orbit.png");
    Ok(())
}
