//! Cameras supply the view transform of a frame.
//!
//! A camera never draws anything. The scene asks it to push its view onto the
//! target's matrix stack around the 3D passes, and to apply only its rotation
//! while the skybox is drawn so the skybox follows the view direction but never
//! moves closer.

use cgmath::{Deg, Matrix4, Point3, Vector3};

use crate::context::{Projection, RenderTarget};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// The view transform capability the scene relies on.
pub trait Camera {
    /// Full world to eye transform.
    fn view_matrix(&self) -> Matrix4<f32>;

    /// The rotational part of [`Camera::view_matrix`].
    fn rotation_matrix(&self) -> Matrix4<f32>;

    /// Saves the current transform and applies the view.
    fn push(&self, target: &mut dyn RenderTarget) {
        target.push_matrix();
        target.mul_matrix(self.view_matrix());
    }

    /// Restores the transform saved by [`Camera::push`].
    fn pop(&self, target: &mut dyn RenderTarget) {
        target.pop_matrix();
    }

    /// Applies the rotation only, for geometry at infinite distance.
    fn set_skybox_data(&self, target: &mut dyn RenderTarget) {
        target.mul_matrix(self.rotation_matrix());
    }
}

/// Euler rotation in degrees applied in x, y, z order.
fn rotation(rotation: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_angle_x(Deg(rotation.x))
        * Matrix4::from_angle_y(Deg(rotation.y))
        * Matrix4::from_angle_z(Deg(rotation.z))
}

/// A first person camera looking from `position`.
#[derive(Clone, Debug, PartialEq)]
pub struct LookFromCamera {
    pub position: Point3<f32>,
    /// Degrees around the x, y and z axis.
    pub rotation: Vector3<f32>,
}

impl LookFromCamera {
    pub fn new<P: Into<Point3<f32>>, R: Into<Vector3<f32>>>(position: P, rotation: R) -> Self {
        Self {
            position: position.into(),
            rotation: rotation.into(),
        }
    }
}

impl Camera for LookFromCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let p = self.position;
        rotation(self.rotation) * Matrix4::from_translation(Vector3::new(-p.x, -p.y, -p.z))
    }

    fn rotation_matrix(&self) -> Matrix4<f32> {
        rotation(self.rotation)
    }
}

/// An orbit camera circling `target` at `distance`.
#[derive(Clone, Debug, PartialEq)]
pub struct LookAtCamera {
    pub target: Point3<f32>,
    /// Degrees around the x, y and z axis.
    pub rotation: Vector3<f32>,
    pub distance: f32,
}

impl LookAtCamera {
    pub fn new<P: Into<Point3<f32>>>(target: P, distance: f32) -> Self {
        Self {
            target: target.into(),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            distance,
        }
    }
}

impl Camera for LookAtCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let t = self.target;
        Matrix4::from_translation(Vector3::new(0.0, 0.0, -self.distance))
            * rotation(self.rotation)
            * Matrix4::from_translation(Vector3::new(-t.x, -t.y, -t.z))
    }

    fn rotation_matrix(&self) -> Matrix4<f32> {
        rotation(self.rotation)
    }
}

/// View projection matrix in the layout shaders expect.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &dyn Camera, projection: &Projection) {
        self.view_proj =
            (OPENGL_TO_WGPU_MATRIX * projection.to_matrix() * camera.view_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}
