// src/engine_lib/camera.rs

use glam::{Mat4, Vec3};

/// Anything that can be posed and viewed through. Implemented by the plain
/// `Camera` and by the `CameraController` that drives one, so portal warps
/// can move either.
pub trait CameraPose {
    fn set_pose(&mut self, eye: Vec3, forward: Vec3);
    fn eye(&self) -> Vec3;
    fn forward(&self) -> Vec3;
    fn view_matrix(&self) -> Mat4;
    fn projection_matrix(&self) -> Mat4;

    /// Camera-to-world transform.
    fn world_matrix(&self) -> Mat4 {
        self.view_matrix().inverse()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    eye: Vec3,
    forward: Vec3,
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(fov_y_deg: f32, znear: f32, zfar: f32) -> Self {
        Self {
            eye: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            fov_y_deg,
            aspect: 4.0 / 3.0,
            znear,
            zfar,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn set_eye(&mut self, eye: Vec3) {
        self.eye = eye;
    }

    pub fn look_at(&mut self, target: Vec3) {
        let forward = target - self.eye;
        self.set_pose(self.eye, forward);
    }
}

/// World up, unless `forward` is (nearly) vertical; then the horizontal
/// axis the camera was tipping away from.
fn up_for(forward: Vec3) -> Vec3 {
    if forward.cross(Vec3::Y).length_squared() < 1e-8 {
        Vec3::Z * -forward.y.signum()
    } else {
        Vec3::Y
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(35.0, 0.1, 1000.0)
    }
}

impl CameraPose for Camera {
    fn set_pose(&mut self, eye: Vec3, forward: Vec3) {
        self.eye = eye;
        let forward = forward.normalize_or_zero();
        if forward != Vec3::ZERO {
            self.forward = forward;
        }
    }

    fn eye(&self) -> Vec3 {
        self.eye
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.forward, up_for(self.forward))
    }

    fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_deg.to_radians(), self.aspect, self.znear, self.zfar)
    }
}
