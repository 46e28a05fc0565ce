// src/engine_lib/controller.rs

use std::rc::Rc;

use glam::{Mat4, Vec3};
use serde::Deserialize;

use crate::engine_lib::camera::{Camera, CameraPose};
use crate::engine_lib::input::{HostInput, Movement};

/// How the eye height is held while the camera is not floating.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundLock {
    /// Horizontal movement only; whatever height the camera had is kept.
    KeepHeight,
    /// Horizontal movement only, and the eye is pinned to this height.
    EyeHeight(f32),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControllerSettings {
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per pixel of mouse travel.
    pub mouse_sensitivity: f32,
    /// `None` leaves pitch unconstrained.
    pub pitch_limit_deg: Option<f32>,
    pub ground_lock: GroundLock,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            move_speed: 7.0,
            mouse_sensitivity: 0.2,
            pitch_limit_deg: Some(89.0),
            ground_lock: GroundLock::KeepHeight,
        }
    }
}

/// First-person free-fly controller. Owns the camera it drives and keeps
/// yaw/pitch (degrees) as the source of truth for its orientation.
pub struct CameraController {
    camera: Camera,
    yaw: f32,
    pitch: f32,
    settings: ControllerSettings,
    frozen: bool,
    floating: bool,
    input: Rc<dyn HostInput>,
}

impl CameraController {
    pub fn new(camera: Camera, settings: ControllerSettings, input: Rc<dyn HostInput>) -> Self {
        let mut controller = Self {
            camera,
            yaw: -90.0,
            pitch: 0.0,
            settings,
            frozen: false,
            floating: true,
            input,
        };
        controller.update_camera_vectors();
        controller
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_floating(&self) -> bool {
        self.floating
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Mouse look. Ignored while frozen or while the cursor is released.
    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        if self.frozen || !self.input.is_cursor_captured() {
            return;
        }
        self.yaw += dx * self.settings.mouse_sensitivity;
        // Screen y grows downward, so dragging down looks down.
        self.pitch -= dy * self.settings.mouse_sensitivity;
        self.clamp_pitch();
        self.update_camera_vectors();
    }

    pub fn move_in(&mut self, movement: Movement, dt: f64) {
        if self.frozen {
            return;
        }
        let velocity = self.settings.move_speed * dt as f32;
        let forward = self.camera.forward();

        let front = if self.floating {
            forward
        } else {
            Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero()
        };
        let right = front.cross(Vec3::Y).normalize_or_zero();
        let up = if self.floating { Vec3::Y } else { Vec3::ZERO };

        let direction = match movement {
            Movement::Forward => front,
            Movement::Backward => -front,
            Movement::Right => right,
            Movement::Left => -right,
            Movement::Upward => up,
            Movement::Downward => -up,
        };

        let mut eye = self.camera.eye() + direction * velocity;
        if !self.floating {
            if let GroundLock::EyeHeight(height) = self.settings.ground_lock {
                eye.y = height;
            }
        }
        self.camera.set_pose(eye, forward);
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
        self.input.set_cursor_captured(false);
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
        self.input.set_cursor_captured(true);
    }

    pub fn toggle_freeze(&mut self) {
        if self.frozen {
            self.unfreeze();
        } else {
            self.freeze();
        }
        log::debug!("camera frozen: {}", self.frozen);
    }

    /// Releases the cursor while the window is in the background and takes
    /// it back on return, unless frozen.
    pub fn set_focused(&mut self, focused: bool) {
        self.input.set_cursor_captured(focused && !self.frozen);
    }

    /// Re-grabs a released cursor after a click into the window.
    pub fn recapture(&mut self) {
        if !self.frozen && !self.input.is_cursor_captured() {
            self.input.set_cursor_captured(true);
        }
    }

    pub fn toggle_floating(&mut self) {
        self.floating = !self.floating;
        log::debug!("camera floating: {}", self.floating);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.camera.set_aspect(aspect);
    }

    pub fn look_at(&mut self, target: Vec3) {
        let eye = self.camera.eye();
        self.set_pose(eye, target - eye);
    }

    fn clamp_pitch(&mut self) {
        if let Some(limit) = self.settings.pitch_limit_deg {
            self.pitch = self.pitch.clamp(-limit, limit);
        }
    }

    fn update_camera_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let forward = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        let eye = self.camera.eye();
        self.camera.set_pose(eye, forward);
    }

    fn sync_angles_from(&mut self, forward: Vec3) {
        let forward = forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return;
        }
        self.pitch = forward.y.clamp(-1.0, 1.0).asin().to_degrees();
        self.yaw = forward.z.atan2(forward.x).to_degrees();
    }
}

impl CameraPose for CameraController {
    fn set_pose(&mut self, eye: Vec3, forward: Vec3) {
        self.sync_angles_from(forward);
        self.camera.set_pose(eye, forward);
    }

    fn eye(&self) -> Vec3 {
        self.camera.eye()
    }

    fn forward(&self) -> Vec3 {
        self.camera.forward()
    }

    fn view_matrix(&self) -> Mat4 {
        self.camera.view_matrix()
    }

    fn projection_matrix(&self) -> Mat4 {
        self.camera.projection_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::input::fake::FakeInput;

    const ALL_MOVES: [Movement; 6] = [
        Movement::Forward,
        Movement::Backward,
        Movement::Right,
        Movement::Left,
        Movement::Upward,
        Movement::Downward,
    ];

    fn controller_with(settings: ControllerSettings) -> (CameraController, Rc<FakeInput>) {
        let input = Rc::new(FakeInput::default());
        let mut camera = Camera::default();
        camera.set_eye(Vec3::new(0.0, 3.0, 0.0));
        input.captured.set(true);
        (CameraController::new(camera, settings, input.clone()), input)
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn starts_looking_down_negative_z() {
        let (controller, _) = controller_with(ControllerSettings::default());
        assert!(close(controller.forward(), Vec3::NEG_Z));
        assert_eq!(controller.yaw(), -90.0);
    }

    #[test]
    fn frozen_move_leaves_pose_unchanged() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.process_mouse(37.0, -12.0);
        controller.freeze();
        let (eye, forward) = (controller.eye(), controller.forward());
        for movement in ALL_MOVES {
            controller.move_in(movement, 0.5);
        }
        controller.process_mouse(100.0, 100.0);
        assert_eq!(controller.eye(), eye);
        assert_eq!(controller.forward(), forward);
    }

    #[test]
    fn toggle_floating_twice_restores_flag() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        let original = controller.is_floating();
        controller.toggle_floating();
        assert_ne!(controller.is_floating(), original);
        controller.toggle_floating();
        assert_eq!(controller.is_floating(), original);
    }

    #[test]
    fn freeze_releases_and_unfreeze_captures_cursor() {
        let (mut controller, input) = controller_with(ControllerSettings::default());
        controller.toggle_freeze();
        assert!(controller.is_frozen());
        controller.toggle_freeze();
        assert!(!controller.is_frozen());
        assert_eq!(*input.capture_calls.borrow(), vec![false, true]);
    }

    #[test]
    fn cursor_follows_window_focus() {
        let (mut controller, input) = controller_with(ControllerSettings::default());
        controller.set_focused(false);
        assert!(!input.is_cursor_captured());
        controller.process_mouse(50.0, 0.0);
        assert_eq!(controller.yaw(), -90.0);

        controller.set_focused(true);
        assert!(input.is_cursor_captured());
        controller.process_mouse(50.0, 0.0);
        assert_eq!(controller.yaw(), -80.0);
        assert_eq!(*input.capture_calls.borrow(), vec![false, true]);
    }

    #[test]
    fn frozen_camera_stays_released_until_unfrozen() {
        let (mut controller, input) = controller_with(ControllerSettings::default());
        controller.freeze();
        controller.set_focused(false);
        controller.set_focused(true);
        controller.recapture();
        assert!(!input.is_cursor_captured());

        controller.unfreeze();
        controller.set_focused(false);
        controller.recapture();
        assert!(input.is_cursor_captured());
        assert_eq!(*input.capture_calls.borrow(), vec![false, false, false, true, false, true]);
    }

    #[test]
    fn forward_movement_scales_with_speed_and_dt() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.move_in(Movement::Forward, 0.5);
        assert!(close(controller.eye(), Vec3::new(0.0, 3.0, -3.5)));
        controller.move_in(Movement::Right, 1.0);
        assert!(close(controller.eye(), Vec3::new(7.0, 3.0, -3.5)));
    }

    #[test]
    fn ground_locked_movement_stays_horizontal() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.toggle_floating();
        controller.process_mouse(0.0, 150.0);
        assert!(controller.forward().y < -0.4);

        controller.move_in(Movement::Forward, 1.0);
        controller.move_in(Movement::Upward, 1.0);
        controller.move_in(Movement::Downward, 1.0);
        assert!((controller.eye().y - 3.0).abs() < 1e-5);
        assert!((controller.eye() - Vec3::new(0.0, 3.0, 0.0)).length() > 6.9);
    }

    #[test]
    fn eye_height_lock_snaps_vertical_position() {
        let settings = ControllerSettings {
            ground_lock: GroundLock::EyeHeight(1.8),
            ..ControllerSettings::default()
        };
        let (mut controller, _) = controller_with(settings);
        controller.toggle_floating();
        controller.move_in(Movement::Left, 0.1);
        assert!((controller.eye().y - 1.8).abs() < 1e-6);
    }

    #[test]
    fn mouse_updates_yaw_and_pitch() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.process_mouse(10.0, 5.0);
        assert!((controller.yaw() - -88.0).abs() < 1e-4);
        assert!((controller.pitch() - -1.0).abs() < 1e-4);
    }

    #[test]
    fn pitch_limit_is_optional() {
        let (mut clamped, _) = controller_with(ControllerSettings::default());
        clamped.process_mouse(0.0, -1000.0);
        assert_eq!(clamped.pitch(), 89.0);

        let (mut free, _) = controller_with(ControllerSettings {
            pitch_limit_deg: None,
            ..ControllerSettings::default()
        });
        free.process_mouse(0.0, -1000.0);
        assert_eq!(free.pitch(), 200.0);
    }

    #[test]
    fn unclamped_pitch_straight_up_keeps_view_finite() {
        let (mut free, _) = controller_with(ControllerSettings {
            pitch_limit_deg: None,
            ..ControllerSettings::default()
        });
        free.process_mouse(0.0, -450.0);
        assert_eq!(free.pitch(), 90.0);
        assert!(free.view_matrix().is_finite());
    }

    #[test]
    fn set_pose_rederives_angles() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.set_pose(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(controller.yaw().abs() < 1e-4);
        assert!(controller.pitch().abs() < 1e-4);

        // Mouse look continues from the new heading instead of snapping back.
        controller.process_mouse(0.0, 0.0);
        assert!(close(controller.forward(), Vec3::X));
        assert!(close(controller.eye(), Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn look_at_points_camera_at_target() {
        let (mut controller, _) = controller_with(ControllerSettings::default());
        controller.look_at(Vec3::new(0.0, 1.0, 3.0));
        let expected = Vec3::new(0.0, -2.0, 3.0).normalize();
        assert!(close(controller.forward(), expected));
        assert!((controller.yaw() - 90.0).abs() < 1e-3);
    }
}
