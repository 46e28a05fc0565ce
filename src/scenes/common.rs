// src/scenes/common.rs

use glam::{Vec2, Vec3};

use crate::engine_lib::camera::CameraPose;
use crate::engine_lib::controller::CameraController;
use crate::engine_lib::error::SceneError;
use crate::engine_lib::input::{HostInput, Key, MOVEMENT_BINDINGS};
use crate::engine_lib::scene_types::{
    require_image, require_shader, AssetMap, BatchId, Material, SceneResources, SkyboxShader, TextureId,
    TextureSource,
};
use crate::rendering_lib::geometry::Mesh;
use crate::rendering_lib::texture::cube_faces_from_image;

pub const CHECKERBOARD: &str = "checkerboard.png";
pub const ROCK_TUNNEL: &str = "rock-tunnel";
pub const GALAXY_TEXTURE: &str = "galaxy-texture";
pub const SKYBOX_VERTEX: &str = "skybox.vert";
pub const SKYBOX_FRAGMENT: &str = "skybox.frag";

pub const REQUIRED_ASSETS: [&str; 5] = [CHECKERBOARD, ROCK_TUNNEL, GALAXY_TEXTURE, SKYBOX_VERTEX, SKYBOX_FRAGMENT];

pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];
pub const SKYBOX_SIZE: f32 = 300.0;

pub const START_EYE: Vec3 = Vec3::new(0.0, 3.0, 0.0);
pub const START_TARGET: Vec3 = Vec3::new(0.0, 1.0, 3.0);

/// Resources both scenes start from.
pub struct SharedAssets {
    pub floor_texture: TextureId,
    pub tunnel_texture: TextureId,
    pub skybox: BatchId,
}

pub fn load_shared_assets(assets: &AssetMap, resources: &mut SceneResources) -> Result<SharedAssets, SceneError> {
    let floor = require_image(assets, CHECKERBOARD)?;
    let tunnel = require_image(assets, ROCK_TUNNEL)?;
    let galaxy = require_image(assets, GALAXY_TEXTURE)?;
    let vertex = require_shader(assets, SKYBOX_VERTEX)?;
    let fragment = require_shader(assets, SKYBOX_FRAGMENT)?;

    let floor_texture = resources.add_texture(TextureSource::Image2d(floor.clone()));
    let tunnel_texture = resources.add_texture(TextureSource::Image2d(tunnel.clone()));
    let cube = resources.add_texture(TextureSource::CubeMap(Box::new(cube_faces_from_image(galaxy))));
    resources.skybox_shader = Some(SkyboxShader {
        vertex: vertex.to_string(),
        fragment: fragment.to_string(),
    });
    let skybox = resources.add_batch(Mesh::cube(SKYBOX_SIZE), Material::Skybox(cube));

    Ok(SharedAssets {
        floor_texture,
        tunnel_texture,
        skybox,
    })
}

/// Places the camera at the common start pose, ground-locked.
pub fn init_camera(controller: &mut CameraController) {
    let forward = controller.forward();
    controller.set_pose(START_EYE, forward);
    controller.look_at(START_TARGET);
    controller.toggle_floating();
}

/// Turns absolute cursor positions into deltas. The first event only seeds.
#[derive(Debug, Default)]
pub struct MouseTracker {
    last: Option<Vec2>,
}

impl MouseTracker {
    pub fn delta(&mut self, position: Vec2) -> Option<Vec2> {
        let delta = self.last.map(|last| position - last);
        self.last = Some(position);
        delta
    }
}

#[derive(Debug, Default)]
pub struct FrameClock {
    last: Option<f64>,
}

impl FrameClock {
    /// Seconds since the previous tick; zero on the first.
    pub fn tick(&mut self, elapsed: f64) -> f64 {
        let dt = self.last.map_or(0.0, |last| (elapsed - last).max(0.0));
        self.last = Some(elapsed);
        dt
    }

    pub fn last(&self) -> f64 {
        self.last.unwrap_or(0.0)
    }
}

pub fn poll_movement(controller: &mut CameraController, input: &dyn HostInput, dt: f64) {
    for (key, movement) in MOVEMENT_BINDINGS {
        if input.is_key_down(key) {
            controller.move_in(movement, dt);
        }
    }
}

/// F and T behave the same in every scene. Returns whether the key was used.
pub fn handle_camera_toggle(controller: &mut CameraController, key: Key) -> bool {
    match key {
        Key::F => controller.toggle_freeze(),
        Key::T => controller.toggle_floating(),
        _ => return false,
    }
    true
}
