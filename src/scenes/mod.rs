// src/scenes/mod.rs
pub mod common;
pub mod tunnel;
pub mod tunnel_portal;

use std::rc::Rc;

use glam::Vec2;
use serde::Deserialize;

use crate::engine_lib::camera::Camera;
use crate::engine_lib::controller::{CameraController, ControllerSettings};
use crate::engine_lib::error::SceneError;
use crate::engine_lib::frame::FrameRecorder;
use crate::engine_lib::input::{HostInput, Key};
use crate::engine_lib::scene_types::{AssetMap, SceneResources};

pub use tunnel::TunnelScene;
pub use tunnel_portal::TunnelPortalScene;

/// What the host drives every frame.
pub trait Scene {
    fn name(&self) -> &'static str;
    /// Builds all geometry and resources. Missing assets are fatal.
    fn setup(&mut self, assets: &AssetMap) -> Result<(), SceneError>;
    /// `elapsed` is seconds since the host started.
    fn update(&mut self, elapsed: f64);
    fn draw(&self, frame: &mut FrameRecorder);
    fn handle_mouse_move(&mut self, position: Vec2);
    fn handle_key_down(&mut self, key: Key);
    fn camera(&self) -> &CameraController;
    fn camera_mut(&mut self) -> &mut CameraController;
    fn resources(&self) -> &SceneResources;

    fn set_aspect(&mut self, aspect: f32) {
        self.camera_mut().set_aspect(aspect);
    }

    fn warp_count(&self) -> usize {
        0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    Tunnel,
    #[default]
    TunnelPortal,
}

impl SceneKind {
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::Digit1 => Some(SceneKind::Tunnel),
            Key::Digit2 => Some(SceneKind::TunnelPortal),
            _ => None,
        }
    }
}

/// Shared construction inputs for every scene.
#[derive(Clone)]
pub struct SceneContext {
    pub input: Rc<dyn HostInput>,
    pub camera: Camera,
    pub controller: ControllerSettings,
}

impl SceneContext {
    pub fn controller(&self) -> CameraController {
        CameraController::new(self.camera.clone(), self.controller.clone(), self.input.clone())
    }
}

pub enum ActiveScene {
    Tunnel(TunnelScene),
    TunnelPortal(TunnelPortalScene),
}

impl ActiveScene {
    pub fn new(kind: SceneKind, context: &SceneContext) -> Self {
        match kind {
            SceneKind::Tunnel => ActiveScene::Tunnel(TunnelScene::new(context)),
            SceneKind::TunnelPortal => ActiveScene::TunnelPortal(TunnelPortalScene::new(context)),
        }
    }

    pub fn kind(&self) -> SceneKind {
        match self {
            ActiveScene::Tunnel(_) => SceneKind::Tunnel,
            ActiveScene::TunnelPortal(_) => SceneKind::TunnelPortal,
        }
    }

    fn inner(&self) -> &dyn Scene {
        match self {
            ActiveScene::Tunnel(scene) => scene,
            ActiveScene::TunnelPortal(scene) => scene,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Scene {
        match self {
            ActiveScene::Tunnel(scene) => scene,
            ActiveScene::TunnelPortal(scene) => scene,
        }
    }
}

impl Scene for ActiveScene {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn setup(&mut self, assets: &AssetMap) -> Result<(), SceneError> {
        self.inner_mut().setup(assets)
    }

    fn update(&mut self, elapsed: f64) {
        self.inner_mut().update(elapsed)
    }

    fn draw(&self, frame: &mut FrameRecorder) {
        self.inner().draw(frame)
    }

    fn handle_mouse_move(&mut self, position: Vec2) {
        self.inner_mut().handle_mouse_move(position)
    }

    fn handle_key_down(&mut self, key: Key) {
        self.inner_mut().handle_key_down(key)
    }

    fn camera(&self) -> &CameraController {
        self.inner().camera()
    }

    fn camera_mut(&mut self) -> &mut CameraController {
        self.inner_mut().camera_mut()
    }

    fn resources(&self) -> &SceneResources {
        self.inner().resources()
    }

    fn set_aspect(&mut self, aspect: f32) {
        self.inner_mut().set_aspect(aspect)
    }

    fn warp_count(&self) -> usize {
        self.inner().warp_count()
    }
}

/// Sole owner of the running scene.
pub struct SceneSlot {
    active: ActiveScene,
    context: SceneContext,
}

impl SceneSlot {
    pub fn new(kind: SceneKind, context: SceneContext, assets: &AssetMap) -> Result<Self, SceneError> {
        let mut active = ActiveScene::new(kind, &context);
        active.setup(assets)?;
        log::info!("scene `{}` ready", active.name());
        Ok(Self { active, context })
    }

    pub fn scene(&self) -> &ActiveScene {
        &self.active
    }

    pub fn scene_mut(&mut self) -> &mut ActiveScene {
        &mut self.active
    }

    pub fn kind(&self) -> SceneKind {
        self.active.kind()
    }

    /// Sets up the new scene before dropping the old one; on failure the
    /// current scene keeps running.
    pub fn switch_to(&mut self, kind: SceneKind, assets: &AssetMap) -> Result<(), SceneError> {
        let mut next = ActiveScene::new(kind, &self.context);
        next.setup(assets)?;
        next.set_aspect(self.active.camera().camera().aspect);
        log::info!("switched scene `{}` -> `{}`", self.active.name(), next.name());
        self.active = next;
        Ok(())
    }
}
