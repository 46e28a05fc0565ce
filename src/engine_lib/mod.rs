// src/engine_lib/mod.rs
pub mod camera;
pub mod controller;
pub mod error;
pub mod frame;
pub mod input;
pub mod portal;
pub mod scene_types;
pub mod tunnel;

pub use camera::{Camera, CameraPose};
pub use controller::{CameraController, ControllerSettings, GroundLock};
pub use error::{PortalError, SceneError};
pub use frame::{FrameRecorder, RenderCommand, RenderState, StencilMode};
pub use input::{HostInput, Key, Movement};
pub use portal::{Facing, Portal, PortalSet};
pub use tunnel::Tunnel;
