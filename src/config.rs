// src/config.rs
//! Application settings loaded from TOML. Every section uses
//! `#[serde(default)]`, so a file only needs the keys it overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::engine_lib::camera::Camera;
use crate::engine_lib::controller::{ControllerSettings, GroundLock};
use crate::scenes::SceneKind;

pub const CONFIG_ENV_VAR: &str = "PORTAL_TUNNELS_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub assets: AssetConfig,
    pub start_scene: SceneKind,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Portal Tunnels".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_y_deg: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Degrees per pixel.
    pub mouse_sensitivity: f32,
    pub clamp_pitch: bool,
    pub pitch_limit_deg: f32,
    pub ground_lock: GroundLock,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera::default();
        let controller = ControllerSettings::default();
        Self {
            fov_y_deg: camera.fov_y_deg,
            znear: camera.znear,
            zfar: camera.zfar,
            move_speed: controller.move_speed,
            mouse_sensitivity: controller.mouse_sensitivity,
            clamp_pitch: true,
            pitch_limit_deg: 89.0,
            ground_lock: controller.ground_lock,
        }
    }
}

impl CameraConfig {
    pub fn camera(&self) -> Camera {
        Camera::new(self.fov_y_deg, self.znear, self.zfar)
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            move_speed: self.move_speed,
            mouse_sensitivity: self.mouse_sensitivity,
            pitch_limit_deg: self.clamp_pitch.then_some(self.pitch_limit_deg),
            ground_lock: self.ground_lock,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub directory: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("assets"),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// First CLI argument, else `PORTAL_TUNNELS_CONFIG`, else defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .map(PathBuf::from);
        match path {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.start_scene, SceneKind::TunnelPortal);
        assert_eq!(config.camera.controller_settings(), ControllerSettings::default());
        assert_eq!(config.camera.camera(), Camera::default());
    }

    #[test]
    fn partial_sections_override_only_given_keys() {
        let config = AppConfig::from_toml_str(
            r#"
            start_scene = "tunnel"

            [camera]
            move_speed = 12.5
            clamp_pitch = false
            ground_lock = { eye_height = 1.8 }

            [assets]
            directory = "/srv/textures"
            "#,
        )
        .unwrap();

        assert_eq!(config.start_scene, SceneKind::Tunnel);
        let settings = config.camera.controller_settings();
        assert_eq!(settings.move_speed, 12.5);
        assert_eq!(settings.pitch_limit_deg, None);
        assert_eq!(settings.ground_lock, GroundLock::EyeHeight(1.8));
        assert_eq!(settings.mouse_sensitivity, 0.2);
        assert_eq!(config.assets.directory, PathBuf::from("/srv/textures"));
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("[camera\nfov_y_deg = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load(Path::new("/nonexistent/portal_tunnels.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
