// src/engine_lib/error.rs

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    #[error("portal {0} has no linked partner")]
    Unlinked(usize),
    #[error("portal {0} cannot be linked to itself")]
    SelfLink(usize),
    #[error("portal index {index} is out of range ({len} portals)")]
    OutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("required asset `{0}` is missing")]
    MissingAsset(String),
    #[error("asset `{name}` is not a {expected}")]
    WrongAssetKind { name: String, expected: &'static str },
    #[error("portal setup failed: {0}")]
    Portal(#[from] PortalError),
}
