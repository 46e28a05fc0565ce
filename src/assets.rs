// src/assets.rs

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::engine_lib::scene_types::{Asset, AssetMap};
use crate::rendering_lib::shader::{SKYBOX_FRAGMENT_SOURCE, SKYBOX_VERTEX_SOURCE};
use crate::scenes::common::{CHECKERBOARD, GALAXY_TEXTURE, ROCK_TUNNEL, SKYBOX_FRAGMENT, SKYBOX_VERTEX};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

// (asset name, file name, generator used when the file is unavailable)
const IMAGE_ASSETS: [(&str, &str, fn() -> RgbaImage); 3] = [
    (CHECKERBOARD, "checkerboard.png", checkerboard),
    (ROCK_TUNNEL, "rock-tunnel.jpg", rock),
    (GALAXY_TEXTURE, "galaxy-texture.jpg", galaxy),
];

pub fn load_image(path: &Path) -> Result<RgbaImage, AssetError> {
    image::open(path)
        .map(|image| image.to_rgba8())
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Builds the asset map every scene draws from. Images missing from
/// `directory` are replaced by generated textures so the demo always runs.
pub fn load_asset_map(directory: &Path) -> AssetMap {
    let mut assets = AssetMap::new();
    for (name, file, fallback) in IMAGE_ASSETS {
        let image = match load_image(&directory.join(file)) {
            Ok(image) => {
                log::info!("loaded {name} ({}x{})", image.width(), image.height());
                image
            }
            Err(err) => {
                log::warn!("{err}; using a generated texture for {name}");
                fallback()
            }
        };
        assets.insert(name.to_string(), Asset::Image(image));
    }
    assets.insert(SKYBOX_VERTEX.to_string(), Asset::Shader(SKYBOX_VERTEX_SOURCE.to_string()));
    assets.insert(SKYBOX_FRAGMENT.to_string(), Asset::Shader(SKYBOX_FRAGMENT_SOURCE.to_string()));
    assets
}

fn checkerboard() -> RgbaImage {
    RgbaImage::from_fn(256, 256, |x, y| {
        if (x / 32 + y / 32) % 2 == 0 {
            Rgba([230, 230, 230, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    })
}

fn hash(x: u32, y: u32) -> u32 {
    let mut h = x.wrapping_mul(374_761_393) ^ y.wrapping_mul(668_265_263);
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^ (h >> 16)
}

fn rock() -> RgbaImage {
    RgbaImage::from_fn(128, 128, |x, y| {
        let grain = (hash(x / 4, y / 4) % 48) as u8;
        let shade = 80 + grain;
        Rgba([shade, shade - 10, shade - 25, 255])
    })
}

/// Horizontal cross so every cube face gets its own starfield.
fn galaxy() -> RgbaImage {
    RgbaImage::from_fn(256, 192, |x, y| {
        if hash(x, y) % 97 == 0 {
            Rgba([255, 255, 240, 255])
        } else {
            Rgba([6, 4, 20, 255])
        }
    })
}
