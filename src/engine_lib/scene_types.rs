// src/engine_lib/scene_types.rs
use std::collections::HashMap;

use image::RgbaImage;

use crate::engine_lib::error::SceneError;
use crate::rendering_lib::geometry::Mesh;

// Type aliases for IDs
pub type BatchId = usize;
pub type TextureId = usize;

/// A loaded resource handed to a scene by the host.
#[derive(Clone, Debug)]
pub enum Asset {
    Image(RgbaImage),
    /// WGSL source for one shader stage.
    Shader(String),
}

/// Logical asset name -> loaded resource.
pub type AssetMap = HashMap<String, Asset>;

pub fn require_image<'a>(assets: &'a AssetMap, name: &str) -> Result<&'a RgbaImage, SceneError> {
    match assets.get(name) {
        Some(Asset::Image(image)) => Ok(image),
        Some(_) => Err(SceneError::WrongAssetKind { name: name.to_string(), expected: "image" }),
        None => Err(SceneError::MissingAsset(name.to_string())),
    }
}

pub fn require_shader<'a>(assets: &'a AssetMap, name: &str) -> Result<&'a str, SceneError> {
    match assets.get(name) {
        Some(Asset::Shader(source)) => Ok(source),
        Some(_) => Err(SceneError::WrongAssetKind { name: name.to_string(), expected: "shader" }),
        None => Err(SceneError::MissingAsset(name.to_string())),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Textured(TextureId),
    /// Samples a cube map by direction.
    Skybox(TextureId),
    Flat([f32; 4]),
}

#[derive(Clone, Debug)]
pub struct Batch {
    pub mesh: Mesh,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub enum TextureSource {
    Image2d(RgbaImage),
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order.
    CubeMap(Box<[RgbaImage; 6]>),
}

#[derive(Clone, Debug)]
pub struct SkyboxShader {
    pub vertex: String,
    pub fragment: String,
}

/// Everything a scene hands the renderer at setup: static batches, the
/// textures they reference and the skybox program.
#[derive(Clone, Debug, Default)]
pub struct SceneResources {
    batches: Vec<Batch>,
    textures: Vec<TextureSource>,
    pub skybox_shader: Option<SkyboxShader>,
}

impl SceneResources {
    pub fn add_batch(&mut self, mesh: Mesh, material: Material) -> BatchId {
        self.batches.push(Batch { mesh, material });
        self.batches.len() - 1
    }

    pub fn add_texture(&mut self, source: TextureSource) -> TextureId {
        self.textures.push(source);
        self.textures.len() - 1
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(id)
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn textures(&self) -> &[TextureSource] {
        &self.textures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_distinguish_missing_from_wrong_kind() {
        let mut assets = AssetMap::new();
        assets.insert("skybox.vert".into(), Asset::Shader("// wgsl".into()));
        assets.insert("checkerboard.png".into(), Asset::Image(RgbaImage::new(2, 2)));

        assert!(require_image(&assets, "checkerboard.png").is_ok());
        assert_eq!(require_shader(&assets, "skybox.vert").unwrap(), "// wgsl");
        assert!(matches!(
            require_image(&assets, "skybox.vert"),
            Err(SceneError::WrongAssetKind { expected: "image", .. })
        ));
        assert!(matches!(
            require_shader(&assets, "skybox.frag"),
            Err(SceneError::MissingAsset(name)) if name == "skybox.frag"
        ));
    }

    #[test]
    fn ids_follow_insertion_order() {
        let mut resources = SceneResources::default();
        let texture = resources.add_texture(TextureSource::Image2d(RgbaImage::new(1, 1)));
        let first = resources.add_batch(Mesh::unit_quad(), Material::Textured(texture));
        let second = resources.add_batch(Mesh::cube(1.0), Material::Flat([1.0; 4]));
        assert_eq!((texture, first, second), (0, 0, 1));
        assert_eq!(resources.batch(second).unwrap().mesh.vertices.len(), 24);
        assert!(resources.batch(2).is_none());
    }
}
