// src/rendering_lib/texture.rs

use image::{imageops, RgbaImage};
use wgpu::util::DeviceExt;

use crate::engine_lib::scene_types::TextureSource;

pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

// Cell (column, row) of each face in a 4x3 horizontal cross, in +X, -X,
// +Y, -Y, +Z, -Z order.
const CROSS_CELLS: [(u32, u32); 6] = [(2, 1), (0, 1), (1, 0), (1, 2), (1, 1), (3, 1)];
// Same for a 3x4 vertical cross. Its -Z cell hangs below -Y upside down.
const VERTICAL_CROSS_CELLS: [(u32, u32); 6] = [(2, 1), (0, 1), (1, 0), (1, 2), (1, 1), (1, 3)];

/// Splits a horizontal or vertical cross image into six cube faces. Any
/// other image is center-cropped to a square and used on every face, since
/// cube faces must be square.
pub fn cube_faces_from_image(image: &RgbaImage) -> [RgbaImage; 6] {
    let (width, height) = image.dimensions();
    if width > 0 && width * 3 == height * 4 {
        let face = width / 4;
        return CROSS_CELLS.map(|(column, row)| {
            imageops::crop_imm(image, column * face, row * face, face, face).to_image()
        });
    }
    if height > 0 && height * 3 == width * 4 {
        let face = width / 3;
        let mut faces = VERTICAL_CROSS_CELLS.map(|(column, row)| {
            imageops::crop_imm(image, column * face, row * face, face, face).to_image()
        });
        faces[5] = imageops::rotate180(&faces[5]);
        return faces;
    }
    let side = width.min(height);
    if side == 0 {
        log::warn!("cube map source is empty; using a blank 1x1 face");
        return std::array::from_fn(|_| RgbaImage::new(1, 1));
    }
    log::debug!("cube map source {width}x{height} is not a cross; using a centered {side}x{side} square on all faces");
    let square = imageops::crop_imm(image, (width - side) / 2, (height - side) / 2, side, side).to_image();
    std::array::from_fn(|_| square.clone())
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub is_cube: bool,
}

impl GpuTexture {
    pub fn from_source(device: &wgpu::Device, queue: &wgpu::Queue, source: &TextureSource, label: &str) -> Self {
        match source {
            TextureSource::Image2d(image) => Self::from_image(device, queue, image, label),
            TextureSource::CubeMap(faces) => Self::from_cube_faces(device, queue, faces, label),
        }
    }

    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.as_raw(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            is_cube: false,
        }
    }

    pub fn from_cube_faces(device: &wgpu::Device, queue: &wgpu::Queue, faces: &[RgbaImage; 6], label: &str) -> Self {
        let (width, height) = faces[0].dimensions();
        let mut data = Vec::with_capacity((width * height * 4 * 6) as usize);
        for face in faces {
            if face.dimensions() == (width, height) {
                data.extend_from_slice(face.as_raw());
            } else {
                log::warn!("cube face size mismatch in {label}; resizing");
                let resized = imageops::resize(face, width, height, imageops::FilterType::Triangle);
                data.extend_from_slice(resized.as_raw());
            }
        }

        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 6,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TEXTURE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            is_cube: true,
        }
    }
}
