// src/rendering_lib/mod.rs

pub mod geometry;
pub mod renderer;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use geometry::Mesh;
pub use renderer::{Renderer, DEPTH_STENCIL_FORMAT};
pub use vertex::Vertex;
