// src/rendering_lib/shader.rs

// All programs share the per-draw uniform at group 0. Textured and skybox
// programs sample from group 1.

pub const TEXTURED_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    view_proj: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> draw: DrawUniform;

@group(1) @binding(0)
var t_diffuse: texture_2d<f32>;
@group(1) @binding(1)
var s_diffuse: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.uv = model.uv;
    out.clip_position = draw.view_proj * vec4<f32>(model.position, 1.0);
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_diffuse, s_diffuse, in.uv) * draw.color;
}
"#;

pub const FLAT_SHADER_SOURCE: &str = r#"
struct DrawUniform {
    view_proj: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> draw: DrawUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> @builtin(position) vec4<f32> {
    return draw.view_proj * vec4<f32>(model.position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return draw.color;
}
"#;

/// Built-in `skybox.vert`. Stages are separate modules so a scene can swap
/// either one through its asset map.
pub const SKYBOX_VERTEX_SOURCE: &str = r#"
struct DrawUniform {
    view_proj: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> draw: DrawUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.direction = model.position;
    out.clip_position = draw.view_proj * vec4<f32>(model.position, 1.0);
    return out;
}
"#;

/// Built-in `skybox.frag`.
pub const SKYBOX_FRAGMENT_SOURCE: &str = r#"
@group(1) @binding(0)
var t_cube: texture_cube<f32>;
@group(1) @binding(1)
var s_cube: sampler;

@fragment
fn fs_main(@location(0) direction: vec3<f32>) -> @location(0) vec4<f32> {
    return textureSample(t_cube, s_cube, normalize(direction));
}
"#;
