/// WGSL shader code for light-field resampling
///
/// Two programs share one module and one bind group:
/// - `vs_plane` / `fs_plane` draw the refocus plane. For every fragment the
///   ray from the eye through the plane point picks a UV, the plane point
///   itself picks a spot on the camera grid (ST), and all cameras within
///   the aperture radius of that spot are averaged with a focus-dependent
///   UV shift.
/// - `vs_points` / `fs_points` draw the camera grid markers.
///
/// The uniform names `field`, `camArraySize`, `aperture` and `focus` are
/// part of the contract with replacement shaders loaded from disk.

use std::borrow::Cow;
use std::path::Path;

use crate::error::{Result, ViewerError};

pub const PLANE_VERTEX_ENTRY: &str = "vs_plane";
pub const PLANE_FRAGMENT_ENTRY: &str = "fs_plane";
pub const POINTS_VERTEX_ENTRY: &str = "vs_points";
pub const POINTS_FRAGMENT_ENTRY: &str = "fs_points";

pub const LIGHT_FIELD_SHADER: &str = r#"
struct ViewUniforms {
    view_proj: mat4x4<f32>,
    plane_model: mat4x4<f32>,
    points_model: mat4x4<f32>,
    // Eye position relative to the plane origin
    eye_local: vec4<f32>,
    plane_size: vec2<f32>,
    markers_size: vec2<f32>,
    camArraySize: vec2<f32>,
    aperture: f32,
    focus: f32,
    marker_color: vec4<f32>,
    marker_radius: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

@group(0) @binding(0)
var field: texture_2d_array<f32>;

@group(0) @binding(1)
var field_sampler: sampler;

@group(0) @binding(2)
var<uniform> view: ViewUniforms;

// Two triangles covering [-0.5, 0.5]^2
fn quad_corner(index: u32) -> vec2<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
        vec2<f32>(-0.5,  0.5),
    );
    return corners[index];
}

// ========== Refocus plane ==========

struct PlaneOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
}

@vertex
fn vs_plane(@builtin(vertex_index) vertex_index: u32) -> PlaneOutput {
    var output: PlaneOutput;
    let local = quad_corner(vertex_index) * view.plane_size;
    output.clip_position = view.view_proj * view.plane_model * vec4<f32>(local, 0.0, 1.0);
    output.local = local;
    return output;
}

@fragment
fn fs_plane(input: PlaneOutput) -> @location(0) vec4<f32> {
    let eye = view.eye_local.xyz;
    let depth = max(abs(eye.z), 0.0001);

    // Ray slope through this plane point selects the UV
    let slope = (input.local - eye.xy) / depth;
    let uv = vec2<f32>(0.5 + slope.x * 0.5, 0.5 - slope.y * 0.5);
    if (uv.x < 0.0 || uv.x > 1.0 || uv.y < 0.0 || uv.y > 1.0) {
        discard;
    }

    // The plane point itself selects a spot on the camera grid (row 0 on top)
    let st = vec2<f32>(
        input.local.x / view.plane_size.x + 0.5,
        0.5 - input.local.y / view.plane_size.y,
    );

    let cams_x = i32(view.camArraySize.x);
    let cams_y = i32(view.camArraySize.y);
    var color = vec3<f32>(0.0);
    var count = 0.0;

    for (var j = 0; j < cams_y; j = j + 1) {
        for (var i = 0; i < cams_x; i = i + 1) {
            let dx = f32(i) - (st.x * view.camArraySize.x - 0.5);
            let dy = f32(j) - (st.y * view.camArraySize.y - 0.5);
            if (dx * dx + dy * dy < view.aperture) {
                let layer = i + cams_x * j;
                let shifted = uv + vec2<f32>(dx, dy) * view.focus;
                color += textureSampleLevel(field, field_sampler, shifted, layer, 0.0).rgb;
                count += 1.0;
            }
        }
    }

    if (count < 1.0) {
        return vec4<f32>(0.0, 0.0, 0.0, 1.0);
    }
    return vec4<f32>(color / count, 1.0);
}

// ========== Camera grid markers ==========

struct PointOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) corner: vec2<f32>,
}

@vertex
fn vs_points(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance_index: u32,
) -> PointOutput {
    var output: PointOutput;
    // (cams_x + 1) x (cams_y + 1) lattice spanning the full marker extent
    let columns = u32(view.camArraySize.x) + 1u;
    let col = f32(instance_index % columns);
    let row = f32(instance_index / columns);

    let center = vec2<f32>(
        (col / view.camArraySize.x - 0.5) * view.markers_size.x,
        (0.5 - row / view.camArraySize.y) * view.markers_size.y,
    );
    let corner = quad_corner(vertex_index);
    let local = center + corner * 2.0 * view.marker_radius;

    output.clip_position = view.view_proj * view.points_model * vec4<f32>(local, 0.0, 1.0);
    output.corner = corner;
    return output;
}

@fragment
fn fs_points(input: PointOutput) -> @location(0) vec4<f32> {
    if (length(input.corner) > 0.5) {
        discard;
    }
    return view.marker_color;
}
"#;

/// The built-in shader
pub fn get_shader() -> &'static str {
    LIGHT_FIELD_SHADER
}

/// Read a replacement shader from disk, or fall back to the built-in one
pub async fn load_shader(path: Option<&Path>) -> Result<Cow<'static, str>> {
    match path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ViewerError::ShaderRead {
                    path: path.to_path_buf(),
                    source,
                })?;
            log::info!("Loaded shader from {}", path.display());
            Ok(Cow::Owned(source))
        }
        None => Ok(Cow::Borrowed(get_shader())),
    }
}
