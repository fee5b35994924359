/// wgpu render pipeline for light-field resampling
///
/// This module manages all the wgpu boilerplate:
/// - Device and queue initialization (with enough array layers for the field)
/// - The RGBA8 array texture and its incremental layer uploads
/// - One uniform buffer per eye for stereo rendering
/// - Plane and marker render pipelines
/// - Offscreen rendering and readback

// Use wgpu from iced to avoid dependency conflicts
use iced_wgpu::wgpu;
use std::ops::Range;

use super::frame::{EyeView, RenderRequest};
use super::shaders::{
    PLANE_FRAGMENT_ENTRY, PLANE_VERTEX_ENTRY, POINTS_FRAGMENT_ENTRY, POINTS_VERTEX_ENTRY,
};
use crate::error::{Result, ViewerError};
use crate::field::{CameraGrid, FieldBuffer};

/// Left and right eye
const EYE_COUNT: usize = 2;

/// Output format of the offscreen target
const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Per-eye uniforms. Must match `ViewUniforms` in the WGSL source.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuViewUniforms {
    view_proj: [[f32; 4]; 4],
    plane_model: [[f32; 4]; 4],
    points_model: [[f32; 4]; 4],
    eye_local: [f32; 4],
    plane_size: [f32; 2],
    markers_size: [f32; 2],
    cam_array_size: [f32; 2],
    aperture: f32,
    focus: f32,
    marker_color: [f32; 4],
    marker_radius: f32,
    _pad0: f32,
    _pad1: f32,
    _pad2: f32,
}

impl From<&EyeView> for GpuViewUniforms {
    fn from(eye: &EyeView) -> Self {
        Self {
            view_proj: eye.view_proj.into(),
            plane_model: eye.plane_model.into(),
            points_model: eye.points_model.into(),
            eye_local: [eye.eye_local.x, eye.eye_local.y, eye.eye_local.z, 1.0],
            plane_size: eye.plane_size,
            markers_size: eye.markers_size,
            cam_array_size: eye.params.cam_array_size,
            aperture: eye.params.aperture,
            focus: eye.params.focus,
            marker_color: eye.marker_color,
            marker_radius: eye.marker_radius,
            _pad0: 0.0,
            _pad1: 0.0,
            _pad2: 0.0,
        }
    }
}

/// Main render pipeline for the light field
pub struct RenderPipeline {
    device: wgpu::Device,
    queue: wgpu::Queue,
    plane_pipeline: wgpu::RenderPipeline,
    points_pipeline: wgpu::RenderPipeline,
    bind_groups: Vec<wgpu::BindGroup>,
    uniform_buffers: Vec<wgpu::Buffer>,
    texture: wgpu::Texture,
    pub width: u32,  // Field layer width
    pub height: u32, // Field layer height
    pub layers: u32, // Number of cameras
    marker_count: u32,
}

// Manual Debug implementation (wgpu types don't implement Debug)
impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}

impl RenderPipeline {
    /// Create the pipeline and an empty field texture for `grid`
    pub async fn new(grid: &CameraGrid, shader_source: &str) -> Result<Self> {
        grid.validate()?;
        let layers = grid.frame_count() as u32;

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ViewerError::NoAdapter)?;

        let adapter_limits = adapter.limits();
        check_limits(grid, &adapter_limits)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Light Field Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: required_limits(&adapter_limits),
                },
                None,
            )
            .await
            .map_err(|e| ViewerError::Device(e.to_string()))?;

        log::info!(
            "GPU ready: {} ({:?})",
            adapter.get_info().name,
            adapter.get_info().backend
        );

        // Resource errors come back as a ViewerError, not a panic
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Light Field Array Texture"),
            size: wgpu::Extent3d {
                width: grid.res_x,
                height: grid.res_y,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let texture_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Light Field Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Light Field Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Field Bind Group Layout"),
            entries: &[
                // Array texture, one layer per camera
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let mut uniform_buffers = Vec::with_capacity(EYE_COUNT);
        let mut bind_groups = Vec::with_capacity(EYE_COUNT);
        for eye in 0..EYE_COUNT {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(if eye == 0 { "Left Eye Uniforms" } else { "Right Eye Uniforms" }),
                size: std::mem::size_of::<GpuViewUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            bind_groups.push(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Light Field Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&texture_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            }));
            uniform_buffers.push(buffer);
        }

        let validation = device.pop_error_scope().await;
        let out_of_memory = device.pop_error_scope().await;
        if let Some(error) = validation.or(out_of_memory) {
            return Err(ViewerError::Resource(error.to_string()));
        }

        // Shader problems surface here instead of through wgpu's panic handler
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Light Field Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Light Field Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let plane_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "Refocus Plane Pipeline",
            PLANE_VERTEX_ENTRY,
            PLANE_FRAGMENT_ENTRY,
        );
        let points_pipeline = create_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            "Camera Marker Pipeline",
            POINTS_VERTEX_ENTRY,
            POINTS_FRAGMENT_ENTRY,
        );

        if let Some(error) = device.pop_error_scope().await {
            return Err(ViewerError::ShaderCompile(error.to_string()));
        }

        log::info!(
            "Light field texture: {}x{} x {} layers",
            grid.res_x,
            grid.res_y,
            layers
        );

        Ok(Self {
            device,
            queue,
            plane_pipeline,
            points_pipeline,
            bind_groups,
            uniform_buffers,
            texture,
            width: grid.res_x,
            height: grid.res_y,
            layers,
            marker_count: grid.marker_count(),
        })
    }

    /// Queue an upload of `layers` from the packed buffer. Not awaited.
    pub fn upload_layers(&self, field: &FieldBuffer, layers: Range<u32>) {
        let Some(bytes) = field.layer_range(layers.clone()) else {
            log::warn!("Skipping upload of layers {layers:?}: buffer not ready");
            return;
        };
        if layers.is_empty() {
            return;
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layers.start,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: layers.end - layers.start,
            },
        );
    }

    /// Upload whatever the buffer marked dirty and mark it clean
    pub fn flush(&self, field: &mut FieldBuffer) {
        if let Some(layers) = field.take_dirty() {
            log::debug!("Uploading layers {layers:?} (revision {})", field.revision());
            self.upload_layers(field, layers);
        }
    }

    /// Write one eye's uniforms
    fn update_uniforms(&self, eye: usize, view: &EyeView) {
        let uniforms = GpuViewUniforms::from(view);
        log::trace!(
            "Eye {eye}: aperture {:.2}, focus {:.4}",
            uniforms.aperture,
            uniforms.focus
        );
        self.queue
            .write_buffer(&self.uniform_buffers[eye], 0, bytemuck::cast_slice(&[uniforms]));
    }

    /// Record the draw for every eye of `request` into `target`
    pub fn render_to_target(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        request: &RenderRequest,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Light Field Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for (eye, view) in request.eyes.iter().enumerate().take(EYE_COUNT) {
            let (x, y, w, h) = view.viewport;
            render_pass.set_viewport(x, y, w, h, 0.0, 1.0);
            render_pass.set_bind_group(0, &self.bind_groups[eye], &[]);

            // Markers first so the opaque plane covers them
            if request.show_points {
                render_pass.set_pipeline(&self.points_pipeline);
                render_pass.draw(0..6, 0..self.marker_count);
            }

            render_pass.set_pipeline(&self.plane_pipeline);
            render_pass.draw(0..6, 0..1);
        }
    }

    /// Render `request` offscreen and read the RGBA8 pixels back
    pub fn render_to_bytes(&self, request: &RenderRequest) -> Result<Vec<u8>> {
        let (width, height) = (request.width.max(1), request.height.max(1));

        for (eye, view) in request.eyes.iter().enumerate().take(EYE_COUNT) {
            self.update_uniforms(eye, view);
        }

        let output_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Output Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        self.render_to_target(&mut encoder, &output_view, request);

        // Rows must be 256-byte aligned for texture-to-buffer copies
        let bytes_per_row = width * 4;
        let padded_bytes_per_row = (bytes_per_row + 255) & !255;
        let buffer_size = (padded_bytes_per_row * height) as u64;

        let output_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Buffer"),
            size: buffer_size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &output_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| ViewerError::Readback(e.to_string()))?
            .map_err(|e| ViewerError::Readback(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let mut output = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            let start = (y * padded_bytes_per_row) as usize;
            let end = start + bytes_per_row as usize;
            output.extend_from_slice(&data[start..end]);
        }

        drop(data);
        output_buffer.unmap();
        Ok(output)
    }
}

/// Reject grids the adapter cannot hold in one array texture
fn check_limits(grid: &CameraGrid, limits: &wgpu::Limits) -> Result<()> {
    // A 17x17 grid already exceeds the default limit of 256 layers
    let layers = grid.frame_count() as u32;
    if layers > limits.max_texture_array_layers {
        return Err(ViewerError::TooManyLayers {
            needed: layers,
            supported: limits.max_texture_array_layers,
        });
    }

    let supported = limits.max_texture_dimension_2d;
    if grid.res_x > supported || grid.res_y > supported {
        return Err(ViewerError::TextureTooLarge {
            width: grid.res_x,
            height: grid.res_y,
            supported,
        });
    }
    Ok(())
}

/// Downlevel defaults raised to what the field texture needs
fn required_limits(adapter: &wgpu::Limits) -> wgpu::Limits {
    wgpu::Limits {
        max_texture_array_layers: adapter.max_texture_array_layers,
        max_texture_dimension_2d: adapter.max_texture_dimension_2d,
        ..wgpu::Limits::downlevel_defaults()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    vertex_entry: &str,
    fragment_entry: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: vertex_entry,
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format: OUTPUT_FORMAT,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None, // The plane is visible from both sides
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::shaders::get_shader;
    use std::path::PathBuf;

    fn grid(cams: u32, res_x: u32, res_y: u32) -> CameraGrid {
        CameraGrid {
            cams_x: cams,
            cams_y: cams,
            res_x,
            res_y,
            camera_gap: 0.08,
            frames_dir: PathBuf::from("frames"),
        }
    }

    #[test]
    fn test_limits_reject_oversized_layers() {
        let limits = wgpu::Limits::downlevel_defaults();

        let result = check_limits(&grid(2, 4096, 64), &limits);
        assert!(matches!(
            result,
            Err(ViewerError::TextureTooLarge { width: 4096, height: 64, supported: 2048 })
        ));
        assert!(matches!(
            check_limits(&grid(2, 64, 2049), &limits),
            Err(ViewerError::TextureTooLarge { .. })
        ));
        assert!(check_limits(&grid(2, 2048, 2048), &limits).is_ok());
    }

    #[test]
    fn test_limits_reject_too_many_layers() {
        let limits = wgpu::Limits::downlevel_defaults();
        assert!(matches!(
            check_limits(&grid(17, 300, 300), &limits),
            Err(ViewerError::TooManyLayers { needed: 289, supported: 256 })
        ));
    }

    #[test]
    fn test_required_limits_follow_adapter() {
        let adapter = wgpu::Limits {
            max_texture_array_layers: 2048,
            max_texture_dimension_2d: 8192,
            ..wgpu::Limits::default()
        };
        let required = required_limits(&adapter);
        assert_eq!(required.max_texture_array_layers, 2048);
        assert_eq!(required.max_texture_dimension_2d, 8192);
    }

    #[tokio::test]
    async fn test_oversized_grid_is_an_error_not_a_panic() {
        // Larger than any adapter's 2D limit
        let result = RenderPipeline::new(&grid(2, 100_000, 64), get_shader()).await;
        match result {
            Err(ViewerError::NoAdapter) => log::warn!("No GPU adapter, skipping"),
            Err(ViewerError::TextureTooLarge { width, .. }) => assert_eq!(width, 100_000),
            other => panic!("expected TextureTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        // ViewUniforms in WGSL is 272 bytes with 16-byte alignment
        assert_eq!(std::mem::size_of::<GpuViewUniforms>(), 272);
        assert_eq!(std::mem::offset_of!(GpuViewUniforms, eye_local), 192);
        assert_eq!(std::mem::offset_of!(GpuViewUniforms, cam_array_size), 224);
        assert_eq!(std::mem::offset_of!(GpuViewUniforms, aperture), 232);
        assert_eq!(std::mem::offset_of!(GpuViewUniforms, focus), 236);
        assert_eq!(std::mem::offset_of!(GpuViewUniforms, marker_color), 240);
    }
}
