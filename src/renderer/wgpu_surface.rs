use std::{mem::size_of, rc::Rc};

use anyhow::{anyhow, Context, Result};
use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use glam::{const_vec3, vec2, Mat4, Vec2, Vec3, Vec4};
use log::{debug, info, warn};
use pollster::FutureExt as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use super::{
    render_target::{RenderTarget, MSAA_SAMPLE_COUNT},
    upscale::UpscalePass,
    Capabilities, CloudId, FrameView, PointMaterial, SizeAttenuation, Surface, SurfaceDescriptor,
};
use crate::{point_cloud::PointCloud, window::Size};

const QUAD_VERTICES: [Vec3; 4] = [
    const_vec3!([-0.5, -0.5, 0.]),
    const_vec3!([-0.5, 0.5, 0.]),
    const_vec3!([0.5, -0.5, 0.]),
    const_vec3!([0.5, 0.5, 0.]),
];
const QUAD_INDICES: [u16; 6] = [0, 2, 1, 1, 2, 3];

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct FrameUniforms {
    view: Mat4,
    proj: Mat4,
    viewport: Vec2,
    time: f32,
    pixel_ratio: f32,
}

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct CloudUniforms {
    model: Mat4,
    opacity: f32,
    size_reference: f32,
    soft_edge: u32,
    wave: u32,
}

impl CloudUniforms {
    fn new(model: Mat4, material: &PointMaterial) -> Self {
        Self {
            model,
            opacity: material.opacity,
            size_reference: match material.attenuation {
                SizeAttenuation::Reference(distance) => distance,
                SizeAttenuation::Viewport => 0.,
            },
            soft_edge: material.soft_edge as u32,
            wave: material.wave as u32,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
#[repr(C)]
struct Instance {
    position: Vec4,
    color: Vec4,
}

struct GpuCloud {
    material: PointMaterial,
    instances: Vec<Instance>,
    instance_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuCloud {
    fn destroy(self) {
        self.instance_buffer.destroy();
        self.uniform_buffer.destroy();
    }
}

struct Gpu {
    surface: wgpu::Surface,
    surface_configuration: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    /// Container size in logical pixels.
    size: Size,
    pixel_ratio: f32,
    /// The buffer points are drawn into, in physical pixels.
    drawing: Size,
    clear_color: wgpu::Color,
    msaa_target: Option<RenderTarget>,
    sample_count: u32,
    /// Set when the drawing buffer is smaller than the window.
    color_target: Option<RenderTarget>,
    upscale: UpscalePass,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    frame_uniform_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    cloud_bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
    clouds: Vec<Option<GpuCloud>>,
}

/// A [`Surface`] drawing into a winit window through wgpu.
///
/// Points are instanced quads expanded in the vertex stage, so one cloud is
/// one draw call regardless of its size.
///
/// The swapchain always matches the window's physical size. Points are drawn
/// at the container size times the pixel ratio; when that is smaller than the
/// window the result is stretched over it in a second pass.
pub struct WgpuSurface {
    // Declared first so the wgpu surface is dropped before the window.
    gpu: Option<Gpu>,
    window: Rc<Window>,
}

impl WgpuSurface {
    pub fn new(window: Rc<Window>, desc: &SurfaceDescriptor) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::Backends::PRIMARY);
        let surface = unsafe { instance.create_surface(&*window) };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .block_on()
            .context("No adapter found")?;

        let surface_format = surface
            .get_preferred_format(&adapter)
            .context("Surface is incompatible with the adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Backdrop Device"),
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .block_on()
            .context("No device found")?;

        let physical: Size = window.inner_size().into();
        let surface_configuration = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: physical.width.max(1),
            height: physical.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&device, &surface_configuration);

        let sample_count = if desc.antialias { MSAA_SAMPLE_COUNT } else { 1 };

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Vertex Buffer"),
            contents: bytes_of(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Index Buffer"),
            contents: bytes_of(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let frame_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: size_of::<FrameUniforms>() as _,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size_of::<FrameUniforms>() as _),
                    },
                    count: None,
                }],
            });

        let cloud_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Cloud Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                size_of::<CloudUniforms>() as _,
                            ),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(size_of::<Instance>() as _),
                        },
                        count: None,
                    },
                ],
            });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniform_buffer.as_entire_binding(),
            }],
        });

        let shader_module = device.create_shader_module(&wgpu::include_wgsl!("points.wgsl"));

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &cloud_bind_group_layout],
            push_constant_ranges: &[],
        });

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: size_of::<Vec3>() as _,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        format: wgpu::VertexFormat::Float32x3,
                        offset: 0,
                        shader_location: 0,
                    }],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: "fs_main",
                targets: &[wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState {
                        color: additive,
                        alpha: additive,
                    }),
                    write_mask: wgpu::ColorWrites::ALL,
                }],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let clear_color = if desc.transparent {
            wgpu::Color::TRANSPARENT
        } else {
            wgpu::Color::BLACK
        };

        let upscale = UpscalePass::new(&device, surface_format);

        let mut gpu = Gpu {
            surface,
            surface_configuration,
            device,
            queue,
            size: desc.size,
            pixel_ratio: desc.pixel_ratio,
            drawing: Size::default(),
            clear_color,
            msaa_target: None,
            sample_count,
            color_target: None,
            upscale,
            vertex_buffer,
            index_buffer,
            frame_uniform_buffer,
            frame_bind_group,
            cloud_bind_group_layout,
            render_pipeline,
            clouds: Vec::new(),
        };
        gpu.configure(&window);

        info!(
            "Created {:?} surface {}x{}, drawing at {}x{} (pixel ratio {}, {} samples)",
            surface_format,
            physical.width,
            physical.height,
            gpu.drawing.width,
            gpu.drawing.height,
            desc.pixel_ratio,
            sample_count
        );

        Ok(Self {
            gpu: Some(gpu),
            window,
        })
    }

    fn gpu(&mut self) -> Result<&mut Gpu> {
        self.gpu.as_mut().context("Surface has been detached")
    }
}

impl Gpu {
    fn cloud(&self, id: CloudId) -> Result<&GpuCloud> {
        self.clouds
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| anyhow!("Unknown point cloud {:?}", id))
    }

    fn cloud_mut(&mut self, id: CloudId) -> Result<&mut GpuCloud> {
        self.clouds
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| anyhow!("Unknown point cloud {:?}", id))
    }

    fn write_instances(&mut self, id: CloudId) -> Result<()> {
        let cloud = self.cloud(id)?;
        self.queue
            .write_buffer(&cloud.instance_buffer, 0, cast_slice(&cloud.instances));
        Ok(())
    }

    fn configure(&mut self, window: &Window) {
        let physical: Size = window.inner_size().into();
        if physical.is_empty() {
            return;
        }
        self.surface_configuration.width = physical.width;
        self.surface_configuration.height = physical.height;
        self.surface
            .configure(&self.device, &self.surface_configuration);

        let format = self.surface_configuration.format;
        self.drawing = drawing_size(self.size, self.pixel_ratio, physical, window.scale_factor());

        self.color_target = (self.drawing != physical).then(|| {
            RenderTarget::new(
                &self.device,
                "Drawing Buffer",
                format,
                self.drawing,
                1,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            )
        });
        self.upscale.set_source(
            &self.device,
            self.color_target.as_ref().map(|target| &target.texture_view),
        );

        self.msaa_target = (self.sample_count > 1).then(|| {
            RenderTarget::new(
                &self.device,
                "Multisampled Color Target",
                format,
                self.drawing,
                self.sample_count,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
        });

        debug!(
            "Configured swapchain {}x{}, drawing buffer {}x{}",
            physical.width, physical.height, self.drawing.width, self.drawing.height
        );
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum Recovery {
    Reconfigure,
    SkipFrame,
    Fail,
}

/// What to do when the next swapchain texture can't be acquired. Only running
/// out of memory ends the scene.
fn recovery(error: &wgpu::SurfaceError) -> Recovery {
    match error {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => Recovery::Reconfigure,
        wgpu::SurfaceError::Timeout => Recovery::SkipFrame,
        wgpu::SurfaceError::OutOfMemory => Recovery::Fail,
    }
}

/// Size of the buffer points are drawn into. This is the window's own size
/// unless the pixel ratio is capped below the display's, and it never
/// exceeds the window.
fn drawing_size(size: Size, pixel_ratio: f32, physical: Size, scale_factor: f64) -> Size {
    if f64::from(pixel_ratio) + 1e-6 >= scale_factor {
        return physical;
    }
    let scaled = size.scaled(pixel_ratio);
    Size::new(
        scaled.width.min(physical.width).max(1),
        scaled.height.min(physical.height).max(1),
    )
}

impl Surface for WgpuSurface {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            vertex_displacement: true,
        }
    }

    fn upload(&mut self, cloud: &PointCloud, material: PointMaterial) -> Result<CloudId> {
        let gpu = self.gpu()?;

        let instances: Vec<_> = cloud
            .positions()
            .iter()
            .zip(cloud.colors())
            .enumerate()
            .map(|(i, (position, color))| Instance {
                position: (*position, cloud.sizes().get(i)).into(),
                color: (*color, 1.0).into(),
            })
            .collect();

        // Empty storage bindings are invalid; keep one zeroed element around.
        let contents: &[Instance] = if instances.is_empty() {
            &[Instance {
                position: Vec4::ZERO,
                color: Vec4::ZERO,
            }]
        } else {
            &instances
        };

        let instance_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Point Instance Buffer"),
                contents: cast_slice(contents),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        let uniform_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cloud Uniform Buffer"),
                contents: bytes_of(&CloudUniforms::new(Mat4::IDENTITY, &material)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Cloud Bind Group"),
            layout: &gpu.cloud_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: instance_buffer.as_entire_binding(),
                },
            ],
        });

        let id = CloudId(gpu.clouds.len());
        debug!("Uploaded {} points as {:?}", instances.len(), id);
        gpu.clouds.push(Some(GpuCloud {
            material,
            instances,
            instance_buffer,
            uniform_buffer,
            bind_group,
        }));

        Ok(id)
    }

    fn write_positions(&mut self, id: CloudId, positions: &[Vec3]) -> Result<()> {
        let gpu = self.gpu()?;
        let cloud = gpu.cloud_mut(id)?;
        for (instance, position) in cloud.instances.iter_mut().zip(positions) {
            instance.position = (*position, instance.position.w).into();
        }
        gpu.write_instances(id)
    }

    fn write_colors(&mut self, id: CloudId, colors: &[Vec3]) -> Result<()> {
        let gpu = self.gpu()?;
        let cloud = gpu.cloud_mut(id)?;
        for (instance, color) in cloud.instances.iter_mut().zip(colors) {
            instance.color = (*color, 1.0).into();
        }
        gpu.write_instances(id)
    }

    fn release(&mut self, id: CloudId) {
        if let Some(gpu) = self.gpu.as_mut() {
            if let Some(cloud) = gpu.clouds.get_mut(id.0).and_then(Option::take) {
                cloud.destroy();
                debug!("Released {:?}", id);
            }
        }
    }

    fn resize(&mut self, size: Size, pixel_ratio: f32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.size = size;
            gpu.pixel_ratio = pixel_ratio;
            gpu.configure(&self.window);
        }
    }

    fn render(&mut self, view: &FrameView) -> Result<()> {
        let window = self.window.clone();
        let gpu = self.gpu()?;

        let drawing = gpu.drawing;
        if drawing.is_empty() {
            return Ok(());
        }

        let frame_uniforms = FrameUniforms {
            view: view.camera.view_matrix(),
            proj: view.camera.projection_matrix(),
            viewport: vec2(drawing.width as f32, drawing.height as f32),
            time: view.time,
            pixel_ratio: gpu.pixel_ratio,
        };
        gpu.queue
            .write_buffer(&gpu.frame_uniform_buffer, 0, bytes_of(&frame_uniforms));

        for draw in &view.draws {
            let cloud = gpu.cloud(draw.cloud)?;
            let uniforms = CloudUniforms::new(draw.transform.matrix(), &cloud.material);
            gpu.queue
                .write_buffer(&cloud.uniform_buffer, 0, bytes_of(&uniforms));
        }

        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(e) => match recovery(&e) {
                Recovery::Reconfigure => {
                    debug!("Surface {:?}, reconfiguring", e);
                    gpu.configure(&window);
                    return Ok(());
                }
                Recovery::SkipFrame => {
                    warn!("Surface {:?}, skipping frame", e);
                    return Ok(());
                }
                Recovery::Fail => {
                    return Err(anyhow!("Failed to get next surface texture: {:?}", e))
                }
            },
        };
        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let drawing_view = gpu
            .color_target
            .as_ref()
            .map_or(&surface_texture_view, |target| &target.texture_view);
        let (view_target, resolve_target) = match &gpu.msaa_target {
            Some(target) => (&target.texture_view, Some(drawing_view)),
            None => (drawing_view, None),
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Point Command Encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: view_target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(gpu.clear_color),
                        store: true,
                    },
                }],
                depth_stencil_attachment: None,
            });
            rpass.set_pipeline(&gpu.render_pipeline);
            rpass.set_bind_group(0, &gpu.frame_bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
            rpass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            for draw in &view.draws {
                let cloud = gpu.cloud(draw.cloud)?;
                rpass.set_bind_group(1, &cloud.bind_group, &[]);
                rpass.draw_indexed(
                    0..(QUAD_INDICES.len() as _),
                    0,
                    0..(cloud.instances.len() as u32),
                );
            }
        }

        if gpu.upscale.is_active() {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Upscale Render Pass"),
                color_attachments: &[wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(gpu.clear_color),
                        store: true,
                    },
                }],
                depth_stencil_attachment: None,
            });
            gpu.upscale.draw(&mut rpass);
        }

        gpu.queue.submit(Some(encoder.finish()));
        surface_texture.present();

        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.gpu.is_some()
    }

    fn detach(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            for cloud in gpu.clouds.into_iter().flatten() {
                cloud.destroy();
            }
            gpu.vertex_buffer.destroy();
            gpu.index_buffer.destroy();
            gpu.frame_uniform_buffer.destroy();
            info!("Surface detached");
        }
    }
}
