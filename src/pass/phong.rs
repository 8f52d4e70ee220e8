use std::mem;

use wgpu::{BindGroup, BindGroupLayout, Device, Queue, Surface};

use crate::{
    backend::{DrawCall, FillMode},
    model::{self, GpuMesh, Vertex},
    ring::InstanceConstants,
    texture,
};

use super::Pass;

pub struct PhongConfig {
    pub clear_color: wgpu::Color,
    /// Build a line-mode pipeline for highlighted nodes (needs POLYGON_MODE_LINE)
    pub wireframe: bool,
}

pub struct PhongPass {
    // Uniforms
    pub constants_bind_group_layout: BindGroupLayout,
    // Textures
    pub depth_texture: texture::Texture,
    // Render pipelines
    pub render_pipeline: wgpu::RenderPipeline,
    pub wireframe_pipeline: Option<wgpu::RenderPipeline>,
    clear_color: wgpu::Color,
}

impl PhongPass {
    pub fn new(
        phong_config: &PhongConfig,
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> PhongPass {
        // Setup the shader
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Phong Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader.wgsl").into()),
        });

        // Per-node constants live in the ring slot and are selected per draw
        // with a dynamic offset
        let constants_size = mem::size_of::<InstanceConstants>() as wgpu::BufferAddress;
        let constants_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("[Phong] Instance Constants"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(constants_size),
                    },
                    count: None,
                }],
            });

        // Setup the render pipeline
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("[Phong] Pipeline"),
            bind_group_layouts: &[&constants_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = create_pipeline(
            device,
            &pipeline_layout,
            &shader_module,
            config.format,
            wgpu::PolygonMode::Fill,
            "[Phong] Fill Pipeline",
        );

        // Enable/disable wireframe mode
        let wireframe_pipeline = phong_config.wireframe.then(|| {
            create_pipeline(
                device,
                &pipeline_layout,
                &shader_module,
                config.format,
                wgpu::PolygonMode::Line,
                "[Phong] Wireframe Pipeline",
            )
        });

        // Create depth texture
        let depth_texture = texture::Texture::create_depth_texture(device, config, "depth_texture");

        PhongPass {
            constants_bind_group_layout,
            depth_texture,
            render_pipeline,
            wireframe_pipeline,
            clear_color: phong_config.clear_color,
        }
    }

    /// Binds one ring slot buffer so draws can address it by offset.
    pub fn create_constants_bind_group(&self, device: &Device, buffer: &wgpu::Buffer) -> BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("[Phong] Instance Constants"),
            layout: &self.constants_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(mem::size_of::<InstanceConstants>() as u64),
                }),
            }],
        })
    }

    // Make sure to match the current window size to the depth texture
    pub fn resize(&mut self, device: &Device, config: &wgpu::SurfaceConfiguration) {
        self.depth_texture = texture::Texture::create_depth_texture(device, config, "depth_texture");
    }

    fn pipeline_for(&self, fill_mode: FillMode) -> &wgpu::RenderPipeline {
        match (fill_mode, &self.wireframe_pipeline) {
            (FillMode::Wireframe, Some(pipeline)) => pipeline,
            _ => &self.render_pipeline,
        }
    }
}

fn create_pipeline(
    device: &Device,
    layout: &wgpu::PipelineLayout,
    shader_module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    polygon_mode: wgpu::PolygonMode,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader_module,
            entry_point: "vs_main",
            buffers: &[model::ModelVertex::desc()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: match polygon_mode {
                // Back edges are part of the wireframe look
                wgpu::PolygonMode::Fill => Some(wgpu::Face::Back),
                _ => None,
            },
            polygon_mode,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: texture::Texture::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader_module,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState {
                    alpha: wgpu::BlendComponent::REPLACE,
                    color: wgpu::BlendComponent::REPLACE,
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
    })
}

impl Pass for PhongPass {
    fn draw(
        &mut self,
        surface: &Surface,
        device: &Device,
        queue: &Queue,
        meshes: &[GpuMesh],
        constants: &BindGroup,
        draws: &[DrawCall],
    ) -> Result<(), wgpu::SurfaceError> {
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // Setup the render pass
        // see: clear color, depth stencil
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: true,
                    },
                })],
                // Create a depth stencil buffer using the depth texture
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: true,
                    }),
                    stencil_ops: None,
                }),
            });

            for draw in draws {
                let mesh = match meshes.get(draw.mesh.0) {
                    Some(mesh) => mesh,
                    None => {
                        log::warn!("skipping draw of {:?}: unknown mesh {:?}", draw.node, draw.mesh);
                        continue;
                    }
                };

                render_pass.set_pipeline(self.pipeline_for(draw.fill_mode));
                render_pass.set_bind_group(0, constants, &[draw.constant_offset]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                for submesh in &mesh.submeshes {
                    render_pass.draw_indexed(submesh.indices(), 0, 0..1);
                }
            }
        }

        queue.submit(Some(encoder.finish()));
        output.present();

        Ok(())
    }
}
