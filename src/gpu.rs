//! [`GraphicsBackend`] over a wgpu device and window surface.

use crate::{
    backend::{BufferHandle, CompletionCallback, CompletionToken, DrawCall, GraphicsBackend},
    context::GraphicsContext,
    error::{BackendError, FrameError, InitError},
    model::{GpuMesh, MeshData, MeshHandle},
    pass::{
        phong::{PhongConfig, PhongPass},
        Pass,
    },
    renderer::RendererConfig,
    ring::InstanceConstants,
};

// A uniform buffer plus the CPU copy the ring writes into. The copy is flushed
// to the GPU right before the frame that reads it is submitted.
struct ConstantBuffer {
    buffer: wgpu::Buffer,
    shadow: Vec<u8>,
    bind_group: wgpu::BindGroup,
}

pub struct WgpuBackend {
    ctx: GraphicsContext,
    pass: PhongPass,
    constant_buffers: Vec<ConstantBuffer>,
    meshes: Vec<GpuMesh>,
    next_token: u64,
}

impl WgpuBackend {
    pub fn new(ctx: GraphicsContext, config: &RendererConfig) -> Result<Self, InitError> {
        let required = ctx.device.limits().min_uniform_buffer_offset_alignment;
        if config.constant_alignment == 0 || config.constant_alignment % required as usize != 0 {
            return Err(InitError::Alignment {
                alignment: config.constant_alignment,
                required,
            });
        }

        let wireframe = config.wireframe_highlight
            && ctx.features.contains(wgpu::Features::POLYGON_MODE_LINE);
        let [r, g, b, a] = config.clear_color;
        let pass = PhongPass::new(
            &PhongConfig {
                clear_color: wgpu::Color { r, g, b, a },
                wireframe,
            },
            &ctx.device,
            &ctx.config,
        );

        Ok(Self {
            ctx,
            pass,
            constant_buffers: Vec::new(),
            meshes: Vec::new(),
            next_token: 0,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.ctx.config.width, self.ctx.config.height)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.ctx.resize(width, height);
        self.pass.resize(&self.ctx.device, &self.ctx.config);
    }

    pub fn reconfigure(&mut self) {
        log::warn!("reconfiguring lost surface");
        self.ctx.reconfigure();
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_buffer(&mut self, size: usize) -> Result<BufferHandle, BackendError> {
        if size == 0 {
            return Err(BackendError::ZeroSizedBuffer);
        }
        let index = self.constant_buffers.len();
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Constant Buffer {}", index)),
            size: size as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self
            .pass
            .create_constants_bind_group(&self.ctx.device, &buffer);
        self.constant_buffers.push(ConstantBuffer {
            buffer,
            shadow: vec![0; size],
            bind_group,
        });
        Ok(BufferHandle(index))
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> Result<&mut [u8], BackendError> {
        self.constant_buffers
            .get_mut(buffer.0)
            .map(|constants| constants.shadow.as_mut_slice())
            .ok_or(BackendError::UnknownBuffer(buffer.0))
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<MeshHandle, BackendError> {
        if mesh.is_empty() {
            return Err(BackendError::EmptyMesh(mesh.name.clone()));
        }
        self.meshes.push(GpuMesh::new(&self.ctx.device, mesh));
        log::debug!(
            "uploaded mesh {:?}: {} vertices, {} indices",
            mesh.name,
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(MeshHandle(self.meshes.len() - 1))
    }

    fn submit(
        &mut self,
        draws: &[DrawCall],
        target_slot: BufferHandle,
    ) -> Result<CompletionToken, FrameError> {
        let constants = self
            .constant_buffers
            .get(target_slot.0)
            .ok_or(BackendError::UnknownBuffer(target_slot.0))?;
        if let Some(draw) = draws.iter().find(|draw| draw.mesh.0 >= self.meshes.len()) {
            return Err(BackendError::UnknownMesh(draw.mesh.0).into());
        }

        let used = used_constant_bytes(draws).min(constants.shadow.len());
        if used > 0 {
            self.ctx
                .queue
                .write_buffer(&constants.buffer, 0, &constants.shadow[..used]);
        }
        self.pass.draw(
            &self.ctx.surface,
            &self.ctx.device,
            &self.ctx.queue,
            &self.meshes,
            &constants.bind_group,
            draws,
        )?;

        let token = CompletionToken(self.next_token);
        self.next_token += 1;
        Ok(token)
    }

    fn on_complete(&mut self, token: CompletionToken, callback: CompletionCallback) {
        // Everything submitted so far, including the frame behind `token`
        log::trace!("waiting on gpu completion of frame {:?}", token);
        self.ctx.queue.on_submitted_work_done(callback);
    }

    fn poll(&mut self) {
        self.ctx.device.poll(wgpu::Maintain::Poll);
    }
}

/// Bytes of the slot this frame's draws read from, up to the end of the last record.
fn used_constant_bytes(draws: &[DrawCall]) -> usize {
    draws
        .iter()
        .map(|draw| draw.constant_offset as usize + std::mem::size_of::<InstanceConstants>())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backend::FillMode, node::NodeId};

    fn draw_at(constant_offset: u32) -> DrawCall {
        DrawCall {
            node: NodeId(1),
            mesh: MeshHandle(0),
            constant_offset,
            fill_mode: FillMode::Solid,
        }
    }

    #[test]
    fn upload_stops_after_the_last_record() {
        let record = std::mem::size_of::<InstanceConstants>();
        assert_eq!(used_constant_bytes(&[]), 0);
        assert_eq!(used_constant_bytes(&[draw_at(0)]), record);

        let draws = [draw_at(0), draw_at(512), draw_at(256)];
        let used = used_constant_bytes(&draws);
        assert_eq!(used, 512 + record);
        // Queue writes must be a multiple of COPY_BUFFER_ALIGNMENT
        assert_eq!(used as u64 % wgpu::COPY_BUFFER_ALIGNMENT, 0);
    }
}
