use wgpu::{BindGroup, Device, Queue, Surface};

use crate::{backend::DrawCall, model::GpuMesh};

pub mod phong;

pub trait Pass {
    /// Renders one frame of `draws` into the surface's next texture.
    ///
    /// `constants` is the bind group of the ring slot the draws' offsets point into.
    fn draw(
        &mut self,
        surface: &Surface,
        device: &Device,
        queue: &Queue,
        meshes: &[GpuMesh],
        constants: &BindGroup,
        draws: &[DrawCall],
    ) -> Result<(), wgpu::SurfaceError>;
}
