//! Per-frame linear allocator over a fixed ring of constant buffers.
//!
//! Each frame owns one slot exclusively from the moment its permit is taken
//! until the GPU reports completion. Within a frame, records are bump
//! allocated at a fixed stride regardless of their actual size.

use crate::{
    backend::{BufferHandle, GraphicsBackend},
    error::{BackendError, RingError},
};

pub const MAX_FRAMES_IN_FLIGHT: usize = 3;
/// Raise this to draw more objects per frame
pub const CONSTANT_BUFFER_LENGTH: usize = 65536;
/// Must stay a multiple of the GPU's uniform offset alignment
pub const CONSTANT_ALIGNMENT: usize = 256;

/// Per-node constants as laid out in the shader's uniform block
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceConstants {
    pub model_view_projection: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
}

pub struct ConstantRing {
    buffers: Vec<BufferHandle>,
    capacity: usize,
    stride: usize,
    frame_index: usize,
    write_cursor: usize,
}

impl ConstantRing {
    /// Creates `slots` buffers of `capacity` bytes each.
    ///
    /// Fails before touching the backend if records at `stride` would overlap,
    /// a slot cannot hold one record, or offsets would not fit in a `u32`.
    pub fn new<B: GraphicsBackend + ?Sized>(
        backend: &mut B,
        slots: usize,
        capacity: usize,
        stride: usize,
    ) -> Result<Self, BackendError> {
        check_layout(slots, capacity, stride)?;
        let buffers = (0..slots)
            .map(|_| backend.create_buffer(capacity))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            buffers,
            capacity,
            stride,
            frame_index: 0,
            write_cursor: 0,
        })
    }

    pub fn slots(&self) -> usize {
        self.buffers.len()
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of records one slot can hold.
    pub fn records_per_slot(&self) -> usize {
        self.capacity / self.stride
    }

    pub fn current_buffer(&self) -> BufferHandle {
        self.buffers[self.frame_index]
    }

    /// Starts writing the current slot from offset zero.
    pub fn begin_frame(&mut self) {
        self.write_cursor = 0;
    }

    /// Reserves the next record and returns its byte offset.
    pub fn allocate(&mut self) -> Result<usize, RingError> {
        let offset = self.write_cursor;
        if offset + self.stride > self.capacity {
            return Err(RingError::CapacityExceeded {
                offset,
                stride: self.stride,
                capacity: self.capacity,
            });
        }
        self.write_cursor += self.stride;
        Ok(offset)
    }

    /// Allocates a record in the current slot and copies `constants` into it.
    pub fn write<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        constants: &InstanceConstants,
    ) -> Result<usize, crate::error::FrameError> {
        let offset = self.allocate()?;
        let bytes = bytemuck::bytes_of(constants);
        let region = backend.map_buffer(self.current_buffer())?;
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(offset)
    }

    /// Moves on to the next slot. Called once per submitted frame.
    pub fn advance(&mut self) {
        self.frame_index = (self.frame_index + 1) % self.buffers.len();
    }
}

fn check_layout(slots: usize, capacity: usize, stride: usize) -> Result<(), RingError> {
    let record = std::mem::size_of::<InstanceConstants>();
    let max = u32::MAX as usize;
    if slots == 0 {
        return Err(RingError::NoSlots);
    }
    if stride < record {
        return Err(RingError::StrideTooSmall { stride, record });
    }
    if capacity < stride {
        return Err(RingError::CapacityTooSmall { capacity, stride });
    }
    if capacity > max {
        return Err(RingError::CapacityTooLarge { capacity, max });
    }
    Ok(())
}
