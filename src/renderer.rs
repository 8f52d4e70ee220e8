//! The frame loop: pace, traverse, write constants, submit.

use std::time::Duration;

use cgmath::{Matrix4, SquareMatrix};
use serde::Deserialize;

use crate::{
    backend::{DrawCall, FillMode, GraphicsBackend},
    error::{BackendError, FrameError},
    input::ViewportSize,
    math,
    node::Material,
    pacer::FramePacer,
    ring::{
        ConstantRing, InstanceConstants, CONSTANT_ALIGNMENT, CONSTANT_BUFFER_LENGTH,
        MAX_FRAMES_IN_FLIGHT,
    },
    scene::Scene,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub max_frames_in_flight: usize,
    pub constant_buffer_length: usize,
    pub constant_alignment: usize,
    /// Give up on a frame after waiting this long for a free slot
    pub wait_timeout_ms: Option<u64>,
    pub clear_color: [f64; 4],
    /// Use line rasterization for highlighted nodes when the adapter supports it
    pub wireframe_highlight: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            constant_buffer_length: CONSTANT_BUFFER_LENGTH,
            constant_alignment: CONSTANT_ALIGNMENT,
            wait_timeout_ms: None,
            clear_color: [0.1, 0.2, 0.3, 1.0],
            wireframe_highlight: true,
        }
    }
}

impl RendererConfig {
    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }
}

/// Summary of one submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    /// Ring slot the frame wrote its constants into
    pub frame_index: usize,
    pub draws: Vec<DrawCall>,
    pub nodes_visited: usize,
}

pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    ring: ConstantRing,
    pacer: FramePacer,
    frames_submitted: u64,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Builds the ring and pacer. Layouts whose records would overlap or
    /// whose slots hold nothing are rejected with [`BackendError::RingLayout`].
    pub fn new(mut backend: B, config: &RendererConfig) -> Result<Self, BackendError> {
        let ring = ConstantRing::new(
            &mut backend,
            config.max_frames_in_flight,
            config.constant_buffer_length,
            config.constant_alignment,
        )?;
        let pacer = FramePacer::new(config.max_frames_in_flight, config.wait_timeout());
        log::info!(
            "renderer ready: {} frames in flight, {} records per slot",
            config.max_frames_in_flight,
            ring.records_per_slot()
        );
        Ok(Self {
            backend,
            ring,
            pacer,
            frames_submitted: 0,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn frame_index(&self) -> usize {
        self.ring.frame_index()
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }

    /// Draws `scene` from its point of view into a `viewport`-sized target.
    ///
    /// Blocks until a ring slot is free. Any error leaves the frame unsubmitted:
    /// its slot is released and the frame index does not advance.
    pub fn draw(&mut self, scene: &Scene, viewport: ViewportSize) -> Result<FrameStats, FrameError> {
        if viewport.is_empty() {
            return Err(FrameError::EmptyViewport);
        }
        let (camera, camera_world) = scene.active_camera().ok_or(FrameError::NoCamera)?;
        let view = camera_world.invert().ok_or(FrameError::NoCamera)?;
        let projection = camera.projection_matrix(viewport.aspect_ratio());

        let backend = &mut self.backend;
        let permit = self.pacer.acquire(|| backend.poll())?;

        self.ring.begin_frame();
        let mut draws = Vec::new();
        let mut nodes_visited = 0;
        {
            let ring = &mut self.ring;
            let backend = &mut self.backend;
            scene.try_traverse(|id, node, world| -> Result<(), FrameError> {
                nodes_visited += 1;
                let mesh = match node.mesh {
                    Some(mesh) if node.is_drawable() => mesh,
                    _ => return Ok(()),
                };
                let material = node.material.unwrap_or_default();
                let constants = instance_constants(&projection, &view, world, &material);
                let offset = ring.write(&mut *backend, &constants)?;
                draws.push(DrawCall {
                    node: id,
                    mesh,
                    // Ring capacity is capped at u32::MAX
                    constant_offset: offset as u32,
                    fill_mode: if material.highlighted {
                        FillMode::Wireframe
                    } else {
                        FillMode::Solid
                    },
                });
                Ok(())
            })?;
        }

        let frame_index = self.ring.frame_index();
        let token = self.backend.submit(&draws, self.ring.current_buffer())?;
        // The slot stays owned until the GPU is done reading it
        self.backend.on_complete(token, Box::new(move || permit.retire()));
        self.ring.advance();
        self.frames_submitted += 1;

        log::trace!(
            "frame {} submitted to slot {} with {} draws",
            self.frames_submitted,
            frame_index,
            draws.len()
        );
        Ok(FrameStats {
            frame_index,
            draws,
            nodes_visited,
        })
    }
}

fn instance_constants(
    projection: &Matrix4<f32>,
    view: &Matrix4<f32>,
    world: &Matrix4<f32>,
    material: &Material,
) -> InstanceConstants {
    let model_view = view * world;
    InstanceConstants {
        model_view_projection: (projection * model_view).into(),
        normal_matrix: math::normal_matrix(&model_view).into(),
        color: material.color,
    }
}
