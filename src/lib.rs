use anyhow::Context;
use cgmath::{Matrix4, Rad};

pub mod backend;
pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod hit_test;
pub mod input;
pub mod logging;
pub mod math;
pub mod model;
pub mod node;
pub mod pacer;
pub mod pass;
pub mod primitives;
pub mod renderer;
pub mod resources;
pub mod ring;
pub mod scene;
pub mod texture;
pub mod window;

use crate::{
    backend::GraphicsBackend,
    config::AppConfig,
    context::GraphicsContext,
    error::SurfaceErrorAction,
    gpu::WgpuBackend,
    input::{Gesture, PanController, ScreenPoint, ViewportSize},
    node::NodeId,
    renderer::Renderer,
    scene::Scene,
    window::{Window, WindowEvents},
};

struct State {
    renderer: Renderer<WgpuBackend>,
    scene: Scene,
    viewport: ViewportSize,
    pan: PanController,
    // Group node the pan gesture rotates
    grid: NodeId,
    yaw: f32,
    pitch: f32,
}

impl State {
    // Initialize the state
    async fn new(window: &Window, config: &AppConfig) -> anyhow::Result<Self> {
        // Initialize the graphic context
        let ctx = GraphicsContext::new(window)
            .await
            .context("failed to initialize the graphics context")?;
        let viewport = ViewportSize::new(ctx.config.width as f32, ctx.config.height as f32);
        let mut backend = WgpuBackend::new(ctx, &config.renderer)?;

        // Load the sphere mesh, either procedural or from the assets folder
        let mesh = resources::load_mesh(&config.mesh).context("failed to load the sphere mesh")?;
        let mesh = backend.upload_mesh(&mesh)?;

        let mut scene = Scene::new();
        scene.add_camera(&config.camera);
        let grid = scene.add_sphere_grid(&config.grid, Some(mesh));
        log::info!(
            "scene ready: {} nodes, {} spheres",
            scene.len(),
            config.grid.sphere_count()
        );

        let renderer = Renderer::new(backend, &config.renderer)?;

        Ok(Self {
            renderer,
            scene,
            viewport,
            pan: PanController::new(config.input.pan_sensitivity),
            grid,
            yaw: 0.0,
            pitch: 0.0,
        })
    }

    // Keeps state in sync with window size when changed
    fn resize(&mut self, width: u32, height: u32) {
        self.viewport = ViewportSize::new(width as f32, height as f32);
        self.renderer.backend_mut().resize(width, height);
    }

    fn input(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Tap(point) => self.tap(point),
            _ => {
                if let Some((dx, dy)) = self.pan.process(gesture, self.viewport) {
                    self.rotate_grid(dx, dy);
                }
            }
        }
    }

    fn tap(&mut self, point: ScreenPoint) {
        let hit = match self.scene.pick(self.viewport, point) {
            Some(hit) => hit,
            None => {
                log::debug!("tap at ({}, {}) hit nothing", point.x, point.y);
                return;
            }
        };
        if let Some(node) = self.scene.node_mut(hit.node) {
            if let Some(highlighted) = node.toggle_highlight() {
                log::info!("{} highlighted: {}", node.name, highlighted);
            }
        }
    }

    fn rotate_grid(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx;
        self.pitch -= dy;
        if let Some(grid) = self.scene.node_mut(self.grid) {
            grid.transform =
                Matrix4::from_angle_x(Rad(self.pitch)) * Matrix4::from_angle_y(Rad(self.yaw));
        }
    }

    /// Returns `false` when the application should exit.
    fn render(&mut self) -> bool {
        let err = match self.renderer.draw(&self.scene, self.viewport) {
            Ok(_) => return true,
            Err(err) => err,
        };
        match err.action() {
            // Reconfigure the surface if it's lost or outdated
            SurfaceErrorAction::Reconfigure => {
                self.renderer.backend_mut().reconfigure();
                true
            }
            SurfaceErrorAction::SkipFrame => {
                log::debug!("skipping frame: {}", err);
                true
            }
            // The system is out of memory, we should probably quit
            SurfaceErrorAction::Fatal => {
                log::error!("fatal frame error: {}", err);
                false
            }
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load_default_location().context("failed to load configuration")?;
    logging::init_logging(&config.logging);

    let window = Window::new(&config.window, config.input.tap_slop)?;

    // State::new uses async code, so we're going to wait for it to finish
    let mut state = State::new(&window, &config).await?;

    window.run(move |event| match event {
        WindowEvents::Resized { width, height } => {
            state.resize(width, height);
            true
        }
        WindowEvents::Gesture(gesture) => {
            state.input(gesture);
            true
        }
        WindowEvents::Draw => state.render(),
    })
}
