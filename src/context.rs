use crate::{error::InitError, window::Window};

/// Device, queue and configured surface for one window.
pub struct GraphicsContext {
    pub surface: wgpu::Surface,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    /// Optional features the device was created with
    pub features: wgpu::Features,
}

impl GraphicsContext {
    pub async fn new(window: &Window) -> Result<Self, InitError> {
        let size = window.window.inner_size();

        // The instance is a handle to our GPU
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        // Safety: the surface must not outlive the window, and `Window` is kept
        // alive for the whole event loop
        let surface = unsafe { instance.create_surface(&window.window) };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(InitError::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info());

        // Wireframe highlighting needs line polygon mode; go without it if absent
        let features = adapter.features() & wgpu::Features::POLYGON_MODE_LINE;
        if features.is_empty() {
            log::warn!("adapter lacks POLYGON_MODE_LINE, highlighted nodes draw solid");
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    features,
                    limits: wgpu::Limits::default(),
                },
                None,
            )
            .await?;

        let format = *surface
            .get_supported_formats(&adapter)
            .first()
            .ok_or(InitError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            features,
        })
    }

    /// Reconfigures the surface. Zero-sized requests are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// Reapplies the current configuration after the surface was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}
