//! Application configuration, read from TOML.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults the demo scene was designed around.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    camera::CameraConfig,
    error::ConfigError,
    input::InputConfig,
    logging::LoggingConfig,
    renderer::RendererConfig,
    resources::MeshSource,
    ring::{InstanceConstants, CONSTANT_ALIGNMENT},
    scene::GridConfig,
};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SPHERE_PICKER_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "sphere_picker.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "sphere picking".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub grid: GridConfig,
    pub mesh: MeshSource,
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub input: InputConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Loads from `$SPHERE_PICKER_CONFIG`, else `./sphere_picker.toml` if it
    /// exists, else defaults.
    pub fn load_default_location() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(&PathBuf::from(path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let renderer = &self.renderer;
        let record = std::mem::size_of::<InstanceConstants>();

        if renderer.max_frames_in_flight == 0 {
            return invalid("renderer.max_frames_in_flight must be at least 1");
        }
        if renderer.constant_alignment == 0
            || renderer.constant_alignment % CONSTANT_ALIGNMENT != 0
        {
            return invalid(format!(
                "renderer.constant_alignment must be a multiple of {}",
                CONSTANT_ALIGNMENT
            ));
        }
        if renderer.constant_alignment < record {
            return invalid(format!(
                "renderer.constant_alignment must hold a {} byte record",
                record
            ));
        }
        if renderer.constant_buffer_length < renderer.constant_alignment {
            return invalid("renderer.constant_buffer_length must hold at least one record");
        }
        if self.grid.dimensions.contains(&0) {
            return invalid("grid.dimensions must all be non-zero");
        }
        if self.grid.radius <= 0.0 || self.grid.spacing <= 0.0 {
            return invalid("grid.radius and grid.spacing must be positive");
        }
        let camera = &self.camera;
        if !(camera.fovy > 0.0 && camera.fovy < 180.0) {
            return invalid("camera.fovy must be between 0 and 180 degrees");
        }
        if !(camera.znear > 0.0 && camera.zfar > camera.znear) {
            return invalid("camera planes must satisfy 0 < znear < zfar");
        }
        if self.window.width == 0 || self.window.height == 0 {
            return invalid("window size must be non-zero");
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message.into()))
}
