//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Atmosphere override volume. `None` means no volume is present and the
    /// renderer uses its built-in parameters.
    pub atmosphere: Option<AtmosphereConfig>,
    /// Program locations and camera target settings.
    pub render: RenderConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Per-frame atmosphere overrides.
///
/// Distances are in kilometers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtmosphereConfig {
    /// Height of the top of the atmosphere above the surface. Minimum 1.
    pub top_height: f32,
    /// Planet center in world space.
    pub earth_center: [f32; 3],
    /// Mie phase anisotropy, clamped to [-0.999, 0.999].
    pub mie_g: f32,
    /// Single-scattering intensity scale. Minimum 0.
    pub atmosphere_intensity: f32,
    /// Multiple-scattering intensity scale. Minimum 0.
    pub atmosphere_multi_scattering_intensity: f32,
    /// Fibonacci-spiral sample directions when true, 8x8 spherical grid otherwise.
    pub use_fibonacci_sampling: bool,
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory containing the WGSL programs.
    pub shader_dir: Option<PathBuf>,
    /// Fullscreen program file (transmittance, multi-scattering, sky-view, fog).
    pub atmosphere_shader: String,
    /// Compute program file holding the `AerialPerspective` kernel.
    pub aerial_perspective_shader: String,
    /// Number of frames the demo renders before exiting.
    pub frames: u32,
    /// Camera target width in pixels.
    pub width: u32,
    /// Camera target height in pixels.
    pub height: u32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter override (e.g. "debug", "info,stratus_atmosphere=trace").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            atmosphere: Some(AtmosphereConfig::default()),
            render: RenderConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for AtmosphereConfig {
    fn default() -> Self {
        Self {
            top_height: 100.0,
            earth_center: [0.0, -6378.0, 0.0],
            mie_g: 0.8,
            atmosphere_intensity: 10.0,
            atmosphere_multi_scattering_intensity: 1.0,
            use_fibonacci_sampling: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            shader_dir: None,
            atmosphere_shader: "atmospheric_scattering.wgsl".to_string(),
            aerial_perspective_shader: "aerial_perspective.wgsl".to_string(),
            frames: 3,
            width: 1280,
            height: 720,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AtmosphereConfig {
    /// Minimum atmosphere thickness accepted from an override.
    pub const MIN_TOP_HEIGHT: f32 = 1.0;
    /// Largest magnitude of the Mie anisotropy.
    pub const MAX_MIE_G: f32 = 0.999;

    /// Copy with every field forced into its legal range.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let earth_center = if self.earth_center.iter().all(|c| c.is_finite()) {
            self.earth_center
        } else {
            defaults.earth_center
        };
        Self {
            top_height: finite_or(self.top_height, defaults.top_height)
                .max(Self::MIN_TOP_HEIGHT),
            earth_center,
            mie_g: finite_or(self.mie_g, defaults.mie_g)
                .clamp(-Self::MAX_MIE_G, Self::MAX_MIE_G),
            atmosphere_intensity: finite_or(
                self.atmosphere_intensity,
                defaults.atmosphere_intensity,
            )
            .max(0.0),
            atmosphere_multi_scattering_intensity: finite_or(
                self.atmosphere_multi_scattering_intensity,
                defaults.atmosphere_multi_scattering_intensity,
            )
            .max(0.0),
            use_fibonacci_sampling: self.use_fibonacci_sampling,
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

/// Platform config directory for Stratus (e.g. `~/.config/stratus`).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratus")
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or write a default one there.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
