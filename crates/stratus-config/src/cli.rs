//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::{AtmosphereConfig, Config};

/// Stratus command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "stratus", about = "Precomputed atmospheric scattering")]
pub struct CliArgs {
    /// Atmosphere thickness in kilometers.
    #[arg(long)]
    pub top_height: Option<f32>,

    /// Mie phase anisotropy.
    #[arg(long, allow_negative_numbers = true)]
    pub mie_g: Option<f32>,

    /// Single-scattering intensity.
    #[arg(long)]
    pub intensity: Option<f32>,

    /// Multiple-scattering intensity.
    #[arg(long)]
    pub multi_scattering_intensity: Option<f32>,

    /// Use the 8x8 spherical grid instead of the Fibonacci spiral.
    #[arg(long)]
    pub grid_sampling: bool,

    /// Ignore the override volume and render with built-in parameters.
    #[arg(long)]
    pub no_volume: bool,

    /// Number of frames to render.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Run without a GPU.
    #[arg(long)]
    pub headless: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CliArgs {
    fn has_atmosphere_overrides(&self) -> bool {
        self.top_height.is_some()
            || self.mie_g.is_some()
            || self.intensity.is_some()
            || self.multi_scattering_intensity.is_some()
            || self.grid_sampling
    }
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.no_volume {
            self.atmosphere = None;
        } else if args.has_atmosphere_overrides() {
            let atmosphere = self
                .atmosphere
                .get_or_insert_with(AtmosphereConfig::default);
            if let Some(h) = args.top_height {
                atmosphere.top_height = h;
            }
            if let Some(g) = args.mie_g {
                atmosphere.mie_g = g;
            }
            if let Some(i) = args.intensity {
                atmosphere.atmosphere_intensity = i;
            }
            if let Some(i) = args.multi_scattering_intensity {
                atmosphere.atmosphere_multi_scattering_intensity = i;
            }
            if args.grid_sampling {
                atmosphere.use_fibonacci_sampling = false;
            }
        }
        if let Some(frames) = args.frames {
            self.render.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            top_height: Some(60.0),
            mie_g: Some(-0.3),
            grid_sampling: true,
            frames: Some(8),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        let atmosphere = config.atmosphere.as_ref().unwrap();
        assert_eq!(atmosphere.top_height, 60.0);
        assert_eq!(atmosphere.mie_g, -0.3);
        assert!(!atmosphere.use_fibonacci_sampling);
        // Non-overridden fields retain defaults
        assert_eq!(atmosphere.atmosphere_intensity, 10.0);
        assert_eq!(config.render.frames, 8);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_override_creates_missing_volume() {
        let mut config = Config {
            atmosphere: None,
            ..Config::default()
        };
        let args = CliArgs {
            intensity: Some(4.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.atmosphere.unwrap().atmosphere_intensity, 4.0);
    }

    #[test]
    fn test_no_volume_wins() {
        let mut config = Config::default();
        let args = CliArgs {
            no_volume: true,
            top_height: Some(50.0),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert!(config.atmosphere.is_none());
    }

    #[test]
    fn test_parse_negative_mie_g() {
        let args = CliArgs::parse_from(["stratus", "--mie-g", "-0.5", "--headless"]);
        assert_eq!(args.mie_g, Some(-0.5));
        assert!(args.headless);
    }
}
