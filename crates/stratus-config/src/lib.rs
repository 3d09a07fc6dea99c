//! Configuration for the Stratus atmosphere renderer.
//!
//! Settings persist to disk as RON. The optional [`AtmosphereConfig`] block is
//! the per-frame override volume consumed by the scattering parameters; when it
//! is absent the renderer falls back to its built-in Earth-like defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{AtmosphereConfig, Config, DebugConfig, RenderConfig, default_config_dir};
pub use error::ConfigError;
