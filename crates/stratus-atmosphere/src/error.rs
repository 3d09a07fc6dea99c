use stratus_render::{PassError, ShaderError, TextureError};

use crate::pipeline::Lifecycle;

/// Errors surfaced by the atmosphere pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AtmosphereError {
    /// A LUT could not be allocated; the frame cannot be rendered.
    #[error(transparent)]
    Texture(#[from] TextureError),

    /// A program failed to load or compile.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// A pass failed while recording.
    #[error(transparent)]
    Pass(#[from] PassError),

    /// Per-frame work was requested outside the `Created` state.
    #[error("atmosphere pipeline is {0:?}, expected Created")]
    NotCreated(Lifecycle),
}
