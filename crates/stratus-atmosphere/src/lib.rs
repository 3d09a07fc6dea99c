//! Precomputed atmospheric scattering.
//!
//! Each frame the [`AtmospherePipeline`] refreshes [`ScatteringParameters`]
//! from the optional override volume and records five passes in a fixed order:
//!
//! 1. transmittance LUT (256x64)
//! 2. multiple-scattering LUT (32x32), integrating over a [`SampleDirectionSet`]
//! 3. sky-view LUT (256x128)
//! 4. aerial-perspective LUT (32x32x24, compute)
//! 5. fog composite onto the camera color target
//!
//! Every stage publishes its LUT under a well-known global name that the next
//! stages sample. The GPU programs themselves are supplied by the caller.

mod error;
pub mod luts;
mod params;
mod pipeline;
mod sampling;
pub mod stages;
mod state;
mod uniform;

pub use error::AtmosphereError;
pub use params::ScatteringParameters;
pub use pipeline::{AtmospherePipeline, AtmosphereSettings, Lifecycle};
pub use sampling::{SAMPLE_COUNT, SAMPLE_WEIGHT, SampleDirectionSet, SamplingMode};
pub use stages::{AtmosphereStage, StageSetup};
pub use state::AtmosphereFrameState;
pub use uniform::{AtmosphereUniform, SampleDirectionsUniform};
