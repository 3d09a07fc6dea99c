//! WGSL-layout uniform blocks assembled from a frame's global bindings.
//!
//! A wgpu backend cannot bind loose named values, so it packs the scalar and
//! vector globals into one [`AtmosphereUniform`] and the direction array into a
//! [`SampleDirectionsUniform`] right before a draw or dispatch.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use stratus_render::GlobalBindings;

use crate::luts::bindings;
use crate::params::uniforms;
use crate::sampling::SAMPLE_COUNT;

/// Matches the WGSL struct layout.
///
/// Each `vec3<f32>` is followed by a scalar so every row stays 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AtmosphereUniform {
    /// (offset 0)
    pub earth_center: [f32; 3],
    /// (offset 12)
    pub top_height: f32,
    /// (offset 16)
    pub rayleigh_scattering: [f32; 3],
    /// (offset 28)
    pub rayleigh_height: f32,
    /// (offset 32)
    pub mie_scattering: [f32; 3],
    /// (offset 44)
    pub mie_height: f32,
    /// (offset 48)
    pub mie_absorption: [f32; 3],
    /// (offset 60)
    pub mie_g: f32,
    /// (offset 64)
    pub ozone_absorption: [f32; 3],
    /// (offset 76)
    pub ozone_center: f32,
    /// (offset 80)
    pub earth_radius: f32,
    pub ozone_width: f32,
    pub max_tangent_length: f32,
    pub atmosphere_intensity: f32,
    /// (offset 96)
    pub multi_scattering_intensity: f32,
    pub max_steps: u32,
    pub _padding: [f32; 2],
    /// `_AerialPerspectiveParams`; zero until the aerial-perspective stage
    /// has run. (offset 112)
    pub aerial_perspective_params: [f32; 4],
}

fn vec3(globals: &GlobalBindings, name: &str) -> Option<[f32; 3]> {
    globals.vector(name).map(|v| v.truncate().to_array())
}

impl AtmosphereUniform {
    /// Pack the scattering globals. `None` if any parameter is missing.
    pub fn from_globals(globals: &GlobalBindings) -> Option<Self> {
        Some(Self {
            earth_center: vec3(globals, uniforms::EARTH_CENTER)?,
            top_height: globals.float(uniforms::TOP_HEIGHT)?,
            rayleigh_scattering: vec3(globals, uniforms::RAYLEIGH_SCATTERING)?,
            rayleigh_height: globals.float(uniforms::RAYLEIGH_HEIGHT)?,
            mie_scattering: vec3(globals, uniforms::MIE_SCATTERING)?,
            mie_height: globals.float(uniforms::MIE_HEIGHT)?,
            mie_absorption: vec3(globals, uniforms::MIE_ABSORPTION)?,
            mie_g: globals.float(uniforms::MIE_G)?,
            ozone_absorption: vec3(globals, uniforms::OZONE_ABSORPTION)?,
            ozone_center: globals.float(uniforms::OZONE_CENTER)?,
            earth_radius: globals.float(uniforms::EARTH_RADIUS)?,
            ozone_width: globals.float(uniforms::OZONE_WIDTH)?,
            max_tangent_length: globals.float(uniforms::MAX_TANGENT_LENGTH)?,
            atmosphere_intensity: globals.float(uniforms::ATMOSPHERE_INTENSITY)?,
            multi_scattering_intensity: globals.float(uniforms::MULTI_SCATTERING_INTENSITY)?,
            max_steps: u32::try_from(globals.int(uniforms::MAX_STEPS)?).ok()?,
            _padding: [0.0; 2],
            aerial_perspective_params: globals
                .vector(bindings::AERIAL_PERSPECTIVE_PARAMS)
                .unwrap_or(Vec4::ZERO)
                .to_array(),
        })
    }
}

/// `array<vec4<f32>, 64>` of sample directions.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SampleDirectionsUniform {
    pub directions: [[f32; 4]; SAMPLE_COUNT],
}

impl SampleDirectionsUniform {
    /// `None` unless exactly 64 directions are bound.
    pub fn from_globals(globals: &GlobalBindings) -> Option<Self> {
        let bound = globals.vector_array(bindings::SAMPLE_DIRECTIONS)?;
        if bound.len() != SAMPLE_COUNT {
            return None;
        }
        let mut uniform = Self::zeroed();
        for (slot, direction) in uniform.directions.iter_mut().zip(bound) {
            *slot = direction.to_array();
        }
        Some(uniform)
    }
}
