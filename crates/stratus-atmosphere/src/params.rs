//! Physical description of the atmosphere and its per-frame uniform upload.

use glam::Vec3;
use stratus_config::AtmosphereConfig;
use stratus_render::FrameContext;

/// Global uniform names read by the atmosphere programs.
pub mod uniforms {
    pub const TOP_HEIGHT: &str = "topHeight";
    pub const EARTH_RADIUS: &str = "earthRadius";
    pub const EARTH_CENTER: &str = "earthCenter";
    pub const RAYLEIGH_SCATTERING: &str = "rayleighScatteringCoefficient";
    pub const RAYLEIGH_HEIGHT: &str = "rayleighHeight";
    pub const MIE_SCATTERING: &str = "mieScatteringCoefficient";
    pub const MIE_ABSORPTION: &str = "mieAbsorptionCoefficient";
    pub const MIE_HEIGHT: &str = "mieHeight";
    pub const MIE_G: &str = "mieG";
    pub const OZONE_ABSORPTION: &str = "ozoneAbsorptionCoefficient";
    pub const OZONE_CENTER: &str = "ozoneCenter";
    pub const OZONE_WIDTH: &str = "ozoneWidth";
    pub const MAX_STEPS: &str = "maxSteps";
    pub const MAX_TANGENT_LENGTH: &str = "maxTangentLength";
    pub const ATMOSPHERE_INTENSITY: &str = "atmosphereIntensity";
    pub const MULTI_SCATTERING_INTENSITY: &str = "atmosphereMultiScatteringIntensity";
}

/// Earth-like atmosphere. Distances in kilometers, coefficients per kilometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatteringParameters {
    /// Atmosphere thickness above the surface.
    pub top_height: f32,
    pub earth_radius: f32,
    /// Planet center in world space.
    pub earth_center: Vec3,
    pub rayleigh_scattering: Vec3,
    /// Rayleigh density scale height.
    pub rayleigh_height: f32,
    pub mie_scattering: Vec3,
    pub mie_absorption: Vec3,
    /// Mie density scale height.
    pub mie_height: f32,
    /// Henyey-Greenstein anisotropy.
    pub mie_g: f32,
    pub ozone_absorption: Vec3,
    /// Altitude of peak ozone density.
    pub ozone_center: f32,
    /// Width of the ozone tent profile.
    pub ozone_width: f32,
    /// Ray-march step limit.
    pub max_steps: u32,
    pub atmosphere_intensity: f32,
    pub multi_scattering_intensity: f32,
    max_tangent_length: f32,
}

impl Default for ScatteringParameters {
    fn default() -> Self {
        let mut params = Self {
            top_height: 85.0,
            earth_radius: 6378.0,
            earth_center: Vec3::new(0.0, -6378.0, 0.0),
            rayleigh_scattering: Vec3::new(5.802, 13.558, 33.1) * 1e-3,
            rayleigh_height: 8.5,
            mie_scattering: Vec3::splat(3.996e-3),
            mie_absorption: Vec3::splat(4.40e-3),
            mie_height: 1.2,
            mie_g: 0.8,
            ozone_absorption: Vec3::new(0.65, 1.881, 0.085) * 1e-3,
            ozone_center: 25.0,
            ozone_width: 15.0,
            max_steps: 128,
            atmosphere_intensity: 10.0,
            multi_scattering_intensity: 1.0,
            max_tangent_length: 0.0,
        };
        params.max_tangent_length = params.compute_max_tangent_length();
        params
    }
}

impl ScatteringParameters {
    /// Apply the override volume, if any, and refresh derived quantities.
    ///
    /// Overrides are sanitized first so a hand-edited volume cannot produce a
    /// zero-thickness atmosphere or a degenerate phase function. Fields the
    /// volume does not carry keep their current values.
    pub fn init(&mut self, volume: Option<&AtmosphereConfig>) {
        if let Some(volume) = volume.map(AtmosphereConfig::sanitized) {
            self.top_height = volume.top_height;
            self.earth_center = Vec3::from_array(volume.earth_center);
            self.mie_g = volume.mie_g;
            self.atmosphere_intensity = volume.atmosphere_intensity;
            self.multi_scattering_intensity = volume.atmosphere_multi_scattering_intensity;
        }
        self.max_tangent_length = self.compute_max_tangent_length();
    }

    /// Length of the ground-level tangent ray from the surface to the top of
    /// the atmosphere, as of the last [`Self::init`].
    pub fn max_tangent_length(&self) -> f32 {
        self.max_tangent_length
    }

    /// Radius of the atmosphere's outer shell.
    pub fn top_radius(&self) -> f32 {
        self.earth_radius + self.top_height
    }

    fn compute_max_tangent_length(&self) -> f32 {
        let top = self.top_radius();
        (top * top - self.earth_radius * self.earth_radius)
            .max(0.0)
            .sqrt()
    }

    /// Publish every parameter under its global uniform name.
    pub fn prepare_uniforms(&self, ctx: &mut FrameContext) {
        ctx.set_float(uniforms::TOP_HEIGHT, self.top_height);
        ctx.set_float(uniforms::EARTH_RADIUS, self.earth_radius);
        ctx.set_vector(uniforms::EARTH_CENTER, self.earth_center.extend(0.0));
        ctx.set_vector(
            uniforms::RAYLEIGH_SCATTERING,
            self.rayleigh_scattering.extend(0.0),
        );
        ctx.set_float(uniforms::RAYLEIGH_HEIGHT, self.rayleigh_height);
        ctx.set_vector(uniforms::MIE_SCATTERING, self.mie_scattering.extend(0.0));
        ctx.set_vector(uniforms::MIE_ABSORPTION, self.mie_absorption.extend(0.0));
        ctx.set_float(uniforms::MIE_HEIGHT, self.mie_height);
        ctx.set_float(uniforms::MIE_G, self.mie_g);
        ctx.set_vector(
            uniforms::OZONE_ABSORPTION,
            self.ozone_absorption.extend(0.0),
        );
        ctx.set_float(uniforms::OZONE_CENTER, self.ozone_center);
        ctx.set_float(uniforms::OZONE_WIDTH, self.ozone_width);
        ctx.set_int(
            uniforms::MAX_STEPS,
            i32::try_from(self.max_steps).unwrap_or(i32::MAX),
        );
        ctx.set_float(uniforms::MAX_TANGENT_LENGTH, self.max_tangent_length);
        ctx.set_float(uniforms::ATMOSPHERE_INTENSITY, self.atmosphere_intensity);
        ctx.set_float(
            uniforms::MULTI_SCATTERING_INTENSITY,
            self.multi_scattering_intensity,
        );
    }
}
