//! Lookup-table descriptors and the global names they are published under.
//!
//! Every LUT stores half-float RGBA. Layouts are fixed; only the camera color
//! target depends on the host resolution.

use stratus_render::{ShaderStage, TextureDesc, declares_entry_point};

pub const LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Transmittance to the top of the atmosphere over (view zenith, altitude).
pub const TRANSMITTANCE: TextureDesc = TextureDesc::d2("transmittance-lut", 256, 64, LUT_FORMAT);

/// Isotropic multiple-scattering contribution over (sun zenith, altitude).
pub const MULTI_SCATTERING: TextureDesc =
    TextureDesc::d2("multi-scattering-lut", 32, 32, LUT_FORMAT);

/// Sky radiance over (azimuth, elevation) for the current camera altitude.
pub const SKY_VIEW: TextureDesc = TextureDesc::d2("sky-view-lut", 256, 128, LUT_FORMAT);

pub const AERIAL_PERSPECTIVE_SLICES: u32 = 24;

/// Froxel volume of in-scattering and transmittance along camera rays,
/// written texel-by-texel by the aerial-perspective kernel.
pub const AERIAL_PERSPECTIVE: TextureDesc =
    TextureDesc::d2("aerial-perspective-lut", 32, 32, LUT_FORMAT)
        .layered(
            wgpu::TextureViewDimension::D2Array,
            AERIAL_PERSPECTIVE_SLICES,
        )
        .with_random_write();

/// Threads per workgroup of the aerial-perspective kernel on x and y.
pub const AERIAL_PERSPECTIVE_WORKGROUP: [u32; 3] = [8, 8, 1];

/// Workgroups covering the aerial-perspective volume: 32x32 texels in 8x8
/// tiles, one group deep (the kernel walks all slices itself).
pub const AERIAL_PERSPECTIVE_GROUPS: [u32; 3] = [
    AERIAL_PERSPECTIVE.width / AERIAL_PERSPECTIVE_WORKGROUP[0],
    AERIAL_PERSPECTIVE.height / AERIAL_PERSPECTIVE_WORKGROUP[1],
    1,
];

/// Entry point of the aerial-perspective kernel.
pub const AERIAL_PERSPECTIVE_KERNEL: &str = "AerialPerspective";

/// Global binding names.
pub mod bindings {
    pub const TRANSMITTANCE: &str = "_PrecomputedTransmittance";
    pub const SAMPLE_DIRECTIONS: &str = "_SampleDirections";
    pub const MULTI_SCATTERING: &str = "_PrecomputedMultiScattering";
    pub const SKY_VIEW: &str = "_PrecomputedAtmosphere";
    pub const AERIAL_PERSPECTIVE: &str = "_PrecomputedAerialPerspective";
    /// `(width, height, slices, 0)` of the aerial-perspective volume.
    pub const AERIAL_PERSPECTIVE_PARAMS: &str = "_AerialPerspectiveParams";
}

/// Pass indices inside the fullscreen atmosphere program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FullscreenPass {
    Transmittance = 0,
    MultiScattering = 1,
    SkyView = 2,
    Fog = 3,
}

/// Vertex entry point shared by every fullscreen pass.
pub const FULLSCREEN_VERTEX_ENTRY: &str = "vs_fullscreen";

impl FullscreenPass {
    pub const ALL: [Self; 4] = [
        Self::Transmittance,
        Self::MultiScattering,
        Self::SkyView,
        Self::Fog,
    ];

    pub const fn index(self) -> u32 {
        self as u32
    }

    /// Fragment entry point implementing the pass.
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Transmittance => "fs_transmittance",
            Self::MultiScattering => "fs_multi_scattering",
            Self::SkyView => "fs_sky_view",
            Self::Fog => "fs_fog",
        }
    }

    /// Entry points `wgsl` fails to declare, vertex stage first.
    pub fn missing_entry_points(wgsl: &str) -> Vec<&'static str> {
        let vertex = (!declares_entry_point(wgsl, ShaderStage::Vertex, FULLSCREEN_VERTEX_ENTRY))
            .then_some(FULLSCREEN_VERTEX_ENTRY);
        let fragments = Self::ALL
            .into_iter()
            .map(Self::entry_point)
            .filter(|name| !declares_entry_point(wgsl, ShaderStage::Fragment, name));
        vertex.into_iter().chain(fragments).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lut_extents() {
        assert_eq!(TRANSMITTANCE.extent(), (256, 64, 1));
        assert_eq!(MULTI_SCATTERING.extent(), (32, 32, 1));
        assert_eq!(SKY_VIEW.extent(), (256, 128, 1));
        assert_eq!(AERIAL_PERSPECTIVE.extent(), (32, 32, 24));
    }

    #[test]
    fn test_only_aerial_perspective_is_writable() {
        assert!(AERIAL_PERSPECTIVE.random_write);
        assert_eq!(
            AERIAL_PERSPECTIVE.dimension,
            wgpu::TextureViewDimension::D2Array
        );
        for desc in [&TRANSMITTANCE, &MULTI_SCATTERING, &SKY_VIEW] {
            assert!(!desc.random_write, "{} should be render-only", desc.label);
            assert_eq!(desc.format, LUT_FORMAT);
        }
    }

    #[test]
    fn test_descriptors_validate() {
        for desc in [&TRANSMITTANCE, &MULTI_SCATTERING, &SKY_VIEW, &AERIAL_PERSPECTIVE] {
            assert!(desc.validate().is_ok(), "{} invalid", desc.label);
        }
    }

    #[test]
    fn test_dispatch_covers_volume() {
        assert_eq!(AERIAL_PERSPECTIVE_GROUPS, [4, 4, 1]);
        assert_eq!(
            AERIAL_PERSPECTIVE_GROUPS[0] * AERIAL_PERSPECTIVE_WORKGROUP[0],
            AERIAL_PERSPECTIVE.width
        );
    }

    #[test]
    fn test_pass_indices() {
        assert_eq!(FullscreenPass::Transmittance.index(), 0);
        assert_eq!(FullscreenPass::MultiScattering.index(), 1);
        assert_eq!(FullscreenPass::SkyView.index(), 2);
        assert_eq!(FullscreenPass::Fog.index(), 3);
    }

    #[test]
    fn test_missing_entry_points() {
        let partial = r#"
            @vertex fn vs_fullscreen() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }
            @fragment fn fs_transmittance() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
            @fragment fn fs_fog() -> @location(0) vec4<f32> { return vec4<f32>(0.0); }
            fn fs_sky_view() {}
        "#;
        assert_eq!(
            FullscreenPass::missing_entry_points(partial),
            vec!["fs_multi_scattering", "fs_sky_view"]
        );
        assert_eq!(
            FullscreenPass::missing_entry_points(""),
            vec![
                "vs_fullscreen",
                "fs_transmittance",
                "fs_multi_scattering",
                "fs_sky_view",
                "fs_fog"
            ]
        );
    }
}
