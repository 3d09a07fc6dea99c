//! The five atmosphere passes.
//!
//! Every stage follows the same per-frame protocol: [`AtmosphereStage::setup`]
//! hands it a parameter snapshot and its output target, then the host calls
//! `configure` and `execute` through [`RenderPass`]. A stage that runs before
//! setup fails with [`PassError::NotSetUp`].

mod aerial_perspective;
mod fog;
mod multi_scattering;
mod sky_view;
mod transmittance;

pub use aerial_perspective::AerialPerspectiveStage;
pub use fog::FogCompositeStage;
pub use multi_scattering::MultiScatteringStage;
pub use sky_view::SkyViewStage;
pub use transmittance::TransmittanceStage;

use glam::Vec4;
use stratus_render::{FrameContext, PassError, RenderPass, TextureId};

use crate::params::ScatteringParameters;
use crate::sampling::SamplingMode;

/// Scale-bias of a blit that covers the whole target.
pub(crate) const FULLSCREEN_SCALE_BIAS: Vec4 = Vec4::new(1.0, 1.0, 0.0, 0.0);

/// Per-frame inputs handed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct StageSetup<'a> {
    pub params: &'a ScatteringParameters,
    /// Texture the stage writes.
    pub target: TextureId,
    /// Only read by the multiple-scattering stage.
    pub sampling: SamplingMode,
}

/// A [`RenderPass`] with the atmosphere's setup and teardown hooks.
pub trait AtmosphereStage: RenderPass {
    /// Bind this frame's parameters and output target.
    fn setup(&mut self, setup: &StageSetup<'_>);

    /// Drop per-frame bindings. The stage must be set up again before use.
    fn dispose(&mut self);
}

/// What a stage remembers between `setup` and `execute`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bound {
    pub params: ScatteringParameters,
    pub target: TextureId,
}

impl Bound {
    pub fn from_setup(setup: &StageSetup<'_>) -> Self {
        Self {
            params: *setup.params,
            target: setup.target,
        }
    }
}

pub(crate) fn bound<'s>(
    slot: &'s Option<Bound>,
    pass: &'static str,
) -> Result<&'s Bound, PassError> {
    slot.as_ref().ok_or(PassError::NotSetUp { pass })
}

/// Fail unless every binding in `names` holds a texture this frame.
pub(crate) fn require_textures(
    ctx: &FrameContext,
    pass: &'static str,
    names: &[&'static str],
) -> Result<(), PassError> {
    match names.iter().find(|name| ctx.globals().texture(name).is_none()) {
        Some(&binding) => Err(PassError::MissingInput { pass, binding }),
        None => Ok(()),
    }
}

/// Record `body` inside a debug group. The group is closed even when `body` fails.
pub(crate) fn in_debug_group(
    ctx: &mut FrameContext,
    label: &str,
    body: impl FnOnce(&mut FrameContext) -> Result<(), PassError>,
) -> Result<(), PassError> {
    ctx.push_debug_group(label);
    let result = body(ctx);
    ctx.pop_debug_group();
    result
}

#[cfg(test)]
pub(crate) mod test_support {
    use stratus_render::{CameraTargets, FrameContext, TextureId};

    pub const LUT_TARGET: TextureId = TextureId::from_raw(50);

    pub fn frame() -> FrameContext {
        FrameContext::new(
            0,
            CameraTargets {
                color: TextureId::from_raw(1),
                depth: TextureId::from_raw(2),
                width: 64,
                height: 32,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::frame;
    use super::*;
    use crate::luts::bindings;

    #[test]
    fn test_require_textures_names_first_missing() {
        let mut ctx = frame();
        ctx.set_texture(bindings::TRANSMITTANCE, TextureId::from_raw(3));
        let err = require_textures(
            &ctx,
            "probe",
            &[bindings::TRANSMITTANCE, bindings::MULTI_SCATTERING],
        )
        .unwrap_err();
        assert_eq!(
            err,
            PassError::MissingInput {
                pass: "probe",
                binding: bindings::MULTI_SCATTERING
            }
        );
    }

    #[test]
    fn test_require_textures_ignores_non_texture_values() {
        let mut ctx = frame();
        ctx.set_float(bindings::TRANSMITTANCE, 1.0);
        assert!(require_textures(&ctx, "probe", &[bindings::TRANSMITTANCE]).is_err());
    }

    #[test]
    fn test_debug_group_closed_on_error() {
        let mut ctx = frame();
        let result = in_debug_group(&mut ctx, "Failing", |_| {
            Err(PassError::NotSetUp { pass: "failing" })
        });
        assert!(result.is_err());
        assert_eq!(
            ctx.commands().last(),
            Some(&stratus_render::Command::PopDebugGroup)
        );
    }
}
