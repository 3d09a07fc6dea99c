use stratus_render::FrameContext;

use crate::luts::bindings;
use crate::params::uniforms;

/// How far a frame has progressed through the atmosphere chain.
///
/// Read off the frame context rather than tracked separately, so it always
/// agrees with what later passes will actually see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AtmosphereFrameState {
    Uninitialized,
    /// Scattering uniforms have been published.
    ParamsRefreshed,
    TransmittanceReady,
    MultiScatteringReady,
    SkyViewReady,
    AerialPerspectiveReady,
    /// Fog has been drawn into the camera color target.
    Composited,
}

impl AtmosphereFrameState {
    pub fn of(ctx: &FrameContext) -> Self {
        let globals = ctx.globals();
        let has = |name: &str| globals.texture(name).is_some();

        if ctx.draws_into(ctx.camera().color).next().is_some() {
            Self::Composited
        } else if has(bindings::AERIAL_PERSPECTIVE) {
            Self::AerialPerspectiveReady
        } else if has(bindings::SKY_VIEW) {
            Self::SkyViewReady
        } else if has(bindings::MULTI_SCATTERING) {
            Self::MultiScatteringReady
        } else if has(bindings::TRANSMITTANCE) {
            Self::TransmittanceReady
        } else if globals.contains(uniforms::TOP_HEIGHT) {
            Self::ParamsRefreshed
        } else {
            Self::Uninitialized
        }
    }
}
