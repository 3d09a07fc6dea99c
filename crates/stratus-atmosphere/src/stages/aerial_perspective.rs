use glam::Vec4;
use stratus_render::{FrameContext, KernelId, PassError, RenderPass, RenderPassEvent};

use super::{AtmosphereStage, Bound, StageSetup, bound, in_debug_group, require_textures};
use crate::luts::{self, AERIAL_PERSPECTIVE, AERIAL_PERSPECTIVE_SLICES, bindings};

const DEBUG_GROUP: &str = "AtmosphericScatteringAerialPerspectivePass";
const INPUTS: &[&str] = &[
    bindings::TRANSMITTANCE,
    bindings::MULTI_SCATTERING,
    bindings::SKY_VIEW,
];

/// In-scattering and transmittance along camera rays, sliced by depth.
///
/// The only compute stage: the kernel writes the froxel volume directly, so
/// there is no render target to configure.
#[derive(Debug)]
pub struct AerialPerspectiveStage {
    kernel: KernelId,
    bound: Option<Bound>,
}

impl AerialPerspectiveStage {
    pub fn new(kernel: KernelId) -> Self {
        Self {
            kernel,
            bound: None,
        }
    }

    /// Volume layout published as `_AerialPerspectiveParams`.
    pub fn volume_params() -> Vec4 {
        Vec4::new(
            AERIAL_PERSPECTIVE.width as f32,
            AERIAL_PERSPECTIVE.height as f32,
            AERIAL_PERSPECTIVE_SLICES as f32,
            0.0,
        )
    }
}

impl RenderPass for AerialPerspectiveStage {
    fn name(&self) -> &'static str {
        "aerial-perspective"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BeforeRenderingOpaques
    }

    fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError> {
        let bound = bound(&self.bound, self.name())?;
        require_textures(ctx, self.name(), INPUTS)?;
        in_debug_group(ctx, DEBUG_GROUP, |ctx| {
            bound.params.prepare_uniforms(ctx);
            ctx.set_vector(bindings::AERIAL_PERSPECTIVE_PARAMS, Self::volume_params());
            ctx.set_compute_texture(self.kernel, bindings::AERIAL_PERSPECTIVE, bound.target);
            ctx.set_texture(bindings::AERIAL_PERSPECTIVE, bound.target);
            ctx.dispatch(self.kernel, luts::AERIAL_PERSPECTIVE_GROUPS);
            Ok(())
        })
    }
}

impl AtmosphereStage for AerialPerspectiveStage {
    fn setup(&mut self, setup: &StageSetup<'_>) {
        self.bound = Some(Bound::from_setup(setup));
    }

    fn dispose(&mut self) {
        self.bound = None;
    }
}
