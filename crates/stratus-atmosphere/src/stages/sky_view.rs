use stratus_render::{FrameContext, PassError, ProgramId, RenderPass, RenderPassEvent};

use super::{
    AtmosphereStage, Bound, FULLSCREEN_SCALE_BIAS, StageSetup, bound, in_debug_group,
    require_textures,
};
use crate::luts::{FullscreenPass, bindings};

const DEBUG_GROUP: &str = "AtmosphericScatteringAtmospherePass";
const INPUTS: &[&str] = &[bindings::TRANSMITTANCE, bindings::MULTI_SCATTERING];

/// Sky radiance over azimuth and elevation, seen from the camera altitude.
#[derive(Debug)]
pub struct SkyViewStage {
    program: ProgramId,
    bound: Option<Bound>,
}

impl SkyViewStage {
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            bound: None,
        }
    }
}

impl RenderPass for SkyViewStage {
    fn name(&self) -> &'static str {
        "sky-view"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BeforeRenderingOpaques
    }

    fn configure(&self, ctx: &mut FrameContext) {
        if let Some(bound) = &self.bound {
            ctx.set_render_target(bound.target);
        }
    }

    fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError> {
        let bound = bound(&self.bound, self.name())?;
        require_textures(ctx, self.name(), INPUTS)?;
        in_debug_group(ctx, DEBUG_GROUP, |ctx| {
            bound.params.prepare_uniforms(ctx);
            ctx.draw_fullscreen(
                self.program,
                FullscreenPass::SkyView.index(),
                FULLSCREEN_SCALE_BIAS,
            )?;
            ctx.set_texture(bindings::SKY_VIEW, bound.target);
            Ok(())
        })
    }
}

impl AtmosphereStage for SkyViewStage {
    fn setup(&mut self, setup: &StageSetup<'_>) {
        self.bound = Some(Bound::from_setup(setup));
    }

    fn dispose(&mut self) {
        self.bound = None;
    }
}
