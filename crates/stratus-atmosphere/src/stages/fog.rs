use stratus_render::{FrameContext, PassError, PassInput, ProgramId, RenderPass, RenderPassEvent};

use super::{AtmosphereStage, Bound, FULLSCREEN_SCALE_BIAS, StageSetup, bound, in_debug_group};
use crate::luts::{FullscreenPass, bindings};

const DEBUG_GROUP: &str = "AtmosphericScatteringAtmosphereFogPass";

/// Blends aerial perspective over the rendered scene, in place.
///
/// The only stage whose target is the host's camera color buffer rather than
/// one of the LUTs. Runs without the aerial-perspective volume when no compute
/// program is available; the program then sees the binding unset.
#[derive(Debug)]
pub struct FogCompositeStage {
    program: ProgramId,
    bound: Option<Bound>,
}

impl FogCompositeStage {
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            bound: None,
        }
    }
}

impl RenderPass for FogCompositeStage {
    fn name(&self) -> &'static str {
        "fog-composite"
    }

    fn event(&self) -> RenderPassEvent {
        RenderPassEvent::BeforeRenderingPostProcessing
    }

    fn inputs(&self) -> PassInput {
        PassInput::COLOR_DEPTH
    }

    fn configure(&self, ctx: &mut FrameContext) {
        if let Some(bound) = &self.bound {
            ctx.set_render_target(bound.target);
        }
    }

    fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError> {
        let bound = bound(&self.bound, self.name())?;
        if !ctx.globals().contains(bindings::AERIAL_PERSPECTIVE) {
            tracing::trace!("Fog composite without an aerial-perspective volume");
        }
        in_debug_group(ctx, DEBUG_GROUP, |ctx| {
            bound.params.prepare_uniforms(ctx);
            ctx.draw_fullscreen(
                self.program,
                FullscreenPass::Fog.index(),
                FULLSCREEN_SCALE_BIAS,
            )
        })
    }
}

impl AtmosphereStage for FogCompositeStage {
    fn setup(&mut self, setup: &StageSetup<'_>) {
        self.bound = Some(Bound::from_setup(setup));
    }

    fn dispose(&mut self) {
        self.bound = None;
    }
}
