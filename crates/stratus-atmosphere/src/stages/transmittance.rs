use stratus_render::{FrameContext, PassError, ProgramId, RenderPass, RenderPassEvent};

use super::{AtmosphereStage, Bound, FULLSCREEN_SCALE_BIAS, StageSetup, bound, in_debug_group};
use crate::luts::{FullscreenPass, bindings};

const DEBUG_GROUP: &str = "AtmosphericScatteringTransmittancePass";

/// Optical depth to the top of the atmosphere, stored as transmittance.
///
/// Root of the LUT chain: reads only the scattering uniforms.
#[derive(Debug)]
pub struct TransmittanceStage {
    program: ProgramId,
    bound: Option<Bound>,
}

impl TransmittanceStage {
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            bound: None,
        }
    }
}

impl RenderPass for TransmittanceStage {
    fn name(&self) -> &'static str {
        "transmittance"
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
        in_debug_group(ctx, DEBUG_GROUP, |ctx| {
            bound.params.prepare_uniforms(ctx);
            ctx.draw_fullscreen(
                self.program,
                FullscreenPass::Transmittance.index(),
                FULLSCREEN_SCALE_BIAS,
            )?;
            ctx.set_texture(bindings::TRANSMITTANCE, bound.target);
            Ok(())
        })
    }
}

impl AtmosphereStage for TransmittanceStage {
    fn setup(&mut self, setup: &StageSetup<'_>) {
        self.bound = Some(Bound::from_setup(setup));
    }

    fn dispose(&mut self) {
        self.bound = None;
    }
}
