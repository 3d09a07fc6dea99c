use stratus_render::{FrameContext, PassError, ProgramId, RenderPass, RenderPassEvent};

use super::{
    AtmosphereStage, Bound, FULLSCREEN_SCALE_BIAS, StageSetup, bound, in_debug_group,
    require_textures,
};
use crate::luts::{FullscreenPass, bindings};
use crate::sampling::{SampleDirectionSet, SamplingMode};

const DEBUG_GROUP: &str = "AtmosphericScatteringMultiScatteringPass";
const INPUTS: &[&str] = &[bindings::TRANSMITTANCE];

/// Second-and-higher order scattering, integrated over 64 sphere directions.
///
/// The direction set is cached and only rebuilt when the sampling mode changes
/// between setups.
#[derive(Debug)]
pub struct MultiScatteringStage {
    program: ProgramId,
    bound: Option<Bound>,
    samples: Option<SampleDirectionSet>,
    generations: u64,
}

impl MultiScatteringStage {
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            bound: None,
            samples: None,
            generations: 0,
        }
    }

    /// Directions uploaded as `_SampleDirections`, once set up.
    pub fn sample_directions(&self) -> Option<&SampleDirectionSet> {
        self.samples.as_ref()
    }

    /// How many times the direction set has been generated.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    fn ensure_samples(&mut self, mode: SamplingMode) {
        if self.samples.as_ref().is_some_and(|s| s.mode() == mode) {
            return;
        }
        tracing::debug!(?mode, "Generating multi-scattering sample directions");
        self.samples = Some(SampleDirectionSet::generate(mode));
        self.generations += 1;
    }
}

impl RenderPass for MultiScatteringStage {
    fn name(&self) -> &'static str {
        "multi-scattering"
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
        let samples = self
            .samples
            .as_ref()
            .ok_or(PassError::NotSetUp { pass: self.name() })?;
        require_textures(ctx, self.name(), INPUTS)?;
        in_debug_group(ctx, DEBUG_GROUP, |ctx| {
            bound.params.prepare_uniforms(ctx);
            ctx.set_vector_array(bindings::SAMPLE_DIRECTIONS, samples.as_slice());
            ctx.draw_fullscreen(
                self.program,
                FullscreenPass::MultiScattering.index(),
                FULLSCREEN_SCALE_BIAS,
            )?;
            ctx.set_texture(bindings::MULTI_SCATTERING, bound.target);
            Ok(())
        })
    }
}

impl AtmosphereStage for MultiScatteringStage {
    fn setup(&mut self, setup: &StageSetup<'_>) {
        self.bound = Some(Bound::from_setup(setup));
        self.ensure_samples(setup.sampling);
    }

    /// Keeps the cached directions; they depend only on the sampling mode.
    fn dispose(&mut self) {
        self.bound = None;
    }
}
