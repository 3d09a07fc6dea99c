//! Owns the atmosphere stages and their LUTs across frames.
//!
//! The host drives four hooks: [`AtmospherePipeline::create`] once,
//! [`AtmospherePipeline::setup_per_frame`] and [`AtmospherePipeline::enqueue`]
//! every frame, and [`AtmospherePipeline::dispose`] at teardown.

use stratus_config::{AtmosphereConfig, RenderConfig};
use stratus_render::{
    CameraTargets, PassQueue, ProgramId, ProgramSource, RenderDevice, RenderPass, RenderTexture,
    ShaderError, ShaderLibrary, TextureDesc, TextureError,
};

use crate::error::AtmosphereError;
use crate::luts;
use crate::params::ScatteringParameters;
use crate::sampling::SamplingMode;
use crate::stages::{
    AerialPerspectiveStage, AtmosphereStage, FogCompositeStage, MultiScatteringStage, SkyViewStage,
    StageSetup, TransmittanceStage,
};

/// Programs the pipeline is built from. Either may be absent.
#[derive(Debug, Clone, Default)]
pub struct AtmosphereSettings {
    /// Fullscreen program with the transmittance, multi-scattering, sky-view
    /// and fog passes. Without it the pipeline records nothing.
    pub shader: Option<ProgramSource>,
    /// Compute program exposing the `AerialPerspective` kernel. Without it the
    /// fog composite runs with no aerial-perspective volume.
    pub compute_shader: Option<ProgramSource>,
}

impl AtmosphereSettings {
    /// Read both programs from the library's shader directory.
    ///
    /// A missing file or directory leaves that program unset; other I/O
    /// failures are returned.
    pub fn from_shader_dir(
        library: &ShaderLibrary,
        render: &RenderConfig,
    ) -> Result<Self, ShaderError> {
        Ok(Self {
            shader: optional_source(library, &render.atmosphere_shader)?,
            compute_shader: optional_source(library, &render.aerial_perspective_shader)?,
        })
    }
}

fn optional_source(
    library: &ShaderLibrary,
    filename: &str,
) -> Result<Option<ProgramSource>, ShaderError> {
    match library.read_source(filename) {
        Ok(source) => Ok(Some(source)),
        Err(ShaderError::FileNotFound { path }) => {
            tracing::warn!(path = %path.display(), "Atmosphere program not found");
            Ok(None)
        }
        Err(ShaderError::NoShaderDir) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Where the pipeline is in its create/dispose cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Created,
    /// Torn down. [`AtmospherePipeline::create`] may build it again.
    Disposed,
}

/// The atmosphere render feature.
#[derive(Debug, Default)]
pub struct AtmospherePipeline {
    lifecycle: Lifecycle,
    params: ScatteringParameters,
    program: Option<ProgramId>,
    compute_program: Option<ProgramId>,

    transmittance: Option<TransmittanceStage>,
    multi_scattering: Option<MultiScatteringStage>,
    sky_view: Option<SkyViewStage>,
    aerial_perspective: Option<AerialPerspectiveStage>,
    fog: Option<FogCompositeStage>,

    transmittance_lut: RenderTexture,
    multi_scattering_lut: RenderTexture,
    sky_view_lut: RenderTexture,
    aerial_perspective_lut: RenderTexture,
}

impl AtmospherePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Parameters as of the last [`Self::setup_per_frame`].
    pub fn params(&self) -> &ScatteringParameters {
        &self.params
    }

    /// Compile programs and build the stages they support.
    ///
    /// Calling this on a created pipeline does nothing.
    pub fn create<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        settings: &AtmosphereSettings,
    ) -> Result<(), AtmosphereError> {
        if self.lifecycle == Lifecycle::Created {
            tracing::debug!("Atmosphere pipeline already created");
            return Ok(());
        }

        if let Err(err) = self.build_stages(device, settings) {
            self.teardown(device);
            return Err(err);
        }

        self.lifecycle = Lifecycle::Created;
        tracing::info!(passes = ?self.pass_names(), "Atmosphere pipeline created");
        Ok(())
    }

    fn build_stages<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        settings: &AtmosphereSettings,
    ) -> Result<(), AtmosphereError> {
        // The aerial-perspective kernel reads LUTs only the fullscreen program
        // produces, so without it nothing is built at all.
        let Some(source) = &settings.shader else {
            tracing::warn!("No atmosphere program assigned, atmosphere disabled");
            return Ok(());
        };

        let missing = luts::FullscreenPass::missing_entry_points(&source.wgsl);
        if !missing.is_empty() {
            tracing::warn!(
                program = %source.label,
                ?missing,
                "Atmosphere program lacks pass entry points"
            );
        }
        let program = device.create_program(source)?;
        self.program = Some(program);
        self.transmittance = Some(TransmittanceStage::new(program));
        self.multi_scattering = Some(MultiScatteringStage::new(program));
        self.sky_view = Some(SkyViewStage::new(program));
        self.fog = Some(FogCompositeStage::new(program));

        if let Some(source) = &settings.compute_shader {
            let program = device.create_program(source)?;
            match device.find_kernel(program, luts::AERIAL_PERSPECTIVE_KERNEL) {
                Some(kernel) => {
                    self.compute_program = Some(program);
                    self.aerial_perspective = Some(AerialPerspectiveStage::new(kernel));
                }
                None => {
                    tracing::warn!(
                        program = %source.label,
                        kernel = luts::AERIAL_PERSPECTIVE_KERNEL,
                        "Compute program lacks the aerial-perspective kernel"
                    );
                    device.destroy_program(program);
                }
            }
        }
        Ok(())
    }

    /// Refresh parameters, reallocate changed LUTs, and bind stages to them.
    ///
    /// `volume` is the override source; `None` keeps the built-in parameters
    /// and Fibonacci sampling. A LUT that cannot be allocated fails the frame.
    pub fn setup_per_frame<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        volume: Option<&AtmosphereConfig>,
        camera: &CameraTargets,
    ) -> Result<(), AtmosphereError> {
        if self.lifecycle != Lifecycle::Created {
            return Err(AtmosphereError::NotCreated(self.lifecycle));
        }

        self.params.init(volume);
        if self.passes().next().is_none() {
            return Ok(());
        }

        let params = self.params;
        let sampling = volume.map_or(SamplingMode::default(), |v| {
            SamplingMode::from_fibonacci_flag(v.use_fibonacci_sampling)
        });

        refresh_lut(
            device,
            &mut self.transmittance_lut,
            &luts::TRANSMITTANCE,
            self.transmittance.as_mut(),
            &params,
            sampling,
        )?;
        refresh_lut(
            device,
            &mut self.multi_scattering_lut,
            &luts::MULTI_SCATTERING,
            self.multi_scattering.as_mut(),
            &params,
            sampling,
        )?;
        refresh_lut(
            device,
            &mut self.sky_view_lut,
            &luts::SKY_VIEW,
            self.sky_view.as_mut(),
            &params,
            sampling,
        )?;
        refresh_lut(
            device,
            &mut self.aerial_perspective_lut,
            &luts::AERIAL_PERSPECTIVE,
            self.aerial_perspective.as_mut(),
            &params,
            sampling,
        )?;

        if let Some(fog) = &mut self.fog {
            fog.setup(&StageSetup {
                params: &params,
                target: camera.color,
                sampling,
            });
        }
        Ok(())
    }

    /// Queue every built stage in dependency order.
    pub fn enqueue<'a>(&'a self, queue: &mut PassQueue<'a>) {
        if self.lifecycle != Lifecycle::Created {
            return;
        }
        for pass in self.passes() {
            queue.enqueue(pass);
        }
    }

    /// Release LUTs and programs. Safe to call more than once.
    pub fn dispose<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        if self.lifecycle != Lifecycle::Created {
            tracing::debug!(lifecycle = ?self.lifecycle, "Atmosphere dispose skipped");
            return;
        }
        self.teardown(device);
        self.lifecycle = Lifecycle::Disposed;
        tracing::info!("Atmosphere pipeline disposed");
    }

    fn teardown<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        for stage in self.stages_mut() {
            stage.dispose();
        }
        self.transmittance = None;
        self.multi_scattering = None;
        self.sky_view = None;
        self.aerial_perspective = None;
        self.fog = None;

        for lut in [
            &mut self.transmittance_lut,
            &mut self.multi_scattering_lut,
            &mut self.sky_view_lut,
            &mut self.aerial_perspective_lut,
        ] {
            lut.release(device);
        }

        for program in [self.program.take(), self.compute_program.take()]
            .into_iter()
            .flatten()
        {
            if !device.destroy_program(program) {
                tracing::warn!(%program, "Device did not know atmosphere program");
            }
        }
    }

    fn passes(&self) -> impl Iterator<Item = &dyn RenderPass> {
        let passes: [Option<&dyn RenderPass>; 5] = [
            self.transmittance.as_ref().map(|s| s as &dyn RenderPass),
            self.multi_scattering.as_ref().map(|s| s as &dyn RenderPass),
            self.sky_view.as_ref().map(|s| s as &dyn RenderPass),
            self.aerial_perspective.as_ref().map(|s| s as &dyn RenderPass),
            self.fog.as_ref().map(|s| s as &dyn RenderPass),
        ];
        passes.into_iter().flatten()
    }

    fn stages_mut(&mut self) -> impl Iterator<Item = &mut dyn AtmosphereStage> {
        let stages: [Option<&mut dyn AtmosphereStage>; 5] = [
            self.transmittance
                .as_mut()
                .map(|s| s as &mut dyn AtmosphereStage),
            self.multi_scattering
                .as_mut()
                .map(|s| s as &mut dyn AtmosphereStage),
            self.sky_view.as_mut().map(|s| s as &mut dyn AtmosphereStage),
            self.aerial_perspective
                .as_mut()
                .map(|s| s as &mut dyn AtmosphereStage),
            self.fog.as_mut().map(|s| s as &mut dyn AtmosphereStage),
        ];
        stages.into_iter().flatten()
    }

    /// Names of the built stages in execution order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes().map(|p| p.name()).collect()
    }

    pub fn has_aerial_perspective(&self) -> bool {
        self.aerial_perspective.is_some()
    }

    pub fn multi_scattering(&self) -> Option<&MultiScatteringStage> {
        self.multi_scattering.as_ref()
    }

    /// The four LUTs: transmittance, multi-scattering, sky-view, aerial perspective.
    pub fn luts(&self) -> [&RenderTexture; 4] {
        [
            &self.transmittance_lut,
            &self.multi_scattering_lut,
            &self.sky_view_lut,
            &self.aerial_perspective_lut,
        ]
    }
}

impl Drop for AtmospherePipeline {
    fn drop(&mut self) {
        if self.luts().iter().any(|lut| lut.is_allocated()) {
            tracing::warn!("Atmosphere pipeline dropped without dispose, LUTs leaked");
        }
    }
}

fn refresh_lut<D: RenderDevice + ?Sized, S: AtmosphereStage>(
    device: &mut D,
    lut: &mut RenderTexture,
    desc: &TextureDesc,
    stage: Option<&mut S>,
    params: &ScatteringParameters,
    sampling: SamplingMode,
) -> Result<(), TextureError> {
    if lut.reallocate_if_needed(device, desc)? {
        tracing::debug!(lut = desc.label, "Allocated atmosphere LUT");
    }
    if let (Some(stage), Some(target)) = (stage, lut.id()) {
        stage.setup(&StageSetup {
            params,
            target,
            sampling,
        });
    }
    Ok(())
}
