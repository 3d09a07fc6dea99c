//! Demo binary that renders a few atmosphere frames and logs what each recorded.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p stratus-demo` to use the GPU when one is available.
//! Run with `cargo run -p stratus-demo -- --headless --grid-sampling` to dry-run
//! without a GPU using the 8x8 sample grid.

use std::process::ExitCode;

use clap::Parser;
use stratus_atmosphere::{
    AtmosphereError, AtmosphereFrameState, AtmospherePipeline, AtmosphereSettings,
    AtmosphereUniform, SampleDirectionsUniform,
};
use stratus_config::{CliArgs, Config, default_config_dir};
use stratus_render::{
    CameraTargets, Command, FrameContext, HeadlessDevice, PassQueue, ProgramSource, RenderDevice,
    ShaderLibrary, TextureDesc, WgpuDevice,
};
use tracing::{info, warn};

const BUILTIN_ATMOSPHERE: &str = include_str!("../shaders/atmospheric_scattering.wgsl");
const BUILTIN_AERIAL_PERSPECTIVE: &str = include_str!("../shaders/aerial_perspective.wgsl");

/// Totals over every rendered frame.
#[derive(Debug, Default)]
struct RunSummary {
    frames: u32,
    draws: usize,
    dispatches: usize,
    uniform_bytes: usize,
}

impl RunSummary {
    fn record(&mut self, ctx: &FrameContext) {
        self.frames += 1;
        for command in ctx.commands() {
            match command {
                Command::DrawFullscreen { .. } => self.draws += 1,
                Command::Dispatch { .. } => self.dispatches += 1,
                _ => {}
            }
        }
    }
}

/// Programs from the configured shader directory, falling back to the
/// pass-through programs compiled into the binary.
fn load_settings(config: &Config) -> AtmosphereSettings {
    let library = match &config.render.shader_dir {
        Some(dir) => ShaderLibrary::new().with_shader_dir(dir),
        None => ShaderLibrary::new(),
    };
    let mut settings = AtmosphereSettings::from_shader_dir(&library, &config.render)
        .unwrap_or_else(|e| {
            warn!("Failed to read atmosphere programs: {e}");
            AtmosphereSettings::default()
        });

    if settings.shader.is_none() {
        info!("Using built-in atmosphere program");
        settings.shader = Some(ProgramSource::new(
            config.render.atmosphere_shader.clone(),
            BUILTIN_ATMOSPHERE,
        ));
    }
    if settings.compute_shader.is_none() {
        info!("Using built-in aerial-perspective kernel");
        settings.compute_shader = Some(ProgramSource::new(
            config.render.aerial_perspective_shader.clone(),
            BUILTIN_AERIAL_PERSPECTIVE,
        ));
    }
    settings
}

const CAMERA_COLOR: TextureDesc =
    TextureDesc::d2("camera-color", 1, 1, wgpu::TextureFormat::Rgba16Float);
const CAMERA_DEPTH: TextureDesc =
    TextureDesc::d2("camera-depth", 1, 1, wgpu::TextureFormat::Depth32Float);

fn create_camera<D: RenderDevice + ?Sized>(
    device: &mut D,
    config: &Config,
) -> Result<CameraTargets, AtmosphereError> {
    let (width, height) = (config.render.width.max(1), config.render.height.max(1));
    let color = device.create_texture(&CAMERA_COLOR.resized(width, height))?;
    let depth = device.create_texture(&CAMERA_DEPTH.resized(width, height))?;
    Ok(CameraTargets {
        color,
        depth,
        width,
        height,
    })
}

fn render_frames<D: RenderDevice + ?Sized>(
    device: &mut D,
    config: &Config,
    settings: &AtmosphereSettings,
) -> Result<RunSummary, AtmosphereError> {
    let camera = create_camera(device, config)?;
    let mut pipeline = AtmospherePipeline::new();
    pipeline.create(device, settings)?;

    let mut summary = RunSummary::default();
    let result = (0..config.render.frames).try_for_each(|frame| {
        pipeline.setup_per_frame(device, config.atmosphere.as_ref(), &camera)?;

        let mut queue = PassQueue::new();
        pipeline.enqueue(&mut queue);
        let mut ctx = FrameContext::new(u64::from(frame), camera);
        queue.execute(&mut ctx)?;

        if let Some(uniform) = AtmosphereUniform::from_globals(ctx.globals()) {
            summary.uniform_bytes = bytemuck::bytes_of(&uniform).len();
        }
        if let Some(directions) = SampleDirectionsUniform::from_globals(ctx.globals()) {
            summary.uniform_bytes += bytemuck::bytes_of(&directions).len();
        }

        info!(
            frame,
            state = ?AtmosphereFrameState::of(&ctx),
            commands = ctx.commands().len(),
            passes = ?queue.names(),
            "Frame recorded"
        );
        summary.record(&ctx);
        Ok::<_, AtmosphereError>(())
    });

    pipeline.dispose(device);
    device.release_texture(camera.color);
    device.release_texture(camera.depth);
    result.map(|()| summary)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config.debug.log_dir.clone().unwrap_or_else(|| config_dir.join("logs"));
    stratus_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let settings = load_settings(&config);
    let result = if args.headless {
        info!("Rendering headless without a GPU");
        render_frames(&mut HeadlessDevice::new(), &config, &settings)
    } else {
        match WgpuDevice::new_headless_blocking() {
            Ok(mut gpu) => render_frames(&mut gpu, &config, &settings),
            Err(e) => {
                warn!("GPU unavailable ({e}), falling back to headless rendering");
                render_frames(&mut HeadlessDevice::new(), &config, &settings)
            }
        }
    };

    match result {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                draws = summary.draws,
                dispatches = summary.dispatches,
                uniform_bytes = summary.uniform_bytes,
                "Atmosphere demo finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Atmosphere demo failed: {e}");
            ExitCode::FAILURE
        }
    }
}
