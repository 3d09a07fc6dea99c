//! Full frames through the pass queue on a headless device.

use stratus_atmosphere::luts::{self, bindings};
use stratus_atmosphere::{
    AtmosphereFrameState, AtmospherePipeline, AtmosphereSettings, AtmosphereUniform,
    SampleDirectionsUniform,
};
use stratus_config::AtmosphereConfig;
use stratus_render::{
    CameraTargets, Command, FrameContext, HeadlessDevice, PassInput, PassQueue, ProgramSource,
    RenderPassEvent,
};

const ATMOSPHERE_WGSL: &str = r#"
@vertex
fn vs_fullscreen(@builtin(vertex_index) i: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((i << 1u) & 2u), f32(i & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}

@fragment fn fs_transmittance() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
@fragment fn fs_multi_scattering() -> @location(0) vec4<f32> { return vec4<f32>(0.0); }
@fragment fn fs_sky_view() -> @location(0) vec4<f32> { return vec4<f32>(0.0); }
@fragment fn fs_fog() -> @location(0) vec4<f32> { return vec4<f32>(0.0); }
"#;

const AERIAL_PERSPECTIVE_WGSL: &str = r#"
@group(0) @binding(0) var volume: texture_storage_2d_array<rgba16float, write>;

@compute @workgroup_size(8, 8, 1)
fn AerialPerspective(@builtin(global_invocation_id) id: vec3<u32>) {}
"#;

fn settings() -> AtmosphereSettings {
    AtmosphereSettings {
        shader: Some(ProgramSource::new("atmosphere", ATMOSPHERE_WGSL)),
        compute_shader: Some(ProgramSource::new("aerial", AERIAL_PERSPECTIVE_WGSL)),
    }
}

struct Host {
    device: HeadlessDevice,
    camera: CameraTargets,
    pipeline: AtmospherePipeline,
}

impl Host {
    fn new(settings: &AtmosphereSettings) -> Self {
        let mut device = HeadlessDevice::new();
        let format = wgpu::TextureFormat::Rgba16Float;
        let camera = CameraTargets {
            color: device.create_target("camera-color", 320, 180, format).unwrap(),
            depth: device
                .create_target("camera-depth", 320, 180, wgpu::TextureFormat::Depth32Float)
                .unwrap(),
            width: 320,
            height: 180,
        };
        let mut pipeline = AtmospherePipeline::new();
        pipeline.create(&mut device, settings).unwrap();
        Self {
            device,
            camera,
            pipeline,
        }
    }

    fn frame(&mut self, index: u64, volume: Option<&AtmosphereConfig>) -> FrameContext {
        self.pipeline
            .setup_per_frame(&mut self.device, volume, &self.camera)
            .unwrap();
        let mut queue = PassQueue::new();
        self.pipeline.enqueue(&mut queue);
        let mut ctx = FrameContext::new(index, self.camera);
        queue.execute(&mut ctx).unwrap();
        ctx
    }
}

#[test]
fn test_default_frame_populates_every_lut() {
    let mut host = Host::new(&settings());
    let volume = AtmosphereConfig::default();
    let ctx = host.frame(0, Some(&volume));

    let [transmittance, multi_scattering, sky_view, aerial_perspective] =
        host.pipeline.luts().map(|lut| lut.id().unwrap());

    let globals = ctx.globals();
    assert_eq!(globals.texture(bindings::TRANSMITTANCE), Some(transmittance));
    assert_eq!(globals.texture(bindings::MULTI_SCATTERING), Some(multi_scattering));
    assert_eq!(globals.texture(bindings::SKY_VIEW), Some(sky_view));
    assert_eq!(
        globals.texture(bindings::AERIAL_PERSPECTIVE),
        Some(aerial_perspective)
    );

    assert_eq!(
        host.device.texture(transmittance).map(|d| d.extent()),
        Some((256, 64, 1))
    );
    assert_eq!(
        host.device.texture(aerial_perspective).map(|d| d.extent()),
        Some((32, 32, 24))
    );
    assert_eq!(AtmosphereFrameState::of(&ctx), AtmosphereFrameState::Composited);

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_only_fog_touches_scene_color() {
    let mut host = Host::new(&settings());
    let ctx = host.frame(0, None);

    assert_eq!(
        ctx.groups_writing(host.camera.color),
        vec!["AtmosphericScatteringAtmosphereFogPass".to_string()]
    );
    assert_eq!(ctx.draws_into(host.camera.color).count(), 1);
    assert!(ctx.groups_writing(host.camera.depth).is_empty());

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_stages_run_in_dependency_order() {
    let mut host = Host::new(&settings());
    let ctx = host.frame(0, None);

    let groups: Vec<&str> = ctx
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::PushDebugGroup(label) => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        groups,
        vec![
            "AtmosphericScatteringTransmittancePass",
            "AtmosphericScatteringMultiScatteringPass",
            "AtmosphericScatteringAtmospherePass",
            "AtmosphericScatteringAerialPerspectivePass",
            "AtmosphericScatteringAtmosphereFogPass",
        ]
    );

    let pass_indices: Vec<u32> = ctx
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::DrawFullscreen { pass_index, .. } => Some(*pass_index),
            _ => None,
        })
        .collect();
    assert_eq!(pass_indices, vec![0, 1, 2, 3]);

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_queue_requests_scene_inputs_for_fog() {
    let mut host = Host::new(&settings());
    let mut queue = PassQueue::new();
    host.pipeline.enqueue(&mut queue);

    assert_eq!(queue.requested_inputs(), PassInput::COLOR_DEPTH);
    assert_eq!(queue.names().last(), Some(&"fog-composite"));

    drop(queue);
    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_events_split_lut_and_composite_work() {
    let mut host = Host::new(&settings());
    host.pipeline
        .setup_per_frame(&mut host.device, None, &host.camera)
        .unwrap();
    let mut queue = PassQueue::new();
    host.pipeline.enqueue(&mut queue);

    let mut ctx = FrameContext::new(0, host.camera);
    queue
        .execute_event(RenderPassEvent::BeforeRenderingOpaques, &mut ctx)
        .unwrap();
    assert_eq!(
        AtmosphereFrameState::of(&ctx),
        AtmosphereFrameState::AerialPerspectiveReady
    );
    queue
        .execute_event(RenderPassEvent::BeforeRenderingPostProcessing, &mut ctx)
        .unwrap();
    assert_eq!(AtmosphereFrameState::of(&ctx), AtmosphereFrameState::Composited);

    drop(queue);
    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_frames_reuse_luts() {
    let mut host = Host::new(&settings());
    host.frame(0, None);
    let first = host.pipeline.luts().map(|lut| lut.id());
    host.frame(1, None);
    host.frame(2, None);

    assert_eq!(host.pipeline.luts().map(|lut| lut.id()), first);
    // two camera targets plus four LUTs
    assert_eq!(host.device.stats().textures_created, 6);

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_uniform_blocks_pack_from_frame() {
    let mut host = Host::new(&settings());
    let volume = AtmosphereConfig {
        top_height: 60.0,
        use_fibonacci_sampling: false,
        ..AtmosphereConfig::default()
    };
    let ctx = host.frame(0, Some(&volume));

    let uniform = AtmosphereUniform::from_globals(ctx.globals()).unwrap();
    assert_eq!(uniform.top_height, 60.0);
    assert_eq!(uniform.aerial_perspective_params, [32.0, 32.0, 24.0, 0.0]);

    let directions = SampleDirectionsUniform::from_globals(ctx.globals()).unwrap();
    let first = directions.directions[0];
    assert!((first[1] - (0.0625 * std::f32::consts::PI).cos()).abs() < 1e-6);

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_without_compute_program_fog_still_composites() {
    let settings = AtmosphereSettings {
        compute_shader: None,
        ..settings()
    };
    let mut host = Host::new(&settings);
    let ctx = host.frame(0, None);

    assert!(ctx.globals().texture(bindings::AERIAL_PERSPECTIVE).is_none());
    assert!(
        !ctx.commands()
            .iter()
            .any(|c| matches!(c, Command::Dispatch { .. }))
    );
    assert_eq!(ctx.draws_into(host.camera.color).count(), 1);

    host.pipeline.dispose(&mut host.device);
}

#[test]
fn test_dispose_twice_releases_everything_once() {
    let mut host = Host::new(&settings());
    host.frame(0, None);

    host.pipeline.dispose(&mut host.device);
    host.pipeline.dispose(&mut host.device);

    let stats = host.device.stats();
    assert_eq!(stats.textures_released, 4);
    assert_eq!(stats.programs_destroyed, 2);
    assert_eq!(stats.stale_releases, 0);
    assert_eq!(host.device.live_programs(), 0);
    // camera color and depth are owned by the host
    assert_eq!(host.device.live_textures(), 2);
    assert!(host.pipeline.luts().iter().all(|lut| !lut.is_allocated()));
}

#[test]
fn test_lut_descriptors_match_layouts() {
    let mut host = Host::new(&settings());
    host.frame(0, None);

    let descriptors = host
        .pipeline
        .luts()
        .map(|lut| lut.descriptor().cloned().unwrap());
    assert_eq!(
        descriptors,
        [
            luts::TRANSMITTANCE,
            luts::MULTI_SCATTERING,
            luts::SKY_VIEW,
            luts::AERIAL_PERSPECTIVE
        ]
    );

    host.pipeline.dispose(&mut host.device);
}
