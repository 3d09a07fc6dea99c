//! Headless wgpu device implementing [`RenderDevice`].
//!
//! Owns the adapter, device and queue plus every texture and shader module
//! created through it. No surface is involved: LUTs are offscreen resources and
//! presentation belongs to the host renderer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::device::RenderDevice;
use crate::handle::{HandleAllocator, KernelId, ProgramId, TextureId};
use crate::shader::{ProgramSource, ShaderError, ShaderLibrary, ShaderStage, declares_entry_point};
use crate::texture::{TextureDesc, TextureError};

/// Error type for device initialization failures.
#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

/// A texture allocated on the GPU together with the view and sampler programs read it through.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub desc: TextureDesc,
}

struct GpuProgram {
    module: Arc<wgpu::ShaderModule>,
    source: ProgramSource,
}

/// wgpu-backed [`RenderDevice`].
pub struct WgpuDevice {
    pub adapter_info: wgpu::AdapterInfo,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    handles: HandleAllocator,
    textures: HashMap<TextureId, GpuTexture>,
    programs: HashMap<ProgramId, GpuProgram>,
    kernels: HashMap<(ProgramId, String), KernelId>,
    shaders: ShaderLibrary,
}

impl WgpuDevice {
    /// Request a headless adapter and device.
    pub async fn new_headless() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderContextError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("stratus-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self {
            adapter_info,
            device,
            queue,
            handles: HandleAllocator::default(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            kernels: HashMap::new(),
            shaders: ShaderLibrary::new(),
        })
    }

    /// Blocking wrapper around [`Self::new_headless`].
    pub fn new_headless_blocking() -> Result<Self, RenderContextError> {
        pollster::block_on(Self::new_headless())
    }

    /// Look up a live texture.
    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Compiled module behind a program handle.
    pub fn shader_module(&self, id: ProgramId) -> Option<Arc<wgpu::ShaderModule>> {
        self.programs.get(&id).map(|p| Arc::clone(&p.module))
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn check_limits(&self, desc: &TextureDesc) -> Result<(), TextureError> {
        let limits = self.device.limits();
        let (max_extent, max_depth) = match desc.dimension {
            wgpu::TextureViewDimension::D3 => (
                limits.max_texture_dimension_3d,
                limits.max_texture_dimension_3d,
            ),
            _ => (
                limits.max_texture_dimension_2d,
                limits.max_texture_array_layers,
            ),
        };
        if desc.width > max_extent || desc.height > max_extent || desc.depth_or_layers > max_depth
        {
            return Err(TextureError::AllocationFailed {
                label: desc.label,
                reason: format!(
                    "{}x{}x{} exceeds device limits ({max_extent}, {max_depth} layers)",
                    desc.width, desc.height, desc.depth_or_layers
                ),
            });
        }
        Ok(())
    }
}

fn texture_usage(desc: &TextureDesc) -> wgpu::TextureUsages {
    let mut usage = wgpu::TextureUsages::TEXTURE_BINDING;
    if desc.dimension != wgpu::TextureViewDimension::D3 {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if desc.random_write {
        usage |= wgpu::TextureUsages::STORAGE_BINDING;
    }
    usage
}

impl RenderDevice for WgpuDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, TextureError> {
        desc.validate()?;
        self.check_limits(desc)?;

        let dimension = match desc.dimension {
            wgpu::TextureViewDimension::D3 => wgpu::TextureDimension::D3,
            _ => wgpu::TextureDimension::D2,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: desc.depth_or_layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension,
            format: desc.format,
            usage: texture_usage(desc),
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(desc.label),
            dimension: Some(desc.dimension),
            ..Default::default()
        });

        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(desc.label),
            address_mode_u: desc.address_mode,
            address_mode_v: desc.address_mode,
            address_mode_w: desc.address_mode,
            mag_filter: desc.filter,
            min_filter: desc.filter,
            ..Default::default()
        });

        let id = self.handles.texture();
        log::info!(
            "Created texture '{}' ({}x{}x{}, {:?}) as {id}",
            desc.label,
            desc.width,
            desc.height,
            desc.depth_or_layers,
            desc.format
        );
        self.textures.insert(
            id,
            GpuTexture {
                texture,
                view,
                sampler,
                desc: desc.clone(),
            },
        );
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(gpu) => {
                gpu.texture.destroy();
                log::debug!("Released texture '{}' ({id})", gpu.desc.label);
                true
            }
            None => false,
        }
    }

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId, ShaderError> {
        let module = self
            .shaders
            .load_from_source(&self.device, &source.label, &source.wgsl)?;
        let id = self.handles.program();
        self.programs.insert(
            id,
            GpuProgram {
                module,
                source: source.clone(),
            },
        );
        Ok(id)
    }

    fn find_kernel(&mut self, program: ProgramId, name: &str) -> Option<KernelId> {
        let gpu = self.programs.get(&program)?;
        if !declares_entry_point(&gpu.source.wgsl, ShaderStage::Compute, name) {
            return None;
        }
        let handles = &mut self.handles;
        Some(
            *self
                .kernels
                .entry((program, name.to_string()))
                .or_insert_with(|| handles.kernel()),
        )
    }

    fn destroy_program(&mut self, id: ProgramId) -> bool {
        match self.programs.remove(&id) {
            Some(gpu) => {
                self.shaders.remove(&gpu.source.label);
                self.kernels.retain(|(program, _), _| *program != id);
                true
            }
            None => false,
        }
    }
}

/// Create a test GPU device and queue. Returns `None` if no GPU is available.
#[cfg(test)]
pub(crate) fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let gpu = WgpuDevice::new_headless_blocking().ok()?;
    Some((gpu.device, gpu.queue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::RenderTexture;

    fn create_test_gpu() -> Option<WgpuDevice> {
        WgpuDevice::new_headless_blocking().ok()
    }

    #[test]
    fn test_usage_for_storage_array() {
        let desc = TextureDesc::d2("ap", 32, 32, wgpu::TextureFormat::Rgba16Float)
            .layered(wgpu::TextureViewDimension::D2Array, 24)
            .with_random_write();
        let usage = texture_usage(&desc);
        assert!(usage.contains(wgpu::TextureUsages::STORAGE_BINDING));
        assert!(usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
    }

    #[test]
    fn test_usage_for_plain_lut() {
        let desc = TextureDesc::d2("lut", 256, 64, wgpu::TextureFormat::Rgba16Float);
        let usage = texture_usage(&desc);
        assert!(usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
        assert!(!usage.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }

    #[test]
    fn test_create_and_release_texture() {
        let Some(mut gpu) = create_test_gpu() else {
            return;
        };
        let desc = TextureDesc::d2("lut", 256, 64, wgpu::TextureFormat::Rgba16Float);
        let id = gpu.create_texture(&desc).unwrap();
        let texture = gpu.texture(id).unwrap();
        assert_eq!(texture.texture.width(), 256);
        assert_eq!(texture.texture.height(), 64);
        assert!(gpu.release_texture(id));
        assert!(!gpu.release_texture(id));
    }

    #[test]
    fn test_array_texture_layers() {
        let Some(mut gpu) = create_test_gpu() else {
            return;
        };
        let desc = TextureDesc::d2("ap", 32, 32, wgpu::TextureFormat::Rgba16Float)
            .layered(wgpu::TextureViewDimension::D2Array, 24)
            .with_random_write();
        let id = gpu.create_texture(&desc).unwrap();
        assert_eq!(gpu.texture(id).unwrap().texture.depth_or_array_layers(), 24);
    }

    #[test]
    fn test_oversized_texture_rejected() {
        let Some(mut gpu) = create_test_gpu() else {
            return;
        };
        let max = gpu.device.limits().max_texture_dimension_2d;
        let desc = TextureDesc::d2("huge", max + 1, 1, wgpu::TextureFormat::Rgba16Float);
        assert!(matches!(
            gpu.create_texture(&desc),
            Err(TextureError::AllocationFailed { .. })
        ));
    }

    #[test]
    fn test_render_texture_on_gpu_is_idempotent() {
        let Some(mut gpu) = create_test_gpu() else {
            return;
        };
        let desc = TextureDesc::d2("lut", 32, 32, wgpu::TextureFormat::Rgba16Float);
        let mut lut = RenderTexture::new();
        assert!(lut.reallocate_if_needed(&mut gpu, &desc).unwrap());
        assert!(!lut.reallocate_if_needed(&mut gpu, &desc).unwrap());
        assert_eq!(gpu.live_textures(), 1);
        assert!(lut.release(&mut gpu));
        assert_eq!(gpu.live_textures(), 0);
    }
}
