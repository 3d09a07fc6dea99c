//! The device seam: texture and program lifetimes.
//!
//! [`RenderDevice`] is the only thing the render features know about the
//! graphics backend. [`HeadlessDevice`] implements it without a GPU and keeps
//! allocation statistics; [`crate::gpu::WgpuDevice`] implements it on wgpu.

use std::collections::HashMap;

use crate::handle::{HandleAllocator, KernelId, ProgramId, TextureId};
use crate::shader::{ProgramSource, ShaderError, ShaderStage, declares_entry_point};
use crate::texture::{TextureDesc, TextureError};

/// Allocation and program management provided by a graphics backend.
pub trait RenderDevice {
    /// Allocate a texture matching `desc`.
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, TextureError>;

    /// Release a texture. Returns `false` if the handle was not live.
    fn release_texture(&mut self, id: TextureId) -> bool;

    /// Compile a program from WGSL.
    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId, ShaderError>;

    /// Look up a compute entry point by name.
    fn find_kernel(&mut self, program: ProgramId, name: &str) -> Option<KernelId>;

    /// Destroy a program. Returns `false` if the handle was not live.
    fn destroy_program(&mut self, id: ProgramId) -> bool;
}

/// Counters kept by [`HeadlessDevice`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStats {
    pub textures_created: usize,
    pub textures_released: usize,
    pub programs_created: usize,
    pub programs_destroyed: usize,
    /// Release or destroy calls for handles that were not live.
    pub stale_releases: usize,
}

/// A device that hands out handles without touching a GPU.
///
/// Used for dry runs and for exercising render features in tests.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    handles: HandleAllocator,
    textures: HashMap<TextureId, TextureDesc>,
    programs: HashMap<ProgramId, ProgramSource>,
    kernels: HashMap<(ProgramId, String), KernelId>,
    texture_limit: Option<usize>,
    stats: DeviceStats,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of simultaneously live textures.
    pub fn with_texture_limit(mut self, limit: usize) -> Self {
        self.texture_limit = Some(limit);
        self
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Descriptor of a live texture.
    pub fn texture(&self, id: TextureId) -> Option<&TextureDesc> {
        self.textures.get(&id)
    }

    /// Allocate a texture the caller does not track through a [`crate::RenderTexture`],
    /// such as host camera targets.
    pub fn create_target(
        &mut self,
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<TextureId, TextureError> {
        self.create_texture(&TextureDesc::d2(label, width, height, format))
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureId, TextureError> {
        desc.validate()?;
        if let Some(limit) = self.texture_limit
            && self.textures.len() >= limit
        {
            return Err(TextureError::AllocationFailed {
                label: desc.label,
                reason: format!("texture limit of {limit} reached"),
            });
        }
        let id = self.handles.texture();
        self.textures.insert(id, desc.clone());
        self.stats.textures_created += 1;
        Ok(id)
    }

    fn release_texture(&mut self, id: TextureId) -> bool {
        if self.textures.remove(&id).is_some() {
            self.stats.textures_released += 1;
            true
        } else {
            self.stats.stale_releases += 1;
            false
        }
    }

    fn create_program(&mut self, source: &ProgramSource) -> Result<ProgramId, ShaderError> {
        let id = self.handles.program();
        self.programs.insert(id, source.clone());
        self.stats.programs_created += 1;
        log::debug!("Registered program '{}' as {id}", source.label);
        Ok(id)
    }

    fn find_kernel(&mut self, program: ProgramId, name: &str) -> Option<KernelId> {
        let source = self.programs.get(&program)?;
        if !declares_entry_point(&source.wgsl, ShaderStage::Compute, name) {
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
        if self.programs.remove(&id).is_some() {
            self.kernels.retain(|(program, _), _| *program != id);
            self.stats.programs_destroyed += 1;
            true
        } else {
            self.stats.stale_releases += 1;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERNEL_SOURCE: &str = r#"
        @group(0) @binding(0) var lut: texture_storage_2d_array<rgba16float, write>;

        @compute @workgroup_size(8, 8, 1)
        fn Scatter(@builtin(global_invocation_id) id: vec3<u32>) {}
    "#;

    #[test]
    fn test_texture_lifecycle_counts() {
        let mut device = HeadlessDevice::new();
        let id = device
            .create_target("color", 4, 4, wgpu::TextureFormat::Rgba16Float)
            .unwrap();
        assert_eq!(device.live_textures(), 1);
        assert!(device.release_texture(id));
        assert!(!device.release_texture(id));

        let stats = device.stats();
        assert_eq!(stats.textures_created, 1);
        assert_eq!(stats.textures_released, 1);
        assert_eq!(stats.stale_releases, 1);
    }

    #[test]
    fn test_find_kernel_is_stable() {
        let mut device = HeadlessDevice::new();
        let program = device
            .create_program(&ProgramSource::new("kernels", KERNEL_SOURCE))
            .unwrap();
        let a = device.find_kernel(program, "Scatter").unwrap();
        let b = device.find_kernel(program, "Scatter").unwrap();
        assert_eq!(a, b);
        assert!(device.find_kernel(program, "Gather").is_none());
    }

    #[test]
    fn test_destroy_program_drops_kernels() {
        let mut device = HeadlessDevice::new();
        let program = device
            .create_program(&ProgramSource::new("kernels", KERNEL_SOURCE))
            .unwrap();
        device.find_kernel(program, "Scatter").unwrap();

        assert!(device.destroy_program(program));
        assert!(device.find_kernel(program, "Scatter").is_none());
        assert!(!device.destroy_program(program));
        assert_eq!(device.stats().programs_destroyed, 1);
    }

    #[test]
    fn test_texture_limit() {
        let mut device = HeadlessDevice::new().with_texture_limit(1);
        device
            .create_target("a", 1, 1, wgpu::TextureFormat::Rgba8Unorm)
            .unwrap();
        let second = device.create_target("b", 1, 1, wgpu::TextureFormat::Rgba8Unorm);
        assert!(matches!(second, Err(TextureError::AllocationFailed { .. })));
    }
}
