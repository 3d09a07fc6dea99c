//! Texture descriptors and the owned render-texture resource.
//!
//! [`TextureDesc`] fully describes a texture; two textures with equal
//! descriptors are interchangeable. [`RenderTexture`] owns at most one device
//! texture and only reallocates it when the requested descriptor differs from
//! the one it was created with.

use crate::device::RenderDevice;
use crate::handle::TextureId;

/// Everything needed to allocate a texture, independent of any device.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    /// Debug label.
    pub label: &'static str,
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth (3D) or layer count (arrays). 1 for plain 2D textures.
    pub depth_or_layers: u32,
    /// How the texture is viewed by programs.
    pub dimension: wgpu::TextureViewDimension,
    /// Texel format.
    pub format: wgpu::TextureFormat,
    /// Whether compute programs may write arbitrary texels (storage binding).
    pub random_write: bool,
    /// Sampler filter used when the texture is read.
    pub filter: wgpu::FilterMode,
    /// Sampler address mode on all axes.
    pub address_mode: wgpu::AddressMode,
}

/// Errors from texture validation and allocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextureError {
    /// Width, height, or depth is zero.
    #[error("texture '{label}' has a zero dimension: {width}x{height}x{depth}")]
    ZeroDimensions {
        label: &'static str,
        width: u32,
        height: u32,
        depth: u32,
    },

    /// A plain 2D texture was given more than one layer.
    #[error("texture '{label}' is {dimension:?} but requests {layers} layers")]
    InvalidLayers {
        label: &'static str,
        dimension: wgpu::TextureViewDimension,
        layers: u32,
    },

    /// The device refused the allocation.
    #[error("failed to allocate texture '{label}': {reason}")]
    AllocationFailed { label: &'static str, reason: String },
}

impl TextureDesc {
    /// A single-layer 2D texture sampled bilinearly with clamped edges.
    pub const fn d2(
        label: &'static str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label,
            width,
            height,
            depth_or_layers: 1,
            dimension: wgpu::TextureViewDimension::D2,
            format,
            random_write: false,
            filter: wgpu::FilterMode::Linear,
            address_mode: wgpu::AddressMode::ClampToEdge,
        }
    }

    /// Turn this into a layered (array or 3D) texture.
    pub const fn layered(mut self, dimension: wgpu::TextureViewDimension, layers: u32) -> Self {
        self.dimension = dimension;
        self.depth_or_layers = layers;
        self
    }

    /// Allow compute programs to write into the texture.
    pub const fn with_random_write(mut self) -> Self {
        self.random_write = true;
        self
    }

    /// Same descriptor under a different size.
    pub const fn resized(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// `(width, height, depth_or_layers)`.
    pub fn extent(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.depth_or_layers)
    }

    /// Approximate memory footprint of the top mip level.
    pub fn byte_size(&self) -> u64 {
        let bpp = self.format.block_copy_size(None).unwrap_or(4) as u64;
        u64::from(self.width) * u64::from(self.height) * u64::from(self.depth_or_layers) * bpp
    }

    /// Check the descriptor is allocatable on any device.
    pub fn validate(&self) -> Result<(), TextureError> {
        if self.width == 0 || self.height == 0 || self.depth_or_layers == 0 {
            return Err(TextureError::ZeroDimensions {
                label: self.label,
                width: self.width,
                height: self.height,
                depth: self.depth_or_layers,
            });
        }
        if self.dimension == wgpu::TextureViewDimension::D2 && self.depth_or_layers != 1 {
            return Err(TextureError::InvalidLayers {
                label: self.label,
                dimension: self.dimension,
                layers: self.depth_or_layers,
            });
        }
        Ok(())
    }
}

/// A texture owned by exactly one producer, reallocated only on descriptor change.
#[derive(Debug, Default)]
pub struct RenderTexture {
    allocated: Option<(TextureId, TextureDesc)>,
}

impl RenderTexture {
    pub const fn new() -> Self {
        Self { allocated: None }
    }

    /// Make sure a texture matching `desc` exists.
    ///
    /// Returns `Ok(true)` when a new texture was allocated and `Ok(false)` when
    /// the current one already matches. On a descriptor change the previous
    /// texture is released after the replacement has been created, so a failed
    /// allocation leaves the old texture in place.
    pub fn reallocate_if_needed<D: RenderDevice + ?Sized>(
        &mut self,
        device: &mut D,
        desc: &TextureDesc,
    ) -> Result<bool, TextureError> {
        if let Some((_, current)) = &self.allocated
            && current == desc
        {
            return Ok(false);
        }

        desc.validate()?;
        let id = device.create_texture(desc)?;
        if let Some((old, _)) = self.allocated.replace((id, desc.clone())) {
            device.release_texture(old);
            log::debug!("Reallocated '{}' ({old} -> {id})", desc.label);
        } else {
            log::debug!(
                "Allocated '{}' as {id} ({} bytes)",
                desc.label,
                desc.byte_size()
            );
        }
        Ok(true)
    }

    /// Release the texture. Returns `false` if nothing was allocated.
    pub fn release<D: RenderDevice + ?Sized>(&mut self, device: &mut D) -> bool {
        match self.allocated.take() {
            Some((id, desc)) => {
                if !device.release_texture(id) {
                    log::warn!("Device did not know texture '{}' ({id})", desc.label);
                }
                true
            }
            None => false,
        }
    }

    /// Handle of the current texture.
    pub fn id(&self) -> Option<TextureId> {
        self.allocated.as_ref().map(|(id, _)| *id)
    }

    /// Descriptor the current texture was created with.
    pub fn descriptor(&self) -> Option<&TextureDesc> {
        self.allocated.as_ref().map(|(_, desc)| desc)
    }

    pub fn is_allocated(&self) -> bool {
        self.allocated.is_some()
    }
}
