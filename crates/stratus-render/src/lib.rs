//! Graphics substrate for Stratus: handles, textures, devices, per-frame state, and passes.
//!
//! Render features are written against [`RenderDevice`] and [`FrameContext`]
//! so they can be driven by the wgpu backend or by [`HeadlessDevice`].

pub mod device;
pub mod frame;
pub mod gpu;
pub mod handle;
pub mod pass;
pub mod shader;
pub mod texture;

pub use device::{DeviceStats, HeadlessDevice, RenderDevice};
pub use frame::{CameraTargets, Command, FrameContext, GlobalBindings, GlobalValue};
pub use gpu::{GpuTexture, RenderContextError, WgpuDevice};
pub use handle::{KernelId, ProgramId, TextureId};
pub use pass::{PassError, PassInput, PassQueue, RenderPass, RenderPassEvent};
pub use shader::{ProgramSource, ShaderError, ShaderLibrary, ShaderStage, declares_entry_point};
pub use texture::{RenderTexture, TextureDesc, TextureError};
