//! WGSL program sources, shader module caching, and entry point lookup.

use log::{debug, info};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

/// Error types for shader loading operations.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{name}' failed to compile: {message}")]
    CompilationFailed { name: String, message: String },

    #[error("shader file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read shader file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("no shader directory configured for file-based loading")]
    NoShaderDir,
}

/// WGSL text plus the label it is compiled under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    pub label: String,
    pub wgsl: String,
}

impl ProgramSource {
    pub fn new(label: impl Into<String>, wgsl: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            wgsl: wgsl.into(),
        }
    }
}

/// Pipeline stage an entry point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    fn attribute(self) -> &'static str {
        match self {
            Self::Vertex => "@vertex",
            Self::Fragment => "@fragment",
            Self::Compute => "@compute",
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `source` declares a `stage` entry point called `name`.
///
/// Looks at the attributes between the previous item boundary (`;` or `}`)
/// and the `fn` keyword, so `@compute @workgroup_size(4, 4, 1) fn name(...)`
/// matches while a helper `fn name` without the stage attribute does not.
pub fn declares_entry_point(source: &str, stage: ShaderStage, name: &str) -> bool {
    source.match_indices("fn").any(|(idx, _)| {
        let head = &source[..idx];
        if head.chars().next_back().is_some_and(is_ident_char) {
            return false;
        }
        let rest = &source[idx + 2..];
        if !rest.starts_with(char::is_whitespace) {
            return false;
        }
        let ident: String = rest.trim_start().chars().take_while(|&c| is_ident_char(c)).collect();
        if ident != name {
            return false;
        }
        let item_start = head.rfind([';', '}']).map_or(0, |i| i + 1);
        head[item_start..].contains(stage.attribute())
    })
}

/// Registry of compiled shader modules, optionally backed by a directory of `.wgsl` files.
pub struct ShaderLibrary {
    modules: HashMap<String, Arc<wgpu::ShaderModule>>,
    shader_dir: Option<PathBuf>,
}

impl ShaderLibrary {
    /// Create a new empty shader library.
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            shader_dir: None,
        }
    }

    /// Set the directory to load .wgsl files from.
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    /// Read a program source from the shader directory without compiling it.
    pub fn read_source(&self, filename: &str) -> Result<ProgramSource, ShaderError> {
        let shader_dir = self.shader_dir.as_ref().ok_or(ShaderError::NoShaderDir)?;
        let path = shader_dir.join(filename);

        debug!("Reading shader source from {:?}", path);

        if !path.exists() {
            return Err(ShaderError::FileNotFound { path });
        }

        let wgsl = std::fs::read_to_string(&path)?;
        Ok(ProgramSource::new(filename, wgsl))
    }

    /// Compile a shader from a WGSL source string, replacing any module of the same name.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        debug!("Loading shader '{}' from source", name);

        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });

        let arc_module = Arc::new(module);
        let replaced = self
            .modules
            .insert(name.to_string(), arc_module.clone())
            .is_some();

        if replaced {
            info!("Replaced shader '{}'", name);
        } else {
            info!("Loaded shader '{}'", name);
        }

        Ok(arc_module)
    }

    /// Compile a shader from a file in the shader directory.
    pub fn load_from_file(
        &mut self,
        device: &wgpu::Device,
        filename: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        let source = self.read_source(filename)?;
        self.load_from_source(device, &source.label, &source.wgsl)
    }

    /// Get a previously loaded shader by name.
    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.modules.get(name).cloned()
    }

    /// Drop a cached module. Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.modules.remove(name).is_some()
    }

    /// Number of loaded shaders.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the shader library is empty.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}
