//! Per-frame global bindings and the ordered command stream.
//!
//! A [`FrameContext`] is created fresh for every frame and handed by reference
//! to each pass in submission order. Passes publish named values (uniforms and
//! texture bindings) that later passes and GPU programs read; the last write to
//! a name wins. Every operation is also appended to the command stream, which a
//! backend replays in order.

use std::collections::HashMap;

use glam::Vec4;

use crate::handle::{KernelId, ProgramId, TextureId};
use crate::pass::PassError;

/// A value bound under a global name.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalValue {
    Float(f32),
    Int(i32),
    Vector(Vec4),
    VectorArray(Vec<Vec4>),
    Texture(TextureId),
}

/// Name-keyed global state visible to every program invocation after the write.
#[derive(Debug, Clone, Default)]
pub struct GlobalBindings {
    values: HashMap<String, GlobalValue>,
}

impl GlobalBindings {
    /// Bind `value` under `name`, returning the value it replaced.
    pub fn set(&mut self, name: &str, value: GlobalValue) -> Option<GlobalValue> {
        self.values.insert(name.to_string(), value)
    }

    pub fn get(&self, name: &str) -> Option<&GlobalValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.values.get(name)? {
            GlobalValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.values.get(name)? {
            GlobalValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        match self.values.get(name)? {
            GlobalValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn vector_array(&self, name: &str) -> Option<&[Vec4]> {
        match self.values.get(name)? {
            GlobalValue::VectorArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.values.get(name)? {
            GlobalValue::Texture(id) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GlobalValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One recorded GPU operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    PushDebugGroup(String),
    PopDebugGroup,
    SetGlobal { name: String, value: GlobalValue },
    SetRenderTarget(TextureId),
    /// Bind a texture as a kernel's writable resource.
    SetComputeTexture {
        kernel: KernelId,
        name: String,
        texture: TextureId,
    },
    /// Fullscreen triangle with `program`'s pass `pass_index` into `target`.
    DrawFullscreen {
        program: ProgramId,
        pass_index: u32,
        target: TextureId,
        scale_bias: Vec4,
    },
    Dispatch { kernel: KernelId, groups: [u32; 3] },
}

/// Host camera buffers a frame renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraTargets {
    pub color: TextureId,
    pub depth: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Explicit per-frame scratch state shared by all passes of one frame.
#[derive(Debug)]
pub struct FrameContext {
    frame_index: u64,
    camera: CameraTargets,
    globals: GlobalBindings,
    commands: Vec<Command>,
    render_target: Option<TextureId>,
    debug_groups: Vec<String>,
}

impl FrameContext {
    pub fn new(frame_index: u64, camera: CameraTargets) -> Self {
        Self {
            frame_index,
            camera,
            globals: GlobalBindings::default(),
            commands: Vec::new(),
            render_target: None,
            debug_groups: Vec::new(),
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn camera(&self) -> &CameraTargets {
        &self.camera
    }

    pub fn globals(&self) -> &GlobalBindings {
        &self.globals
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Target configured by the most recent [`Self::set_render_target`].
    pub fn render_target(&self) -> Option<TextureId> {
        self.render_target
    }

    fn set_global(&mut self, name: &str, value: GlobalValue) {
        self.globals.set(name, value.clone());
        self.commands.push(Command::SetGlobal {
            name: name.to_string(),
            value,
        });
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.set_global(name, GlobalValue::Float(value));
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.set_global(name, GlobalValue::Int(value));
    }

    pub fn set_vector(&mut self, name: &str, value: Vec4) {
        self.set_global(name, GlobalValue::Vector(value));
    }

    pub fn set_vector_array(&mut self, name: &str, values: &[Vec4]) {
        self.set_global(name, GlobalValue::VectorArray(values.to_vec()));
    }

    pub fn set_texture(&mut self, name: &str, texture: TextureId) {
        self.set_global(name, GlobalValue::Texture(texture));
    }

    pub fn set_render_target(&mut self, target: TextureId) {
        self.render_target = Some(target);
        self.commands.push(Command::SetRenderTarget(target));
    }

    pub fn set_compute_texture(&mut self, kernel: KernelId, name: &str, texture: TextureId) {
        self.commands.push(Command::SetComputeTexture {
            kernel,
            name: name.to_string(),
            texture,
        });
    }

    /// Draw a fullscreen triangle into the configured render target.
    pub fn draw_fullscreen(
        &mut self,
        program: ProgramId,
        pass_index: u32,
        scale_bias: Vec4,
    ) -> Result<(), PassError> {
        let target = self.render_target.ok_or_else(|| PassError::NoRenderTarget {
            group: self
                .debug_groups
                .last()
                .cloned()
                .unwrap_or_else(|| "<root>".to_string()),
        })?;
        self.commands.push(Command::DrawFullscreen {
            program,
            pass_index,
            target,
            scale_bias,
        });
        Ok(())
    }

    pub fn dispatch(&mut self, kernel: KernelId, groups: [u32; 3]) {
        self.commands.push(Command::Dispatch { kernel, groups });
    }

    pub fn push_debug_group(&mut self, label: &str) {
        self.debug_groups.push(label.to_string());
        self.commands.push(Command::PushDebugGroup(label.to_string()));
    }

    pub fn pop_debug_group(&mut self) {
        if self.debug_groups.pop().is_some() {
            self.commands.push(Command::PopDebugGroup);
        } else {
            log::warn!("pop_debug_group with no open group");
        }
    }

    /// Draw commands that wrote into `target`, in submission order.
    pub fn draws_into(&self, target: TextureId) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(
            move |c| matches!(c, Command::DrawFullscreen { target: t, .. } if *t == target),
        )
    }

    /// Labels of the debug groups in which a draw or dispatch touched `target`.
    pub fn groups_writing(&self, target: TextureId) -> Vec<String> {
        let mut stack: Vec<&str> = Vec::new();
        let mut groups = Vec::new();
        for command in &self.commands {
            match command {
                Command::PushDebugGroup(label) => stack.push(label),
                Command::PopDebugGroup => {
                    stack.pop();
                }
                Command::DrawFullscreen { target: t, .. }
                | Command::SetComputeTexture { texture: t, .. }
                    if *t == target =>
                {
                    let label = stack.last().copied().unwrap_or("<root>").to_string();
                    if !groups.contains(&label) {
                        groups.push(label);
                    }
                }
                _ => {}
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> CameraTargets {
        CameraTargets {
            color: TextureId::from_raw(100),
            depth: TextureId::from_raw(101),
            width: 1280,
            height: 720,
        }
    }

    #[test]
    fn test_last_writer_wins() {
        let mut ctx = FrameContext::new(0, camera());
        ctx.set_float("mieG", 0.8);
        ctx.set_float("mieG", 0.5);
        assert_eq!(ctx.globals().float("mieG"), Some(0.5));
        assert_eq!(ctx.commands().len(), 2);
    }

    #[test]
    fn test_typed_getters_reject_other_kinds() {
        let mut ctx = FrameContext::new(0, camera());
        ctx.set_int("maxSteps", 128);
        assert_eq!(ctx.globals().int("maxSteps"), Some(128));
        assert_eq!(ctx.globals().float("maxSteps"), None);
        assert_eq!(ctx.globals().texture("maxSteps"), None);
    }

    #[test]
    fn test_vector_array_binding() {
        let mut ctx = FrameContext::new(0, camera());
        let dirs = [Vec4::X, Vec4::Y];
        ctx.set_vector_array("_SampleDirections", &dirs);
        assert_eq!(ctx.globals().vector_array("_SampleDirections"), Some(&dirs[..]));
    }

    #[test]
    fn test_draw_requires_render_target() {
        let mut ctx = FrameContext::new(0, camera());
        ctx.push_debug_group("Orphan");
        let err = ctx
            .draw_fullscreen(ProgramId::from_raw(1), 0, Vec4::new(1.0, 1.0, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            PassError::NoRenderTarget {
                group: "Orphan".to_string()
            }
        );
    }

    #[test]
    fn test_draw_records_current_target() {
        let mut ctx = FrameContext::new(0, camera());
        let target = TextureId::from_raw(5);
        ctx.set_render_target(target);
        ctx.draw_fullscreen(ProgramId::from_raw(1), 2, Vec4::new(1.0, 1.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(ctx.draws_into(target).count(), 1);
        assert_eq!(ctx.draws_into(ctx.camera().color).count(), 0);
    }

    #[test]
    fn test_groups_writing() {
        let mut ctx = FrameContext::new(0, camera());
        let color = ctx.camera().color;
        ctx.push_debug_group("Sky");
        ctx.set_render_target(TextureId::from_raw(9));
        ctx.draw_fullscreen(ProgramId::from_raw(1), 0, Vec4::ONE).unwrap();
        ctx.pop_debug_group();
        ctx.push_debug_group("Fog");
        ctx.set_render_target(color);
        ctx.draw_fullscreen(ProgramId::from_raw(1), 3, Vec4::ONE).unwrap();
        ctx.pop_debug_group();

        assert_eq!(ctx.groups_writing(color), vec!["Fog".to_string()]);
    }

    #[test]
    fn test_unbalanced_pop_is_ignored() {
        let mut ctx = FrameContext::new(0, camera());
        ctx.pop_debug_group();
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_new_frame_starts_empty() {
        let ctx = FrameContext::new(3, camera());
        assert_eq!(ctx.frame_index(), 3);
        assert!(ctx.globals().is_empty());
        assert!(ctx.render_target().is_none());
    }
}
