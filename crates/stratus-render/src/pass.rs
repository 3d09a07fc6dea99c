//! Host-facing pass abstraction and the per-camera pass queue.
//!
//! A [`RenderPass`] is configured and executed against a [`FrameContext`].
//! [`PassQueue`] orders passes by [`RenderPassEvent`] while preserving
//! enqueue order inside an event, then runs them one after another. Ordering
//! is the only synchronization: a pass may read anything written by a pass
//! that ran before it.

use crate::frame::FrameContext;

/// Injection points in the host frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPassEvent {
    /// Before opaque geometry. Scene buffers hold nothing useful yet.
    BeforeRenderingOpaques,
    /// After opaques and transparents, before post-processing.
    BeforeRenderingPostProcessing,
}

/// Scene buffers a pass wants to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassInput {
    pub color: bool,
    pub depth: bool,
}

impl PassInput {
    pub const NONE: Self = Self {
        color: false,
        depth: false,
    };
    pub const COLOR_DEPTH: Self = Self {
        color: true,
        depth: true,
    };

    pub fn union(self, other: Self) -> Self {
        Self {
            color: self.color || other.color,
            depth: self.depth || other.depth,
        }
    }
}

/// Errors raised while recording a pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PassError {
    /// A draw was issued with no render target configured.
    #[error("draw in '{group}' has no render target")]
    NoRenderTarget { group: String },

    /// The pass was executed before it received its per-frame setup.
    #[error("pass '{pass}' executed before setup")]
    NotSetUp { pass: &'static str },

    /// A binding this pass samples has not been written this frame.
    #[error("pass '{pass}' reads '{binding}' but nothing bound it this frame")]
    MissingInput {
        pass: &'static str,
        binding: &'static str,
    },
}

/// A unit of GPU work the host schedules once per frame.
pub trait RenderPass {
    /// Stable name used in logs and debug groups.
    fn name(&self) -> &'static str;

    /// Where in the host frame the pass runs.
    fn event(&self) -> RenderPassEvent;

    /// Scene buffers the pass reads.
    fn inputs(&self) -> PassInput {
        PassInput::NONE
    }

    /// Bind render targets before execution.
    fn configure(&self, _ctx: &mut FrameContext) {}

    /// Record the pass's work.
    fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError>;
}

/// Ordered list of passes for one camera and frame.
#[derive(Default)]
pub struct PassQueue<'a> {
    passes: Vec<&'a dyn RenderPass>,
}

impl<'a> PassQueue<'a> {
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Insert after every queued pass of the same or an earlier event.
    pub fn enqueue(&mut self, pass: &'a dyn RenderPass) {
        let event = pass.event();
        let at = self
            .passes
            .iter()
            .position(|p| p.event() > event)
            .unwrap_or(self.passes.len());
        self.passes.insert(at, pass);
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Pass names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Union of every queued pass's scene-buffer requests.
    pub fn requested_inputs(&self) -> PassInput {
        self.passes
            .iter()
            .fold(PassInput::NONE, |acc, p| acc.union(p.inputs()))
    }

    /// Configure and execute all queued passes in order.
    pub fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError> {
        for pass in &self.passes {
            run_pass(*pass, ctx)?;
        }
        Ok(())
    }

    /// Configure and execute only the passes registered for `event`.
    pub fn execute_event(
        &self,
        event: RenderPassEvent,
        ctx: &mut FrameContext,
    ) -> Result<(), PassError> {
        for pass in self.passes.iter().filter(|p| p.event() == event) {
            run_pass(*pass, ctx)?;
        }
        Ok(())
    }
}

fn run_pass(pass: &dyn RenderPass, ctx: &mut FrameContext) -> Result<(), PassError> {
    log::trace!("Executing pass '{}' (frame {})", pass.name(), ctx.frame_index());
    pass.configure(ctx);
    pass.execute(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CameraTargets;
    use crate::handle::TextureId;

    struct Marker {
        name: &'static str,
        event: RenderPassEvent,
        inputs: PassInput,
    }

    impl RenderPass for Marker {
        fn name(&self) -> &'static str {
            self.name
        }

        fn event(&self) -> RenderPassEvent {
            self.event
        }

        fn inputs(&self) -> PassInput {
            self.inputs
        }

        fn execute(&self, ctx: &mut FrameContext) -> Result<(), PassError> {
            ctx.push_debug_group(self.name);
            ctx.pop_debug_group();
            Ok(())
        }
    }

    fn marker(name: &'static str, event: RenderPassEvent) -> Marker {
        Marker {
            name,
            event,
            inputs: PassInput::NONE,
        }
    }

    fn ctx() -> FrameContext {
        FrameContext::new(
            0,
            CameraTargets {
                color: TextureId::from_raw(1),
                depth: TextureId::from_raw(2),
                width: 4,
                height: 4,
            },
        )
    }

    #[test]
    fn test_events_ordered_and_enqueue_order_kept() {
        let fog = marker("fog", RenderPassEvent::BeforeRenderingPostProcessing);
        let a = marker("a", RenderPassEvent::BeforeRenderingOpaques);
        let b = marker("b", RenderPassEvent::BeforeRenderingOpaques);

        let mut queue = PassQueue::new();
        queue.enqueue(&fog);
        queue.enqueue(&a);
        queue.enqueue(&b);
        assert_eq!(queue.names(), vec!["a", "b", "fog"]);
    }

    #[test]
    fn test_requested_inputs_union() {
        let plain = marker("plain", RenderPassEvent::BeforeRenderingOpaques);
        let reader = Marker {
            name: "reader",
            event: RenderPassEvent::BeforeRenderingPostProcessing,
            inputs: PassInput::COLOR_DEPTH,
        };
        let mut queue = PassQueue::new();
        assert_eq!(queue.requested_inputs(), PassInput::NONE);
        queue.enqueue(&plain);
        queue.enqueue(&reader);
        assert_eq!(queue.requested_inputs(), PassInput::COLOR_DEPTH);
    }

    #[test]
    fn test_execute_event_filters() {
        let a = marker("a", RenderPassEvent::BeforeRenderingOpaques);
        let fog = marker("fog", RenderPassEvent::BeforeRenderingPostProcessing);
        let mut queue = PassQueue::new();
        queue.enqueue(&a);
        queue.enqueue(&fog);

        let mut ctx = ctx();
        queue
            .execute_event(RenderPassEvent::BeforeRenderingPostProcessing, &mut ctx)
            .unwrap();
        assert_eq!(
            ctx.commands().first(),
            Some(&crate::frame::Command::PushDebugGroup("fog".to_string()))
        );
        assert_eq!(ctx.commands().len(), 2);
    }
}
