//! Opaque GPU object handles.
//!
//! Handles are plain integers issued by a [`crate::RenderDevice`]. They are
//! never reused, so a stale handle can be detected instead of aliasing a newer
//! resource.

use std::fmt;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw handle value.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw handle value.
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// A texture owned by a device.
    TextureId,
    "texture"
);
define_handle!(
    /// A compiled GPU program (shader module).
    ProgramId,
    "program"
);
define_handle!(
    /// A compute entry point inside a [`ProgramId`].
    KernelId,
    "kernel"
);

/// Monotonic handle source shared by all handle kinds of one device.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    fn bump(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn texture(&mut self) -> TextureId {
        TextureId(self.bump())
    }

    pub fn program(&mut self) -> ProgramId {
        ProgramId(self.bump())
    }

    pub fn kernel(&mut self) -> KernelId {
        KernelId(self.bump())
    }
}
