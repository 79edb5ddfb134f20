mod audio;
mod clock;
mod config;
mod error;
mod font;
mod host;
mod keystate;
mod memory;
mod processor;
mod program;
mod properties;
mod stack;
mod variants;
mod video;

// Re-exports
pub use crate::audio::AudioState;
pub use crate::config::{
    digest_rom, ConfigError, Options, RomConfiguration, SessionConfiguration,
    DEFAULT_PROCESSOR_SPEED_HERTZ,
};
pub use crate::error::*;
pub use crate::host::{HeadlessHost, Host};
pub use crate::memory::Memory;
pub use crate::processor::{
    Breakpoint, BreakpointCondition, CpuState, ExecMode, Processor, StateSnapshot,
    StateSnapshotVerbosity,
};
pub use crate::program::Program;
pub use crate::properties::{MemorySize, Properties, QuirkFlags, ScreenRotation, Variant};
pub use crate::stack::Stack;
pub use crate::variants::{description, preset};
pub use crate::video::{BlendMode, Video};
