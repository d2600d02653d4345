// Assembling
mod asm;
pub use asm::{assemble, Assembler};
mod isa;
pub use isa::{MemImage, Opcode, Register, MEMORY_MAX};

// Running
mod runtime;
pub use runtime::{Halt, RunState};

mod error;
mod source;
pub use source::StaticSource;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
