//! Compiler for D3D pixel shader assembly (`ps.1.1` - `ps.1.4`) targeting an
//! ATI_fragment_shader style fixed-function fragment pipeline.
//!
//! Compilation happens in two passes:
//!
//! - Pass 1 ([`compiler2pass`]) is a generic lexer/parser driven by a declarative rule table.
//!   It produces a flat token list and a pool of numeric literals.
//! - Pass 2 ([`ps1x::InstructionBuilder`]) turns tokens into machine instructions. It expands the
//!   legacy CISC texture opcodes into primitive instructions, tracks temp register liveness across
//!   the two hardware phases and splits color/alpha writes.
//!
//! The resulting four instruction queues are handed to a [`FragmentShaderApi`] implementation by
//! [`bind_machine_instructions`], or through the [`FragmentProgram`] lifecycle wrapper.

#![forbid(unsafe_code)]

mod binder;
pub mod compiler2pass;
mod error;
mod limits;
pub mod native;
mod program;
pub mod ps1x;
mod recording;


pub use crate::binder::{bind_machine_instructions, FragmentShaderApi};
pub use crate::error::{BindError, CompileError, GrammarError, ProgramError};
pub use crate::limits::{MAX_PROGRAM_CONSTANTS, MAX_PS1X_SOURCE_BYTES};
pub use crate::program::FragmentProgram;
pub use crate::ps1x::{
    AlphaDst, ColorDst, MachineInstruction, MachineQueues, Phase, Ps1xCompiler, SrcOperand, Symbol,
};
pub use crate::recording::{ApiCall, RecordingApi};
