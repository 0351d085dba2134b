//! Centralized limits for ps.1.x compilation.
//!
//! Shader source handed to the compiler may come from untrusted content packs. These limits bound
//! the work done by the backtracking parser and the size of the fixed-capacity builder state.

/// Maximum accepted shader source length in bytes.
///
/// A full ps.1.4 program is at most a few dozen instructions; real-world sources (comments
/// included) stay well under a few KiB.
pub const MAX_PS1X_SOURCE_BYTES: usize = 64 * 1024; // 64 KiB

/// Operand slots per pending instruction (destination plus up to four sources/extra operands).
pub(crate) const MAX_OP_PARAMS: usize = 5;

/// Number of temp registers tracked for cross-phase liveness (`REG_0` - `REG_5`).
pub(crate) const TEMP_REGISTER_COUNT: usize = 6;

/// Number of fragment program constants (`c0` - `c7`).
pub const MAX_PROGRAM_CONSTANTS: usize = 8;
