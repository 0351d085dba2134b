use thiserror::Error;

use crate::ps1x::Phase;

/// A rule table failed validation while it was being cross-linked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("symbol table entry {index} declares id {id}; ids must be dense and ordered")]
    SymbolOutOfOrder { index: usize, id: u16 },
    #[error("rule step {step} references unknown symbol id {id}")]
    UnknownSymbol { step: usize, id: u16 },
    #[error("rule table must start with a rule step")]
    MissingRoot,
    #[error("rule for symbol id {id} starting at step {step} is not terminated by an end step")]
    UnterminatedRule { step: usize, id: u16 },
    #[error("symbol id {id} has more than one rule")]
    DuplicateRule { id: u16 },
    #[error("terminal symbol id {id} at step {step} has no literal text")]
    MissingText { step: usize, id: u16 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("no rule table configured")]
    NoRuleTable,
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("shader source is {len} bytes (max {max})")]
    SourceTooLarge { len: usize, max: usize },
    #[error("shader source was not recognised by the grammar")]
    Rejected,
    #[error("unexpected trailing input at line {line}, offset {offset}")]
    TrailingInput { line: u32, offset: usize },
    #[error("instruction pipe not cleared at line {line}, offset {offset}")]
    PipeNotCleared { line: u32, offset: usize },
    #[error("too many operands at line {line}, offset {offset}")]
    OperandOverflow { line: u32, offset: usize },
    #[error("missing operand {operand} at line {line}, offset {offset}")]
    MissingOperand {
        operand: usize,
        line: u32,
        offset: usize,
    },
    #[error("instruction at line {line}, offset {offset} has {count} source operands")]
    BadOperandCount {
        count: usize,
        line: u32,
        offset: usize,
    },
    #[error("register {register:#x} read at line {line}, offset {offset} was never written")]
    UndefinedRegisterRead {
        register: u32,
        line: u32,
        offset: usize,
    },
    #[error("macro operand {operand} register {register:#x} has no counterpart in the expansion")]
    MacroOperand { operand: usize, register: u32 },
    #[error("constant definition at index {index} needs 4 values but the pool holds {available}")]
    MissingConstants { index: usize, available: usize },
    #[error("unexpected token id {id} (rule {rule}) at line {line}, offset {offset}")]
    UnexpectedToken {
        id: u16,
        rule: u16,
        line: u32,
        offset: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("fragment shader API reported an error binding {phase} instruction {instruction}")]
    Api { phase: Phase, instruction: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("fragment program has not been loaded")]
    NotLoaded,
}
