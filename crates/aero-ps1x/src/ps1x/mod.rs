//! ps.1.1 - ps.1.4 front end: grammar, CISC macro library and the Pass-2 instruction builder.

mod builder;
mod grammar;
mod macros;
pub mod queue;
mod symbols;

use std::sync::Arc;

use tracing::debug;

use crate::compiler2pass::rules::RuleTable;
use crate::compiler2pass::{Compiler2Pass, TokenInstruction};
use crate::error::{CompileError, GrammarError};

pub use self::builder::InstructionBuilder;
pub use self::grammar::grammar;
pub use self::queue::{
    AlphaDst, ColorDst, InstructionQueue, MachineInstruction, MachineOpcode, MachineQueues, Phase,
    RecordError, SrcOperand,
};
pub use self::symbols::{Ps1xContext, Symbol};

/// Compiles ps.1.x source into machine instruction queues.
///
/// Tokens, constants and queues from the most recent compile stay available for inspection even
/// when it failed.
#[derive(Debug, Clone)]
pub struct Ps1xCompiler {
    engine: Compiler2Pass,
    builder: InstructionBuilder,
    /// Why the rule table is unusable; every compile reports it.
    grammar_error: Option<GrammarError>,
}

impl Default for Ps1xCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Ps1xCompiler {
    pub fn new() -> Self {
        Self::with_grammar(grammar())
    }

    /// Compiler over an explicitly supplied rule table.
    pub fn with_grammar(rules: Result<Arc<RuleTable>, GrammarError>) -> Self {
        let (rules, grammar_error) = match rules {
            Ok(rules) => (Some(rules), None),
            Err(err) => (None, Some(err)),
        };
        Self {
            engine: Compiler2Pass::new(rules),
            builder: InstructionBuilder::default(),
            grammar_error,
        }
    }

    pub fn compile(&mut self, source: &str) -> Result<(), CompileError> {
        if let Some(err) = &self.grammar_error {
            return Err(CompileError::Grammar(err.clone()));
        }
        self.builder.reset();
        let result = self.engine.compile(source, &mut self.builder);
        match &result {
            Ok(()) => debug!(
                tokens = self.engine.tokens().len(),
                phase_marker = self.builder.phase_marker_found(),
                "compiled ps.1.x shader"
            ),
            Err(err) => debug!(%err, "ps.1.x shader failed to compile"),
        }
        result
    }

    pub fn tokens(&self) -> &[TokenInstruction] {
        self.engine.tokens()
    }

    /// Terminal symbols of [`Self::tokens`].
    pub fn token_symbols(&self) -> Vec<Symbol> {
        self.tokens()
            .iter()
            .filter_map(|t| Symbol::from_id(t.id))
            .collect()
    }

    pub fn constants(&self) -> &[f32] {
        self.engine.constants()
    }

    pub fn queues(&self) -> &MachineQueues {
        self.builder.queues()
    }

    pub fn active_contexts(&self) -> Ps1xContext {
        Ps1xContext::from_bits_truncate(self.engine.active_contexts())
    }
}
