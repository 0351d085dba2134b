//! Declarative rule-table model.
//!
//! A grammar is a flat array of [`RuleStep`]s in which every rule starts with
//! [`RuleStep::Rule`] and is terminated by [`RuleStep::End`], plus a symbol table describing each
//! grammar symbol. [`RuleTable::new`] cross-links the two once; afterwards the table is immutable
//! and may be shared between compiler instances.

use crate::error::GrammarError;

/// Stable integer tag of a grammar symbol (terminal or non-terminal).
pub type SymbolId = u16;

/// Symbol reference inside a rule step, optionally carrying the literal text to match.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Term {
    pub symbol: SymbolId,
    pub text: Option<&'static str>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RuleStep {
    /// Start of the rule path producing `symbol`.
    Rule(SymbolId),
    /// Must match while the path is still passing.
    And(Term),
    /// Alternative, tried only when the path so far failed.
    Or(Term),
    /// May match; the outcome does not affect the path.
    Optional(Term),
    /// One or more repetitions.
    Repeat(Term),
    End,
}

impl RuleStep {
    pub const fn rule(symbol: SymbolId) -> Self {
        Self::Rule(symbol)
    }

    pub const fn is(symbol: SymbolId) -> Self {
        Self::And(Term { symbol, text: None })
    }

    pub const fn is_text(symbol: SymbolId, text: &'static str) -> Self {
        Self::And(Term {
            symbol,
            text: Some(text),
        })
    }

    pub const fn or(symbol: SymbolId) -> Self {
        Self::Or(Term { symbol, text: None })
    }

    pub const fn or_text(symbol: SymbolId, text: &'static str) -> Self {
        Self::Or(Term {
            symbol,
            text: Some(text),
        })
    }

    pub const fn optional(symbol: SymbolId) -> Self {
        Self::Optional(Term { symbol, text: None })
    }

    pub const fn repeat(symbol: SymbolId) -> Self {
        Self::Repeat(Term { symbol, text: None })
    }

    pub const fn end() -> Self {
        Self::End
    }

    fn term(&self) -> Option<&Term> {
        match self {
            Self::And(t) | Self::Or(t) | Self::Optional(t) | Self::Repeat(t) => Some(t),
            Self::Rule(_) | Self::End => None,
        }
    }
}

/// Static description of a grammar symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SymbolDef {
    pub id: SymbolId,
    /// Code handed to the binding API unchanged (opcode, register, modifier bits, ...).
    pub native: u32,
    /// The symbol is only recognised while `context_key & active_contexts != 0`.
    pub context_key: u32,
    /// Bits set in the active context after the symbol is accepted.
    pub context_set: u32,
    /// Bits cleared from the active context after the symbol is accepted (before `context_set`).
    pub context_clear: u32,
}

impl SymbolDef {
    pub const fn new(id: SymbolId, native: u32, context_key: u32) -> Self {
        Self {
            id,
            native,
            context_key,
            context_set: 0,
            context_clear: 0,
        }
    }

    pub const fn with_context(mut self, set: u32, clear: u32) -> Self {
        self.context_set = set;
        self.context_clear = clear;
        self
    }
}

/// Symbol table entry after cross-linking.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub def: SymbolDef,
    /// Index of the first rule step carrying literal text for this symbol.
    pub default_text_index: Option<usize>,
    /// Index of the [`RuleStep::Rule`] step producing this symbol; `None` for terminals.
    pub rule_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RuleTable {
    symbols: Vec<SymbolEntry>,
    steps: Vec<RuleStep>,
    value_symbol: SymbolId,
    initial_contexts: u32,
}

impl RuleTable {
    /// Cross-links `symbols` and `steps`.
    ///
    /// `symbols[i].id` must equal `i`. The first step must open the root rule. `value_symbol` is the
    /// terminal recognised as a numeric literal instead of by text.
    pub fn new(
        symbols: &[SymbolDef],
        steps: &[RuleStep],
        value_symbol: SymbolId,
        initial_contexts: u32,
    ) -> Result<Self, GrammarError> {
        let mut entries = Vec::with_capacity(symbols.len());
        for (index, def) in symbols.iter().enumerate() {
            if usize::from(def.id) != index {
                return Err(GrammarError::SymbolOutOfOrder { index, id: def.id });
            }
            entries.push(SymbolEntry {
                def: *def,
                default_text_index: None,
                rule_index: None,
            });
        }

        if !matches!(steps.first(), Some(RuleStep::Rule(_))) {
            return Err(GrammarError::MissingRoot);
        }

        let mut open_rule: Option<(usize, SymbolId)> = None;
        for (step, rule_step) in steps.iter().enumerate() {
            let id = match rule_step {
                RuleStep::Rule(id) => *id,
                RuleStep::End => {
                    open_rule = None;
                    continue;
                }
                other => other.term().map_or(0, |t| t.symbol),
            };
            let entry = entries
                .get_mut(usize::from(id))
                .ok_or(GrammarError::UnknownSymbol { step, id })?;

            match rule_step {
                RuleStep::Rule(_) => {
                    if let Some((start, open)) = open_rule {
                        return Err(GrammarError::UnterminatedRule {
                            step: start,
                            id: open,
                        });
                    }
                    if entry.rule_index.is_some() {
                        return Err(GrammarError::DuplicateRule { id });
                    }
                    entry.rule_index = Some(step);
                    open_rule = Some((step, id));
                }
                other => {
                    if let Some(Term { text: Some(_), .. }) = other.term() {
                        entry.default_text_index.get_or_insert(step);
                    }
                }
            }
        }
        if let Some((step, id)) = open_rule {
            return Err(GrammarError::UnterminatedRule { step, id });
        }

        // Terminals need something to match against.
        for (step, rule_step) in steps.iter().enumerate() {
            let Some(term) = rule_step.term() else {
                continue;
            };
            let entry = &entries[usize::from(term.symbol)];
            if entry.rule_index.is_none()
                && term.symbol != value_symbol
                && term.text.is_none()
                && entry.default_text_index.is_none()
            {
                return Err(GrammarError::MissingText {
                    step,
                    id: term.symbol,
                });
            }
        }

        Ok(Self {
            symbols: entries,
            steps: steps.to_vec(),
            value_symbol,
            initial_contexts,
        })
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&SymbolEntry> {
        self.symbols.get(usize::from(id))
    }

    pub fn step(&self, index: usize) -> Option<&RuleStep> {
        self.steps.get(index)
    }

    /// Native code of `id`, or `GL_NONE` for unknown ids.
    pub fn native(&self, id: SymbolId) -> u32 {
        self.symbol(id).map_or(0, |s| s.def.native)
    }

    /// Literal text recorded as the default for `id`.
    pub fn default_text(&self, id: SymbolId) -> Option<&'static str> {
        let index = self.symbol(id)?.default_text_index?;
        self.steps.get(index)?.term()?.text
    }

    pub fn value_symbol(&self) -> SymbolId {
        self.value_symbol
    }

    pub fn initial_contexts(&self) -> u32 {
        self.initial_contexts
    }
}
