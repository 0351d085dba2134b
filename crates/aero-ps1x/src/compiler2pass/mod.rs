//! Generic two-pass compiler engine.
//!
//! Pass 1 interprets a [`RuleTable`] against source text, producing a token list and a constant
//! pool. Pass 2 is supplied by the grammar's owner through the [`Pass2`] trait.
//!
//! Backtracking is truncation based: every rule path records the token/constant list lengths,
//! the cursor and the active context on entry and restores them when the path fails.

pub mod cursor;
pub mod rules;
pub mod tokens;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::CompileError;
use crate::limits::MAX_PS1X_SOURCE_BYTES;

use self::cursor::{Cursor, CursorState};
use self::rules::{RuleStep, RuleTable, SymbolEntry, SymbolId, Term};
pub use self::tokens::{ConstantPool, TokenInstruction, TokenList};

/// Everything Pass 1 produced, as seen by Pass 2.
#[derive(Debug, Copy, Clone)]
pub struct Pass1Output<'a> {
    pub rules: &'a RuleTable,
    pub tokens: &'a [TokenInstruction],
    pub constants: &'a [f32],
    /// Active contexts at the end of Pass 1.
    pub active_contexts: u32,
}

pub trait Pass2 {
    fn do_pass2(&mut self, pass1: &Pass1Output<'_>) -> Result<(), CompileError>;
}

#[derive(Debug, Clone, Default)]
pub struct Compiler2Pass {
    rules: Option<Arc<RuleTable>>,
    tokens: TokenList,
    constants: ConstantPool,
    active_contexts: u32,
}

impl Compiler2Pass {
    pub fn new(rules: Option<Arc<RuleTable>>) -> Self {
        Self {
            rules,
            ..Default::default()
        }
    }

    pub fn rules(&self) -> Option<&Arc<RuleTable>> {
        self.rules.as_ref()
    }

    pub fn tokens(&self) -> &[TokenInstruction] {
        self.tokens.as_slice()
    }

    pub fn constants(&self) -> &[f32] {
        self.constants.as_slice()
    }

    pub fn active_contexts(&self) -> u32 {
        self.active_contexts
    }

    /// Runs Pass 1 over `source` and, if it accepted the whole source, `pass2`.
    pub fn compile(&mut self, source: &str, pass2: &mut dyn Pass2) -> Result<(), CompileError> {
        let rules = self.rules.clone().ok_or(CompileError::NoRuleTable)?;
        if source.len() > MAX_PS1X_SOURCE_BYTES {
            return Err(CompileError::SourceTooLarge {
                len: source.len(),
                max: MAX_PS1X_SOURCE_BYTES,
            });
        }

        self.do_pass1(&rules, source)?;
        debug!(
            tokens = self.tokens.len(),
            constants = self.constants.len(),
            contexts = self.active_contexts,
            "pass 1 complete"
        );

        pass2.do_pass2(&Pass1Output {
            rules: &rules,
            tokens: self.tokens.as_slice(),
            constants: self.constants.as_slice(),
            active_contexts: self.active_contexts,
        })
    }

    fn do_pass1(&mut self, rules: &RuleTable, source: &str) -> Result<(), CompileError> {
        let mut pass = Pass1 {
            rules,
            cursor: Cursor::new(source),
            tokens: TokenList::default(),
            constants: ConstantPool::default(),
            active_contexts: rules.initial_contexts(),
        };

        let passed = pass.process_rule_path(0);
        let trailing = pass.cursor.position_to_next_symbol();
        let (line, offset) = (pass.cursor.line(), pass.cursor.offset());

        self.tokens = pass.tokens;
        self.constants = pass.constants;
        self.active_contexts = pass.active_contexts;

        if !passed {
            return Err(CompileError::Rejected);
        }
        if trailing {
            return Err(CompileError::TrailingInput { line, offset });
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
struct Checkpoint {
    tokens: usize,
    constants: usize,
    cursor: CursorState,
    active_contexts: u32,
}

struct Pass1<'a> {
    rules: &'a RuleTable,
    cursor: Cursor<'a>,
    tokens: TokenList,
    constants: ConstantPool,
    active_contexts: u32,
}

impl Pass1<'_> {
    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            tokens: self.tokens.len(),
            constants: self.constants.len(),
            cursor: self.cursor.state(),
            active_contexts: self.active_contexts,
        }
    }

    fn rollback(&mut self, checkpoint: &Checkpoint) {
        self.tokens.truncate(checkpoint.tokens);
        self.constants.truncate(checkpoint.constants);
        self.cursor.restore(checkpoint.cursor);
        self.active_contexts = checkpoint.active_contexts;
    }

    /// Evaluates the rule path starting at `rule_index`.
    fn process_rule_path(&mut self, rule_index: usize) -> bool {
        let Some(&RuleStep::Rule(active_rule)) = self.rules.step(rule_index) else {
            return false;
        };
        let checkpoint = self.checkpoint();
        let mut passed = true;
        let mut index = rule_index + 1;

        loop {
            let Some(&step) = self.rules.step(index) else {
                passed = false;
                break;
            };
            match step {
                RuleStep::And(term) => {
                    if passed {
                        passed = self.validate_token(&term, active_rule);
                    }
                }
                RuleStep::Or(term) => {
                    if passed {
                        break;
                    }
                    self.rollback(&checkpoint);
                    passed = self.validate_token(&term, active_rule);
                }
                RuleStep::Optional(term) => {
                    if passed {
                        self.validate_token(&term, active_rule);
                    }
                }
                RuleStep::Repeat(term) => {
                    if passed {
                        let mut repetitions = 0usize;
                        loop {
                            let before = self.cursor.offset();
                            if !self.validate_token(&term, active_rule) {
                                break;
                            }
                            repetitions += 1;
                            if self.cursor.offset() == before {
                                break;
                            }
                        }
                        passed = repetitions > 0;
                    }
                }
                RuleStep::End => break,
                RuleStep::Rule(_) => {
                    passed = false;
                    break;
                }
            }
            index += 1;
        }

        if !passed {
            self.rollback(&checkpoint);
        }
        passed
    }

    fn validate_token(&mut self, term: &Term, active_rule: SymbolId) -> bool {
        let Some(&entry) = self.rules.symbol(term.symbol) else {
            return false;
        };
        if entry.def.context_key & self.active_contexts == 0 {
            return false;
        }
        match entry.rule_index {
            Some(rule_index) => self.process_rule_path(rule_index),
            None => self.accept_terminal(term, &entry, active_rule),
        }
    }

    fn accept_terminal(&mut self, term: &Term, entry: &SymbolEntry, active_rule: SymbolId) -> bool {
        if !self.cursor.position_to_next_symbol() {
            return false;
        }
        let (line, offset) = (self.cursor.line(), self.cursor.offset());

        let len = if term.symbol == self.rules.value_symbol() {
            let Some((value, len)) = self.cursor.float_value() else {
                return false;
            };
            self.constants.push(value);
            len
        } else {
            let Some(text) = term.text.or_else(|| self.rules.default_text(term.symbol)) else {
                return false;
            };
            if !self.cursor.is_symbol(text) {
                return false;
            }
            text.len()
        };

        self.tokens.push(TokenInstruction {
            id: term.symbol,
            rule: active_rule,
            line,
            offset,
        });
        self.cursor.advance(len);
        self.active_contexts &= !entry.def.context_clear;
        self.active_contexts |= entry.def.context_set;
        trace!(id = term.symbol, rule = active_rule, line, offset, "token");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarError;
    use pretty_assertions::assert_eq;
    use rules::SymbolDef;

    // List     ::= Item [Tail]
    // Tail     ::= {TailItem}+
    // TailItem ::= "," Item
    // Item     ::= "ab" | "a" | Num | Pair | "lock" | "gated"
    // Pair     ::= "lock" "!"
    //
    // "lock" is only visible while UNLOCKED is active and swaps it for LOCKED; "gated" needs LOCKED.
    const LIST: SymbolId = 0;
    const ITEM: SymbolId = 1;
    const TAIL: SymbolId = 2;
    const TAIL_ITEM: SymbolId = 3;
    const PAIR: SymbolId = 4;
    const AB: SymbolId = 5;
    const A: SymbolId = 6;
    const NUM: SymbolId = 7;
    const COMMA: SymbolId = 8;
    const LOCK: SymbolId = 9;
    const BANG: SymbolId = 10;
    const GATED: SymbolId = 11;

    const BASE: u32 = 1;
    const UNLOCKED: u32 = 2;
    const LOCKED: u32 = 4;

    fn toy_table() -> Arc<RuleTable> {
        let symbols = [
            SymbolDef::new(LIST, 0, BASE),
            SymbolDef::new(ITEM, 0, BASE),
            SymbolDef::new(TAIL, 0, BASE),
            SymbolDef::new(TAIL_ITEM, 0, BASE),
            SymbolDef::new(PAIR, 0, BASE),
            SymbolDef::new(AB, 10, BASE),
            SymbolDef::new(A, 11, BASE),
            SymbolDef::new(NUM, 0, BASE),
            SymbolDef::new(COMMA, 0, BASE),
            SymbolDef::new(LOCK, 0, UNLOCKED).with_context(LOCKED, UNLOCKED),
            SymbolDef::new(BANG, 0, BASE),
            SymbolDef::new(GATED, 0, LOCKED),
        ];
        let steps = [
            RuleStep::rule(LIST),
            RuleStep::is(ITEM),
            RuleStep::optional(TAIL),
            RuleStep::end(),
            RuleStep::rule(TAIL),
            RuleStep::repeat(TAIL_ITEM),
            RuleStep::end(),
            RuleStep::rule(TAIL_ITEM),
            RuleStep::is_text(COMMA, ","),
            RuleStep::is(ITEM),
            RuleStep::end(),
            RuleStep::rule(ITEM),
            RuleStep::is_text(AB, "ab"),
            RuleStep::or_text(A, "a"),
            RuleStep::or(NUM),
            RuleStep::or(PAIR),
            RuleStep::or_text(LOCK, "lock"),
            RuleStep::or_text(GATED, "gated"),
            RuleStep::end(),
            RuleStep::rule(PAIR),
            RuleStep::is(LOCK),
            RuleStep::is_text(BANG, "!"),
            RuleStep::end(),
        ];
        Arc::new(RuleTable::new(&symbols, &steps, NUM, BASE | UNLOCKED).unwrap())
    }

    struct Nop;

    impl Pass2 for Nop {
        fn do_pass2(&mut self, _: &Pass1Output<'_>) -> Result<(), CompileError> {
            Ok(())
        }
    }

    fn ids(compiler: &Compiler2Pass) -> Vec<SymbolId> {
        compiler.tokens().iter().map(|t| t.id).collect()
    }

    #[test]
    fn default_text_is_first_literal() {
        let table = toy_table();
        assert_eq!(table.default_text(LOCK), Some("lock"));
        assert_eq!(table.default_text(NUM), None);
        assert_eq!(table.symbol(PAIR).unwrap().rule_index, Some(19));
        assert_eq!(table.symbol(LOCK).unwrap().rule_index, None);
    }

    #[test]
    fn alternatives_backtrack_and_record_producing_rule() {
        let mut compiler = Compiler2Pass::new(Some(toy_table()));
        compiler.compile("a, ab ,1.5", &mut Nop).unwrap();
        assert_eq!(ids(&compiler), vec![A, COMMA, AB, COMMA, NUM]);
        assert_eq!(compiler.constants(), &[1.5]);
        assert_eq!(compiler.tokens()[0].rule, ITEM);
        assert_eq!(compiler.tokens()[1].rule, TAIL_ITEM);
        assert_eq!(compiler.tokens()[2].offset, 3);
    }

    #[test]
    fn failed_repetition_rolls_back_tokens_and_constants() {
        let mut compiler = Compiler2Pass::new(Some(toy_table()));
        let err = compiler.compile("a, 2, x", &mut Nop).unwrap_err();
        assert_eq!(err, CompileError::TrailingInput { line: 1, offset: 4 });
        // The dangling ", x" was rolled back, the accepted ", 2" was kept.
        assert_eq!(ids(&compiler), vec![A, COMMA, NUM]);
        assert_eq!(compiler.constants(), &[2.0]);
    }

    #[test]
    fn context_gates_symbols() {
        let mut compiler = Compiler2Pass::new(Some(toy_table()));
        compiler.compile("lock!, gated", &mut Nop).unwrap();
        assert_eq!(ids(&compiler), vec![LOCK, BANG, COMMA, GATED]);
        assert_eq!(compiler.active_contexts(), BASE | LOCKED);

        // "lock" can only be consumed once.
        let err = compiler.compile("lock, lock", &mut Nop).unwrap_err();
        assert!(matches!(err, CompileError::TrailingInput { .. }), "{err:?}");

        // "gated" is not visible before "lock".
        let err = compiler.compile("gated", &mut Nop).unwrap_err();
        assert_eq!(err, CompileError::Rejected);
    }

    #[test]
    fn backtracking_restores_active_contexts() {
        // Pair accepts "lock" (dropping UNLOCKED) and then fails on the missing "!"; the plain
        // "lock" alternative is only reachable if UNLOCKED was restored.
        let mut compiler = Compiler2Pass::new(Some(toy_table()));
        compiler.compile("lock, gated", &mut Nop).unwrap();
        assert_eq!(ids(&compiler), vec![LOCK, COMMA, GATED]);
        assert_eq!(compiler.tokens()[0].rule, ITEM);
    }

    #[test]
    fn missing_table_and_oversized_source() {
        let mut compiler = Compiler2Pass::default();
        assert_eq!(compiler.compile("a", &mut Nop), Err(CompileError::NoRuleTable));

        let mut compiler = Compiler2Pass::new(Some(toy_table()));
        let source = "a".repeat(MAX_PS1X_SOURCE_BYTES + 1);
        assert!(matches!(
            compiler.compile(&source, &mut Nop),
            Err(CompileError::SourceTooLarge { .. })
        ));
    }

    #[test]
    fn table_validation() {
        let symbols = [SymbolDef::new(0, 0, 1), SymbolDef::new(1, 0, 1)];
        let err = RuleTable::new(&symbols, &[RuleStep::rule(0), RuleStep::is(1)], 99, 1)
            .unwrap_err();
        assert!(matches!(err, GrammarError::UnterminatedRule { .. }), "{err:?}");

        let steps = [RuleStep::rule(0), RuleStep::is(1), RuleStep::end()];
        let err = RuleTable::new(&symbols, &steps, 99, 1).unwrap_err();
        assert_eq!(err, GrammarError::MissingText { step: 1, id: 1 });

        let err = RuleTable::new(&[SymbolDef::new(1, 0, 1)], &[RuleStep::rule(1)], 99, 1)
            .unwrap_err();
        assert_eq!(err, GrammarError::SymbolOutOfOrder { index: 0, id: 1 });
    }
}
