use super::rules::SymbolId;

/// A terminal accepted by Pass 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenInstruction {
    /// The terminal symbol.
    pub id: SymbolId,
    /// The non-terminal whose rule path accepted the terminal.
    pub rule: SymbolId,
    pub line: u32,
    pub offset: usize,
}

impl TokenInstruction {
    pub const fn new(id: SymbolId, rule: SymbolId) -> Self {
        Self {
            id,
            rule,
            line: 0,
            offset: 0,
        }
    }
}

/// Append-only token list that backtracking truncates back to a saved length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<TokenInstruction>,
}

impl TokenList {
    pub fn push(&mut self, token: TokenInstruction) {
        self.tokens.push(token);
    }

    pub fn truncate(&mut self, len: usize) {
        self.tokens.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn as_slice(&self) -> &[TokenInstruction] {
        &self.tokens
    }
}

/// Numeric literals in the order they were recognised.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    values: Vec<f32>,
}

impl ConstantPool {
    pub fn push(&mut self, value: f32) {
        self.values.push(value);
    }

    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}
