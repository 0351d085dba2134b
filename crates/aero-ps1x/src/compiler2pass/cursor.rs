//! Byte cursor over shader source used by Pass 1.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub offset: usize,
    pub line: u32,
}

/// Source cursor tracking the byte offset and the 1-based line number.
#[derive(Debug, Clone)]
pub struct Cursor<'s> {
    src: &'s [u8],
    offset: usize,
    line: u32,
}

impl<'s> Cursor<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            src: source.as_bytes(),
            offset: 0,
            line: 1,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn state(&self) -> CursorState {
        CursorState {
            offset: self.offset,
            line: self.line,
        }
    }

    pub fn restore(&mut self, state: CursorState) {
        self.offset = state.offset;
        self.line = state.line;
    }

    pub fn advance(&mut self, len: usize) {
        self.offset = (self.offset + len).min(self.src.len());
    }

    pub fn is_at_end(&self) -> bool {
        self.offset >= self.src.len()
    }

    fn rest(&self) -> &'s [u8] {
        &self.src[self.offset.min(self.src.len())..]
    }

    pub fn skip_whitespace(&mut self) {
        let n = self
            .rest()
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        self.offset += n;
    }

    /// Consumes one logical newline: `\n`, `\r`, `\r\n` or `\n\r`.
    pub fn skip_eol(&mut self) {
        let rest = self.rest();
        let Some(&first) = rest.first() else {
            return;
        };
        let complement = match first {
            b'\n' => b'\r',
            b'\r' => b'\n',
            _ => return,
        };
        self.line += 1;
        self.offset += 1;
        if rest.get(1) == Some(&complement) {
            self.offset += 1;
        }
    }

    /// Skips a `//`, `;` or `#` comment up to (not including) the end of line.
    pub fn skip_comments(&mut self) {
        let rest = self.rest();
        if !(rest.starts_with(b"//") || rest.starts_with(b";") || rest.starts_with(b"#")) {
            return;
        }
        let n = rest
            .iter()
            .take_while(|&&b| b != b'\n' && b != b'\r')
            .count();
        self.offset += n;
    }

    /// Moves past whitespace, newlines and comments.
    ///
    /// Returns `true` if the cursor now rests on a printable byte and `false` at end of source.
    pub fn position_to_next_symbol(&mut self) -> bool {
        loop {
            let start = self.offset;
            self.skip_whitespace();
            self.skip_eol();
            self.skip_comments();
            match self.rest().first() {
                None => return false,
                Some(&b) if b > b' ' => return true,
                // Control bytes none of the skips recognise.
                Some(_) if self.offset == start => self.offset += 1,
                Some(_) => {}
            }
        }
    }

    /// Recognises a numeric literal at the cursor without consuming it.
    ///
    /// Leading spaces and tabs are counted. The literal is the longest prefix of the following run
    /// of digits, `.` and `-` that parses as an `f32`. Returns the value and the number of bytes the
    /// literal spans including the leading whitespace.
    pub fn float_value(&self) -> Option<(f32, usize)> {
        let rest = self.rest();
        let leading = rest
            .iter()
            .take_while(|&&b| b == b' ' || b == b'\t')
            .count();
        let body = &rest[leading..];
        let run = body
            .iter()
            .take_while(|&&b| b.is_ascii_digit() || b == b'.' || b == b'-')
            .count();
        (1..=run).rev().find_map(|len| {
            let text = std::str::from_utf8(&body[..len]).ok()?;
            let value = text.parse::<f32>().ok()?;
            Some((value, leading + len))
        })
    }

    /// Case-sensitive literal comparison at the cursor.
    pub fn is_symbol(&self, text: &str) -> bool {
        !text.is_empty() && self.rest().starts_with(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_literals() {
        let cases: [(&str, f32, usize); 7] = [
            ("1 test", 1.0, 1),
            ("2.3f test", 2.3, 3),
            ("-0.5 test", -0.5, 4),
            (" 23.6 test", 23.6, 5),
            ("  -0.021 test", -0.021, 8),
            ("12 test", 12.0, 2),
            ("3test", 3.0, 1),
        ];
        for (src, value, len) in cases {
            assert_eq!(Cursor::new(src).float_value(), Some((value, len)), "{src:?}");
        }
    }

    #[test]
    fn float_literal_rejects_non_numbers() {
        assert_eq!(Cursor::new("test").float_value(), None);
        assert_eq!(Cursor::new("- 1").float_value(), None);
        assert_eq!(Cursor::new("").float_value(), None);
    }

    #[test]
    fn newline_variants_count_one_line_each() {
        for src in ["\nx", "\rx", "\r\nx", "\n\rx"] {
            let mut cursor = Cursor::new(src);
            cursor.skip_eol();
            assert_eq!(cursor.line(), 2, "{src:?}");
            assert!(cursor.is_symbol("x"), "{src:?}");
        }

        // Two newlines of the same kind are two lines.
        let mut cursor = Cursor::new("\n\nx");
        assert!(cursor.position_to_next_symbol());
        assert_eq!(cursor.line(), 3);
    }

    #[test]
    fn skips_comments_and_whitespace() {
        let mut cursor = Cursor::new("  // comment\n\t; other\r\n# third\n  mov");
        assert!(cursor.position_to_next_symbol());
        assert!(cursor.is_symbol("mov"));
        assert_eq!(cursor.line(), 4);

        let offset = cursor.offset();
        assert!(cursor.position_to_next_symbol());
        assert_eq!(cursor.offset(), offset);
    }

    #[test]
    fn positioning_terminates_on_control_bytes_and_end() {
        let mut cursor = Cursor::new("\0\x0b \x7f");
        assert!(cursor.position_to_next_symbol());
        assert!(cursor.is_symbol("\x7f"));

        let mut cursor = Cursor::new("  ; trailing comment");
        assert!(!cursor.position_to_next_symbol());
        assert!(cursor.is_at_end());

        let mut cursor = Cursor::new("");
        assert!(!cursor.position_to_next_symbol());
    }

    #[test]
    fn literal_match_is_case_sensitive_and_bounded() {
        let cursor = Cursor::new("ps.1.4");
        assert!(cursor.is_symbol("ps.1.4"));
        assert!(cursor.is_symbol("ps"));
        assert!(!cursor.is_symbol("PS.1.4"));
        assert!(!cursor.is_symbol("ps.1.4x"));
    }
}
