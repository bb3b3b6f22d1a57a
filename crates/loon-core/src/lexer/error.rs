use std::collections::BTreeSet;

use crate::token::TokenType;

/// What went wrong while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    /// The scanner sat between tokens and the byte has no transition at all.
    #[error("unknown character")]
    InvalidChar,
    /// The scanner was mid-token and the byte broke the lex.
    #[error("invalid character while reading a token")]
    ReadingToken,
    /// Input ended while mid-token.
    #[error("input ended in the middle of a token")]
    NonstopToken,
}

/// A buffered lexical error with enough position data to render the offending
/// source line. Scanning continues after one of these; the driver reports them
/// once the whole input is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    kind: LexErrorKind,
    line: usize,
    column: usize,
    length: usize,
    /// Token types the scanner could still have completed into, by numeric
    /// identity. Empty unless the kind is `ReadingToken`.
    candidates: BTreeSet<u32>,
}

impl ErrorReport {
    pub(crate) fn new(
        kind: LexErrorKind,
        line: usize,
        column: usize,
        length: usize,
        candidates: BTreeSet<u32>,
    ) -> Self {
        Self { kind, line, column, length, candidates }
    }

    pub fn kind(&self) -> LexErrorKind {
        self.kind
    }

    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn column_number(&self) -> usize {
        self.column
    }

    pub fn token_length(&self) -> usize {
        self.length
    }

    pub fn token_types(&self) -> &BTreeSet<u32> {
        &self.candidates
    }

    /// Renders the report against its source line: the line with the bad run
    /// highlighted, then a reason. With `colorful` the run is wrapped in ANSI
    /// red, otherwise in `~` markers.
    pub fn render(&self, source_line: &str, colorful: bool) -> String {
        let (mark_start, mark_stop) = if colorful {
            ("\x1b[31m", "\x1b[0m")
        } else {
            ("~", "~")
        };

        let mut hint = String::new();
        let mut need_reset = false;
        for (idx, ch) in source_line.chars().enumerate() {
            if idx == self.column {
                hint.push_str(mark_start);
                need_reset = true;
            }
            if idx == self.column + self.length {
                hint.push_str(mark_stop);
                need_reset = false;
            }
            hint.push(ch);
        }
        if need_reset {
            hint.push_str(mark_stop);
        }

        let offending = source_line
            .as_bytes()
            .get((self.column + self.length).saturating_sub(1))
            .map(|&b| b as char)
            .unwrap_or(' ');
        let reason = match self.kind {
            LexErrorKind::InvalidChar => {
                format!("Read unknown character '{offending}'")
            }
            LexErrorKind::ReadingToken => {
                let mut names = String::new();
                for &ty in &self.candidates {
                    if let Some(ty) = TokenType::from_u32(ty) {
                        names.push_str(ty.name());
                        names.push(' ');
                    }
                }
                format!(
                    "Read invalid character '{offending}' while reading possible token {{ {names}}}"
                )
            }
            LexErrorKind::NonstopToken => "Token has not ended when input stopped".to_owned(),
        };

        format!(
            "---------------------\n{} |\t{}\nReason: {}\n",
            self.line + 1,
            hint,
            reason
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_marks_the_offending_run() {
        let report = ErrorReport::new(
            LexErrorKind::ReadingToken,
            2,
            4,
            3,
            BTreeSet::from([TokenType::String.as_u32()]),
        );
        let out = report.render("s = \"ab", false);

        assert!(out.contains("3 |\ts = ~\"ab~"));
        assert!(out.contains("Read invalid character 'b' while reading possible token { STRING }"));
    }

    #[test]
    fn render_invalid_char() {
        let report = ErrorReport::new(LexErrorKind::InvalidChar, 0, 2, 1, BTreeSet::new());
        let out = report.render("a @ b", false);

        assert!(out.contains("1 |\ta ~@~ b"));
        assert!(out.contains("Read unknown character '@'"));
    }
}
