//! The scanner.
//!
//! One composite DFA recognizes every token type at once: each type's pattern
//! is compiled to an NFA, its states are marked with the type's identity, and
//! all of them are grafted as branches onto a shared start state whose
//! whitespace self-loops eat blanks between tokens. The lexer then runs the
//! DFA byte by byte and commits a token exactly when the automaton cannot
//! extend the current lexeme, which is what makes the scan maximal-munch.

use std::collections::{BTreeSet, VecDeque};
use std::io::{self, Read};
use std::sync::OnceLock;

use crate::token::{RawToken, TokenStorage, TokenType};

pub mod dfa;
pub mod error;
pub mod nfa;
pub mod regex;

use dfa::{Dfa, StateId};
use error::{ErrorReport, LexErrorKind};

static SCANNER: OnceLock<Dfa> = OnceLock::new();

/// The process-wide scanner automaton. Built once, on first use; immutable
/// and freely shared between lexers afterwards.
pub fn scanner_automaton() -> &'static Dfa {
    SCANNER.get_or_init(build_scanner)
}

/// Builds the composite automaton from the token pattern table.
///
/// Stop states of a sub-automaton for type `t` are marked `t << 1 | 1`, all
/// its other states `t << 1`. A state of the final DFA therefore knows both
/// which types it currently accepts and which ones it could still complete
/// into. The start state has its marks cleared: between tokens the scanner is
/// inside nothing.
fn build_scanner() -> Dfa {
    let mut nfa = nfa::Nfa::new();
    let start = nfa.start_single_state();
    nfa.add_jump(start, b' ', start);
    nfa.add_jump(start, b'\t', start);
    nfa.add_state_mark(start, 0);

    for ty in TokenType::all() {
        let pattern = ty.pattern();
        if pattern.is_empty() {
            continue;
        }
        let mut sub = regex::automaton_from_pattern(pattern);
        sub.add_stop_state_marks(ty.as_u32() << 1 | 1);
        for state in 0..sub.state_count() {
            if !sub.is_stop_state(state) {
                sub.add_state_mark(state, ty.as_u32() << 1);
            }
        }
        nfa.add_automaton(start, &sub);
    }

    let mut dfa = nfa.to_deterministic();
    dfa.clear_state_marks(dfa.start_state());
    tracing::debug!(states = dfa.state_count(), "scanner automaton ready");
    dfa
}

/// Splits a mark set into (in-progress types, accepted types).
fn split_marks(marks: &BTreeSet<u32>) -> (BTreeSet<u32>, BTreeSet<u32>) {
    let mut procedure = BTreeSet::new();
    let mut stop = BTreeSet::new();
    for &m in marks {
        if m & 1 == 1 {
            stop.insert(m >> 1);
        } else {
            procedure.insert(m >> 1);
        }
    }
    (procedure, stop)
}

/// A maximal-munch scanner over a byte stream.
///
/// Feed bytes with [`Lexer::feed_char`] (or a whole stream with
/// [`Lexer::feed_reader`]), close with [`Lexer::eof`], and drain tokens with
/// [`Lexer::take_token`]. Errors do not abort the scan; they are buffered and
/// the scanner resynchronizes from the start state.
#[derive(Debug)]
pub struct Lexer {
    automaton: &'static Dfa,
    state: StateId,
    tokens: VecDeque<RawToken>,
    lexeme: Vec<u8>,
    line: usize,
    column: usize,
    stopped: bool,
    lines: Vec<String>,
    errors: Vec<ErrorReport>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        let automaton = scanner_automaton();
        Self {
            automaton,
            state: automaton.start_state(),
            tokens: VecDeque::new(),
            lexeme: Vec::new(),
            line: 0,
            column: 0,
            stopped: false,
            lines: vec![String::new()],
            errors: Vec::new(),
        }
    }

    /// Feeds one byte. Returns whether a token was committed to the queue.
    pub fn feed_char(&mut self, byte: u8) -> bool {
        let mut generated = false;

        let mut trial = self.automaton.next_state(self.state, byte);
        if trial == Dfa::REJECT {
            // The lexeme cannot extend: commit it, then retry the byte from
            // wherever that left us.
            generated = self.generate_token_and_reset();
            trial = self.automaton.next_state(self.state, byte);
            if trial == Dfa::REJECT {
                trial = self.automaton.start_state();
                self.push_error(LexErrorKind::InvalidChar, BTreeSet::new());
            }
        }

        self.column += 1;
        // Whitespace self-loops keep us at the start state and out of the
        // lexeme buffer.
        if trial != self.automaton.start_state() {
            self.lexeme.push(byte);
        }
        if byte != b'\r' && byte != b'\n' {
            self.lines.last_mut().unwrap().push(byte as char);
        }
        self.state = trial;

        // Newlines swallowed by a multi-line comment still count as lines.
        let comment_mark = TokenType::Comment.as_u32() << 1;
        if self.automaton.state_marks(self.state).contains(&comment_mark)
            && self.lexeme.len() > 2
        {
            let len = self.lexeme.len();
            if self.lexeme[len - 1] == b'\n' || self.lexeme[len - 2] == b'\r' {
                self.line += 1;
                self.column = usize::from(self.lexeme[len - 1] != b'\n');
                self.lines.push(String::new());
                self.tokens.push_back(RawToken::new(TokenType::Newline, ""));
            }
        }

        generated
    }

    /// Feeds a whole stream and closes the lexer.
    pub fn feed_reader<R: Read>(&mut self, reader: R) -> io::Result<()> {
        for byte in reader.bytes() {
            self.feed_char(byte?);
        }
        self.eof();
        Ok(())
    }

    pub fn feed_bytes(&mut self, bytes: impl AsRef<[u8]>) {
        for &b in bytes.as_ref() {
            self.feed_char(b);
        }
    }

    /// Closes the input. A pending accepted lexeme is committed; a pending
    /// unaccepted one becomes a NONSTOP_TOKEN error. Always appends
    /// TOKEN_EOF.
    pub fn eof(&mut self) {
        let (procedure, stop) = split_marks(self.automaton.state_marks(self.state));
        if !stop.is_empty() {
            self.generate_token_and_reset();
        } else if self.state != self.automaton.start_state() {
            self.push_error(LexErrorKind::NonstopToken, procedure);
        }
        self.tokens.push_back(RawToken::new(TokenType::TokenEof, ""));
        self.stopped = true;
    }

    /// Commits the buffered lexeme based on the current state's marks.
    ///
    /// An accepting state emits the token type with the smallest accept mark;
    /// that tie-break is the language's precedence rule (keywords beat
    /// SYMBOL, operators follow declaration order). COMMENT tokens are
    /// suppressed. A non-accepting state with in-progress marks is a
    /// READING_TOKEN error. Either way the automaton jumps back to its start
    /// state.
    fn generate_token_and_reset(&mut self) -> bool {
        let (procedure, stop) = split_marks(self.automaton.state_marks(self.state));
        let mut generated = false;

        if self.automaton.is_stop_state(self.state) && !stop.is_empty() {
            let ty = TokenType::from_u32(*stop.first().unwrap())
                .expect("accept mark does not name a token type");

            if ty == TokenType::Newline {
                self.line += 1;
                self.column = 0;
                self.lines.push(String::new());
            }

            if ty != TokenType::Comment {
                let text = String::from_utf8_lossy(&self.lexeme).into_owned();
                self.tokens.push_back(RawToken::new(ty, text));
                generated = true;
            }

            self.lexeme.clear();
            self.state = self.automaton.start_state();
        } else if !procedure.is_empty() {
            self.push_error(LexErrorKind::ReadingToken, procedure);
            self.state = self.automaton.start_state();
        }

        generated
    }

    fn push_error(&mut self, kind: LexErrorKind, candidates: BTreeSet<u32>) {
        let column = self.column.saturating_sub(self.lexeme.len());
        self.errors.push(ErrorReport::new(
            kind,
            self.line,
            column,
            self.lexeme.len() + 1,
            candidates,
        ));
        self.lexeme.clear();
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn take_token(&mut self) -> Option<RawToken> {
        self.tokens.pop_front()
    }

    /// Moves every queued token into `storage`.
    pub fn drain_into(&mut self, storage: &mut TokenStorage) {
        while let Some(token) = self.tokens.pop_front() {
            storage.push_token(token);
        }
    }

    pub fn errors(&self) -> &[ErrorReport] {
        &self.errors
    }

    /// The n-th stored source line (newline bytes excluded).
    pub fn source_line(&self, n: usize) -> &str {
        &self.lines[n]
    }

    /// Renders the n-th buffered error against its stored source line.
    pub fn render_error(&self, n: usize, colorful: bool) -> String {
        let report = &self.errors[n];
        report.render(self.source_line(report.line_number()), colorful)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn lex(src: &str) -> Lexer {
        let mut lexer = Lexer::new();
        lexer.feed_bytes(src);
        lexer.eof();
        lexer
    }

    fn types(lexer: &mut Lexer) -> Vec<TokenType> {
        std::iter::from_fn(|| lexer.take_token()).map(|t| t.ty).collect()
    }

    fn texts(lexer: &mut Lexer) -> Vec<(TokenType, String)> {
        std::iter::from_fn(|| lexer.take_token())
            .map(|t| (t.ty, t.text))
            .collect()
    }

    #[test]
    fn maximal_munch_wins_over_keywords() {
        let mut lexer = lex("ifx");
        assert_eq!(types(&mut lexer), [TokenType::Symbol, TokenType::TokenEof]);

        let mut lexer = lex("if x");
        assert_eq!(
            types(&mut lexer),
            [TokenType::If, TokenType::Symbol, TokenType::TokenEof]
        );
    }

    #[test]
    fn keywords_beat_symbol() {
        let mut lexer = lex("return");
        assert_eq!(types(&mut lexer), [TokenType::Return, TokenType::TokenEof]);

        let mut lexer = lex("fn");
        assert_eq!(types(&mut lexer), [TokenType::Fn, TokenType::TokenEof]);
    }

    #[test]
    fn line_comments_are_suppressed() {
        let mut lexer = lex("a // hi\nb");
        assert_eq!(
            texts(&mut lexer),
            [
                (TokenType::Symbol, "a".to_owned()),
                (TokenType::Newline, "\n".to_owned()),
                (TokenType::Symbol, "b".to_owned()),
                (TokenType::TokenEof, String::new()),
            ]
        );
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn comment_at_eof_is_suppressed() {
        let mut lexer = lex("a // hi");
        assert_eq!(types(&mut lexer), [TokenType::Symbol, TokenType::TokenEof]);
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn block_comment_counts_lines() {
        let mut lexer = lex("a /* x\ny */ b");
        assert_eq!(
            types(&mut lexer),
            [
                TokenType::Symbol,
                TokenType::Newline,
                TokenType::Symbol,
                TokenType::TokenEof
            ]
        );
        assert!(lexer.errors().is_empty());
        assert_eq!(lexer.source_line(0), "a /* x");
        assert_eq!(lexer.source_line(1), "y */ b");
    }

    #[test]
    fn string_literal() {
        let mut lexer = lex("\"hello\"");
        assert_eq!(
            texts(&mut lexer),
            [
                (TokenType::String, "\"hello\"".to_owned()),
                (TokenType::TokenEof, String::new()),
            ]
        );
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn unterminated_string_reports_an_error() {
        let lexer = lex("\"abc");
        assert_eq!(lexer.errors().len(), 1);
        assert_eq!(lexer.errors()[0].kind(), LexErrorKind::NonstopToken);
    }

    #[test]
    fn newline_breaks_a_string() {
        let mut lexer = lex("\"ab\ncd\"");
        assert_eq!(lexer.errors().len(), 2);
        assert_eq!(lexer.errors()[0].kind(), LexErrorKind::ReadingToken);
        assert!(lexer.errors()[0]
            .token_types()
            .contains(&TokenType::String.as_u32()));
        // the scan resynchronized after the break
        assert!(types(&mut lexer).contains(&TokenType::Newline));
    }

    #[test]
    fn scientific_number_is_one_token() {
        let mut lexer = lex("3.14e-2");
        assert_eq!(
            texts(&mut lexer),
            [
                (TokenType::Number, "3.14e-2".to_owned()),
                (TokenType::TokenEof, String::new()),
            ]
        );
    }

    #[test]
    fn leading_zero_splits_under_maximal_munch() {
        let mut lexer = lex("0123");
        assert_eq!(
            texts(&mut lexer),
            [
                (TokenType::Number, "0".to_owned()),
                (TokenType::Number, "123".to_owned()),
                (TokenType::TokenEof, String::new()),
            ]
        );
    }

    #[test]
    fn two_byte_operators_win_over_prefixes() {
        let mut lexer = lex("<=");
        assert_eq!(types(&mut lexer), [TokenType::OpLe, TokenType::TokenEof]);

        let mut lexer = lex("<");
        assert_eq!(types(&mut lexer), [TokenType::OpLt, TokenType::TokenEof]);

        let mut lexer = lex("a->b");
        assert_eq!(
            types(&mut lexer),
            [
                TokenType::Symbol,
                TokenType::Arrow,
                TokenType::Symbol,
                TokenType::TokenEof
            ]
        );

        let mut lexer = lex("a-b");
        assert_eq!(
            types(&mut lexer),
            [
                TokenType::Symbol,
                TokenType::OpSub,
                TokenType::Symbol,
                TokenType::TokenEof
            ]
        );
    }

    #[test]
    fn invalid_character_is_reported_and_skipped() {
        let mut lexer = lex("a @ b");
        assert_eq!(
            types(&mut lexer),
            [TokenType::Symbol, TokenType::Symbol, TokenType::TokenEof]
        );
        assert_eq!(lexer.errors().len(), 1);
        assert_eq!(lexer.errors()[0].kind(), LexErrorKind::InvalidChar);
        assert_eq!(lexer.errors()[0].line_number(), 0);
    }

    #[test]
    fn clean_eof_between_tokens() {
        let mut lexer = lex("a ");
        assert_eq!(types(&mut lexer), [TokenType::Symbol, TokenType::TokenEof]);
        assert!(lexer.errors().is_empty());

        let mut lexer = lex("");
        assert_eq!(types(&mut lexer), [TokenType::TokenEof]);
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn tracks_lines_and_columns() {
        let lexer = lex("int a;\nint b;");
        assert_eq!(lexer.source_line(0), "int a;");
        assert_eq!(lexer.source_line(1), "int b;");
        assert!(lexer.stopped());
    }

    #[test]
    fn feed_reader_consumes_everything() {
        let mut lexer = Lexer::new();
        lexer.feed_reader(&b"if (a) { b; }"[..]).unwrap();
        let tokens = types(&mut lexer);
        assert_eq!(
            tokens,
            [
                TokenType::If,
                TokenType::LParen,
                TokenType::Symbol,
                TokenType::RParen,
                TokenType::LBrace,
                TokenType::Symbol,
                TokenType::Semicolon,
                TokenType::RBrace,
                TokenType::TokenEof
            ]
        );
    }

    #[test]
    fn drain_into_interns() {
        let mut lexer = lex("x = 1;");
        let mut storage = TokenStorage::new();
        lexer.drain_into(&mut storage);

        assert_eq!(lexer.token_count(), 0);
        assert_eq!(storage.len(), 5);
        assert_eq!(storage[0].ty, TokenType::Symbol);
        assert_eq!(storage.symbol_at(storage[0].seman), Some("x"));
        assert_eq!(storage[2].ty, TokenType::Number);
        assert_eq!(storage.number_at(storage[2].seman), Some("1"));
    }
}
