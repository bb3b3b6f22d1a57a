use std::fmt;
use std::io::{self, Write};

use hashbrown::HashMap;

/// The closed set of token types, with stable numeric identity.
///
/// The discriminant doubles as the token's scanner priority: when one lexeme
/// is accepted by several patterns at once, the smallest discriminant wins.
/// That is why every keyword sits before [`TokenType::Symbol`] and the fixed
/// operators keep their declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum TokenType {
    Comment = 0,
    Fn = 1,
    If = 2,
    Else = 3,
    For = 4,
    While = 5,
    Break = 6,
    Return = 7,
    Continue = 8,
    Float = 9,
    Int = 10,
    Char = 11,
    Symbol = 12,
    Number = 13,
    OpPlus = 14,
    OpSub = 15,
    OpMul = 16,
    OpDiv = 17,
    OpMod = 18,
    OpGt = 19,
    OpGe = 20,
    OpLt = 21,
    OpLe = 22,
    OpNeq = 23,
    OpEqu = 24,
    OpNot = 25,
    OpAnd = 26,
    OpOr = 27,
    Comma = 28,
    Assign = 29,
    LBracket = 30,
    RBracket = 31,
    LParen = 32,
    RParen = 33,
    LBrace = 34,
    RBrace = 35,
    Semicolon = 36,
    Dot = 37,
    Newline = 38,
    TokenEof = 39,
    String = 40,
    Arrow = 41,
}

impl TokenType {
    pub const COUNT: usize = 42;

    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        use TokenType::*;
        Some(match v {
            0 => Comment,
            1 => Fn,
            2 => If,
            3 => Else,
            4 => For,
            5 => While,
            6 => Break,
            7 => Return,
            8 => Continue,
            9 => Float,
            10 => Int,
            11 => Char,
            12 => Symbol,
            13 => Number,
            14 => OpPlus,
            15 => OpSub,
            16 => OpMul,
            17 => OpDiv,
            18 => OpMod,
            19 => OpGt,
            20 => OpGe,
            21 => OpLt,
            22 => OpLe,
            23 => OpNeq,
            24 => OpEqu,
            25 => OpNot,
            26 => OpAnd,
            27 => OpOr,
            28 => Comma,
            29 => Assign,
            30 => LBracket,
            31 => RBracket,
            32 => LParen,
            33 => RParen,
            34 => LBrace,
            35 => RBrace,
            36 => Semicolon,
            37 => Dot,
            38 => Newline,
            39 => TokenEof,
            40 => String,
            41 => Arrow,
            _ => return None,
        })
    }

    /// All token types in ascending numeric order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u32).map(|v| Self::from_u32(v).unwrap())
    }

    pub fn name(self) -> &'static str {
        use TokenType::*;
        match self {
            Comment => "COMMENT",
            Fn => "FN",
            If => "IF",
            Else => "ELSE",
            For => "FOR",
            While => "WHILE",
            Break => "BREAK",
            Return => "RETURN",
            Continue => "CONTINUE",
            Float => "FLOAT",
            Int => "INT",
            Char => "CHAR",
            Symbol => "SYMBOL",
            Number => "NUMBER",
            OpPlus => "OP_PLUS",
            OpSub => "OP_SUB",
            OpMul => "OP_MUL",
            OpDiv => "OP_DIV",
            OpMod => "OP_MOD",
            OpGt => "OP_GT",
            OpGe => "OP_GE",
            OpLt => "OP_LT",
            OpLe => "OP_LE",
            OpNeq => "OP_NEQ",
            OpEqu => "OP_EQU",
            OpNot => "OP_NOT",
            OpAnd => "OP_AND",
            OpOr => "OP_OR",
            Comma => "COMMA",
            Assign => "ASSIGN",
            LBracket => "LBRACKET",
            RBracket => "RBRACKET",
            LParen => "LPAREN",
            RParen => "RPAREN",
            LBrace => "LBRACE",
            RBrace => "RBRACE",
            Semicolon => "SEMICOLON",
            Dot => "DOT",
            Newline => "NEWLINE",
            TokenEof => "TOKEN_EOF",
            String => "STRING",
            Arrow => "ARROW",
        }
    }

    /// The scanner pattern for this token type, or `""` for types the scanner
    /// never produces from input (TOKEN_EOF).
    pub fn pattern(self) -> &'static str {
        use TokenType::*;
        match self {
            Comment => "//[^\r\n]*|/\\*([^*/]|\\*[^/]|[^*]/)*\\*/",
            Fn => "fn",
            If => "if",
            Else => "else",
            For => "for",
            While => "while",
            Break => "break",
            Return => "return",
            Continue => "continue",
            Float => "float",
            Int => "int",
            Char => "char",
            Symbol => "[_a-zA-Z][_a-zA-Z0-9]*",
            Number => "0|[1-9][0-9]*|(0|[1-9][0-9]*)?.[0-9]+([eE][-+]?[0-9]+)?",
            OpPlus => "\\+",
            OpSub => "-",
            OpMul => "\\*",
            OpDiv => "/",
            OpMod => "%",
            OpGt => ">",
            OpGe => ">=",
            OpLt => "<",
            OpLe => "<=",
            OpNeq => "!=",
            OpEqu => "==",
            OpNot => "!",
            OpAnd => "&&",
            OpOr => "\\|\\|",
            Comma => ",",
            Assign => "=",
            LBracket => "\\[",
            RBracket => "\\]",
            LParen => "\\(",
            RParen => "\\)",
            LBrace => "\\{",
            RBrace => "\\}",
            Semicolon => ";",
            Dot => "\\.",
            // both bare and paired line endings
            Newline => "\r|\n|\r\n",
            TokenEof => "",
            String => "\"\"|\"([^\"\r\n]|\\\\\")*[^\\\\]\"",
            Arrow => "->",
        }
    }
}

/// A token fresh out of the scanner, still carrying its lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub ty: TokenType,
    pub text: String,
}

impl RawToken {
    pub fn new(ty: TokenType, text: impl Into<String>) -> Self {
        Self { ty, text: text.into() }
    }
}

impl fmt::Display for RawToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = format!("TokenType: {} ({})", self.ty.as_u32(), self.ty.name());
        if self.ty == TokenType::Newline {
            return f.write_str(&head);
        }
        write!(f, "{head:<30}Content: {}", self.text)
    }
}

/// An interned token: the type plus the index of its lexeme in the matching
/// storage table, or `-1` for types without a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,
    pub seman: i32,
}

/// Interns SYMBOL, NUMBER and STRING lexemes and keeps the token stream in
/// arrival order. NEWLINE and TOKEN_EOF tokens pass through unfiltered; the
/// parser is the one that skips newlines.
#[derive(Debug, Default)]
pub struct TokenStorage {
    tokens: Vec<Token>,
    symbols: Vec<String>,
    numbers: Vec<String>,
    strings: Vec<String>,
    symbol_ids: HashMap<String, i32>,
    number_ids: HashMap<String, i32>,
    string_ids: HashMap<String, i32>,
}

fn intern(
    table: &mut Vec<String>,
    ids: &mut HashMap<String, i32>,
    text: String,
) -> i32 {
    if let Some(&id) = ids.get(&text) {
        return id;
    }
    let id = table.len() as i32;
    ids.insert(text.clone(), id);
    table.push(text);
    id
}

impl TokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_token(&mut self, raw: RawToken) {
        let seman = match raw.ty {
            TokenType::Symbol => intern(&mut self.symbols, &mut self.symbol_ids, raw.text),
            TokenType::Number => intern(&mut self.numbers, &mut self.number_ids, raw.text),
            TokenType::String => intern(&mut self.strings, &mut self.string_ids, raw.text),
            _ => -1,
        };
        self.tokens.push(Token { ty: raw.ty, seman });
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Token> {
        self.tokens.get(idx).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Token> + '_ {
        self.tokens.iter().copied()
    }

    pub fn symbol_at(&self, id: i32) -> Option<&str> {
        self.symbols.get(usize::try_from(id).ok()?).map(|s| s.as_str())
    }

    pub fn number_at(&self, id: i32) -> Option<&str> {
        self.numbers.get(usize::try_from(id).ok()?).map(|s| s.as_str())
    }

    pub fn string_at(&self, id: i32) -> Option<&str> {
        self.strings.get(usize::try_from(id).ok()?).map(|s| s.as_str())
    }

    /// Writes the token list and the symbol and number tables in fixed-column
    /// text.
    pub fn serialize_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "Tokens >--------------------")?;
        writeln!(w, "Type            Seman")?;
        for token in &self.tokens {
            let mut line = token.ty.as_u32().to_string();
            while line.len() < 2 {
                line.push(' ');
            }
            line.push('(');
            line.push_str(token.ty.name());
            line.push(')');
            while line.len() < 16 {
                line.push(' ');
            }
            if token.seman == -1 {
                line.push('^');
            } else {
                line.push_str(&token.seman.to_string());
            }
            writeln!(w, "{line}")?;
        }
        writeln!(w)?;

        for (title, table) in [("Symbols", &self.symbols), ("Numbers", &self.numbers)] {
            writeln!(w, "{title} >-------------------")?;
            writeln!(w, "Index  Value")?;
            for (i, value) in table.iter().enumerate() {
                let mut line = i.to_string();
                while line.len() < 7 {
                    line.push(' ');
                }
                line.push_str(value);
                writeln!(w, "{line}")?;
            }
            writeln!(w)?;
        }

        Ok(())
    }
}

impl std::ops::Index<usize> for TokenStorage {
    type Output = Token;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.tokens[idx]
    }
}
