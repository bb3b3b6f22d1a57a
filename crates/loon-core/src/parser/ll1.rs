//! Table-driven LL(1) parse driver.

use crate::grammar::{Grammar, Symbol};
use crate::parser::{NodeId, SyntaxTree};
use crate::token::{TokenStorage, TokenType};

/// Fatal predictive-parse failure: the token under the cursor did not match
/// the expected terminal. No recovery is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unexpected token at offset {token_offset} (line {line}, token {token_in_line})")]
pub struct ParseError {
    /// Absolute index into the token storage.
    pub token_offset: usize,
    /// Line the cursor was on, counted from the NEWLINE tokens seen.
    pub line: usize,
    /// How many tokens had already matched on that line.
    pub token_in_line: usize,
}

/// Runs a predictive parse of `tokens` against `grammar` and returns the full
/// parse tree.
///
/// The driver keeps an explicit stack of tree handles, seeded with a root
/// node for the start symbol. NEWLINE tokens are skipped at the cursor. A
/// popped terminal must match the cursor token, which is then stored into the
/// node. A popped non-terminal expands through the LL(1) table; its children
/// are pushed in reverse so they pop left-to-right. A missing table cell
/// expands to the empty sentence, so unmatched lookaheads surface as a
/// terminal mismatch later instead of failing at the non-terminal.
pub fn parse(grammar: &Grammar, tokens: &TokenStorage) -> Result<SyntaxTree, ParseError> {
    let ll = grammar.ll_map();

    let mut tree = SyntaxTree::new(grammar.start());
    let mut stack: Vec<NodeId> = vec![tree.root()];

    let mut cursor = 0usize;
    let mut line = 0usize;
    let mut token_in_line = 0usize;

    while let Some(node) = stack.pop() {
        while cursor < tokens.len() && tokens[cursor].ty == TokenType::Newline {
            cursor += 1;
            line += 1;
            token_in_line = 0;
        }

        let symbol = tree.symbol(node);

        if !grammar.is_non_terminal(symbol) {
            let matched = tokens
                .get(cursor)
                .is_some_and(|token| Symbol::from(token.ty) == symbol);
            if !matched {
                return Err(ParseError { token_offset: cursor, line, token_in_line });
            }
            tree.set_token(node, tokens[cursor]);
            cursor += 1;
            token_in_line += 1;
            continue;
        }

        let rhs: &[Symbol] = tokens
            .get(cursor)
            .and_then(|token| ll.get(&symbol)?.get(&Symbol::from(token.ty)))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        for &child_symbol in rhs {
            tree.add_child(node, child_symbol);
        }
        for &child in tree.children(node).iter().rev() {
            stack.push(child);
        }
    }

    Ok(tree)
}
