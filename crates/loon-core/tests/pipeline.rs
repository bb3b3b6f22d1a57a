//! Whole-pipeline tests: scan a source string, intern the tokens, run the
//! predictive parse, and inspect the tree and the serialized outputs.

use loon_core::lang::{self, symbols};
use loon_core::parser::NodeId;
use loon_core::prelude::*;

fn tokenize(src: &str) -> (Lexer, TokenStorage) {
    let mut lexer = Lexer::new();
    lexer.feed_bytes(src);
    lexer.eof();
    assert!(
        lexer.errors().is_empty(),
        "unexpected lexer errors in {src:?}"
    );
    let mut storage = TokenStorage::new();
    lexer.drain_into(&mut storage);
    (lexer, storage)
}

fn parse_source(src: &str) -> (TokenStorage, SyntaxTree) {
    let (_, storage) = tokenize(src);
    let tree = parse(&lang::grammar(), &storage).expect("source should parse");
    (storage, tree)
}

/// Depth-first search for the first descendant carrying `symbol`.
fn find_descendant(tree: &SyntaxTree, node: NodeId, symbol: Symbol) -> Option<NodeId> {
    if tree.symbol(node) == symbol {
        return Some(node);
    }
    tree.children(node)
        .iter()
        .find_map(|&c| find_descendant(tree, c, symbol))
}

#[test]
fn fn_definition_with_empty_parameter_list() {
    let (storage, tree) = parse_source("fn main() -> int { return 0; }");

    let root = tree.root();
    assert_eq!(tree.symbol(root), symbols::PROGRAM);

    let part = tree.child(root, 0).unwrap();
    assert_eq!(tree.symbol(part), symbols::PROGRAM_PART);
    let fndef = tree.child(part, 0).unwrap();
    assert_eq!(tree.symbol(fndef), symbols::FNDEF);
    assert_eq!(tree.child_count(fndef), 8);

    // the parameter list is empty
    let params = tree.find_child(fndef, symbols::VIRTVARDEFS).unwrap();
    assert_eq!(tree.child_count(params), 0);

    // body: { STMTS } holding a single return statement
    let body = tree.find_child(fndef, symbols::STMT).unwrap();
    let stmts = tree.find_child(body, symbols::STMTS).unwrap();
    let ret = tree.child(stmts, 0).unwrap();
    assert!(tree
        .find_child(ret, Symbol::from(TokenType::Return))
        .is_some());

    let expr = tree.find_child(ret, symbols::EXPR).unwrap();
    let literal = find_descendant(&tree, expr, symbols::LITERAL).unwrap();
    let number = tree.child(literal, 0).unwrap();
    let token = tree.token(number).unwrap();
    assert_eq!(token.ty, TokenType::Number);
    assert_eq!(storage.number_at(token.seman), Some("0"));
}

#[test]
fn top_level_variable_definitions() {
    let (_, tree) = parse_source("int a; int b;");

    let root = tree.root();
    let first = tree.child(root, 0).unwrap();
    assert_eq!(tree.symbol(first), symbols::PROGRAM_PART);

    let rest = tree.child(root, 1).unwrap();
    assert_eq!(tree.symbol(rest), symbols::PROGRAM);
    let second = tree.child(rest, 0).unwrap();
    assert_eq!(tree.symbol(second), symbols::PROGRAM_PART);

    // both are variable definitions
    for part in [first, second] {
        assert!(tree.find_child(part, symbols::VARDEF).is_some());
    }
}

#[test]
fn if_with_populated_else_clause() {
    let (_, tree) =
        parse_source("fn f() -> int { if (a < b) { a = b; } else { b = a; } }");

    let ifstmt = find_descendant(&tree, tree.root(), symbols::IFSTMT).unwrap();
    assert_eq!(tree.child_count(ifstmt), 6);

    let less = find_descendant(&tree, ifstmt, Symbol::from(TokenType::OpLt));
    assert!(less.is_some());

    let else_clause = tree.find_child(ifstmt, symbols::ELSECLAUSE).unwrap();
    assert_eq!(tree.child_count(else_clause), 2);
    assert_eq!(
        tree.symbol(tree.child(else_clause, 0).unwrap()),
        Symbol::from(TokenType::Else)
    );
}

#[test]
fn else_binds_to_the_nearest_if() {
    let (_, tree) =
        parse_source("fn f() -> int { if (a) if (b) { x = a; } else { x = b; } }");

    let outer = find_descendant(&tree, tree.root(), symbols::IFSTMT).unwrap();
    let outer_else = tree.find_child(outer, symbols::ELSECLAUSE).unwrap();

    let inner = find_descendant(&tree, tree.find_child(outer, symbols::STMT).unwrap(), symbols::IFSTMT).unwrap();
    let inner_else = tree.find_child(inner, symbols::ELSECLAUSE).unwrap();

    assert_eq!(tree.child_count(inner_else), 2);
    assert_eq!(tree.child_count(outer_else), 0);
}

#[test]
fn newlines_and_comments_are_transparent_to_the_parser() {
    let src = "\
// globals
int g;

fn main() -> int {
    int x;
    x = add(1, 2.5e1); /* call with
                          two arguments */
    while (x < 10) { x = x + 1; }
    if (x >= 10) { return x; } else { return 0; }
}

fn add(int a, int b) -> int {
    return a + b;
}
";
    let (storage, tree) = parse_source(src);

    assert!(find_descendant(&tree, tree.root(), symbols::WHILESTMT).is_some());
    assert!(find_descendant(&tree, tree.root(), symbols::FNDEF).is_some());

    // interned once each
    assert_eq!(storage.number_at(0), Some("1"));
    assert_eq!(storage.number_at(1), Some("2.5e1"));
}

#[test]
fn parse_error_carries_a_position() {
    let (_, storage) = tokenize("int a;\nint 5;");
    let err = parse(&lang::grammar(), &storage).unwrap_err();

    // the NUMBER where a SYMBOL was expected, second line, one token in
    assert_eq!(err.line, 1);
    assert_eq!(err.token_in_line, 1);
}

#[test]
fn serialized_output_shape() {
    let (storage, tree) = parse_source("int a;");

    let mut out = Vec::new();
    storage.serialize_to(&mut out).unwrap();
    tree.serialize_to(&mut out, &lang::symbol_name).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("10(INT)         ^"));
    assert!(text.contains("12(SYMBOL)      0"));
    assert!(text.contains("0      a"));

    let tree_dump = "PROGRAM\n\
                     |PROGRAM_PART\n\
                     ||VARDEF\n\
                     |||TYPE\n\
                     ||||INT with token seman -1\n\
                     |||SYMBOL with token seman 0\n\
                     ||SEMICOLON with token seman -1\n\
                     |PROGRAM\n";
    assert!(text.ends_with(tree_dump));
}

#[test]
fn scanner_and_storage_survive_error_free_reuse() {
    // the scanner automaton is shared: a second lexer must see the same
    // behavior as the first
    let (_, first) = tokenize("int a;");
    let (_, second) = tokenize("int a;");
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a, b);
    }
}
