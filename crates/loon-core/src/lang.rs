//! The Loon language: its grammar and symbol names.
//!
//! Token patterns live on [`TokenType`](crate::token::TokenType); this module
//! contributes the non-terminal symbols and the production set. Expressions
//! are encoded as a precedence ladder of `L_N / L_N_P` pairs so the grammar
//! stays LL(1) without left recursion.

use crate::grammar::{Grammar, Symbol};
use crate::token::TokenType;

/// The non-terminal symbols, allocated from 256 so they never collide with
/// byte values or token types.
pub mod symbols {
    use crate::grammar::Symbol;

    macro_rules! symdef {
        ($($name:ident = $value:literal;)*) => {
            $(pub const $name: Symbol = Symbol::from_u32($value);)*

            pub(super) fn name(s: Symbol) -> Option<&'static str> {
                match s.as_u32() {
                    $($value => Some(stringify!($name)),)*
                    _ => None,
                }
            }
        };
    }

    symdef! {
        LITERAL       = 256;
        SINGLE_EXPR   = 257;
        L5_EXPR       = 258;
        L4_EXPR_P     = 259;
        L4_EXPR       = 260;
        L3_EXPR_P     = 261;
        L3_EXPR       = 262;
        L2_EXPR_P     = 263;
        L2_EXPR       = 264;
        L1_EXPR_P     = 265;
        L1_EXPR       = 266;
        EXPR          = 267;
        SYM_OR_FCAL   = 268;
        ARGS_E        = 269;
        COMMA_SEP_E   = 270;
        COMMA_SEP     = 271;
        COMMA_SEP_P   = 272;
        VARDEF        = 273;
        STMT          = 274;
        STMTS         = 275;
        IFSTMT        = 276;
        ELSECLAUSE    = 277;
        WHILESTMT     = 278;
        FNDEF         = 279;
        VIRTVARDEFS   = 280;
        VIRTVARDEFS_P = 281;
        PROGRAM_PART  = 282;
        PROGRAM       = 283;
        UNARY_OP      = 284;
        BI_OP4        = 285;
        BI_OP3        = 286;
        BI_OP2        = 287;
        BI_OP1        = 288;
        TYPE          = 289;
    }
}

/// Display name for any grammar symbol: non-terminal names, token type names,
/// or the raw value as a fallback.
pub fn symbol_name(s: Symbol) -> String {
    if let Some(name) = symbols::name(s) {
        return name.to_owned();
    }
    if let Some(ty) = s.token_type() {
        return ty.name().to_owned();
    }
    format!("SYM{s}")
}

fn t(ty: TokenType) -> Symbol {
    Symbol::from(ty)
}

/// Builds the Loon grammar. The start symbol is PROGRAM.
pub fn grammar() -> Grammar {
    use crate::token::TokenType as T;
    use symbols::*;

    const EMPTY: [Symbol; 0] = [];

    let mut g = Grammar::new(PROGRAM);

    g.add_production(LITERAL, [t(T::Number)]);
    g.add_production(LITERAL, [t(T::String)]);
    g.add_production(UNARY_OP, [t(T::OpNot)]);
    g.add_production(UNARY_OP, [t(T::OpSub)]);
    g.add_production(UNARY_OP, [t(T::OpPlus)]);
    g.add_production(BI_OP4, [t(T::OpMul)]);
    g.add_production(BI_OP4, [t(T::OpDiv)]);
    g.add_production(BI_OP4, [t(T::OpMod)]);
    g.add_production(BI_OP3, [t(T::OpPlus)]);
    g.add_production(BI_OP3, [t(T::OpSub)]);
    g.add_production(BI_OP2, [t(T::OpGt)]);
    g.add_production(BI_OP2, [t(T::OpGe)]);
    g.add_production(BI_OP2, [t(T::OpLt)]);
    g.add_production(BI_OP2, [t(T::OpLe)]);
    g.add_production(BI_OP2, [t(T::OpNeq)]);
    g.add_production(BI_OP2, [t(T::OpEqu)]);
    g.add_production(BI_OP1, [t(T::OpAnd)]);
    g.add_production(BI_OP1, [t(T::OpOr)]);
    g.add_production(TYPE, [t(T::Int)]);
    g.add_production(TYPE, [t(T::Float)]);
    g.add_production(TYPE, [t(T::Char)]);

    g.add_production(SINGLE_EXPR, [LITERAL]);
    g.add_production(SINGLE_EXPR, [SYM_OR_FCAL]);
    g.add_production(SINGLE_EXPR, [t(T::LParen), EXPR, t(T::RParen)]);

    g.add_production(L5_EXPR, [SINGLE_EXPR]);
    g.add_production(L5_EXPR, [UNARY_OP, SINGLE_EXPR]);

    g.add_production(L4_EXPR_P, EMPTY);
    g.add_production(L4_EXPR_P, [BI_OP4, L4_EXPR]);
    g.add_production(L4_EXPR, [L5_EXPR, L4_EXPR_P]);

    g.add_production(L3_EXPR_P, EMPTY);
    g.add_production(L3_EXPR_P, [BI_OP3, L3_EXPR]);
    g.add_production(L3_EXPR, [L4_EXPR, L3_EXPR_P]);

    g.add_production(L2_EXPR_P, EMPTY);
    g.add_production(L2_EXPR_P, [BI_OP2, L2_EXPR]);
    g.add_production(L2_EXPR, [L3_EXPR, L2_EXPR_P]);

    g.add_production(L1_EXPR_P, EMPTY);
    g.add_production(L1_EXPR_P, [BI_OP1, L1_EXPR]);
    g.add_production(L1_EXPR, [L2_EXPR, L1_EXPR_P]);

    g.add_production(EXPR, [L1_EXPR]);

    g.add_production(SYM_OR_FCAL, [t(T::Symbol), ARGS_E]);

    g.add_production(ARGS_E, EMPTY);
    g.add_production(ARGS_E, [t(T::LParen), COMMA_SEP_E, t(T::RParen)]);

    g.add_production(COMMA_SEP_E, EMPTY);
    g.add_production(COMMA_SEP_E, [COMMA_SEP]);

    g.add_production(COMMA_SEP, [EXPR, COMMA_SEP_P]);
    g.add_production(COMMA_SEP_P, [t(T::Comma), COMMA_SEP]);

    g.add_production(VARDEF, [TYPE, t(T::Symbol)]);

    g.add_production(STMT, [VARDEF, t(T::Semicolon)]);
    g.add_production(
        STMT,
        [t(T::Symbol), t(T::Assign), EXPR, t(T::Semicolon)],
    );
    g.add_production(STMT, [t(T::LBrace), STMTS, t(T::RBrace)]);
    g.add_production(STMT, [IFSTMT]);
    g.add_production(STMT, [WHILESTMT]);
    g.add_production(STMT, [t(T::Return), EXPR, t(T::Semicolon)]);
    g.add_production(STMT, [t(T::Break), t(T::Semicolon)]);
    g.add_production(STMT, [t(T::Continue), t(T::Semicolon)]);

    g.add_production(STMTS, EMPTY);
    g.add_production(STMTS, [STMT, STMTS]);

    g.add_production(
        IFSTMT,
        [
            t(T::If),
            t(T::LParen),
            EXPR,
            t(T::RParen),
            STMT,
            ELSECLAUSE,
        ],
    );
    g.add_production(ELSECLAUSE, EMPTY);
    g.add_production(ELSECLAUSE, [t(T::Else), STMT]);

    g.add_production(
        WHILESTMT,
        [t(T::While), t(T::LParen), EXPR, t(T::RParen), STMT],
    );

    g.add_production(
        FNDEF,
        [
            t(T::Fn),
            t(T::Symbol),
            t(T::LParen),
            VIRTVARDEFS,
            t(T::RParen),
            t(T::Arrow),
            TYPE,
            STMT,
        ],
    );
    g.add_production(VIRTVARDEFS, [VARDEF, VIRTVARDEFS_P]);
    g.add_production(VIRTVARDEFS_P, EMPTY);
    g.add_production(VIRTVARDEFS_P, [t(T::Comma), VIRTVARDEFS]);

    g.add_production(PROGRAM_PART, [VARDEF, t(T::Semicolon)]);
    g.add_production(PROGRAM_PART, [FNDEF]);

    g.add_production(PROGRAM, EMPTY);
    g.add_production(PROGRAM, [PROGRAM_PART, PROGRAM]);

    g
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use super::symbols::*;
    use super::*;

    #[test]
    fn start_symbol_and_names() {
        let g = grammar();
        assert_eq!(g.start(), PROGRAM);
        assert_eq!(symbol_name(PROGRAM), "PROGRAM");
        assert_eq!(symbol_name(L4_EXPR_P), "L4_EXPR_P");
        assert_eq!(symbol_name(t(TokenType::Semicolon)), "SEMICOLON");
        assert_eq!(symbol_name(Symbol::from_u32(9999)), "SYM9999");
    }

    #[test]
    fn empty_symbols() {
        let g = grammar();
        assert_eq!(
            g.empty_symbols(),
            &BTreeSet::from([
                L4_EXPR_P,
                L3_EXPR_P,
                L2_EXPR_P,
                L1_EXPR_P,
                ARGS_E,
                COMMA_SEP_E,
                STMTS,
                ELSECLAUSE,
                PROGRAM,
                VIRTVARDEFS_P,
            ])
        );
    }

    #[test]
    fn first_sets_of_the_ladder() {
        let g = grammar();

        let expr_first = BTreeSet::from([
            t(TokenType::OpNot),
            t(TokenType::OpSub),
            t(TokenType::OpPlus),
            t(TokenType::Number),
            t(TokenType::String),
            t(TokenType::Symbol),
            t(TokenType::LParen),
        ]);
        assert_eq!(g.first(EXPR), &expr_first);
        // every rung of the ladder starts with the same terminals
        for level in [L1_EXPR, L2_EXPR, L3_EXPR, L4_EXPR, L5_EXPR] {
            assert_eq!(g.first(level), &expr_first);
        }

        assert_eq!(
            g.first(TYPE),
            &BTreeSet::from([
                t(TokenType::Int),
                t(TokenType::Float),
                t(TokenType::Char)
            ])
        );
        assert!(!g.first(LITERAL).contains(&Symbol::EPS));
        assert!(g.first(STMTS).contains(&Symbol::EPS));
    }

    #[test]
    fn follow_sets_of_statements() {
        let g = grammar();

        // dangling else: STMT inside IFSTMT is followed by ELSE
        assert!(g.follow(STMT).contains(&t(TokenType::Else)));
        assert!(g.follow(STMT).contains(&t(TokenType::RBrace)));
        assert!(g.follow(STMTS).contains(&t(TokenType::RBrace)));
        assert!(g.follow(PROGRAM).contains(&Symbol::EPS));
        assert!(g.follow(VIRTVARDEFS).contains(&t(TokenType::RParen)));
        assert!(g.follow(ARGS_E).contains(&t(TokenType::RParen)));
    }

    #[test]
    fn select_sets_partition_statements() {
        let g = grammar();

        let mut stmt_selects = Vec::new();
        for p in g.productions().iter().filter(|p| p.lhs() == STMT) {
            stmt_selects.push(g.select(p));
        }
        // the eight STMT alternatives are pairwise disjoint
        for (i, a) in stmt_selects.iter().enumerate() {
            for b in stmt_selects.iter().skip(i + 1) {
                assert!(a.intersection(b).next().is_none());
            }
        }
    }

    #[test]
    fn the_only_conflict_is_the_dangling_else() {
        let g = grammar();
        assert_eq!(
            g.ll_conflicts(),
            BTreeSet::from([(ELSECLAUSE, t(TokenType::Else))])
        );

        // insertion order makes the else bind to the nearest if
        let ll = g.ll_map();
        assert_eq!(
            ll[&ELSECLAUSE][&t(TokenType::Else)],
            vec![t(TokenType::Else), STMT]
        );
    }

    #[test]
    fn table_drives_fn_definitions() {
        let g = grammar();
        let ll = g.ll_map();

        assert_eq!(ll[&PROGRAM_PART][&t(TokenType::Fn)], vec![FNDEF]);
        assert_eq!(
            ll[&PROGRAM_PART][&t(TokenType::Int)],
            vec![VARDEF, t(TokenType::Semicolon)]
        );
        // empty parameter lists rely on the missing-cell fallback
        assert!(!ll[&VIRTVARDEFS].contains_key(&t(TokenType::RParen)));
    }
}
