//! Context-free grammar storage and LL(1) analysis.
//!
//! A [`Grammar`] accumulates productions and answers the classic questions
//! about them: which non-terminals derive the empty string, FIRST and FOLLOW
//! sets, SELECT sets per production, and the LL(1) table built from those.
//! The derived sets are computed on demand, memoized, and invalidated by any
//! further [`Grammar::add_production`].

mod symbol;

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};

use hashbrown::{HashMap, HashSet};

pub use symbol::Symbol;

/// One production `lhs -> rhs`. An empty `rhs` is the epsilon production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    lhs: Symbol,
    rhs: Vec<Symbol>,
}

impl Production {
    pub fn lhs(&self) -> Symbol {
        self.lhs
    }

    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }
}

/// The LL(1) table: non-terminal to lookahead terminal to right-hand side.
pub type LlMap = BTreeMap<Symbol, BTreeMap<Symbol, Vec<Symbol>>>;

#[derive(Debug)]
pub struct Grammar {
    start: Symbol,
    symbols: BTreeSet<Symbol>,
    non_terminals: BTreeSet<Symbol>,
    /// Per-non-terminal alternative sets, for duplicate rejection.
    alternatives: HashMap<Symbol, HashSet<Vec<Symbol>>>,
    /// All productions, in insertion order.
    productions: Vec<Production>,

    empty_symbols: OnceCell<BTreeSet<Symbol>>,
    first_sets: OnceCell<BTreeMap<Symbol, BTreeSet<Symbol>>>,
    follow_sets: OnceCell<BTreeMap<Symbol, BTreeSet<Symbol>>>,
}

impl Grammar {
    pub fn new(start: Symbol) -> Self {
        Self {
            start,
            symbols: BTreeSet::from([start]),
            non_terminals: BTreeSet::new(),
            alternatives: HashMap::new(),
            productions: Vec::new(),
            empty_symbols: OnceCell::new(),
            first_sets: OnceCell::new(),
            follow_sets: OnceCell::new(),
        }
    }

    /// Records `lhs -> rhs` unless that exact production is already present.
    /// Invalidates every derived set.
    pub fn add_production(&mut self, lhs: Symbol, rhs: impl IntoIterator<Item = Symbol>) {
        self.empty_symbols = OnceCell::new();
        self.first_sets = OnceCell::new();
        self.follow_sets = OnceCell::new();

        let rhs: Vec<Symbol> = rhs.into_iter().collect();
        self.symbols.insert(lhs);
        self.non_terminals.insert(lhs);
        self.symbols.extend(rhs.iter().copied());

        if self.alternatives.entry(lhs).or_default().insert(rhs.clone()) {
            self.productions.push(Production { lhs, rhs });
        }
    }

    pub fn start(&self) -> Symbol {
        self.start
    }

    pub fn symbols(&self) -> &BTreeSet<Symbol> {
        &self.symbols
    }

    /// The symbols that appear on some production's left-hand side.
    pub fn non_terminals(&self) -> &BTreeSet<Symbol> {
        &self.non_terminals
    }

    pub fn is_non_terminal(&self, s: Symbol) -> bool {
        self.non_terminals.contains(&s)
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    /// The non-terminals that derive the empty string. Fixpoint iteration: a
    /// non-terminal joins the set once some alternative consists only of
    /// members (or is itself empty).
    pub fn empty_symbols(&self) -> &BTreeSet<Symbol> {
        self.empty_symbols.get_or_init(|| {
            let mut empty: BTreeSet<Symbol> = BTreeSet::new();
            loop {
                let mut changed = false;
                for p in &self.productions {
                    if empty.contains(&p.lhs) {
                        continue;
                    }
                    if p.rhs.iter().all(|s| empty.contains(s)) {
                        empty.insert(p.lhs);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }
            empty
        })
    }

    fn first_sets(&self) -> &BTreeMap<Symbol, BTreeSet<Symbol>> {
        self.first_sets.get_or_init(|| {
            let empty = self.empty_symbols();

            let mut table: BTreeMap<Symbol, BTreeSet<Symbol>> = BTreeMap::new();
            for &s in &self.symbols {
                if self.non_terminals.contains(&s) {
                    let mut set = BTreeSet::new();
                    if empty.contains(&s) {
                        set.insert(Symbol::EPS);
                    }
                    table.insert(s, set);
                } else {
                    table.insert(s, BTreeSet::from([s]));
                }
            }

            loop {
                let mut changed = false;
                for p in &self.productions {
                    let mut gained = BTreeSet::new();
                    for s in &p.rhs {
                        let first = &table[s];
                        gained.extend(first.iter().copied().filter(|f| !f.is_eps()));
                        if !first.contains(&Symbol::EPS) {
                            break;
                        }
                    }
                    let target = table.get_mut(&p.lhs).unwrap();
                    let before = target.len();
                    target.extend(gained);
                    changed |= target.len() != before;
                }
                if !changed {
                    break;
                }
            }

            table
        })
    }

    /// FIRST of a single symbol. For a terminal this is the symbol itself;
    /// EPS is a member exactly when the symbol derives the empty string.
    pub fn first(&self, s: Symbol) -> &BTreeSet<Symbol> {
        self.first_sets()
            .get(&s)
            .expect("first set queried for a symbol the grammar never saw")
    }

    /// FIRST of a sentence. FIRST of the empty sentence is `{EPS}`.
    pub fn first_of(&self, sentence: &[Symbol]) -> BTreeSet<Symbol> {
        let mut first = BTreeSet::from([Symbol::EPS]);
        for &s in sentence {
            if !first.remove(&Symbol::EPS) {
                break;
            }
            first.extend(self.first(s).iter().copied());
        }
        first
    }

    fn follow_sets(&self) -> &BTreeMap<Symbol, BTreeSet<Symbol>> {
        self.follow_sets.get_or_init(|| {
            let mut table: BTreeMap<Symbol, BTreeSet<Symbol>> = self
                .non_terminals
                .iter()
                .map(|&nt| (nt, BTreeSet::new()))
                .collect();
            // EPS doubles as the end-of-input marker
            table.entry(self.start).or_default().insert(Symbol::EPS);

            loop {
                let mut changed = false;
                for p in &self.productions {
                    for (i, &s) in p.rhs.iter().enumerate() {
                        if !self.non_terminals.contains(&s) {
                            continue;
                        }
                        let mut tail_first = self.first_of(&p.rhs[i + 1..]);
                        let tail_can_vanish = tail_first.remove(&Symbol::EPS);
                        let inherited: Vec<Symbol> = if tail_can_vanish {
                            table[&p.lhs].iter().copied().collect()
                        } else {
                            Vec::new()
                        };

                        let target = table.get_mut(&s).unwrap();
                        let before = target.len();
                        target.extend(tail_first);
                        target.extend(inherited);
                        changed |= target.len() != before;
                    }
                }
                if !changed {
                    break;
                }
            }

            table
        })
    }

    /// FOLLOW of a non-terminal.
    pub fn follow(&self, s: Symbol) -> &BTreeSet<Symbol> {
        self.follow_sets()
            .get(&s)
            .expect("follow set queried for a symbol that is not a non-terminal")
    }

    /// SELECT of a production: FIRST of the right-hand side, with EPS traded
    /// for FOLLOW of the left-hand side when the right-hand side can vanish.
    pub fn select(&self, production: &Production) -> BTreeSet<Symbol> {
        let mut set = self.first_of(&production.rhs);
        if set.remove(&Symbol::EPS) {
            set.extend(self.follow(production.lhs).iter().copied());
        }
        set
    }

    /// Builds the LL(1) table. When two productions compete for a cell the
    /// later one wins, which is also what resolves the dangling-else
    /// ambiguity in favor of the nearest `if`.
    pub fn ll_map(&self) -> LlMap {
        let mut map: LlMap = BTreeMap::new();
        for p in &self.productions {
            let row = map.entry(p.lhs).or_default();
            for terminal in self.select(p) {
                if let Some(prev) = row.insert(terminal, p.rhs.clone()) {
                    if prev != p.rhs {
                        tracing::warn!(
                            non_terminal = p.lhs.as_u32(),
                            terminal = terminal.as_u32(),
                            "LL(1) cell overwritten, keeping the later production"
                        );
                    }
                }
            }
        }
        map
    }

    /// The (non-terminal, terminal) cells claimed by more than one distinct
    /// right-hand side. Empty exactly when the grammar is LL(1).
    pub fn ll_conflicts(&self) -> BTreeSet<(Symbol, Symbol)> {
        let mut seen: HashMap<(Symbol, Symbol), &[Symbol]> = HashMap::new();
        let mut conflicts = BTreeSet::new();
        for p in &self.productions {
            for terminal in self.select(p) {
                if let Some(prev) = seen.insert((p.lhs, terminal), &p.rhs) {
                    if prev != p.rhs.as_slice() {
                        conflicts.insert((p.lhs, terminal));
                    }
                }
            }
        }
        conflicts
    }
}
