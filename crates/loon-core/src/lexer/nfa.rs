use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Write as _;

use hashbrown::HashMap;

use super::dfa::{display_byte, Dfa, StateId};

#[derive(Debug, Clone, Default)]
struct StateNode {
    /// Byte transitions. Multiple targets per byte are allowed.
    next: BTreeMap<u8, BTreeSet<StateId>>,
    eps: BTreeSet<StateId>,
    marks: BTreeSet<u32>,
}

/// An ordered set of single states, as produced by epsilon closures and
/// consumed by subset construction. Equality, ordering and hashing are
/// lexicographic on the member indices; the owning automaton is implicit.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateSet(BTreeSet<StateId>);

impl StateSet {
    pub fn contains(&self, s: StateId) -> bool {
        self.0.contains(&s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.0.iter().copied()
    }

    fn insert(&mut self, s: StateId) -> bool {
        self.0.insert(s)
    }
}

impl FromIterator<StateId> for StateSet {
    fn from_iter<I: IntoIterator<Item = StateId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Nondeterministic automaton over the byte alphabet, with epsilon edges and
/// per-state marks.
///
/// This is the assembly area of the regex pipeline: the Thompson combinators
/// ([`Nfa::connect`], [`Nfa::branch`], [`Nfa::make_repetitive`],
/// [`Nfa::make_skippable`]) graft automata together in place, and
/// [`Nfa::to_deterministic`] lowers the result via subset construction.
#[derive(Debug, Clone)]
pub struct Nfa {
    nodes: Vec<StateNode>,
    start: StateId,
    stops: BTreeSet<StateId>,
}

impl Default for Nfa {
    fn default() -> Self {
        Self::new()
    }
}

impl Nfa {
    /// A fresh automaton with a single start state.
    pub fn new() -> Self {
        Self {
            nodes: vec![StateNode::default()],
            start: 0,
            stops: BTreeSet::new(),
        }
    }

    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn add_state(&mut self) -> StateId {
        self.nodes.push(StateNode::default());
        self.nodes.len() - 1
    }

    /// Adds a byte transition. Additive: existing edges on the same byte are
    /// kept.
    pub fn add_jump(&mut self, from: StateId, byte: u8, to: StateId) {
        self.nodes[from].next.entry(byte).or_default().insert(to);
    }

    pub fn add_epsilon_jump(&mut self, from: StateId, to: StateId) {
        self.nodes[from].eps.insert(to);
    }

    fn contains_epsilon_jump(&self, from: StateId, to: StateId) -> bool {
        self.nodes[from].eps.contains(&to)
    }

    pub fn start_single_state(&self) -> StateId {
        self.start
    }

    /// The composite start state: the epsilon closure of the start single
    /// state.
    pub fn start_state(&self) -> StateSet {
        self.epsilon_closure([self.start])
    }

    /// The least superset of `init` closed under epsilon successors.
    pub fn epsilon_closure(&self, init: impl IntoIterator<Item = StateId>) -> StateSet {
        let mut closure: StateSet = init.into_iter().collect();
        let mut workset: Vec<StateId> = closure.iter().collect();
        while let Some(s) = workset.pop() {
            for &next in &self.nodes[s].eps {
                if closure.insert(next) {
                    workset.push(next);
                }
            }
        }
        closure
    }

    /// Epsilon closure of the union of byte successors over `set`.
    pub fn next_state(&self, set: &StateSet, byte: u8) -> StateSet {
        let mut successors = BTreeSet::new();
        for s in set.iter() {
            if let Some(targets) = self.nodes[s].next.get(&byte) {
                successors.extend(targets.iter().copied());
            }
        }
        self.epsilon_closure(successors)
    }

    /// The bytes on which any member of `set` has an outgoing edge.
    pub fn character_transitions(&self, set: &StateSet) -> BTreeSet<u8> {
        let mut bytes = BTreeSet::new();
        for s in set.iter() {
            bytes.extend(self.nodes[s].next.keys().copied());
        }
        bytes
    }

    pub fn set_stop_state(&mut self, s: StateId, stop: bool) {
        if stop {
            self.stops.insert(s);
        } else {
            self.stops.remove(&s);
        }
    }

    pub fn is_stop_state(&self, s: StateId) -> bool {
        self.stops.contains(&s)
    }

    /// True iff the composite contains any stop single state.
    pub fn is_stop_set(&self, set: &StateSet) -> bool {
        set.iter().any(|s| self.is_stop_state(s))
    }

    pub fn stop_states(&self) -> &BTreeSet<StateId> {
        &self.stops
    }

    pub fn add_state_mark(&mut self, s: StateId, mark: u32) {
        self.nodes[s].marks.insert(mark);
    }

    pub fn remove_state_mark(&mut self, s: StateId, mark: u32) {
        self.nodes[s].marks.remove(&mark);
    }

    pub fn set_state_marks(&mut self, s: StateId, marks: BTreeSet<u32>) {
        self.nodes[s].marks = marks;
    }

    pub fn state_marks(&self, s: StateId) -> &BTreeSet<u32> {
        &self.nodes[s].marks
    }

    /// Applies `mark` to every current stop state.
    pub fn add_stop_state_marks(&mut self, mark: u32) {
        for s in self.stops.clone() {
            self.add_state_mark(s, mark);
        }
    }

    /// Union of the marks of all members of `set`.
    pub fn set_marks(&self, set: &StateSet) -> BTreeSet<u32> {
        let mut marks = BTreeSet::new();
        for s in set.iter() {
            marks.extend(self.nodes[s].marks.iter().copied());
        }
        marks
    }

    /// Copies every state of `other` into `self` with all targets offset by
    /// the previous state count. Marks are carried over unchanged. Returns
    /// `other`'s start and stop states under the new numbering.
    fn import_automaton(&mut self, other: &Nfa) -> (StateId, BTreeSet<StateId>) {
        let bias = self.state_count();
        for node in &other.nodes {
            self.nodes.push(StateNode {
                next: node
                    .next
                    .iter()
                    .map(|(&b, targets)| (b, targets.iter().map(|t| t + bias).collect()))
                    .collect(),
                eps: node.eps.iter().map(|t| t + bias).collect(),
                marks: node.marks.clone(),
            });
        }

        let start = other.start + bias;
        let stops = other.stops.iter().map(|s| s + bias).collect();
        (start, stops)
    }

    /// Imports `other` as a branch reachable from `from` through an epsilon
    /// edge. `other`'s stop states become stop states of `self`.
    pub fn add_automaton(&mut self, from: StateId, other: &Nfa) {
        let (start, stops) = self.import_automaton(other);
        self.add_epsilon_jump(from, start);
        self.stops.extend(stops);
    }

    /// Collapses the stop set to a single state by adding a fresh state with
    /// epsilon edges from every old stop.
    fn unify_stop_states(&mut self) {
        if self.stops.len() <= 1 {
            return;
        }
        let unified = self.add_state();
        for s in std::mem::take(&mut self.stops) {
            self.add_epsilon_jump(s, unified);
        }
        self.stops.insert(unified);
    }

    /// `self+`: at least one repetition.
    pub fn make_repetitive(&mut self) {
        self.unify_stop_states();
        let Some(&stop) = self.stops.first() else {
            return;
        };
        if !self.contains_epsilon_jump(stop, self.start) {
            self.add_epsilon_jump(stop, self.start);
        }
    }

    /// `self?`: the whole automaton may be skipped.
    pub fn make_skippable(&mut self) {
        self.unify_stop_states();
        let Some(&stop) = self.stops.first() else {
            return;
        };
        if !self.contains_epsilon_jump(self.start, stop) {
            self.add_epsilon_jump(self.start, stop);
        }
    }

    /// `self other`: concatenation.
    pub fn connect(&mut self, other: &Nfa) {
        self.unify_stop_states();
        let stop = *self
            .stops
            .first()
            .expect("connecting an automaton with no stop state");
        self.stops.clear();
        self.add_automaton(stop, other);
    }

    /// `self | other`: alternation from the start state.
    pub fn branch(&mut self, other: &Nfa) {
        self.add_automaton(self.start, other);
    }

    /// Subset construction. Composite states become DFA states, breadth-first
    /// from the closure of the start state; each composite's mark union is
    /// copied onto its DFA state, and the result is minimized.
    pub fn to_deterministic(&self) -> Dfa {
        let mut dfa = Dfa::new();

        let start = self.start_state();
        let mut translate: HashMap<StateSet, StateId> = HashMap::new();
        translate.insert(start.clone(), dfa.start_state());

        let mut queue = VecDeque::new();
        queue.push_back(start);

        while let Some(set) = queue.pop_front() {
            let from = translate[&set];
            for byte in self.character_transitions(&set) {
                let next = self.next_state(&set, byte);
                let to = match translate.get(&next) {
                    Some(&id) => id,
                    None => {
                        let id = dfa.add_state();
                        dfa.set_stop_state(id, self.is_stop_set(&next));
                        translate.insert(next.clone(), id);
                        queue.push_back(next);
                        id
                    }
                };
                dfa.set_jump(from, byte, to);
            }
        }

        for (set, &state) in &translate {
            for mark in self.set_marks(set) {
                dfa.add_state_mark(state, mark);
            }
        }

        let subset_states = dfa.state_count();
        dfa.simplify();
        tracing::debug!(
            nfa_states = self.state_count(),
            subset_states,
            dfa_states = dfa.state_count(),
            "lowered NFA to minimized DFA"
        );

        dfa
    }

    /// Human-readable dump: one state per line with epsilon and byte
    /// transitions, then the stop states.
    pub fn serialize(&self) -> String {
        fn serialize_set(set: &BTreeSet<StateId>) -> String {
            match set.len() {
                0 => "{}".to_owned(),
                1 => set.first().unwrap().to_string(),
                _ => {
                    let items: Vec<String> = set.iter().map(|s| s.to_string()).collect();
                    format!("{{{}}}", items.join(","))
                }
            }
        }

        let mut out = String::new();
        for (s, node) in self.nodes.iter().enumerate() {
            let _ = write!(out, "STATE{s}: {{");
            let mut first = true;
            if !node.eps.is_empty() {
                let _ = write!(out, "EPS -> {}", serialize_set(&node.eps));
                first = false;
            }
            for (&b, targets) in &node.next {
                if !first {
                    out.push_str(", ");
                }
                let _ = write!(out, "{} -> {}", display_byte(b), serialize_set(targets));
                first = false;
            }
            out.push_str("}\n");
        }
        let _ = write!(out, "FINISH_STATES = {}", serialize_set(&self.stops));
        out.push('\n');
        out
    }
}
