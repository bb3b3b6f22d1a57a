use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use hashbrown::HashMap;

pub type StateId = usize;

/// Renders a byte for automaton dumps: printable ASCII as `'x'`, everything
/// else as `'\xHH'`.
pub(crate) fn display_byte(b: u8) -> String {
    if b.is_ascii_graphic() || b == b' ' {
        format!("'{}'", b as char)
    } else {
        format!("'\\x{b:02X}'")
    }
}

/// Deterministic automaton over the byte alphabet.
///
/// States are dense indices. Transitions are partial: a missing edge steps to
/// [`Dfa::REJECT`], and stepping from `REJECT` stays in `REJECT`. Every state
/// carries a set of integer marks placed there by the automaton's producer;
/// marks survive [`Dfa::simplify`] because states with different mark sets are
/// never merged.
#[derive(Debug, Clone, Default)]
pub struct Dfa {
    transitions: Vec<BTreeMap<u8, StateId>>,
    marks: Vec<BTreeSet<u32>>,
    start: StateId,
    stops: BTreeSet<StateId>,
}

impl Dfa {
    /// The dead-state sentinel. Not a valid state index.
    pub const REJECT: StateId = usize::MAX;

    /// A fresh automaton with a single start state and no transitions.
    pub fn new() -> Self {
        Self {
            transitions: vec![BTreeMap::new()],
            marks: vec![BTreeSet::new()],
            start: 0,
            stops: BTreeSet::new(),
        }
    }

    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn start_state(&self) -> StateId {
        self.start
    }

    pub fn add_state(&mut self) -> StateId {
        self.transitions.push(BTreeMap::new());
        self.marks.push(BTreeSet::new());
        self.transitions.len() - 1
    }

    pub fn set_jump(&mut self, from: StateId, byte: u8, to: StateId) {
        debug_assert!(from < self.state_count() && to < self.state_count());
        self.transitions[from].insert(byte, to);
    }

    /// Steps the automaton. `REJECT` is absorbing.
    pub fn next_state(&self, from: StateId, byte: u8) -> StateId {
        if from == Self::REJECT {
            return Self::REJECT;
        }
        self.transitions[from].get(&byte).copied().unwrap_or(Self::REJECT)
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

    pub fn stop_states(&self) -> &BTreeSet<StateId> {
        &self.stops
    }

    pub fn add_state_mark(&mut self, s: StateId, mark: u32) {
        self.marks[s].insert(mark);
    }

    pub fn remove_state_mark(&mut self, s: StateId, mark: u32) {
        self.marks[s].remove(&mark);
    }

    pub fn clear_state_marks(&mut self, s: StateId) {
        self.marks[s].clear();
    }

    pub fn state_marks(&self, s: StateId) -> &BTreeSet<u32> {
        &self.marks[s]
    }

    /// Copies every state of `other` into `self`, offsetting all transition
    /// targets by the previous state count. Returns `other`'s start state and
    /// stop states under the new numbering. `self`'s own stop set is left
    /// untouched.
    pub fn import_automaton(&mut self, other: &Dfa) -> (StateId, BTreeSet<StateId>) {
        let bias = self.state_count();
        for table in &other.transitions {
            self.transitions
                .push(table.iter().map(|(&b, &t)| (b, t + bias)).collect());
        }
        self.marks.extend(other.marks.iter().cloned());

        let start = other.start + bias;
        let stops = other.stops.iter().map(|s| s + bias).collect();
        (start, stops)
    }

    /// Runs the automaton over `input` from the start state.
    pub fn walk(&self, input: &[u8]) -> StateId {
        input
            .iter()
            .fold(self.start, |s, &b| self.next_state(s, b))
    }

    pub fn accepts(&self, input: &[u8]) -> bool {
        let end = self.walk(input);
        end != Self::REJECT && self.is_stop_state(end)
    }

    /// Merges equivalent states by partition refinement.
    ///
    /// The initial partition groups states by (stop flag, mark set), so two
    /// states with different marks never end up merged, then classes are split
    /// on transition signatures until a pass changes nothing. Afterwards the
    /// class representatives are renumbered densely and all transitions,
    /// marks, the stop set and the start state are rewritten onto them.
    pub fn simplify(&mut self) {
        let n = self.state_count();
        if n == 0 {
            return;
        }

        let mut class_of = vec![0usize; n];
        let mut class_count;
        {
            let mut classes: HashMap<(bool, &BTreeSet<u32>), usize> = HashMap::new();
            for s in 0..n {
                let next = classes.len();
                class_of[s] = *classes
                    .entry((self.stops.contains(&s), &self.marks[s]))
                    .or_insert(next);
            }
            class_count = classes.len();
        }

        loop {
            let mut classes: HashMap<(usize, Vec<(u8, usize)>), usize> = HashMap::new();
            let mut refined = vec![0usize; n];
            for s in 0..n {
                let signature: Vec<(u8, usize)> = self.transitions[s]
                    .iter()
                    .map(|(&b, &t)| (b, class_of[t]))
                    .collect();
                let next = classes.len();
                refined[s] = *classes.entry((class_of[s], signature)).or_insert(next);
            }
            let refined_count = classes.len();
            class_of = refined;
            if refined_count == class_count {
                break;
            }
            class_count = refined_count;
        }

        // Renumber classes by their lowest member so the result is stable.
        let mut renumber = vec![usize::MAX; class_count];
        let mut representative = Vec::with_capacity(class_count);
        for s in 0..n {
            if renumber[class_of[s]] == usize::MAX {
                renumber[class_of[s]] = representative.len();
                representative.push(s);
            }
        }

        let mut transitions = Vec::with_capacity(representative.len());
        let mut marks = Vec::with_capacity(representative.len());
        for &rep in &representative {
            transitions.push(
                self.transitions[rep]
                    .iter()
                    .map(|(&b, &t)| (b, renumber[class_of[t]]))
                    .collect(),
            );
            marks.push(std::mem::take(&mut self.marks[rep]));
        }

        self.stops = self
            .stops
            .iter()
            .map(|&s| renumber[class_of[s]])
            .collect();
        self.start = renumber[class_of[self.start]];
        self.transitions = transitions;
        self.marks = marks;
    }

    /// Human-readable dump of the whole automaton, one state per line with its
    /// transition table and mark set, then the start state and stop states.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for s in 0..self.state_count() {
            let _ = write!(out, "STATE{s}: {{");
            for (i, (&b, &t)) in self.transitions[s].iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{} -> {t}", display_byte(b));
            }
            out.push_str("}\n");

            out.push_str("  MARKS: ");
            if self.marks[s].is_empty() {
                out.push_str("EMPTY");
            } else {
                for (i, m) in self.marks[s].iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    let _ = write!(out, "{m}");
                }
            }
            out.push('\n');
        }

        let _ = write!(out, "START_STATE = {}", self.start);
        out.push('\n');
        out.push_str("STOP_STATES =");
        for s in &self.stops {
            let _ = write!(out, " {s}");
        }
        out.push('\n');
        out
    }
}
