
//! The polarity-aware Tseitin-style clause emitter and the output writers.
//!
//! Works on a circuit that has already been simplified and normalized:
//! marks the cone of influence of the asserted gates, numbers the relevant
//! gates (folding NOT gates into negated literals unless disabled),
//! optionally permutes the variable indices and restricts clauses to the
//! polarities actually reachable from the asserted roots, then emits the
//! per-gate definition clauses plus one unit clause per determined gate.

#[macro_use] extern crate log;
extern crate fxhash;
extern crate batcirc_core;

pub mod dimacs;
pub mod edimacs;
pub mod iscas;

use batcirc_core::{Circuit, GateId, Kind};

/// Options shared by the CNF-emitting frontends.
#[derive(Clone,Debug)]
pub struct CnfOpts {
    /// Fold NOT gates into negative literals of their child.
    pub notless: bool,
    /// Emit only the clauses on polarities reachable from the roots.
    pub polarity: bool,
    /// Remap variable indices with a seeded shuffle.
    pub permute_seed: Option<u32>,
    /// Restrict the output to the cone of influence of the constraints.
    pub perform_coi: bool,
}

impl Default for CnfOpts {
    fn default() -> Self {
        CnfOpts {
            notless: true,
            polarity: false,
            permute_seed: None,
            perform_coi: true,
        }
    }
}

/// Mark the gates relevant for the translation with a cone-of-influence
/// pass from every determined, not-yet-justified gate. On entry every
/// `temp` is set to -1; marked gates get a non-negative `temp`. Returns the
/// number of relevant gates.
pub fn mark_relevant(circ: &mut Circuit, perform_coi: bool) -> usize {
    circ.reset_temps(-1);
    let mut counter: i32 = 0;
    let roots: Vec<GateId> = circ.gate_ids().collect();
    for g in roots {
        let root = !perform_coi
            || (circ.gate(g).is_determined() && !circ.is_justified(g));
        if root {
            mark_coi(circ, g, &mut counter);
        }
    }
    counter as usize
}

fn mark_coi(circ: &mut Circuit, g: GateId, counter: &mut i32) {
    let mut stack = vec![g];
    while let Some(h) = stack.pop() {
        if circ.gate(h).temp >= 0 {
            continue;
        }
        circ.gate_mut(h).temp = *counter;
        *counter += 1;
        let children: Vec<GateId> = circ.children(h).collect();
        for c in children {
            stack.push(c);
        }
    }
}

/// Number the marked gates with consecutive positive integers in `temp`,
/// walking the global gate list in order. Under the NOT-less translation
/// NOT gates are skipped (their `temp` drops back to -1): they are
/// represented by the negated literal of their child. Returns the largest
/// assigned variable and the number of relevant input gates.
pub fn number_gates(circ: &mut Circuit, notless: bool) -> (i32, usize) {
    let mut gate_num: i32 = 0;
    let mut nof_inputs = 0;
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for g in ids {
        if circ.gate(g).temp == -1 {
            continue;
        }
        if notless && circ.gate(g).kind() == Kind::Not {
            debug_assert!(!circ.gate(g).is_determined());
            debug_assert!(circ.gate(circ.first_child(g)).kind() != Kind::Not);
            circ.gate_mut(g).temp = -1;
        } else {
            gate_num += 1;
            circ.gate_mut(g).temp = gate_num;
        }
        if circ.gate(g).kind() == Kind::Var {
            nof_inputs += 1;
        }
    }
    (gate_num, nof_inputs)
}

/// Remap the assigned variable indices `1..=max_var` through a seeded
/// Knuth shuffle, for benchmark scrambling.
pub fn permute_variables(circ: &mut Circuit, max_var: i32, seed: u32) {
    let perm = shuffled_permutation(max_var as usize, seed);
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for g in ids {
        let t = circ.gate(g).temp;
        if t <= 0 {
            continue;
        }
        debug_assert!(t <= max_var);
        circ.gate_mut(g).temp = perm[t as usize] as i32;
    }
}

// A permutation of [1..=n] (slot 0 unused), from a Fisher-Yates shuffle
// driven by a 64-bit LCG so a fixed seed reproduces across runs.
fn shuffled_permutation(n: usize, seed: u32) -> Vec<u32> {
    let mut perm: Vec<u32> = (0..=n as u32).collect();
    let mut state: u64 = (seed as u64) ^ 0x5851_f42d_4c95_7f2d;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 33
    };
    for i in (2..=n).rev() {
        let j = 1 + (next() % i as u64) as usize;
        perm.swap(i, j);
    }
    perm
}

/// The literal standing for `g` in the output: its own variable, or the
/// negated variable of its child for a NOT gate under the NOT-less
/// translation.
pub fn lit_of(circ: &Circuit, g: GateId, notless: bool) -> i32 {
    let gate = circ.gate(g);
    if notless && gate.kind() == Kind::Not {
        let child = circ.first_child(g);
        debug_assert!(circ.gate(child).temp > 0);
        -circ.gate(child).temp
    } else {
        debug_assert!(gate.temp > 0);
        gate.temp
    }
}

/// Propagate polarity information for the monotone input rule. Every
/// determined, not-yet-justified gate is seeded with its required value;
/// `mir_pos`/`mir_neg` record which polarities reach each gate.
pub fn compute_polarity(circ: &mut Circuit) {
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for &g in ids.iter() {
        let gate = circ.gate_mut(g);
        gate.mir_pos = false;
        gate.mir_neg = false;
    }
    let mut stack: Vec<(GateId, bool)> = Vec::new();
    for &g in ids.iter() {
        if circ.gate(g).is_determined() {
            let v = circ.gate(g).value();
            stack.push((g, v));
        }
    }
    while let Some((g, polarity)) = stack.pop() {
        {
            let gate = circ.gate(g);
            if gate.is_determined() {
                if gate.value() != polarity {
                    continue;
                }
                if circ.is_justified(g) {
                    continue;
                }
            }
        }
        {
            let gate = circ.gate_mut(g);
            if polarity {
                if gate.mir_pos { continue }
                gate.mir_pos = true;
            } else {
                if gate.mir_neg { continue }
                gate.mir_neg = true;
            }
        }
        let children: Vec<GateId> = circ.children(g).collect();
        match circ.gate(g).kind() {
            Kind::False | Kind::True | Kind::Var => (),
            Kind::Not => {
                stack.push((children[0], !polarity));
            }
            Kind::Or | Kind::And | Kind::Atleast | Kind::Ref => {
                for &c in children.iter() {
                    stack.push((c, polarity));
                }
            }
            Kind::Equiv => {
                for &c in children.iter() {
                    stack.push((c, polarity));
                    stack.push((c, !polarity));
                }
            }
            Kind::Odd | Kind::Even => {
                let (nof_true, _, nof_undet) = circ.count_child_info(g);
                if nof_undet == 1 {
                    // only one child is open; it must take the value that
                    // completes the parity
                    let parity_true = circ.gate(g).kind() == Kind::Odd;
                    let desired = polarity ^ (nof_true % 2 == if parity_true { 1 } else { 0 });
                    for &c in children.iter() {
                        stack.push((c, desired));
                    }
                } else {
                    for &c in children.iter() {
                        stack.push((c, polarity));
                        stack.push((c, !polarity));
                    }
                }
            }
            Kind::Ite => {
                stack.push((children[0], polarity));
                stack.push((children[0], !polarity));
                stack.push((children[1], polarity));
                stack.push((children[2], polarity));
            }
            Kind::Threshold => {
                let (nof_true, nof_false, nof_undet) = circ.count_child_info(g);
                let nof_children = nof_true + nof_false + nof_undet;
                let (tmin, tmax) = circ.gate(g).bounds();
                let lower_met = nof_true >= tmin as usize;
                let upper_ok = nof_children - nof_false <= tmax as usize;
                if lower_met {
                    // only exceeding the upper bound can flip the gate
                    for &c in children.iter() {
                        stack.push((c, !polarity));
                    }
                } else if upper_ok {
                    // only missing the lower bound can flip the gate
                    for &c in children.iter() {
                        stack.push((c, polarity));
                    }
                } else {
                    for &c in children.iter() {
                        stack.push((c, polarity));
                        stack.push((c, !polarity));
                    }
                }
            }
            k => panic!("compute_polarity: not implemented for {}", k.name()),
        }
    }
}

/// The number of definition clauses `g` contributes, by the same formulas
/// the emitter uses; unit clauses for determined gates are counted by the
/// caller.
pub fn count_gate_clauses(circ: &Circuit, g: GateId, notless: bool, polarity: bool) -> usize {
    let gate = circ.gate(g);
    let (pos, neg) = if polarity {
        (gate.mir_pos, gate.mir_neg)
    } else {
        (true, true)
    };
    let n = |b: bool, k: usize| if b { k } else { 0 };
    match gate.kind() {
        Kind::False | Kind::True | Kind::Var => 0,
        Kind::Ref => {
            if notless {
                panic!("count_gate_clauses: REF gate in NOT-less translation");
            }
            n(pos, 1) + n(neg, 1)
        }
        Kind::Not => {
            if notless {
                debug_assert!(!gate.is_determined());
                debug_assert!(circ.gate(circ.first_child(g)).kind() != Kind::Not);
                0
            } else {
                n(pos, 1) + n(neg, 1)
            }
        }
        Kind::Or => {
            let nof_children = circ.count_children(g);
            debug_assert!(nof_children >= 1);
            n(pos, 1) + n(neg, nof_children)
        }
        Kind::And => {
            let nof_children = circ.count_children(g);
            debug_assert!(nof_children >= 1);
            n(pos, nof_children) + n(neg, 1)
        }
        Kind::Equiv | Kind::Even | Kind::Odd => {
            if circ.count_children(g) != 2 {
                panic!("count_gate_clauses: {} gate not binary", gate.kind().name());
            }
            n(pos, 2) + n(neg, 2)
        }
        Kind::Ite => {
            debug_assert_eq!(circ.count_children(g), 3);
            n(pos, 2) + n(neg, 2)
        }
        k => panic!("count_gate_clauses: circuit not normalized ({})", k.name()),
    }
}

/// Append the definition clauses of `g` to `clauses`.
pub fn gate_clauses(
    circ: &Circuit,
    g: GateId,
    notless: bool,
    polarity: bool,
    clauses: &mut Vec<Vec<i32>>,
) {
    let gate = circ.gate(g);
    let (pos, neg) = if polarity {
        (gate.mir_pos, gate.mir_neg)
    } else {
        (true, true)
    };
    let glit = gate.temp;
    debug_assert!(glit >= 1);
    match gate.kind() {
        Kind::False | Kind::True | Kind::Var => (),
        Kind::Ref => {
            if notless {
                panic!("gate_clauses: REF gate in NOT-less translation");
            }
            let c = circ.gate(circ.first_child(g)).temp;
            if pos {
                clauses.push(vec![-glit, c]); // g -> c
            }
            if neg {
                clauses.push(vec![glit, -c]); // ~g -> ~c
            }
        }
        Kind::Not => {
            if notless {
                debug_assert!(!gate.is_determined());
                return;
            }
            let c = circ.gate(circ.first_child(g)).temp;
            if pos {
                clauses.push(vec![-glit, -c]); // g -> ~c
            }
            if neg {
                clauses.push(vec![glit, c]); // ~g -> c
            }
        }
        Kind::Or => {
            if pos {
                // g -> c1 | ... | cn
                let mut clause = vec![-glit];
                for c in circ.children(g) {
                    clause.push(lit_of(circ, c, notless));
                }
                clauses.push(clause);
            }
            if neg {
                // ~g -> ~ci
                for c in circ.children(g) {
                    clauses.push(vec![glit, -lit_of(circ, c, notless)]);
                }
            }
        }
        Kind::And => {
            if pos {
                // g -> ci
                for c in circ.children(g) {
                    clauses.push(vec![-glit, lit_of(circ, c, notless)]);
                }
            }
            if neg {
                // ~g -> ~c1 | ... | ~cn
                let mut clause = vec![glit];
                for c in circ.children(g) {
                    clause.push(-lit_of(circ, c, notless));
                }
                clauses.push(clause);
            }
        }
        Kind::Equiv | Kind::Even => {
            if circ.count_children(g) != 2 {
                panic!("gate_clauses: {} gate not binary", gate.kind().name());
            }
            let (c1, c2) = circ.two_children(g);
            let l1 = lit_of(circ, c1, notless);
            let l2 = lit_of(circ, c2, notless);
            if pos {
                clauses.push(vec![-glit, -l1, l2]); // g -> (c1 -> c2)
                clauses.push(vec![-glit, l1, -l2]); // g -> (~c1 -> ~c2)
            }
            if neg {
                clauses.push(vec![glit, -l1, -l2]); // ~g -> (c1 -> ~c2)
                clauses.push(vec![glit, l1, l2]);   // ~g -> (~c1 -> c2)
            }
        }
        Kind::Odd => {
            if circ.count_children(g) != 2 {
                panic!("gate_clauses: ODD gate not binary");
            }
            let (c1, c2) = circ.two_children(g);
            let l1 = lit_of(circ, c1, notless);
            let l2 = lit_of(circ, c2, notless);
            if pos {
                clauses.push(vec![-glit, -l1, -l2]); // g -> (c1 -> ~c2)
                clauses.push(vec![-glit, l1, l2]);   // g -> (~c1 -> c2)
            }
            if neg {
                clauses.push(vec![glit, -l1, l2]); // ~g -> (c1 -> c2)
                clauses.push(vec![glit, l1, -l2]); // ~g -> (~c1 -> ~c2)
            }
        }
        Kind::Ite => {
            debug_assert_eq!(circ.count_children(g), 3);
            let (i, t, e) = circ.ite_children(g);
            let li = lit_of(circ, i, notless);
            let lt = lit_of(circ, t, notless);
            let le = lit_of(circ, e, notless);
            if pos {
                clauses.push(vec![-glit, -li, lt]); // g -> (i -> t)
                clauses.push(vec![-glit, li, le]);  // g -> (~i -> e)
            }
            if neg {
                clauses.push(vec![glit, -li, -lt]); // ~g -> (i -> ~t)
                clauses.push(vec![glit, li, -le]);  // ~g -> (~i -> ~e)
            }
        }
        k => panic!("gate_clauses: circuit not normalized ({})", k.name()),
    }
}

/// Collect the whole clause set of the marked, numbered circuit, unit
/// clauses included. Used by the solver frontend and the tests; the file
/// writer streams instead.
pub fn collect_clauses(circ: &Circuit, opts: &CnfOpts) -> Vec<Vec<i32>> {
    let mut clauses = Vec::new();
    for (g, gate) in circ.iter() {
        if gate.temp == -1 {
            continue;
        }
        gate_clauses(circ, g, opts.notless, opts.polarity, &mut clauses);
        if gate.is_determined() {
            let lit = lit_of(circ, g, opts.notless);
            clauses.push(vec![if gate.value() { lit } else { -lit }]);
        }
    }
    clauses
}
