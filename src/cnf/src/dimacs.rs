
//! The DIMACS CNF writer.
//!
//! Expects a circuit that has been constrained, simplified and
//! CNF-normalized. The output starts with a banner and a name-to-literal
//! map in comments, then the `p cnf V C` header where `C` comes from a
//! pre-scan using the same per-gate formulas as the emission itself; the
//! two counts are asserted equal at the end of the pass.

use {
    std::io::{self, Write},
    batcirc_core::{Circuit, GateId, Kind},
    crate::{CnfOpts, mark_relevant, number_gates, permute_variables,
            compute_polarity, count_gate_clauses, gate_clauses, lit_of},
};

const BANNER : &str = "\
c This is a CNF SAT formula in the DIMACS CNF format,
c produced with the bc2cnf translator of the batcirc toolbox.
";

/// What the translation produced.
#[derive(Debug,Clone,Copy,Eq,PartialEq)]
pub enum Outcome {
    /// A real formula was written.
    Written { vars: i32, clauses: usize },
    /// The constraints were already satisfied at translation time; a
    /// trivial satisfiable formula and the assignment were written.
    TriviallySat,
}

/// Write a minimal unsatisfiable formula; used whenever rewriting derives
/// an inconsistency. The instance is solved, not failed.
pub fn write_trivial_unsat<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "c The instance was unsatisfiable\n")?;
    write!(out, "p cnf 1 2\n")?;
    write!(out, "1 0\n")?;
    write!(out, "-1 0\n")
}

/// Translate the circuit to CNF and write it to `out`.
pub fn write_cnf<W: Write>(
    circ: &mut Circuit,
    out: &mut W,
    opts: &CnfOpts,
) -> io::Result<Outcome> {
    let nof_relevant = mark_relevant(circ, opts.perform_coi);
    info!("the circuit has {} relevant gates", nof_relevant);
    if nof_relevant == 0 {
        let r = write_satisfied(circ, out);
        reset_scratch(circ);
        return r.map(|_| Outcome::TriviallySat);
    }

    let (max_var, nof_inputs) = number_gates(circ, opts.notless);
    debug_assert!(max_var > 0);
    info!("the circuit has {} relevant input gates", nof_inputs);

    if let Some(seed) = opts.permute_seed {
        permute_variables(circ, max_var, seed);
    }

    out.write_all(BANNER.as_bytes())?;

    // the name-to-literal map; under the polarity-restricted encoding only
    // input variables keep a biconditional meaning
    for (_, gate) in circ.iter() {
        if gate.temp <= 0 {
            continue;
        }
        if opts.polarity && gate.kind() != Kind::Var {
            continue;
        }
        for name in gate.names() {
            write!(out, "c {} <-> {}\n", name, gate.temp)?;
        }
    }

    if opts.polarity {
        compute_polarity(circ);
    }

    // pre-scan for the header
    let mut nof_clauses = 0usize;
    for (g, gate) in circ.iter() {
        if gate.temp == -1 {
            continue;
        }
        nof_clauses += count_gate_clauses(circ, g, opts.notless, opts.polarity);
        if gate.is_determined() {
            nof_clauses += 1;
        }
    }
    info!("the cnf has {} variables and {} clauses", max_var, nof_clauses);

    write!(out, "p cnf {} {}\n", max_var, nof_clauses)?;

    let mut nof_printed = 0usize;
    let mut clauses: Vec<Vec<i32>> = Vec::new();
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for g in ids {
        if circ.gate(g).temp == -1 {
            continue;
        }
        debug_assert!(circ.gate(g).temp > 0 && circ.gate(g).temp <= max_var);
        clauses.clear();
        gate_clauses(circ, g, opts.notless, opts.polarity, &mut clauses);
        for clause in clauses.iter() {
            for &lit in clause.iter() {
                debug_assert!(lit != 0 && lit.abs() <= max_var);
                write!(out, "{} ", lit)?;
            }
            write!(out, "0\n")?;
            nof_printed += 1;
        }
        if circ.gate(g).is_determined() {
            let lit = lit_of(circ, g, opts.notless);
            write!(out, "{} 0\n", if circ.gate(g).value() { lit } else { -lit })?;
            nof_printed += 1;
        }
    }
    assert_eq!(nof_printed, nof_clauses, "clause pre-scan disagrees with emission");

    reset_scratch(circ);
    Ok(Outcome::Written { vars: max_var, clauses: nof_clauses })
}

// The constraints hold already: complete the assignment, print it in
// comments and write a trivial satisfiable formula.
fn write_satisfied<W: Write>(circ: &mut Circuit, out: &mut W) -> io::Result<()> {
    complete_assignment(circ);
    write!(out, "c The instance was satisfiable\n")?;
    for (_, gate) in circ.iter() {
        debug_assert!(gate.is_determined());
        for name in gate.names() {
            write!(out, "c {} <-> {}\n", name, if gate.value() { "T" } else { "F" })?;
        }
    }
    write!(out, "p cnf 1 1\n")?;
    write!(out, "1 0\n")
}

/// Give every undetermined input an arbitrary value and evaluate the rest
/// of the circuit; aborts if the resulting assignment is inconsistent,
/// which would mean the rewriting itself was unsound.
pub fn complete_assignment(circ: &mut Circuit) {
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for &g in ids.iter() {
        if circ.gate(g).kind() == Kind::Var && !circ.gate(g).is_determined() {
            circ.assign(g, false).expect("assigning an undetermined input");
        }
    }
    for &g in ids.iter() {
        if !circ.gate(g).is_determined() {
            let ok = circ.evaluate(g);
            if !ok {
                panic!("complete_assignment: evaluation error");
            }
        }
    }
    if !circ.check_consistency() {
        panic!("complete_assignment: consistency check failed");
    }
}

// numbering and polarity flags are scratch; leave the circuit clean
fn reset_scratch(circ: &mut Circuit) {
    circ.reset_temps(0);
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for g in ids {
        let gate = circ.gate_mut(g);
        gate.mir_pos = false;
        gate.mir_neg = false;
    }
}
