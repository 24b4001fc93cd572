
extern crate batcirc_core;
extern crate batcirc_cnf;
extern crate batcirc_parser;

use {
    batcirc_core::{Circuit, GateId, Kind},
    batcirc_cnf::{CnfOpts, mark_relevant, number_gates, collect_clauses,
                  compute_polarity, dimacs, edimacs},
    batcirc_cnf::dimacs::Outcome,
};

// drain the two initial constraint queues like the frontends do
fn apply_assignments(circ: &mut Circuit) -> batcirc_core::Result<()> {
    while let Some(g) = circ.assigned_to_true.pop_front() {
        circ.force_true(g)?;
    }
    while let Some(g) = circ.assigned_to_false.pop_front() {
        circ.force_false(g)?;
    }
    Ok(())
}

// the bc2cnf pipeline up to the emission
fn pipeline(input: &str, all: bool) -> batcirc_core::Result<Circuit> {
    let mut circ = batcirc_parser::parse_str(input).expect("parse error");
    circ.preserve_all_solutions = all;
    apply_assignments(&mut circ)?;
    circ.remove_underscore_names();
    circ.simplify(false)?;
    circ.cnf_normalize()?;
    circ.simplify(true)?;
    Ok(circ)
}

fn translate(input: &str, opts: &CnfOpts, all: bool) -> (String, Outcome) {
    let mut circ = pipeline(input, all).expect("unexpectedly inconsistent");
    let mut buf = Vec::new();
    let outcome = dimacs::write_cnf(&mut circ, &mut buf, opts).unwrap();
    (String::from_utf8(buf).unwrap(), outcome)
}

// tiny DPLL over clause vectors
fn dpll(clauses: &[Vec<i32>], assign: &mut Vec<i8>) -> bool {
    loop {
        let mut unit = None;
        for clause in clauses.iter() {
            let mut satisfied = false;
            let mut unassigned = None;
            let mut nof_unassigned = 0;
            for &l in clause.iter() {
                let v = assign[l.abs() as usize];
                if v == 0 {
                    nof_unassigned += 1;
                    unassigned = Some(l);
                } else if (v > 0) == (l > 0) {
                    satisfied = true;
                    break;
                }
            }
            if satisfied { continue }
            match nof_unassigned {
                0 => return false,
                1 => { unit = unassigned; break }
                _ => (),
            }
        }
        match unit {
            None => break,
            Some(l) => assign[l.abs() as usize] = if l > 0 { 1 } else { -1 },
        }
    }
    let var = match (1..assign.len()).find(|&v| assign[v] == 0) {
        None => return true,
        Some(v) => v,
    };
    for &v in [1i8, -1].iter() {
        let mut saved = assign.clone();
        saved[var] = v;
        if dpll(clauses, &mut saved) {
            *assign = saved;
            return true;
        }
    }
    false
}

fn satisfiable(clauses: &[Vec<i32>], nof_vars: usize) -> bool {
    let mut assign = vec![0i8; nof_vars + 1];
    dpll(clauses, &mut assign)
}

#[test]
fn test_single_variable() {
    // ASSIGN x forces the only input; the instance is solved during
    // rewriting and a trivial satisfiable formula comes out
    let opts = CnfOpts::default();
    let (text, outcome) = translate("BC1.0\nASSIGN x;\n", &opts, false);
    assert_eq!(outcome, Outcome::TriviallySat);
    assert!(text.contains("p cnf 1 1\n"));
    assert!(text.contains("1 0\n"));
    assert!(text.contains("c x <-> T\n"));
}

#[test]
fn test_unsat_unit_pair() {
    let mut circ = batcirc_parser::parse_str("BC1.0\nASSIGN x;\nASSIGN ~x;\n").unwrap();
    assert!(apply_assignments(&mut circ).is_err());
    let mut buf = Vec::new();
    dimacs::write_trivial_unsat(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.ends_with("p cnf 1 2\n1 0\n-1 0\n"));
}

#[test]
fn test_xor_chain() {
    // after normalization the ternary ODD is a chain of binary ones: four
    // clauses each, plus the unit for the root
    let opts = CnfOpts::default();
    let (text, outcome) = translate("BC1.0\ng := ODD(a,b,c);\nASSIGN g;\n", &opts, false);
    assert_eq!(outcome, Outcome::Written { vars: 5, clauses: 9 });
    assert!(text.contains("p cnf 5 9\n"));
    // NOT-less output: no literal may refer to a NOT gate, and here no NOT
    // gates exist at all; the formula must still be satisfiable
    let clauses = parse_dimacs_body(&text);
    assert_eq!(clauses.len(), 9);
    assert!(satisfiable(&clauses, 5));
}

// read the clauses back out of the emitted text
fn parse_dimacs_body(text: &str) -> Vec<Vec<i32>> {
    let mut clauses = Vec::new();
    for line in text.lines() {
        if line.starts_with('c') || line.starts_with('p') {
            continue;
        }
        let mut clause: Vec<i32> = line
            .split_whitespace()
            .map(|t| t.parse::<i32>().unwrap())
            .collect();
        assert_eq!(clause.pop(), Some(0));
        clauses.push(clause);
    }
    clauses
}

#[test]
fn test_cardinality_all_solutions() {
    // with all solutions preserved, the projection of the CNF models onto
    // the inputs of [2,2](a,b,c,d) has exactly C(4,2) = 6 members
    let mut circ = pipeline("BC1.0\ng := [2,2](a,b,c,d);\nASSIGN g;\n", true).unwrap();
    mark_relevant(&mut circ, true);
    let (max_var, nof_inputs) = number_gates(&mut circ, true);
    assert_eq!(nof_inputs, 4);
    let opts = CnfOpts::default();
    let clauses = collect_clauses(&circ, &opts);
    let input_vars: Vec<i32> = circ.iter()
        .filter(|&(_, g)| g.kind() == Kind::Var)
        .map(|(_, g)| g.temp)
        .collect();
    assert_eq!(input_vars.len(), 4);
    let mut nof_models = 0;
    for bits in 0..16u32 {
        let mut with_units = clauses.clone();
        for (i, &v) in input_vars.iter().enumerate() {
            let lit = if bits & (1 << i) != 0 { v } else { -v };
            with_units.push(vec![lit]);
        }
        if satisfiable(&with_units, max_var as usize) {
            nof_models += 1;
        }
    }
    assert_eq!(nof_models, 6);
    circ.reset_temps(0);
}

#[test]
fn test_structural_sharing() {
    // two textually different gates over the same operands collapse into
    // one, so the clause count matches the manually shared version; no
    // other simplification runs
    fn share_only(input: &str) -> Outcome {
        let mut circ = batcirc_parser::parse_str(input).expect("parse error");
        apply_assignments(&mut circ).unwrap();
        circ.share().unwrap();
        circ.cnf_normalize().unwrap();
        circ.share().unwrap();
        let mut buf = Vec::new();
        dimacs::write_cnf(&mut circ, &mut buf, &CnfOpts::default()).unwrap()
    }
    let a = share_only("BC1.0\nt1 := OR(a,b);\nt2 := OR(b,a);\ng := ODD(t1,t2);\nASSIGN g;\n");
    let b = share_only("BC1.0\nt := OR(a,b);\ng := ODD(t,t);\nASSIGN g;\n");
    assert_eq!(a, b);
    match a {
        Outcome::Written { vars, clauses } => {
            assert_eq!(vars, 4);
            assert_eq!(clauses, 8);
        }
        _ => panic!("expected a written formula"),
    }
}

#[test]
fn test_polarity_drop() {
    // g is only reached in positive polarity, so the reverse implication
    // clauses are dropped
    let with = CnfOpts { polarity: true, ..CnfOpts::default() };
    let without = CnfOpts::default();
    let (_, o1) = translate("BC1.0\ng := OR(a, ~b);\nASSIGN g;\n", &with, false);
    let (_, o2) = translate("BC1.0\ng := OR(a, ~b);\nASSIGN g;\n", &without, false);
    let (v1, c1) = match o1 { Outcome::Written { vars, clauses } => (vars, clauses), _ => panic!() };
    let (v2, c2) = match o2 { Outcome::Written { vars, clauses } => (vars, clauses), _ => panic!() };
    assert_eq!(v1, v2);
    assert_eq!(c1, 2); // the long clause plus the unit
    assert_eq!(c2, 4);
    // the restricted encoding stays satisfiable
    let (text, _) = translate("BC1.0\ng := OR(a, ~b);\nASSIGN g;\n", &with, false);
    let clauses = parse_dimacs_body(&text);
    assert!(satisfiable(&clauses, v1 as usize));
}

#[test]
fn test_permutation_is_a_bijection() {
    let opts = CnfOpts { permute_seed: Some(7), ..CnfOpts::default() };
    let (text, outcome) = translate("BC1.0\ng := ODD(a,b,c);\nASSIGN g;\n", &opts, false);
    let (vars, _) = match outcome { Outcome::Written { vars, clauses } => (vars, clauses), _ => panic!() };
    // every variable between 1 and V still occurs
    let clauses = parse_dimacs_body(&text);
    let mut seen = vec![false; vars as usize + 1];
    for clause in clauses.iter() {
        for &l in clause.iter() {
            seen[l.abs() as usize] = true;
        }
    }
    assert!(seen[1..].iter().all(|&b| b));
    // and the permuted formula is still satisfiable
    assert!(satisfiable(&clauses, vars as usize));
}

#[test]
fn test_edimacs_round_trip() {
    // write the extended DIMACS form and read it back; the projected
    // solution count onto the four inputs must survive: C(4,2)+C(4,3) = 10
    let mut circ = batcirc_parser::parse_str("BC1.0\ng := [2,3](a,b,c,d);\nASSIGN g;\n").unwrap();
    circ.preserve_all_solutions = true;
    apply_assignments(&mut circ).unwrap();
    circ.simplify(false).unwrap();
    circ.edimacs_normalize().unwrap();
    circ.simplify(true).unwrap();
    let mut buf = Vec::new();
    edimacs::write_edimacs(&mut circ, &mut buf, true, true).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("p noncnf "));

    let mut reparsed = edimacs::parse_edimacs(std::io::Cursor::new(text.as_bytes())).unwrap();
    reparsed.preserve_all_solutions = true;
    apply_assignments(&mut reparsed).unwrap();
    reparsed.simplify(false).unwrap();
    reparsed.cnf_normalize().unwrap();
    reparsed.simplify(true).unwrap();

    mark_relevant(&mut reparsed, true);
    let (max_var, _) = number_gates(&mut reparsed, true);
    let clauses = collect_clauses(&reparsed, &CnfOpts::default());
    let input_vars: Vec<i32> = reparsed.iter()
        .filter(|&(_, g)| g.kind() == Kind::Var && g.temp > 0)
        .map(|(_, g)| g.temp)
        .collect();
    assert_eq!(input_vars.len(), 4);
    let mut nof_models = 0;
    for bits in 0..16u32 {
        let mut with_units = clauses.clone();
        for (i, &v) in input_vars.iter().enumerate() {
            let lit = if bits & (1 << i) != 0 { v } else { -v };
            with_units.push(vec![lit]);
        }
        if satisfiable(&with_units, max_var as usize) {
            nof_models += 1;
        }
    }
    assert_eq!(nof_models, 10);
    reparsed.reset_temps(0);
}

#[test]
fn test_polarity_flags_follow_the_root() {
    let mut circ = pipeline("BC1.0\ng := OR(a, ~b);\nASSIGN g;\n", false).unwrap();
    mark_relevant(&mut circ, true);
    number_gates(&mut circ, true);
    compute_polarity(&mut circ);
    // the root is reached positively only
    let root: Vec<(GateId, bool, bool)> = circ.iter()
        .filter(|&(_, g)| g.kind() == Kind::Or)
        .map(|(g, gate)| (g, gate.mir_pos, gate.mir_neg))
        .collect();
    assert_eq!(root.len(), 1);
    assert!(root[0].1 && !root[0].2);
    circ.reset_temps(0);
}
