
#[macro_use] extern crate proptest;
extern crate batcirc_core;

use {
    batcirc_core::*,
    proptest::prelude::*,
};

// ## Hand-built circuits for the individual rewrite rules

#[test]
fn test_force_contradiction() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    assert!(c.force_true(x).is_ok());
    assert!(c.force_true(x).is_ok()); // idempotent
    assert!(c.force_false(x).is_err());
}

#[test]
fn test_not_not() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let n1 = c.new_not(x);
    let n2 = c.new_not(n1);
    c.add_name(n2, "g".into());
    c.force_true(n2).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // ~~x collapses onto x, which is forced true
    assert!(c.gate(x).is_determined());
    assert!(c.gate(x).value() || c.gate(x).is_deleted());
}

#[test]
fn test_ite_determined_selector() {
    let mut c = Circuit::new();
    let i = c.new_var("i");
    let t = c.new_var("t");
    let e = c.new_var("e");
    let ite = c.new_ite(i, t, e);
    c.add_name(ite, "g".into());
    c.force_true(ite).unwrap();
    c.force_true(i).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // ITE(T,t,e) selects the then-branch
    assert!(c.gate(t).is_determined() && c.gate(t).value() || c.gate(t).is_deleted());
    assert!(!c.gate(e).is_determined() || c.gate(e).is_deleted());
}

#[test]
fn test_ite_to_equiv() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let ny = c.new_not(y);
    let ite = c.new_ite(x, y, ny);
    c.add_name(ite, "g".into());
    // keep the gate alive without determining it
    let root = c.new_or(&[ite]);
    c.add_name(root, "root".into());
    c.force_true(root).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // ITE(x,y,~y) became EQUIV(x,y); after propagation of the forced OR
    // the EQUIV is forced true
    let live: Vec<Kind> = c.iter().map(|(_, g)| g.kind()).collect();
    assert!(!live.contains(&Kind::Ite));
}

#[test]
fn test_or_absorbs_false_and_collapses() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let f = c.new_false();
    let or = c.new_or(&[x, f]);
    c.add_name(or, "g".into());
    c.force_true(or).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // OR(x,F) = x, so x itself ends up forced
    assert!(c.gate(x).is_determined() && c.gate(x).value() || c.gate(x).is_deleted());
}

#[test]
fn test_or_x_not_x() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let nx = c.new_not(x);
    let y = c.new_var("y");
    let or = c.new_or(&[x, nx, y]);
    c.add_name(or, "g".into());
    c.force_false(or).unwrap();
    // OR(x,~x,y) is a tautology, forcing it false is inconsistent
    assert!(c.simplify(false).is_err());
}

#[test]
fn test_and_duplicate_children() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let and = c.new_and(&[x, y, x]);
    c.add_name(and, "g".into());
    c.force_false(and).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    let and_gates: Vec<GateId> = c.iter()
        .filter(|&(_, g)| g.kind() == Kind::And)
        .map(|(g, _)| g)
        .collect();
    // the duplicate x is gone; AND(x,y) remains with two children
    assert_eq!(and_gates.len(), 1);
    assert_eq!(c.count_children(and_gates[0]), 2);
}

#[test]
fn test_xor_cancels_pairs() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let z = c.new_var("z");
    let odd = c.new_nary(Kind::Odd, &[x, x, y, z]);
    c.add_name(odd, "g".into());
    let root = c.new_or(&[odd]);
    c.add_name(root, "r".into());
    c.force_true(root).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // ODD(x,x,y,z) = ODD(y,z): no live gate mentions x any more
    for (g, gate) in c.iter() {
        if gate.kind() == Kind::Odd {
            assert!(c.children(g).all(|ch| ch != x));
            assert_eq!(c.count_children(g), 2);
        }
    }
}

#[test]
fn test_equiv_true_becomes_and() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let t = c.new_true();
    let eq = c.new_nary(Kind::Equiv, &[t, x, y]);
    c.add_name(eq, "g".into());
    c.force_true(eq).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    // EQUIV(T,x,y) = AND(T,x,y), and forced true it forces x and y
    assert!(c.gate(x).is_determined() && c.gate(x).value() || c.gate(x).is_deleted());
    assert!(c.gate(y).is_determined() && c.gate(y).value() || c.gate(y).is_deleted());
}

#[test]
fn test_threshold_trivial_cases() {
    // [0,n] is trivially true
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let th = c.new_threshold(0, 2, &[x, y]);
    c.add_name(th, "g".into());
    c.force_false(th).unwrap();
    assert!(c.simplify(false).is_err());

    // [3,2] is trivially false
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let th = c.new_threshold(3, 2, &[x, y]);
    c.add_name(th, "g".into());
    c.force_true(th).unwrap();
    assert!(c.simplify(false).is_err());
}

#[test]
fn test_threshold_pair_reduction() {
    // [1,1](x,~x,y) = [0,0](y) = ~y
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let nx = c.new_not(x);
    let y = c.new_var("y");
    let th = c.new_threshold(1, 1, &[x, nx, y]);
    c.add_name(th, "g".into());
    c.force_true(th).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    assert!(c.gate(y).is_determined() && !c.gate(y).value() || c.gate(y).is_deleted());
}

#[test]
fn test_atleast_one_is_or() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let al = c.new_atleast(1, &[x, y]);
    c.add_name(al, "g".into());
    let root = c.new_and(&[al]);
    c.add_name(root, "r".into());
    c.force_true(root).unwrap();
    c.simplify(false).unwrap();
    assert!(c.check_edges());
    let kinds: Vec<Kind> = c.iter().map(|(_, g)| g.kind()).collect();
    assert!(!kinds.contains(&Kind::Atleast));
}

#[test]
fn test_share_merges_equal_gates() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let a1 = c.new_and(&[x, y]);
    let a2 = c.new_and(&[y, x]);
    c.add_name(a1, "a1".into());
    c.add_name(a2, "a2".into());
    c.share().unwrap();
    assert!(c.check_edges());
    let live_ands = c.iter().filter(|&(_, g)| g.kind() == Kind::And).count();
    assert_eq!(live_ands, 1);
    // the survivor carries both names
    let (_, survivor) = c.iter().find(|&(_, g)| g.kind() == Kind::And).unwrap();
    let names: Vec<&str> = survivor.names().collect();
    assert!(names.contains(&"a1") && names.contains(&"a2"));
}

#[test]
fn test_share_detects_contradiction() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let a1 = c.new_and(&[x, y]);
    let a2 = c.new_and(&[y, x]);
    c.add_name(a1, "a1".into());
    c.add_name(a2, "a2".into());
    c.assign(a1, true).unwrap();
    c.assign(a2, false).unwrap();
    assert!(c.share().is_err());
}

#[test]
fn test_share_idempotent() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let a1 = c.new_and(&[x, y]);
    let a2 = c.new_and(&[y, x]);
    let o = c.new_or(&[a1, a2]);
    c.add_name(o, "o".into());
    c.share().unwrap();
    c.changed = false;
    c.share().unwrap();
    assert!(!c.changed);
}

#[test]
fn test_cycle_witness() {
    let mut c = Circuit::new();
    let a = c.new_undef();
    let b = c.new_undef();
    c.add_name(a, "a".into());
    c.add_name(b, "b".into());
    c.define_undef(a, Kind::Not, &[b], 0, 0);
    c.define_undef(b, Kind::Not, &[a], 0, 0);
    let cycle = c.test_acyclicity().expect("cycle must be detected");
    assert!(cycle.contains(&"a".to_string()) && cycle.contains(&"b".to_string()));
    // scratch restored
    for (_, g) in c.iter() {
        assert_eq!(g.temp, 0);
    }
}

#[test]
fn test_depends_on() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let n = c.new_not(x);
    let a = c.new_and(&[n, y]);
    assert!(c.depends_on(a, x));
    assert!(c.depends_on(a, n));
    assert!(c.depends_on(a, y));
    assert!(!c.depends_on(x, a));
    assert!(!c.depends_on(n, y));
}

#[test]
fn test_scratch_clean_after_passes() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let z = c.new_var("z");
    let th = c.new_threshold(1, 2, &[x, y, z]);
    c.add_name(th, "g".into());
    c.force_true(th).unwrap();
    c.simplify(false).unwrap();
    for (_, g) in c.iter() {
        assert_eq!(g.temp, 0);
    }
    c.cnf_normalize().unwrap();
    for (_, g) in c.iter() {
        assert_eq!(g.temp, 0);
    }
    c.simplify(true).unwrap();
    for (_, g) in c.iter() {
        assert_eq!(g.temp, 0);
    }
    assert!(c.check_edges());
}

#[test]
fn test_normalize_idempotent() {
    let mut c = Circuit::new();
    let vars: Vec<GateId> = (0..5).map(|i| c.new_var(&format!("x{}", i))).collect();
    let odd = c.new_nary(Kind::Odd, &vars[0..3]);
    let th = c.new_threshold(1, 2, &vars[1..5]);
    let and = c.new_and(&[odd, th]);
    c.add_name(and, "g".into());
    c.force_true(and).unwrap();
    c.simplify(false).unwrap();
    c.cnf_normalize().unwrap();
    let snapshot: Vec<(Kind, usize)> = c.iter()
        .map(|(g, gate)| (gate.kind(), c.count_children(g)))
        .collect();
    c.cnf_normalize().unwrap();
    let again: Vec<(Kind, usize)> = c.iter()
        .map(|(g, gate)| (gate.kind(), c.count_children(g)))
        .collect();
    assert_eq!(snapshot, again);
}

#[test]
fn test_evaluate_and_consistency() {
    let mut c = Circuit::new();
    let x = c.new_var("x");
    let y = c.new_var("y");
    let odd = c.new_nary(Kind::Odd, &[x, y]);
    let ite = c.new_ite(x, odd, y);
    c.add_name(ite, "g".into());
    c.assign(x, true).unwrap();
    c.assign(y, false).unwrap();
    assert!(c.evaluate(ite));
    // ITE(T, ODD(T,F), F) = ODD(T,F) = T
    assert!(c.gate(ite).value());
    assert!(c.check_consistency());
}

// ## Random circuits: rewriting preserves satisfiability

// a small reference model of the circuit, for brute-force evaluation
#[derive(Clone,Debug)]
enum RefNode {
    Input(usize),
    Not(usize),
    Nary(Kind, Vec<usize>),
    Ite(usize, usize, usize),
    Threshold(u32, u32, Vec<usize>),
    Atleast(u32, Vec<usize>),
}

fn ref_eval(nodes: &[RefNode], idx: usize, inputs: &[bool]) -> bool {
    match &nodes[idx] {
        RefNode::Input(i) => inputs[*i],
        RefNode::Not(c) => !ref_eval(nodes, *c, inputs),
        RefNode::Nary(kind, cs) => {
            let vals: Vec<bool> = cs.iter().map(|&c| ref_eval(nodes, c, inputs)).collect();
            let nof_true = vals.iter().filter(|&&v| v).count();
            match kind {
                Kind::And => nof_true == vals.len(),
                Kind::Or => nof_true > 0,
                Kind::Odd => nof_true % 2 == 1,
                Kind::Even => nof_true % 2 == 0,
                Kind::Equiv => nof_true == 0 || nof_true == vals.len(),
                _ => unreachable!(),
            }
        }
        RefNode::Ite(i, t, e) => {
            if ref_eval(nodes, *i, inputs) {
                ref_eval(nodes, *t, inputs)
            } else {
                ref_eval(nodes, *e, inputs)
            }
        }
        RefNode::Threshold(lo, hi, cs) => {
            let n = cs.iter().filter(|&&c| ref_eval(nodes, c, inputs)).count();
            *lo as usize <= n && n <= *hi as usize
        }
        RefNode::Atleast(k, cs) => {
            let n = cs.iter().filter(|&&c| ref_eval(nodes, c, inputs)).count();
            *k as usize <= n
        }
    }
}

const NOF_INPUTS : usize = 4;

// interpret a byte soup as a circuit, building both the real thing and the
// reference model
fn build(ops: &[(u8, u8, u8, u8)]) -> (Circuit, Vec<RefNode>, Vec<GateId>) {
    let mut circ = Circuit::new();
    let mut nodes = Vec::new();
    let mut gates = Vec::new();
    for i in 0..NOF_INPUTS {
        gates.push(circ.new_var(&format!("x{}", i)));
        nodes.push(RefNode::Input(i));
    }
    for &(op, a, b, c) in ops.iter() {
        let n = gates.len();
        let pick = |x: u8| x as usize % n;
        let (g, node) = match op % 8 {
            0 | 1 => {
                let kind = if op % 8 == 0 { Kind::And } else { Kind::Or };
                let cs = vec![pick(a), pick(b), pick(c)];
                let cg: Vec<GateId> = cs.iter().map(|&i| gates[i]).collect();
                (circ.new_nary(kind, &cg), RefNode::Nary(kind, cs))
            }
            2 => {
                let cs = vec![pick(a), pick(b)];
                let cg: Vec<GateId> = cs.iter().map(|&i| gates[i]).collect();
                (circ.new_nary(Kind::Odd, &cg), RefNode::Nary(Kind::Odd, cs))
            }
            3 => {
                let cs = vec![pick(a), pick(b), pick(c)];
                let cg: Vec<GateId> = cs.iter().map(|&i| gates[i]).collect();
                (circ.new_nary(Kind::Equiv, &cg), RefNode::Nary(Kind::Equiv, cs))
            }
            4 => {
                (circ.new_not(gates[pick(a)]), RefNode::Not(pick(a)))
            }
            5 => {
                let (i, t, e) = (pick(a), pick(b), pick(c));
                (circ.new_ite(gates[i], gates[t], gates[e]), RefNode::Ite(i, t, e))
            }
            6 => {
                let cs = vec![pick(a), pick(b), pick(c)];
                let cg: Vec<GateId> = cs.iter().map(|&i| gates[i]).collect();
                let lo = (a % 3) as u32;
                let hi = lo + (b % 2) as u32;
                (circ.new_threshold(lo, hi, &cg),
                 RefNode::Threshold(lo, hi, cs))
            }
            _ => {
                let cs = vec![pick(a), pick(b), pick(c)];
                let cg: Vec<GateId> = cs.iter().map(|&i| gates[i]).collect();
                let k = (a % 4) as u32;
                (circ.new_atleast(k, &cg), RefNode::Atleast(k, cs))
            }
        };
        gates.push(g);
        nodes.push(node);
    }
    (circ, nodes, gates)
}

// is there an input assignment making the last node true?
fn ref_satisfiable(nodes: &[RefNode]) -> bool {
    let root = nodes.len() - 1;
    for bits in 0..(1u32 << NOF_INPUTS) {
        let inputs: Vec<bool> = (0..NOF_INPUTS).map(|i| bits & (1 << i) != 0).collect();
        if ref_eval(nodes, root, &inputs) {
            return true;
        }
    }
    false
}

// tiny DPLL over the collected clauses
fn cnf_satisfiable(clauses: &[Vec<i32>], nof_vars: usize) -> bool {
    fn go(clauses: &[Vec<i32>], assign: &mut Vec<i8>) -> bool {
        // unit propagation
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
                if satisfied {
                    continue;
                }
                match nof_unassigned {
                    0 => return false, // conflict
                    1 => {
                        unit = unassigned;
                        break;
                    }
                    _ => (),
                }
            }
            match unit {
                None => break,
                Some(l) => assign[l.abs() as usize] = if l > 0 { 1 } else { -1 },
            }
        }
        // find an unassigned variable to split on
        let var = (1..assign.len()).find(|&v| assign[v] == 0);
        let var = match var {
            None => return true, // complete and conflict-free
            Some(v) => v,
        };
        for &v in [1i8, -1].iter() {
            let mut saved = assign.clone();
            saved[var] = v;
            if go(clauses, &mut saved) {
                *assign = saved;
                return true;
            }
        }
        false
    }
    let mut assign = vec![0i8; nof_vars + 1];
    go(clauses, &mut assign)
}

// mark + number + collect the clause set, mirroring the emitter
fn circuit_to_clauses(circ: &mut Circuit) -> (Vec<Vec<i32>>, usize) {
    circ.reset_temps(-1);
    let mut counter = 0i32;
    let roots: Vec<GateId> = circ.gate_ids()
        .filter(|&g| circ.gate(g).is_determined() && !circ.is_justified(g))
        .collect();
    for root in roots {
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            if circ.gate(h).temp >= 0 {
                continue;
            }
            circ.gate_mut(h).temp = counter;
            counter += 1;
            let cs: Vec<GateId> = circ.children(h).collect();
            stack.extend(cs);
        }
    }
    let mut var = 0i32;
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for g in ids.iter().cloned() {
        if circ.gate(g).temp == -1 {
            continue;
        }
        var += 1;
        circ.gate_mut(g).temp = var;
    }
    // plain translation with NOT gates kept, so every relevant gate has a
    // variable
    let mut clauses = Vec::new();
    for g in circ.gate_ids().collect::<Vec<_>>() {
        let gate = circ.gate(g);
        if gate.temp == -1 {
            continue;
        }
        let glit = gate.temp;
        let lits: Vec<i32> = circ.children(g).map(|c| circ.gate(c).temp).collect();
        match gate.kind() {
            Kind::True | Kind::False | Kind::Var => (),
            Kind::Ref | Kind::Not => {
                let sign = if gate.kind() == Kind::Ref { 1 } else { -1 };
                clauses.push(vec![-glit, sign * lits[0]]);
                clauses.push(vec![glit, -sign * lits[0]]);
            }
            Kind::Or => {
                let mut cl = vec![-glit];
                cl.extend(lits.iter().cloned());
                clauses.push(cl);
                for &l in lits.iter() {
                    clauses.push(vec![glit, -l]);
                }
            }
            Kind::And => {
                let mut cl = vec![glit];
                cl.extend(lits.iter().map(|&l| -l));
                clauses.push(cl);
                for &l in lits.iter() {
                    clauses.push(vec![-glit, l]);
                }
            }
            Kind::Equiv | Kind::Even => {
                assert_eq!(lits.len(), 2);
                clauses.push(vec![-glit, -lits[0], lits[1]]);
                clauses.push(vec![-glit, lits[0], -lits[1]]);
                clauses.push(vec![glit, -lits[0], -lits[1]]);
                clauses.push(vec![glit, lits[0], lits[1]]);
            }
            Kind::Odd => {
                assert_eq!(lits.len(), 2);
                clauses.push(vec![-glit, -lits[0], -lits[1]]);
                clauses.push(vec![-glit, lits[0], lits[1]]);
                clauses.push(vec![glit, -lits[0], lits[1]]);
                clauses.push(vec![glit, lits[0], -lits[1]]);
            }
            Kind::Ite => {
                assert_eq!(lits.len(), 3);
                clauses.push(vec![-glit, -lits[0], lits[1]]);
                clauses.push(vec![-glit, lits[0], lits[2]]);
                clauses.push(vec![glit, -lits[0], -lits[1]]);
                clauses.push(vec![glit, lits[0], -lits[2]]);
            }
            k => panic!("unexpected {} gate after normalization", k.name()),
        }
        if gate.is_determined() {
            clauses.push(vec![if gate.value() { glit } else { -glit }]);
        }
    }
    circ.reset_temps(0);
    (clauses, var as usize)
}

proptest! {
    #[test]
    fn prop_rewriting_preserves_satisfiability(
        ops in proptest::collection::vec(any::<(u8, u8, u8, u8)>(), 1..10)
    ) {
        let (mut circ, nodes, gates) = build(&ops);
        let root = *gates.last().unwrap();
        circ.add_name(root, "root".into());
        let expected = ref_satisfiable(&nodes);

        let rewritten = (|| -> batcirc_core::Result<()> {
            circ.force_true(root)?;
            circ.simplify(false)?;
            circ.cnf_normalize()?;
            circ.simplify(true)?;
            Ok(())
        })();
        prop_assert!(circ.check_edges());
        match rewritten {
            Err(_) => prop_assert!(!expected),
            Ok(()) => {
                let (clauses, nof_vars) = circuit_to_clauses(&mut circ);
                prop_assert!(nof_vars <= 512, "unexpectedly large translation");
                let got = cnf_satisfiable(&clauses, nof_vars);
                prop_assert_eq!(expected, got);
            }
        }
    }

    #[test]
    fn prop_passes_leave_scratch_clean(
        ops in proptest::collection::vec(any::<(u8, u8, u8, u8)>(), 1..10)
    ) {
        let (mut circ, _nodes, gates) = build(&ops);
        let root = *gates.last().unwrap();
        circ.add_name(root, "root".into());
        let r = (|| -> batcirc_core::Result<()> {
            circ.force_true(root)?;
            circ.simplify(false)?;
            circ.cnf_normalize()?;
            circ.simplify(true)?;
            Ok(())
        })();
        if r.is_ok() {
            for (_, g) in circ.iter() {
                prop_assert_eq!(g.temp, 0);
            }
        }
    }
}
