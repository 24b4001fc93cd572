
//! The extended (non-clausal) DIMACS writer and its inverse parser.
//!
//! One line per gate: `<op> <param-count> [<param>] <out-var> <children> 0`
//! with op-codes 1 FALSE, 2 TRUE, 3 NOT, 4 AND, 6 OR, 8 ODD, 9 EVEN,
//! 11 EQUIV, 12 ITE, 13 ATLEAST, 15 THRESHOLD. ATLEAST and THRESHOLD carry
//! one parameter (THRESHOLD only ever with equal bounds). Determined gates
//! are asserted with constant lines `2 -1 v 0` / `1 -1 v 0`, the same shape
//! constant gates print with; the parser reads those back as assertions.

use {
    std::{error, fmt, io::{self, Write, BufRead}},
    fxhash::FxHashMap,
    batcirc_core::{Circuit, GateId, Kind},
    crate::{mark_relevant, number_gates, lit_of},
};

/// Error raised by the extended-DIMACS parser, with the offending line.
#[derive(Debug)]
pub struct ParseError(String);

impl fmt::Display for ParseError {
    fn fmt(&self, out: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, out)
    }
}

impl error::Error for ParseError {}

fn mk_err(s: String) -> Box<dyn error::Error> {
    Box::new(ParseError(s))
}

fn op_code(kind: Kind) -> i32 {
    match kind {
        Kind::False => 1,
        Kind::True => 2,
        Kind::Not => 3,
        Kind::And => 4,
        Kind::Or => 6,
        Kind::Odd => 8,
        Kind::Even => 9,
        Kind::Equiv => 11,
        Kind::Ite => 12,
        Kind::Atleast => 13,
        Kind::Threshold => 15,
        _ => panic!("op_code: {} gate has no extended-DIMACS form", kind.name()),
    }
}

/// Write the circuit in the extended DIMACS format. Expects the circuit to
/// have passed `edimacs_normalize`.
pub fn write_edimacs<W: Write>(
    circ: &mut Circuit,
    out: &mut W,
    notless: bool,
    perform_coi: bool,
) -> io::Result<()> {
    let nof_relevant = mark_relevant(circ, perform_coi);
    info!("the circuit has {} relevant gates", nof_relevant);
    let (max_var, _) = number_gates(circ, notless);

    write!(out, "c Extended DIMACS form of a Boolean circuit,\n")?;
    write!(out, "c produced with the bc2edimacs translator of the batcirc toolbox.\n")?;
    for (_, gate) in circ.iter() {
        if gate.temp <= 0 {
            continue;
        }
        for name in gate.names() {
            write!(out, "c {} <-> {}\n", name, gate.temp)?;
        }
    }
    write!(out, "p noncnf {}\n", max_var)?;

    let ids: Vec<GateId> = circ.gate_ids().collect();
    for &g in ids.iter() {
        if circ.gate(g).temp == -1 {
            continue;
        }
        write_gate(circ, g, out, notless)?;
    }
    // assert the determined non-constant gates
    for &g in ids.iter() {
        let gate = circ.gate(g);
        if gate.temp == -1 || !gate.is_determined() {
            continue;
        }
        match gate.kind() {
            Kind::True | Kind::False => (), // their gate line asserts them
            _ => {
                let lit = lit_of(circ, g, notless);
                if lit > 0 {
                    write!(out, "{} -1 {} 0\n", if gate.value() { 2 } else { 1 }, lit)?;
                } else {
                    write!(out, "{} -1 {} 0\n", if gate.value() { 1 } else { 2 }, -lit)?;
                }
            }
        }
    }
    circ.reset_temps(0);
    Ok(())
}

fn write_gate<W: Write>(
    circ: &Circuit,
    g: GateId,
    out: &mut W,
    notless: bool,
) -> io::Result<()> {
    let gate = circ.gate(g);
    match gate.kind() {
        Kind::Var => Ok(()),
        Kind::True | Kind::False => {
            write!(out, "{} -1 {} 0\n", op_code(gate.kind()), gate.temp)
        }
        Kind::Not => {
            if notless {
                debug_assert!(!gate.is_determined());
                debug_assert!(circ.gate(circ.first_child(g)).kind() != Kind::Not);
                return Ok(());
            }
            write!(out, "3 -1 {} ", gate.temp)?;
            write_children(circ, g, out, notless)?;
            write!(out, "0\n")
        }
        Kind::And | Kind::Or | Kind::Odd | Kind::Even | Kind::Equiv | Kind::Ite => {
            write!(out, "{} -1 {} ", op_code(gate.kind()), gate.temp)?;
            write_children(circ, g, out, notless)?;
            write!(out, "0\n")
        }
        Kind::Atleast => {
            write!(out, "13 1 {} {} ", gate.bounds().0, gate.temp)?;
            write_children(circ, g, out, notless)?;
            write!(out, "0\n")
        }
        Kind::Threshold => {
            let (tmin, tmax) = gate.bounds();
            if tmin != tmax {
                panic!("write_edimacs: THRESHOLD window not collapsed to a point");
            }
            write!(out, "15 1 {} {} ", tmin, gate.temp)?;
            write_children(circ, g, out, notless)?;
            write!(out, "0\n")
        }
        Kind::Ref => panic!("write_edimacs: circuit not properly normalized (REF)"),
        k => panic!("write_edimacs: not implemented for {}", k.name()),
    }
}

fn write_children<W: Write>(
    circ: &Circuit,
    g: GateId,
    out: &mut W,
    notless: bool,
) -> io::Result<()> {
    for c in circ.children(g) {
        write!(out, "{} ", lit_of(circ, c, notless))?;
    }
    Ok(())
}

/// Read an extended DIMACS file back into a circuit. Variables that are
/// never defined by a gate line become free inputs named `x<var>`;
/// zero-child TRUE/FALSE lines become entries in the assignment queues.
pub fn parse_edimacs<R: BufRead>(r: R) -> Result<Circuit, Box<dyn error::Error>> {
    let mut circ = Circuit::new();
    let mut vars: FxHashMap<i64, GateId> = FxHashMap::default();
    let mut defined: FxHashMap<i64, bool> = FxHashMap::default();
    let mut saw_header = false;

    for (lineno, line) in r.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        if line.starts_with('p') {
            let mut it = line.split_whitespace();
            it.next();
            if it.next() != Some("noncnf") {
                return Err(mk_err(format!("line {}: expected 'p noncnf' header", lineno + 1)));
            }
            saw_header = true;
            continue;
        }
        if !saw_header {
            return Err(mk_err(format!("line {}: gate line before header", lineno + 1)));
        }
        let nums: Vec<i64> = line
            .split_whitespace()
            .map(|t| t.parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|e| mk_err(format!("line {}: {}", lineno + 1, e)))?;
        if nums.len() < 3 || *nums.last().unwrap() != 0 {
            return Err(mk_err(format!("line {}: malformed gate line", lineno + 1)));
        }
        let op = nums[0];
        let param_count = nums[1];
        let (param, rest) = if param_count == -1 {
            (None, &nums[2..nums.len() - 1])
        } else if param_count == 1 {
            if nums.len() < 4 {
                return Err(mk_err(format!("line {}: missing parameter", lineno + 1)));
            }
            (Some(nums[2]), &nums[3..nums.len() - 1])
        } else {
            return Err(mk_err(format!("line {}: unsupported parameter count {}",
                                      lineno + 1, param_count)));
        };
        if rest.is_empty() {
            return Err(mk_err(format!("line {}: missing output variable", lineno + 1)));
        }
        let out_var = rest[0];
        let children = &rest[1..];
        let out_gate = var_gate(&mut circ, &mut vars, out_var)?;

        if op == 1 || op == 2 {
            // constant line: an assertion of the output variable
            if !children.is_empty() {
                return Err(mk_err(format!("line {}: constant with children", lineno + 1)));
            }
            if op == 2 {
                circ.assigned_to_true.push_back(out_gate);
            } else {
                circ.assigned_to_false.push_back(out_gate);
            }
            continue;
        }

        if *defined.get(&out_var).unwrap_or(&false) {
            return Err(mk_err(format!("line {}: variable {} defined twice",
                                      lineno + 1, out_var)));
        }
        defined.insert(out_var, true);

        let mut child_gates = Vec::with_capacity(children.len());
        for &c in children.iter() {
            child_gates.push(lit_gate(&mut circ, &mut vars, c)?);
        }
        let arity_err = |what: &str| {
            mk_err(format!("line {}: {}", lineno + 1, what))
        };
        match op {
            3 => {
                if child_gates.len() != 1 {
                    return Err(arity_err("NOT takes one child"));
                }
                circ.define_undef(out_gate, Kind::Not, &child_gates, 0, 0);
            }
            4 | 6 | 8 | 9 | 11 => {
                if child_gates.is_empty() {
                    return Err(arity_err("connective with no children"));
                }
                let kind = match op {
                    4 => Kind::And,
                    6 => Kind::Or,
                    8 => Kind::Odd,
                    9 => Kind::Even,
                    _ => Kind::Equiv,
                };
                circ.define_undef(out_gate, kind, &child_gates, 0, 0);
            }
            12 => {
                if child_gates.len() != 3 {
                    return Err(arity_err("ITE takes three children"));
                }
                circ.define_undef(out_gate, Kind::Ite, &child_gates, 0, 0);
            }
            13 => {
                let k = param.ok_or_else(|| arity_err("ATLEAST needs a parameter"))?;
                if k < 0 || child_gates.is_empty() {
                    return Err(arity_err("malformed ATLEAST"));
                }
                circ.define_undef(out_gate, Kind::Atleast, &child_gates, k as u32, 0);
            }
            15 => {
                let k = param.ok_or_else(|| arity_err("THRESHOLD needs a parameter"))?;
                if k < 0 || child_gates.is_empty() {
                    return Err(arity_err("malformed THRESHOLD"));
                }
                circ.define_undef(out_gate, Kind::Threshold, &child_gates,
                                  k as u32, k as u32);
            }
            _ => {
                return Err(mk_err(format!("line {}: unknown op-code {}", lineno + 1, op)));
            }
        }
    }
    if !saw_header {
        return Err(mk_err("missing 'p noncnf' header".to_string()));
    }

    // variables never defined by a gate line are free inputs
    let ids: Vec<(i64, GateId)> = vars.iter().map(|(&v, &g)| (v, g)).collect();
    for (v, g) in ids {
        if circ.gate(g).kind() == Kind::Undef {
            circ.define_undef(g, Kind::Var, &[], 0, 0);
            circ.add_name(g, format!("x{}", v).into());
        }
    }
    if let Some(cycle) = circ.test_acyclicity() {
        return Err(mk_err(format!("cyclic definition through {}", cycle.join(" -> "))));
    }
    Ok(circ)
}

fn var_gate(
    circ: &mut Circuit,
    vars: &mut FxHashMap<i64, GateId>,
    v: i64,
) -> Result<GateId, Box<dyn error::Error>> {
    if v <= 0 {
        return Err(mk_err(format!("invalid variable {}", v)));
    }
    Ok(*vars.entry(v).or_insert_with(|| circ.new_undef()))
}

// a negative literal wraps the variable's gate in a fresh NOT; the share
// pass merges the copies later
fn lit_gate(
    circ: &mut Circuit,
    vars: &mut FxHashMap<i64, GateId>,
    v: i64,
) -> Result<GateId, Box<dyn error::Error>> {
    let g = var_gate(circ, vars, v.abs())?;
    Ok(if v < 0 { circ.new_not(g) } else { g })
}
