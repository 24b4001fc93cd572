
//! The ISCAS89 netlist writer.
//!
//! Gates are named `g_<index>`; original names are recorded in a comment
//! map. EQUIV and EVEN are written as `XOR` plus `NOT` since some
//! downstream consumers reject `IFF`. Expects a fully CNF-normalized
//! circuit, where REF and the cardinality gates no longer occur.

use {
    std::io::{self, Write},
    batcirc_core::{Circuit, GateId, Kind},
};

pub fn write_iscas<W: Write>(circ: &Circuit, out: &mut W) -> io::Result<()> {
    // map from netlist names back to the original ones
    for (g, gate) in circ.iter() {
        for name in gate.names() {
            write!(out, "# g_{} <- {}\n", g.index(), name)?;
        }
    }

    for (g, gate) in circ.iter() {
        if gate.kind() == Kind::Var {
            write!(out, "INPUT(g_{})\n", g.index())?;
        }
    }

    for (g, gate) in circ.iter() {
        match gate.kind() {
            Kind::Var | Kind::True | Kind::False => (),
            Kind::Equiv | Kind::Even => {
                if circ.count_children(g) != 2 {
                    panic!("write_iscas: circuit not properly normalized");
                }
                // IFF(a,b) as NOT(XOR(a,b))
                write!(out, "g_{}n = XOR(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
                write!(out, "g_{} = NOT(g_{}n)\n", g.index(), g.index())?;
            }
            Kind::Odd => {
                if circ.count_children(g) != 2 {
                    panic!("write_iscas: circuit not properly normalized");
                }
                write!(out, "g_{} = XOR(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
            }
            Kind::Ite => {
                debug_assert_eq!(circ.count_children(g), 3);
                write!(out, "g_{} = ITE(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
            }
            Kind::Not => {
                debug_assert_eq!(circ.count_children(g), 1);
                write!(out, "g_{} = NOT(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
            }
            Kind::Or => {
                write!(out, "g_{} = OR(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
            }
            Kind::And => {
                write!(out, "g_{} = AND(", g.index())?;
                write_children(circ, g, out)?;
                write!(out, ")\n")?;
            }
            Kind::Ref | Kind::Threshold | Kind::Atleast => {
                panic!("write_iscas: circuit not properly normalized");
            }
            k => panic!("write_iscas: not implemented for {}", k.name()),
        }
    }

    // constrained gates become outputs, with the asserted polarity in a
    // comment since the format cannot express it
    for (g, gate) in circ.iter() {
        if gate.is_determined() {
            write!(out, "# asserted {}\n", if gate.value() { "true" } else { "false" })?;
            write!(out, "OUTPUT(g_{})\n", g.index())?;
        }
    }
    Ok(())
}

fn write_children<W: Write>(circ: &Circuit, g: GateId, out: &mut W) -> io::Result<()> {
    let mut sep = "";
    for c in circ.children(g) {
        write!(out, "{}g_{}", sep, c.index())?;
        sep = ",";
    }
    Ok(())
}
