
// Translate a BC1.0 Boolean circuit into an ISCAS89 netlist.

extern crate batcirc_core;
extern crate batcirc_cnf;
extern crate batcirc_logger;
extern crate batcirc_run;
#[macro_use] extern crate log;

use {
    std::{env, io::Write, process},
    batcirc_cnf::iscas,
    batcirc_run::{Options, apply_assignments, open_output, parse_circuit,
                  print_input_gates, io_bail},
};

const FLAGS : &[&str] = &[
    "-all", "-nosimplify", "-print_inputs",
];

fn usage() {
    eprintln!("\
bc2iscas, part of the batcirc toolbox
bc2iscas <options> [<circuit file>] [<output file>]

  -v              switch verbose mode on
  -all            preserve all solutions (default: preserve satisfiability)
  -nosimplify     do not perform simplifications
  -print_inputs   print input gate names
  <circuit file>  input circuit file (if not specified, stdin is used)
  <output file>   output file (if not specified, stdout is used)");
}

fn main() {
    let opts = match Options::parse(env::args().skip(1), FLAGS, 2) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            usage();
            process::exit(1);
        }
    };
    batcirc_logger::init(opts.verbose);

    let mut circ = parse_circuit(&opts);
    info!("the circuit has {} gates", circ.count_gates());
    if opts.print_inputs {
        print_input_gates(&circ);
    }

    let mut out = open_output(&opts);

    let rewritten = (|| -> batcirc_core::Result<()> {
        apply_assignments(&mut circ)?;
        circ.remove_underscore_names();
        circ.preserve_all_solutions = opts.preserve_all_solutions;
        if opts.perform_simplifications {
            circ.simplify(false)?;
        } else {
            circ.share()?;
        }
        circ.cnf_normalize()?;
        if opts.perform_simplifications {
            circ.simplify(true)?;
        } else {
            circ.share()?;
        }
        Ok(())
    })();
    if rewritten.is_err() {
        info!("the circuit was found unsatisfiable");
        // a netlist asserting a contradiction
        let r = write!(out, "\
# The instance was unsatisfiable
INPUT(g_0)
g_1 = NOT(g_0)
g_2 = AND(g_0,g_1)
# asserted true
OUTPUT(g_2)
");
        if let Err(e) = r {
            io_bail(e);
        }
        return;
    }

    let r = iscas::write_iscas(&circ, &mut out).and_then(|_| out.flush());
    if let Err(e) = r {
        io_bail(e);
    }
}
