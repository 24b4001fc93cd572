
// Translate a BC1.0 Boolean circuit into the extended (non-clausal)
// DIMACS format.

extern crate batcirc_core;
extern crate batcirc_cnf;
extern crate batcirc_logger;
extern crate batcirc_run;
#[macro_use] extern crate log;

use {
    std::{env, io::Write, process},
    batcirc_cnf::edimacs,
    batcirc_run::{Options, apply_assignments, open_output, parse_circuit,
                  print_input_gates, io_bail},
};

const FLAGS : &[&str] = &[
    "-all", "-nosimplify", "-nocoi", "-nots", "-print_inputs",
];

fn usage() {
    eprintln!("\
bc2edimacs, part of the batcirc toolbox
bc2edimacs <options> [<circuit file>] [<output file>]

  -v              switch verbose mode on
  -all            preserve all solutions (default: preserve satisfiability)
  -nosimplify     do not perform simplifications
  -nocoi          do not perform final cone of influence
  -nots           keep NOT-gates instead of folding them into literals
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
        circ.edimacs_normalize()?;
        if opts.perform_simplifications {
            circ.simplify(true)?;
        } else {
            circ.share()?;
        }
        Ok(())
    })();
    if rewritten.is_err() {
        info!("the circuit was found unsatisfiable");
        // a variable asserted both ways
        let r = write!(out, "c The instance was unsatisfiable\np noncnf 1\n2 -1 1 0\n1 -1 1 0\n");
        if let Err(e) = r {
            io_bail(e);
        }
        return;
    }

    let r = edimacs::write_edimacs(&mut circ, &mut out, opts.notless, opts.perform_coi)
        .and_then(|_| out.flush());
    if let Err(e) = r {
        io_bail(e);
    }
}
