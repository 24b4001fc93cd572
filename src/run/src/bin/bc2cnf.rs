
// Translate a BC1.0 Boolean circuit into an equi-satisfiable DIMACS CNF
// formula.

extern crate batcirc_core;
extern crate batcirc_cnf;
extern crate batcirc_logger;
extern crate batcirc_run;
#[macro_use] extern crate log;

use {
    std::{env, process, io::Write},
    batcirc_cnf::{CnfOpts, dimacs},
    batcirc_run::{Options, apply_assignments, open_output, parse_circuit,
                  print_input_gates, io_bail},
};

const FLAGS : &[&str] = &[
    "-all", "-nosimplify", "-nocoi", "-nots", "-polarity_cnf",
    "-permute_cnf", "-print_inputs",
];

fn usage() {
    eprintln!("\
bc2cnf, part of the batcirc toolbox
bc2cnf <options> [<circuit file>] [<cnf file>]

  -v              switch verbose mode on
  -all            preserve all solutions (default: preserve satisfiability)
  -nosimplify     do not perform simplifications
  -nocoi          do not perform final cone of influence
  -nots           perform an unoptimized CNF-translation with NOT-gates
  -polarity_cnf   use polarity exploiting CNF translation
  -permute_cnf=s  permute CNF variables with seed s
  -print_inputs   print input gate names
  <circuit file>  input circuit file (if not specified, stdin is used)
  <cnf file>      output cnf file (if not specified, stdout is used)");
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

    // constrain, simplify, normalize; any derived inconsistency means the
    // instance is solved and a trivial unsatisfiable formula is written
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
        if let Err(e) = dimacs::write_trivial_unsat(&mut out).and_then(|_| out.flush()) {
            io_bail(e);
        }
        return;
    }

    if log_enabled!(log::Level::Info) {
        let (max_min, max_max) = circ.compute_stats();
        info!("the max-min height of the circuit is {}", max_min);
        info!("the max-max height of the circuit is {}", max_max);
    }

    let cnf_opts = CnfOpts {
        notless: opts.notless,
        polarity: opts.polarity,
        permute_seed: opts.permute_seed,
        perform_coi: opts.perform_coi,
    };
    match dimacs::write_cnf(&mut circ, &mut out, &cnf_opts).and_then(|_| out.flush()) {
        Ok(_) => (),
        Err(e) => io_bail(e),
    }
}
