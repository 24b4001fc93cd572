
// Solve a BC1.0 Boolean circuit: translate to clauses, hand them to the
// batsat SAT solver and map the model back onto the named gates.

extern crate batsat;
extern crate env_logger;
extern crate batcirc_core;
extern crate batcirc_cnf;
extern crate batcirc_run;
#[macro_use] extern crate log;

use {
    std::{env, process},
    batsat::{lbool, Lit, SolverInterface},
    batcirc_core::{Circuit, GateId, Kind},
    batcirc_cnf::{CnfOpts, mark_relevant, number_gates, permute_variables,
                  compute_polarity, collect_clauses, dimacs},
    batcirc_run::{Options, apply_assignments, parse_circuit, print_input_gates},
};

const FLAGS : &[&str] = &[
    "-nosimplify", "-nosolution", "-nots", "-polarity_cnf",
    "-permute_cnf", "-print_inputs",
];

fn usage() {
    eprintln!("\
bcsat, part of the batcirc toolbox; solving by batsat
bcsat <options> [<circuit file>]

  -polarity_cnf   use polarity exploiting CNF translation
  -nosimplify     do not perform simplifications
  -nosolution     do not print a satisfying truth assignment
  -nots           perform an unoptimized CNF-translation with NOT-gates
  -v              switch verbose mode on
  -permute_cnf=s  permute CNF variables with seed s
  -print_inputs   print input gate names
  <circuit file>  input circuit file (if not specified, stdin is used)");
}

fn main() {
    let opts = match Options::parse(env::args().skip(1), FLAGS, 1) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{}", e);
            usage();
            process::exit(1);
        }
    };
    let mut builder = env_logger::Builder::from_default_env();
    if opts.verbose {
        builder.filter_level(log::LevelFilter::Info);
    }
    builder.init();

    let mut circ = parse_circuit(&opts);
    info!("the circuit has {} gates", circ.count_gates());
    if opts.print_inputs {
        print_input_gates(&circ);
    }

    // a solution is reconstructed afterwards, so the inputs must survive
    // the rewriting
    circ.solution_reconstruction = true;

    let rewritten = (|| -> batcirc_core::Result<()> {
        apply_assignments(&mut circ)?;
        circ.remove_underscore_names();
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
        println!("Unsatisfiable");
        return;
    }

    let nof_relevant = mark_relevant(&mut circ, true);
    info!("the circuit has {} relevant gates", nof_relevant);
    if nof_relevant == 0 {
        // already satisfied at translation time
        dimacs::complete_assignment(&mut circ);
        circ.reset_temps(0);
        println!("Satisfiable");
        if opts.print_solution {
            print_assignment(&circ);
        }
        return;
    }

    let (max_var, _) = number_gates(&mut circ, opts.notless);
    if let Some(seed) = opts.permute_seed {
        permute_variables(&mut circ, max_var, seed);
    }
    if opts.polarity {
        compute_polarity(&mut circ);
    }
    let cnf_opts = CnfOpts {
        notless: opts.notless,
        polarity: opts.polarity,
        permute_seed: opts.permute_seed,
        perform_coi: true,
    };
    let clauses = collect_clauses(&circ, &cnf_opts);
    info!("the cnf has {} variables and {} clauses", max_var, clauses.len());

    let mut solver = batsat::Solver::new_with(batsat::SolverOpts::default(), Cb::new());
    let mut vars = Vec::with_capacity(max_var as usize);
    for _ in 0..max_var {
        vars.push(solver.new_var_default());
    }
    let mk_lit = |l: i32| {
        debug_assert!(l != 0 && l.abs() <= max_var);
        Lit::new(vars[(l.abs() - 1) as usize], l > 0)
    };
    let mut tmp: Vec<Lit> = Vec::new();
    for clause in clauses.iter() {
        tmp.clear();
        tmp.extend(clause.iter().map(|&l| mk_lit(l)));
        solver.add_clause_reuse(&mut tmp);
    }

    let res = solver.solve_limited(&[]);
    info!("sat.conflicts {}, sat.decisions {}, sat.propagations {}, sat.restarts {}, sat.gc {}",
          solver.num_conflicts(), solver.num_decisions(), solver.num_propagations(),
          solver.cb().n_restarts, solver.cb().n_gc_calls);
    if res != lbool::TRUE {
        debug_assert_eq!(res, lbool::FALSE);
        circ.reset_temps(0);
        println!("Unsatisfiable");
        return;
    }

    // install the model on the numbered gates, then complete it
    let ids: Vec<GateId> = circ.gate_ids().collect();
    for &g in ids.iter() {
        let t = circ.gate(g).temp;
        if t <= 0 {
            continue;
        }
        let v = solver.value_lit(mk_lit(t)) == lbool::TRUE;
        circ.assign(g, v).expect("model disagrees with a forced gate");
    }
    circ.reset_temps(0);
    dimacs::complete_assignment(&mut circ);

    println!("Satisfiable");
    if opts.print_solution {
        print_assignment(&circ);
    }
}

/// Callbacks for the SAT solver; only keeps a couple of counters.
struct Cb {
    n_restarts: u32,
    n_gc_calls: u32,
}

impl Cb {
    fn new() -> Self {
        Cb { n_restarts: 0, n_gc_calls: 0 }
    }
}

impl batsat::Callbacks for Cb {
    #[inline(always)]
    fn on_restart(&mut self) { self.n_restarts += 1 }
    #[inline(always)]
    fn on_gc(&mut self, _: usize, _: usize) { self.n_gc_calls += 1 }
}

fn print_assignment(circ: &Circuit) {
    let mut items = Vec::new();
    for (_, gate) in circ.iter() {
        if gate.kind() != Kind::Var {
            continue;
        }
        for name in gate.names() {
            items.push(format!("{}{}", if gate.value() { "" } else { "~" }, name));
        }
    }
    println!("{}", items.join(" "));
}
