
//! Shared plumbing for the command line frontends.
//!
//! All tools accept the same option surface; a frontend lists the subset
//! it understands. Exit codes: 0 for success (a proven-unsatisfiable
//! instance is a success), 1 for usage or I/O errors, -1 for parse errors.

#[macro_use] extern crate log;
extern crate batcirc_core;
extern crate batcirc_parser;

use {
    std::{fs, io::{self, Read, Write}, process},
    batcirc_core::Circuit,
};

/// The options shared across the frontends.
#[derive(Clone,Debug)]
pub struct Options {
    pub verbose: bool,
    pub preserve_all_solutions: bool,
    pub perform_simplifications: bool,
    pub perform_coi: bool,
    pub notless: bool,
    pub polarity: bool,
    pub permute_seed: Option<u32>,
    pub print_inputs: bool,
    pub print_solution: bool,
    pub infile: Option<String>,
    pub outfile: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            verbose: false,
            preserve_all_solutions: false,
            perform_simplifications: true,
            perform_coi: true,
            notless: true,
            polarity: false,
            permute_seed: None,
            print_inputs: false,
            print_solution: true,
            infile: None,
            outfile: None,
        }
    }
}

impl Options {
    /// Parse the command line. `flags` names the flags this tool accepts
    /// and `max_files` how many positional file arguments it takes.
    pub fn parse<I>(args: I, flags: &[&str], max_files: usize) -> Result<Options, String>
        where I: Iterator<Item=String>
    {
        let mut o = Options::default();
        let mut files = 0;
        for arg in args {
            let known = |f: &str| flags.contains(&f);
            if arg == "-v" || arg == "-verbose" {
                o.verbose = true;
            } else if arg == "-all" && known("-all") {
                o.preserve_all_solutions = true;
            } else if arg == "-nosimplify" && known("-nosimplify") {
                o.perform_simplifications = false;
            } else if arg == "-nocoi" && known("-nocoi") {
                o.perform_coi = false;
            } else if arg == "-nots" && known("-nots") {
                o.notless = false;
            } else if arg == "-polarity_cnf" && known("-polarity_cnf") {
                o.polarity = true;
            } else if arg == "-nosolution" && known("-nosolution") {
                o.print_solution = false;
            } else if arg == "-print_inputs" && known("-print_inputs") {
                o.print_inputs = true;
            } else if arg.starts_with("-permute_cnf=") && known("-permute_cnf") {
                let seed = arg["-permute_cnf=".len()..].parse::<u32>()
                    .map_err(|_| format!("bad seed in `{}'", arg))?;
                o.permute_seed = Some(seed);
            } else if arg.starts_with('-') {
                return Err(format!("unknown command line argument `{}'", arg));
            } else if files < max_files {
                if files == 0 {
                    o.infile = Some(arg);
                } else {
                    o.outfile = Some(arg);
                }
                files += 1;
            } else {
                return Err("too many file arguments".to_string());
            }
        }
        Ok(o)
    }
}

/// Open the input file, or stdin when none was given. Exits 1 on failure.
pub fn open_input(opts: &Options) -> Box<dyn Read> {
    match opts.infile {
        None => Box::new(io::BufReader::new(io::stdin())),
        Some(ref f) => match fs::File::open(f) {
            Ok(file) => Box::new(io::BufReader::new(file)),
            Err(_) => {
                eprintln!("cannot open `{}' for input", f);
                process::exit(1);
            }
        },
    }
}

/// Open the output file, or stdout when none was given. Exits 1 on failure.
pub fn open_output(opts: &Options) -> Box<dyn Write> {
    match opts.outfile {
        None => Box::new(io::BufWriter::new(io::stdout())),
        Some(ref f) => match fs::File::create(f) {
            Ok(file) => Box::new(io::BufWriter::new(file)),
            Err(_) => {
                eprintln!("cannot open `{}' for output", f);
                process::exit(1);
            }
        },
    }
}

/// Parse the circuit from the configured input. Exits -1 on parse errors.
pub fn parse_circuit(opts: &Options) -> Circuit {
    info!("parsing from {}", opts.infile.as_ref().map(|s| &s[..]).unwrap_or("stdin"));
    let input = open_input(opts);
    match batcirc_parser::parse(input) {
        Ok(circ) => circ,
        Err(e) => {
            eprintln!("parse error: {}", e);
            process::exit(-1);
        }
    }
}

/// Drain the two initial constraint queues through force_true/force_false.
pub fn apply_assignments(circ: &mut Circuit) -> batcirc_core::Result<()> {
    while let Some(g) = circ.assigned_to_true.pop_front() {
        circ.force_true(g)?;
    }
    while let Some(g) = circ.assigned_to_false.pop_front() {
        circ.force_false(g)?;
    }
    Ok(())
}

/// Print the names of the input gates, one line.
pub fn print_input_gates(circ: &Circuit) {
    let mut names = Vec::new();
    for (_, gate) in circ.iter() {
        if gate.kind() == batcirc_core::Kind::Var {
            names.extend(gate.names().map(|n| n.to_string()));
        }
    }
    println!("The input gates are: {}", names.join(" "));
}

/// Exit with status 1 after an I/O failure while writing output.
pub fn io_bail(e: io::Error) -> ! {
    eprintln!("error writing output: {}", e);
    process::exit(1);
}
