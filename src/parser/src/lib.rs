
#[macro_use] extern crate log;
extern crate fxhash;
extern crate batcirc_core;

pub mod parser;

pub use crate::{
    parser::{parse, parse_stdin, parse_str, Error, Result},
};
