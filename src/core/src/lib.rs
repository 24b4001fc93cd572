
#[macro_use] extern crate log;
extern crate bit_set;
extern crate fxhash;
extern crate smallvec;

pub mod gate;
pub mod circuit;
mod simplify;
mod normalize;
mod counter;
mod share;

pub use crate::{
    gate::{Gate, GateId, Kind},
    circuit::{Circuit, ChildIter, Inconsistent, Result},
};
