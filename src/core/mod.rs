//! Core synthesis logic: config parsing, environment resolution,
//! graph building, wiring, planning.

pub mod builder;
pub mod environment;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod outputs;
pub mod parser;
pub mod resolver;
pub mod synth;
pub mod types;
pub mod vpc;
pub mod wiring;
