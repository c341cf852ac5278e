//! Stackplan: deployment plan synthesis for a serverless generation stack.
//!
//! Resolves the target environment, places the function into the
//! environment's VPC when required, wires cross-resource references and
//! emits an ordered, fingerprinted plan.

pub mod cli;
pub mod core;
pub mod telemetry;
