//! Command-line workflows, decoupled from argument parsing.

pub mod orchestration;
