//! Command-line interface: training, inspection and reset of value tables

pub mod commands;
pub mod output;
