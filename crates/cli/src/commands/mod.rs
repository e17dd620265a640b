//! Subcommand implementations

pub mod dataset;
pub mod inspect;
pub mod predict;
pub mod train;
