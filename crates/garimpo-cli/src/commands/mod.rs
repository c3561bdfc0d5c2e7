//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod merge;
pub mod process;
