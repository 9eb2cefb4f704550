//! Subcommands.

pub mod assemble;
pub mod clip;
pub mod clips;
pub mod config;
pub mod parse;
