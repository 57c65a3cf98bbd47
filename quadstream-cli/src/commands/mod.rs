//! CLI subcommands.

pub mod common;
pub mod config;
pub mod inspect;
pub mod simulate;
