//! CLI subcommands.

pub mod common;
pub mod config;
pub mod run;
pub mod status;
pub mod sync;
pub mod tiles;
pub mod token;
