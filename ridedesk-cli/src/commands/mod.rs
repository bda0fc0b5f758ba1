//! CLI subcommands.

pub mod common;
pub mod config;
pub mod delete;
pub mod demand;
pub mod list;
pub mod track;
