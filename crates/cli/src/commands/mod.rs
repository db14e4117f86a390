//! CLI subcommands.

pub mod catalog;
pub mod content;
pub mod sponsors;
