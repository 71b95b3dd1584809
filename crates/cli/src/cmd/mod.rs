//! CLI subcommand implementations

pub mod example_config;
pub mod simulate;
