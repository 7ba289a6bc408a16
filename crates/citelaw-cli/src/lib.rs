//! citelaw: the command-line surface over citation detection, graph
//! building, and amendment-impact analysis.

pub mod cli;
pub mod commands;
pub mod config;
pub mod source;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
