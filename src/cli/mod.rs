//! CLI layer for llm-gateway.
//!
//! Provides the command-line interface using clap, with commands for
//! plain, role-based, streamed and structured chat plus the template
//! catalog.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
