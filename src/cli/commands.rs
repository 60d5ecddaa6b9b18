//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - serve: run the MCP server on stdio (default)
//! - tools: print the tool catalog
//! - call: dispatch a single tool call
//! - validate: check the API key against the upstream

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ransomware-mcp - ransomware.live tools for LLM agents
#[derive(Parser, Debug)]
#[command(name = "ransomware-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Serve MCP (JSON-RPC 2.0) on stdin/stdout
    Serve,

    /// List available tools
    Tools {
        /// Print the full catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dispatch one tool call and print the response envelope
    Call {
        /// Tool name, e.g. get-group-detail
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Check that the API key is accepted
    Validate,
}
