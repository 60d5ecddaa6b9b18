//! CLI module for ransomware-mcp - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for serving, inspecting the
//! catalog, and one-off tool calls.

pub mod commands;

pub use commands::Cli;
