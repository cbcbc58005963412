// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// ModLink - Modbus to OPC UA bridge
///
/// Polls outbound Modbus devices, accepts inbound modem devices, mirrors
/// every tag into an OPC UA address space and serves an HTTP admin API.
#[derive(Parser, Debug)]
#[command(
    name = "modlink",
    author = "Sylvex <contact@sylvex.io>",
    version,
    about = "Modbus to OPC UA bridge",
    propagate_version = true
)]
pub struct Cli {
    /// Settings file path (YAML or TOML)
    #[arg(short, long, default_value = "modlink.yaml", env = "MODLINK_CONFIG", global = true)]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", env = "MODLINK_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, default_value = "text", env = "MODLINK_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the bridge (default when no subcommand is given)
    Run,

    /// Validate the settings file and device catalog without starting
    Validate,
}

/// Log output formats.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text (default).
    Text,
    /// Structured JSON for log aggregation.
    Json,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["modlink"]);
        assert_eq!(cli.config, PathBuf::from("modlink.yaml"));
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.log_format, LogFormat::Text);
        assert!(cli.command.is_none());
    }

    #[test]
    fn validate_subcommand() {
        let cli = Cli::parse_from(["modlink", "--config", "x.toml", "validate"]);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Some(Commands::Validate)));
    }
}
