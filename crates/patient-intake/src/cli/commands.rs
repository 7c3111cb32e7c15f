//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on, overriding the configuration
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Patient record commands.
#[derive(Debug, Subcommand)]
pub enum PatientsCommand {
    /// List registered patients
    List {
        /// Maximum number of patients to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Number of patients to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one patient
    Show {
        /// The patient ID
        patient_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Password rule registry commands.
#[derive(Debug, Subcommand)]
pub enum RulesCommand {
    /// List password rules
    List {
        /// Include disabled rules
        #[arg(short, long)]
        all: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Enable a rule
    Enable {
        /// The rule ID
        rule_id: String,
    },

    /// Disable a rule
    Disable {
        /// The rule ID
        rule_id: String,
    },
}

/// Password commands.
#[derive(Debug, Subcommand)]
pub enum PasswordCommand {
    /// Check a password against the enabled rules
    Check {
        /// The password to check
        password: String,

        /// Patient ID the password would belong to
        #[arg(short, long)]
        patient_id: Option<String>,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_output_format_debug() {
        let format = OutputFormat::Json;
        let debug_str = format!("{format:?}");
        assert_eq!(debug_str, "Json");
    }

    #[test]
    fn test_patients_command_debug() {
        let cmd = PatientsCommand::Show {
            patient_id: "P-1001".to_string(),
            json: true,
        };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
        assert!(debug_str.contains("P-1001"));
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("Show"));
    }
}
