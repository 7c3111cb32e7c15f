//! Command-line interface for patient-intake.
//!
//! This module provides the CLI structure for the `intake` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, OutputFormat, PasswordCommand, PatientsCommand, RulesCommand, ServeCommand,
    StatusCommand,
};

/// intake - Register patients through a web form
///
/// Serves the patient details form, stores registrations in a local `SQLite`
/// database, and manages the password rules applied to new registrations.
#[derive(Debug, Parser)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeCommand),

    /// Show database status
    Status(StatusCommand),

    /// Inspect registered patients
    #[command(subcommand)]
    Patients(PatientsCommand),

    /// Manage password rules
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Check passwords against the rules
    #[command(subcommand)]
    Password(PasswordCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
