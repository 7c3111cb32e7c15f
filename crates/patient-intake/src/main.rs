//! `intake` - CLI for patient-intake
//!
//! This binary runs the patient intake web form and provides commands for
//! inspecting registrations and managing the password rules.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::Parser;

use patient_intake::cli::{
    Cli, Command, ConfigCommand, OutputFormat, PasswordCommand, PatientsCommand, RulesCommand,
};
use patient_intake::password::{PasswordPolicy, RuleState};
use patient_intake::storage::RuleFilter;
use patient_intake::{init_logging, server, Config, PatientRecord, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // These must work even when the configuration does not load
    if let Command::Config(ConfigCommand::Path) = cli.command {
        println!("{}", Config::default_config_path().display());
        return Ok(());
    }
    if let Command::Config(ConfigCommand::Validate { ref file }) = cli.command {
        return handle_config_validate(file.clone().or_else(|| cli.config.clone()));
    }

    // Load configuration
    let mut config =
        Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    // Execute the command
    match cli.command {
        Command::Serve(serve_cmd) => {
            if let Some(bind) = serve_cmd.bind {
                config.server.bind_address = bind;
                config.validate()?;
            }
            server::serve(&config).await?;
            Ok(())
        }
        Command::Status(status_cmd) => handle_status(&config, status_cmd.json),
        Command::Patients(patients_cmd) => handle_patients(&config, patients_cmd),
        Command::Rules(rules_cmd) => handle_rules(&config, rules_cmd),
        Command::Password(password_cmd) => handle_password(&config, password_cmd),
        Command::Config(config_cmd) => handle_config(&config, &config_cmd),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    Storage::from_config(config).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path().display()
        )
    })
}

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = open_storage(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "bind_address": config.server.bind_address,
            "total_patients": stats.total_patients,
            "total_rules": stats.total_rules,
            "enabled_rules": stats.enabled_rules,
            "newest_registration": stats.newest_registration,
            "db_size_bytes": stats.db_size_bytes,
            "enforce_rules": config.policy.enforce_rules,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("intake status");
        println!("-------------");
        println!("Database:      {}", config.database_path().display());
        println!("Size:          {} bytes", stats.db_size_bytes);
        println!("Patients:      {}", stats.total_patients);
        println!(
            "Rules:         {} ({} enabled)",
            stats.total_rules, stats.enabled_rules
        );
        match stats.newest_registration {
            Some(at) => println!("Last intake:   {}", at.to_rfc3339()),
            None => println!("Last intake:   never"),
        }
        println!("Listen on:     {}", config.server.bind_address);
    }
    Ok(())
}

fn handle_patients(config: &Config, cmd: PatientsCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        PatientsCommand::List {
            limit,
            offset,
            format,
        } => {
            let patients = storage.list_patients(limit, offset)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&patients)?),
                OutputFormat::Table => print_patient_table(&patients),
                OutputFormat::Plain => {
                    for p in &patients {
                        println!(
                            "{}\t{}\t{}\t{}\t{}",
                            p.patient_id, p.patient_name, p.age, p.blood_group, p.gender
                        );
                    }
                }
            }
            if format != OutputFormat::Json && patients.is_empty() {
                println!("No patients registered.");
            }
        }
        PatientsCommand::Show { patient_id, json } => {
            let Some(patient) = storage.get_patient(&patient_id)? else {
                bail!("patient {patient_id} not found");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&patient)?);
            } else {
                println!("Patient ID:   {}", patient.patient_id);
                println!("Name:         {}", patient.patient_name);
                println!("Age:          {}", patient.age);
                println!("Blood group:  {}", patient.blood_group);
                println!("Gender:       {}", patient.gender.label());
                println!("Registered:   {}", patient.created_at.to_rfc3339());
                println!("Address:");
                for line in patient.address.lines() {
                    println!("  {line}");
                }
            }
        }
    }
    Ok(())
}

fn print_patient_table(patients: &[PatientRecord]) {
    if patients.is_empty() {
        return;
    }
    println!(
        "{:<16} {:<30} {:>4} {:<12} {:<7} {}",
        "PATIENT ID", "NAME", "AGE", "BLOOD GROUP", "GENDER", "REGISTERED"
    );
    for p in patients {
        println!(
            "{:<16} {:<30} {:>4} {:<12} {:<7} {}",
            truncate(&p.patient_id, 16),
            truncate(&p.patient_name, 30),
            p.age,
            p.blood_group.label(),
            p.gender.value(),
            p.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

fn handle_rules(config: &Config, cmd: RulesCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        RulesCommand::List { all, json } => {
            let filter = RuleFilter {
                state: if all { None } else { Some(RuleState::Enabled) },
                limit: usize::MAX,
                offset: 0,
            };
            let rules = storage.list_rules(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                for rule in &rules {
                    println!(
                        "{:>3}  {:<8} {:<12} {:<6} {:<26} {}",
                        rule.order_no,
                        rule.state.as_str(),
                        rule.rule_type.as_str(),
                        rule.validation_type.as_str(),
                        rule.name,
                        rule.rule_id.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
        RulesCommand::Enable { rule_id } => set_state(&storage, &rule_id, RuleState::Enabled)?,
        RulesCommand::Disable { rule_id } => set_state(&storage, &rule_id, RuleState::Disabled)?,
    }
    Ok(())
}

fn set_state(storage: &Storage, rule_id: &str, state: RuleState) -> Result<()> {
    if !storage.set_rule_state(rule_id, state)? {
        bail!("rule {rule_id} not found");
    }
    println!("Rule {rule_id} is now {state}.");
    Ok(())
}

fn handle_password(config: &Config, cmd: PasswordCommand) -> Result<()> {
    let storage = open_storage(config)?;

    match cmd {
        PasswordCommand::Check {
            password,
            patient_id,
        } => {
            let policy = PasswordPolicy::new(storage.enabled_rules()?);
            let outcome = policy.validate(&password, patient_id.as_deref())?;
            if outcome.is_valid() {
                println!("valid");
            } else {
                println!("invalid");
                for message in &outcome.messages {
                    println!("  {message}");
                }
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind_address);
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Security]");
                println!(
                    "  Argon2 memory:      {} KiB",
                    config.security.argon2_memory_kib
                );
                println!("  Argon2 iterations:  {}", config.security.argon2_iterations);
                println!(
                    "  Argon2 parallelism: {}",
                    config.security.argon2_parallelism
                );
                println!();
                println!("[Policy]");
                println!("  Enforce rules:      {}", config.policy.enforce_rules);
                println!("  Seed default rules: {}", config.policy.seed_default_rules);
                println!();
                println!("[Intake]");
                println!("  Max age:            {}", config.intake.max_age);
                println!("  Max field length:   {}", config.intake.max_field_length);
                println!("  Max address length: {}", config.intake.max_address_length);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_config_validate(file.clone())?,
    }
    Ok(())
}

fn handle_config_validate(file: Option<std::path::PathBuf>) -> Result<()> {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::load_from(Some(path)) {
        Ok(_) => {
            println!("Configuration is valid.");
            Ok(())
        }
        Err(e) => bail!("configuration error: {e}"),
    }
}
