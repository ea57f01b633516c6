//! Configuration view and validation commands: `settle config`.

use anyhow::Result;
use std::path::Path;

use settle::config::{CONFIG_FILE_NAME, Config, SettleToml, default_locations};

use super::super::{Cli, ConfigCommands};

fn print_settings(toml: &SettleToml) {
    println!("[backend]");
    println!("  base_url = \"{}\"", toml.backend.base_url);
    match toml.backend.timeout_secs {
        Some(secs) => println!("  timeout_secs = {}", secs),
        None => println!("  timeout_secs = (none)"),
    }
    println!();
    println!("[batch]");
    println!("  pacing_ms = {}", toml.batch.pacing_ms);
    println!("  slot_plan = \"{}\"", toml.batch.slot_plan);
    println!("  slot_count = {}", toml.batch.slot_count);
}

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Settle Configuration");
            println!("====================");
            println!();

            let (file, source) = SettleToml::discover(cli.config.as_deref(), project_dir)?;
            match &source {
                Some(path) => println!("Config file: {}", path.display()),
                None => {
                    println!("No {} found. Searched:", CONFIG_FILE_NAME);
                    for location in default_locations(project_dir) {
                        println!("  - {}", location.display());
                    }
                }
            }
            println!();
            print_settings(&file);
            println!();

            // Effective values include env/CLI overrides
            println!("Effective values (with env/CLI overrides):");
            let config = Config::load(
                cli.config.as_deref(),
                project_dir,
                cli.base_url.clone(),
                None,
            )?;
            println!();
            print_settings(config.settings());
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let (file, source) = SettleToml::discover(cli.config.as_deref(), project_dir)?;
            if source.is_none() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            }

            let warnings = file.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let config_path = cli
                .config
                .clone()
                .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            SettleToml::default().save(&config_path)?;

            println!("Created {} at {}", CONFIG_FILE_NAME, config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [backend] base_url, timeout_secs");
            println!("  - [batch] pacing_ms, slot_plan, slot_count");
            println!();
        }
    }

    Ok(())
}
