use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use safe_core::config::{SafeConfig, WarnLevel};
use safe_core::types::AgentRole;
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved configuration and agent bindings
    Show,

    /// Validate the config for common mistakes
    Validate,

    /// Write a default safe.yaml in the current directory
    Init,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config_path: Option<&Path>, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config_path, json),
        ConfigSubcommand::Validate => validate(config_path, json),
        ConfigSubcommand::Init => init(json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let missing = config.missing_api_keys();

    if json {
        return print_json(&serde_json::json!({
            "config": config,
            "missing_api_keys": missing,
        }));
    }

    println!("Tier:      {}", config.tier.label());
    println!(
        "Cadence:   {} sprints per PI, {} weeks per sprint, {} workdays per week",
        config.sprints_per_pi, config.weeks_per_sprint, config.workdays_per_week
    );
    println!("Team size: {}", config.team_size);
    if let Some(seed) = config.seed {
        println!("Seed:      {seed}");
    }
    println!();

    let rows = AgentRole::all()
        .iter()
        .map(|role| {
            let binding = config.binding(*role);
            let env = &config.provider_config(binding.provider).api_key_env;
            vec![
                role.display_name().to_string(),
                binding.provider.to_string(),
                binding.model_or_default().to_string(),
                env.clone(),
                if missing.contains(env) { "missing" } else { "set" }.to_string(),
            ]
        })
        .collect();
    print_table(&["AGENT", "PROVIDER", "MODEL", "KEY", "STATUS"], rows);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(json: bool) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let (path, written) = SafeConfig::init(&cwd).context("failed to write config")?;

    if json {
        print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "created": written,
        }))?;
    } else if written {
        println!("Created {}", path.display());
    } else {
        println!("{} already exists", path.display());
    }
    Ok(())
}
