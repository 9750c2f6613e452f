//! `nimbus-reports config` command - Configuration management
//!
//! Shows the effective configuration and where it is read from.

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::config::LOCAL_CONFIG_FILE;
use crate::core::odata::odata_base_url;
use crate::core::Config;

use super::load_config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show,

    /// Show paths to configuration files
    Path,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show => run_show(global),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show(global: &GlobalOpts) -> Result<()> {
    let config = load_config()?;

    if global.format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&effective_values(&config)).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();

    print_config_value("base_url", config.base_url.as_deref());
    if let Some(ref url) = config.base_url {
        print_config_value("odata_root", Some(&odata_base_url(url)));
    }
    print_config_value("user_id", config.user_id.map(|id| id.to_string()).as_deref());
    print_config_value(
        "auth_token",
        config.auth_token.as_ref().map(|_| "<redacted>"),
    );
    print_config_value("timeout_secs", Some(&config.timeout_secs().to_string()));
    print_config_value("page_size", Some(&config.page_size().to_string()));
    print_config_value("max_records", Some(&config.max_records().to_string()));
    print_config_value(
        "schedule_batch_size",
        Some(&config.schedule_batch_size().to_string()),
    );
    print_config_value(
        "hierarchy_ttl_hours",
        Some(&config.hierarchy_ttl_hours().to_string()),
    );

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("{}", style("  1. Environment variables (NIMBUS_*)").dim());
    println!("{}", style(format!("  2. ./{}", LOCAL_CONFIG_FILE)).dim());
    println!("{}", style("  3. Global config").dim());

    Ok(())
}

fn effective_values(config: &Config) -> serde_json::Value {
    serde_json::json!({
        "base_url": config.base_url,
        "user_id": config.user_id,
        "auth_token": config.auth_token.as_ref().map(|_| "<redacted>"),
        "timeout_secs": config.timeout_secs(),
        "page_size": config.page_size(),
        "max_records": config.max_records(),
        "schedule_batch_size": config.schedule_batch_size(),
        "hierarchy_ttl_hours": config.hierarchy_ttl_hours(),
    })
}

fn print_config_value(key: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {} = {}", style(key).cyan(), v),
        None => println!("  {} = {}", style(key).cyan(), style("(not set)").dim()),
    }
}

fn run_path() -> Result<()> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    print_path("Local", Some(local));
    print_path("Global", Config::global_config_path());
    Ok(())
}

fn print_path(label: &str, path: Option<PathBuf>) {
    match path {
        Some(p) => {
            let marker = if p.exists() {
                style("✓").green()
            } else {
                style("✗").dim()
            };
            println!("{} {}: {}", marker, label, p.display());
        }
        None => println!("{} {}: {}", style("✗").dim(), label, style("(unavailable)").dim()),
    }
}
