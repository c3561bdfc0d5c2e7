//! Config command - inspect and bootstrap the pipeline configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;

use garimpo_core::models::config::GarimpoConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,

    /// Write a config file with the default values
    Init {
        /// Target path (default: the user config location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check that a config file parses
    Check {
        /// Config file to validate
        file: PathBuf,
    },

    /// Show where the config file is looked up
    Path,
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show(),
        ConfigCommand::Init { output, force } => init(output, force),
        ConfigCommand::Check { file } => check(&file),
        ConfigCommand::Path => path(),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("garimpo")
        .join("config.json")
}

fn load_or_default(path: &Path) -> anyhow::Result<GarimpoConfig> {
    if path.exists() {
        Ok(GarimpoConfig::from_file(path)?)
    } else {
        Ok(GarimpoConfig::default())
    }
}

fn show() -> anyhow::Result<()> {
    let config_path = default_config_path();
    if !config_path.exists() {
        println!("{} No config file, showing defaults.", style("ℹ").blue());
    }
    let config = load_or_default(&config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init(output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let output_path = output.unwrap_or_else(default_config_path);

    if output_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    GarimpoConfig::default().save(&output_path)?;
    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );
    Ok(())
}

fn check(file: &Path) -> anyhow::Result<()> {
    match GarimpoConfig::from_file(file) {
        Ok(_) => {
            println!("{} {} is valid", style("✓").green(), file.display());
            Ok(())
        }
        Err(e) => anyhow::bail!("{}: {}", file.display(), e),
    }
}

fn path() -> anyhow::Result<()> {
    let config_path = default_config_path();
    println!("Configuration file: {}", config_path.display());
    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'garimpo config init' to create one.");
    }
    Ok(())
}
