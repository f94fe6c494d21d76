//! CLI entry point for mmdevice
//!
//! Inspects device modules without writing a host:
//! - `adapters`: module names found under the search paths
//! - `devices <module>`: the devices a module declares
//! - `info <module>`: module path and interface versions
//!
//! # Usage
//!
//! ```bash
//! mmdevice --search-path /opt/micro-manager adapters
//! mmdevice --search-path /opt/micro-manager devices DemoCamera --json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mmdevice::config::{MmConfig, DEFAULT_CONFIG_FILE};
use mmdevice::{logging, PluginManager};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mmdevice")]
#[command(about = "Inspect native microscope device modules", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Additional module search directory (repeatable, searched first)
    #[arg(long = "search-path", global = true)]
    search_paths: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List device modules available under the search paths
    Adapters,

    /// List the devices a module declares
    Devices {
        /// Module name, e.g. DemoCamera
        module: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show a module's path and interface versions
    Info {
        /// Module name
        module: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MmConfig::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    config.search_paths.splice(0..0, cli.search_paths.iter().cloned());
    config.validate().map_err(anyhow::Error::msg)?;
    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    let manager = PluginManager::from_config(&config)?;

    match cli.command {
        Commands::Adapters => list_adapters(&manager),
        Commands::Devices { module, json } => list_devices(&manager, &module, json),
        Commands::Info { module, json } => show_info(&manager, &module, json),
    }
}

fn list_adapters(manager: &PluginManager) -> Result<()> {
    let names = manager.available_device_adapters();
    if names.is_empty() {
        eprintln!("No device modules found in {:?}", manager.search_paths());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn list_devices(manager: &PluginManager, module: &str, json: bool) -> Result<()> {
    let adapter = manager.get_device_adapter(module)?;
    let descriptors = adapter
        .descriptors()
        .with_context(|| format!("enumerating devices of {module}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    let name_width = descriptors
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    println!("{:>3}  {:<name_width$}  {:<14}  Description", "#", "Name", "Type");
    for d in &descriptors {
        println!(
            "{:>3}  {:<name_width$}  {:<14}  {}",
            d.index,
            d.name,
            d.device_type.to_string(),
            d.description
        );
    }
    Ok(())
}

fn show_info(manager: &PluginManager, module: &str, json: bool) -> Result<()> {
    let adapter = manager.get_device_adapter(module)?;
    let descriptor = adapter.descriptor();

    if json {
        println!("{}", serde_json::to_string_pretty(&descriptor)?);
        return Ok(());
    }

    println!("Module:            {}", descriptor.name);
    match &descriptor.path {
        Some(path) => println!("Path:              {}", path.display()),
        None => println!("Path:              (in-process)"),
    }
    println!("Module version:    {}", descriptor.module_version);
    println!("Device interface:  {}", descriptor.device_interface_version);
    println!("Devices:           {}", adapter.device_count()?);
    Ok(())
}
