use clap::Args;
use std::path::PathBuf;
use tracing::{error, info};

use crate::router::RouteTableFactory;
use crate::{Config, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config file to validate instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write a config file with the default routes and exit
    #[arg(long)]
    pub init: bool,
}

pub fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

pub async fn handle_config_command(args: ConfigArgs) -> Result<()> {
    if args.init {
        return init_config(args.config);
    }

    info!("Validating configuration...");

    let config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            return Err(e);
        }
    };

    // Resolves every route's model; nothing is sent over the network
    let table = match RouteTableFactory::from_config(&config) {
        Ok(table) => table,
        Err(e) => {
            error!("Route validation failed: {}", e);
            return Err(e);
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Default model: {}", config.routing.default_model);
    println!("  Routes: {}", table.len());
    for path in table.paths() {
        if let Ok(route) = table.route(path) {
            println!(
                "    POST /{}/invoke → {} [{}]",
                path,
                route.model.name(),
                route.template.input_fields().join(", ")
            );
        }
    }

    if let Ok(config_dir) = Config::config_dir() {
        println!("  Config directory: {}", config_dir.display());
    }

    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => Config::config_file()?,
    };

    if path.exists() {
        println!("Config already exists at {}, leaving it untouched", path.display());
        return Ok(());
    }

    Config::default().save_to(&path)?;
    println!("✓ Wrote default configuration to {}", path.display());
    Ok(())
}
