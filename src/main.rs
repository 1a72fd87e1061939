use chainserve::{
    Result,
    commands::{
        ConfigArgs, InvokeArgs, handle_config_command, handle_invoke_command, load_config,
    },
    server::ChainServer,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "chainserve")]
#[command(about = "Serve LLM prompt templates as HTTP endpoints")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Start {
        /// Override server host
        #[arg(long)]
        host: Option<String>,

        /// Override server port
        #[arg(long)]
        port: Option<u16>,

        /// Config file to use instead of the default location
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate configuration and list the routes it defines
    Config(ConfigArgs),

    /// Send input to a route of a running server and print the output
    Invoke(InvokeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.command {
        Commands::Start { config, .. } => config.clone(),
        Commands::Config(args) => args.config.clone(),
        Commands::Invoke(_) => None,
    };

    // Initialize tracing
    init_tracing(cli.verbose, config_path.as_ref())?;

    match cli.command {
        Commands::Start { host, port, config } => start_server(host, port, config).await,
        Commands::Config(args) => handle_config_command(args).await,
        Commands::Invoke(args) => handle_invoke_command(args).await,
    }
}

async fn start_server(host: Option<String>, port: Option<u16>, config: Option<PathBuf>) -> Result<()> {
    info!("Starting chainserve...");

    let mut config = load_config(config.as_ref())?;

    // Override config with CLI args if provided
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let server = ChainServer::new(config);
    if let Err(e) = server.start().await {
        if e.is_startup_error() {
            error!("Startup aborted: {}", e);
        } else {
            error!("Server error: {}", e);
        }
        return Err(e);
    }

    Ok(())
}

fn init_tracing(verbose: bool, config_path: Option<&PathBuf>) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    // Load config to get logging preferences
    let config = load_config(config_path).unwrap_or_default();

    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter);

    // Add file logging if enabled
    if config.server.log_file_enabled {
        let log_dir = config.log_dir()?;

        let rotation = match config.server.log_rotation.as_str() {
            "minutely" => Rotation::MINUTELY,
            "hourly" => Rotation::HOURLY,
            "daily" => Rotation::DAILY,
            "never" => Rotation::NEVER,
            _ => {
                eprintln!(
                    "Warning: Invalid log rotation '{}', using daily",
                    config.server.log_rotation
                );
                Rotation::DAILY
            }
        };

        let file_appender =
            RollingFileAppender::new(rotation, &log_dir, &config.server.log_file_prefix);

        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        registry
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .init();

        // The writer must outlive every span; the process exits with it
        std::mem::forget(guard);
    } else {
        registry.init();
    }

    Ok(())
}
