//! dynroute: serve a directory of Rust route files.
//!
//! ```text
//! dynroute [--config FILE] [--log-level L] serve [--bind ADDR] [--api-dir D] [--middleware-dir D]
//! dynroute [--config FILE] routes [--json]
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use dynroute::config::{self, Config};
use dynroute::http::{AxumRegistrar, ClientIpPolicy, HttpServer};
use dynroute::lifecycle::{self, Shutdown, Startup};
use dynroute::observability::{logging, metrics};
use dynroute::routing::RouteTable;
use dynroute::LoadError;

#[derive(Parser)]
#[command(name = "dynroute", version)]
#[command(about = "Compile and serve a directory of Rust route files", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `observability.log_level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every route and start the server
    Serve {
        #[arg(long)]
        bind: Option<String>,

        #[arg(long)]
        api_dir: Option<String>,

        #[arg(long)]
        middleware_dir: Option<String>,
    },
    /// Compile every route and print the route table
    Routes {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Commands::Serve {
        bind,
        api_dir,
        middleware_dir,
    } = &cli.command
    {
        if let Some(bind) = bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(dir) = api_dir {
            config.routes.api_dir = dir.clone();
        }
        if let Some(dir) = middleware_dir {
            config.routes.middleware_dir = dir.clone();
        }
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("dynroute v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Serve { .. } => serve(config).await,
        Commands::Routes { json } => list_routes(config, json).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<LoadError>() {
            Some(load) => tracing::error!(category = load.category(), error = %load, "Route loading failed"),
            None => tracing::error!(error = %e, "Fatal error"),
        }
        // Already logged.
        std::process::exit(1);
    }
    Ok(())
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let startup = Startup::new(config.clone())?;
    let mut registrar = AxumRegistrar::new(ClientIpPolicy::from_config(&config.listener));
    startup.load_into(&mut registrar).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.timeouts.request_secs,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, registrar.into_router());
    let mut serving = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let finished = tokio::select! {
        finished = &mut serving => Some(finished),
        _ = lifecycle::forward_signals(&shutdown) => None,
    };
    match finished {
        Some(result) => result??,
        None => serving.await??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn list_routes(config: Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let startup = Startup::new(config)?;
    let mut table = RouteTable::new();
    let summary = startup.load_into(&mut table).await?;

    if json {
        let document = serde_json::json!({ "summary": summary, "table": table });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    for route in &table.routes {
        println!("{:<7} {:<40} middleware={}", route.verb, route.path, route.middleware);
    }
    println!(
        "{} routes from {} files, {} global middleware ({} compiled, {} reused)",
        summary.routes, summary.files, summary.middleware, summary.compiled, summary.reused
    );
    Ok(())
}
