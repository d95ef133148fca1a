//! devgate CLI
//!
//! Usage:
//!   devgate serve [--config devgate.yaml] [--port 8080] [--app-origin http://127.0.0.1:5173]
//!   devgate contexts [--root .] [--check] [--json]

use clap::{Parser, Subcommand, ValueEnum};
use devgate::config::{env::process_env, Config, Origin};
use devgate::dispatch::{self, Dispatcher};
use devgate::{BaseConfig, ProxyServer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

#[derive(Parser, Debug)]
#[command(name = "devgate")]
#[command(author, version, about = "Development request router and test context dispatcher")]
struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the dev server in front of the local application
    Serve {
        /// YAML config file
        #[arg(short, long, env = "DEVGATE_CONFIG")]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file)
        #[arg(short, long, env = "DEVGATE_PORT")]
        port: Option<u16>,

        /// Origin of the local application (overrides the config file)
        #[arg(long, env = "DEVGATE_APP_ORIGIN")]
        app_origin: Option<String>,
    },

    /// Show how test files are split between the client and server contexts
    Contexts {
        /// Project root containing `src/`
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Exit non-zero if any file is orphaned or claimed twice
        #[arg(long)]
        check: bool,

        /// Print the contexts and the partition as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    let result = match args.command {
        Command::Serve {
            config,
            port,
            app_origin,
        } => serve(config, port, app_origin).await,
        Command::Contexts { root, check, json } => contexts(root, check, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(
    config_path: Option<PathBuf>,
    port: Option<u16>,
    app_origin: Option<String>,
) -> Result<ExitCode, anyhow::Error> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path, process_env)?,
        None => Config::from_env(process_env)?,
    };
    if let Some(port) = port {
        config.listen.port = port;
    }
    if let Some(origin) = app_origin {
        config.app_origin = Origin::parse(&origin)?;
    }

    let base = BaseConfig::assemble(&config)?;
    info!(
        "Features: {}",
        serde_json::to_string(&base.features).unwrap_or_default()
    );

    let server = ProxyServer::new(&config, &base)?;
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }
    Ok(ExitCode::SUCCESS)
}

fn contexts(root: PathBuf, check: bool, json: bool) -> Result<ExitCode, anyhow::Error> {
    let config = Config::from_env_flags(process_env);
    let base = Arc::new(BaseConfig::assemble(&config)?);
    let dispatcher = Dispatcher::new(base)?;
    let files = dispatch::discover(&root)?;
    let partition = dispatcher.partition(files);

    if json {
        let report = serde_json::json!({
            "dispatcher": dispatcher,
            "partition": partition,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_partition(&dispatcher, &partition);
    }

    if check {
        if let Err(e) = partition.verify() {
            eprintln!("{RED}{BOLD}✗{RESET} {e}");
            return Ok(ExitCode::FAILURE);
        }
        if !json {
            println!("{GREEN}{BOLD}✓{RESET} every test file runs in exactly one context");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_partition(dispatcher: &Dispatcher, partition: &dispatch::Partition) {
    println!("{BOLD}{CYAN}Test contexts{RESET}");
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!(
        "{DIM}__TEST__ = {}{RESET}",
        dispatcher.base.defines.test
    );

    let groups = [
        (&dispatcher.client.context, &partition.client),
        (&dispatcher.server.context, &partition.server),
    ];
    for (context, files) in groups {
        println!(
            "\n{BOLD}{}{RESET} {DIM}({:?}, {} file(s)){RESET}",
            context.name,
            context.environment,
            files.len()
        );
        println!("  {DIM}include:{RESET} {}", context.include.sources().join(" "));
        println!("  {DIM}exclude:{RESET} {}", context.exclude.sources().join(" "));
        for file in files {
            println!("  {GREEN}•{RESET} {}", dispatch::to_slash(file));
        }
    }

    if !partition.orphaned.is_empty() {
        println!("\n{YELLOW}{BOLD}never run{RESET}");
        for file in &partition.orphaned {
            println!("  {YELLOW}•{RESET} {}", dispatch::to_slash(file));
        }
    }
    if !partition.overlapping.is_empty() {
        println!("\n{RED}{BOLD}claimed by both contexts{RESET}");
        for file in &partition.overlapping {
            println!("  {RED}•{RESET} {}", dispatch::to_slash(file));
        }
    }
}
