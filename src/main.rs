mod aggregate;
mod capacity;
mod checks;
mod collectors;
mod config;
mod extract;
mod metrics;
mod range;
mod render;
mod snapshot;
mod status;
mod threshold;

use checks::{CheckError, CheckOutcome};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use collectors::nodes::{build_client, fetch_node_stats};
use collectors::report::load_report;
use config::Config;
use render::{render, Format};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "healthcheck")]
#[command(version)]
struct Cli {
    /// YAML config; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long)]
    print_default_config: bool,
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a certificate-expiry report file.
    Certs {
        #[arg(long)]
        report: PathBuf,
    },
    /// Check filesystem, heap, cpu and GC statistics of cluster nodes.
    Nodes {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long = "strip-prefix")]
        strip_prefixes: Vec<String>,
        #[arg(short, long, value_name = "KEY=RANGE")]
        warning: Vec<String>,
        #[arg(short, long, value_name = "KEY=RANGE")]
        critical: Vec<String>,
    },
}

const GENERIC_CHECK_NAME: &str = "HEALTHCHECK";

impl Command {
    fn check_name(&self) -> &'static str {
        match self {
            Command::Certs { .. } => checks::certs::CHECK_NAME,
            Command::Nodes { .. } => checks::nodes::CHECK_NAME,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.print_default_config {
        print!("{}", Config::example_yaml());
        return;
    }

    let check = cli
        .command
        .as_ref()
        .map_or(GENERIC_CHECK_NAME, Command::check_name);
    let outcome = match run(cli.config.as_deref(), cli.command).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(check, error = %err, "проверка не выполнена");
            CheckOutcome::unknown(check, &err)
        }
    };

    match render(&outcome, cli.format) {
        Ok(text) => println!("{text}"),
        Err(err) => {
            error!(check, error = %err, "не удалось сформировать вывод");
            println!("{check} UNKNOWN - {err}");
            std::process::exit(status::Status::Unknown.exit_code());
        }
    }
    std::process::exit(outcome.status.exit_code());
}

async fn run(
    config_path: Option<&Path>,
    command: Option<Command>,
) -> Result<CheckOutcome, CheckError> {
    let command = command.ok_or(CheckError::MissingCommand)?;
    let cfg = load_config(config_path)?;

    match command {
        Command::Certs { report } => {
            let policy = cfg.freshness_policy()?;
            let report = load_report(&report)?;
            checks::certs::evaluate(&report, Utc::now(), &policy)
        }
        Command::Nodes {
            endpoint,
            token,
            strip_prefixes,
            warning,
            critical,
        } => {
            let thresholds = cfg.thresholds_with(&warning, &critical)?;
            let endpoint = endpoint
                .or_else(|| cfg.endpoint.clone())
                .filter(|e| !e.trim().is_empty())
                .ok_or(CheckError::MissingEndpoint)?;
            let prefixes = if strip_prefixes.is_empty() {
                cfg.strip_prefixes.clone()
            } else {
                strip_prefixes
            };
            let token = resolve_token(token, &cfg.token_env);
            debug!(
                thresholds = !thresholds.is_empty(),
                token = token.is_some(),
                "параметры проверки узлов подготовлены"
            );

            info!(endpoint = %endpoint, timeout_secs = cfg.timeout_secs, "запрос статистики узлов");
            let client = build_client(cfg.timeout())?;
            let stats = fetch_node_stats(&client, &endpoint, token.as_deref()).await?;
            checks::nodes::evaluate(&stats, &prefixes, &thresholds)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config, CheckError> {
    match path {
        Some(path) => {
            let cfg = Config::load_from_file(path)?;
            info!(path = %path.display(), "конфигурация загружена");
            Ok(cfg)
        }
        None => Ok(Config::default()),
    }
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn resolve_token(cli_token: Option<String>, env_name: &str) -> Option<String> {
    cli_token
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| resolve_token_from_env(env_name))
}

fn resolve_token_from_env(env_name: &str) -> Option<String> {
    if let Ok(v) = std::env::var(env_name) {
        if !v.trim().is_empty() {
            return Some(v.trim().to_string());
        }
    }
    None
}
