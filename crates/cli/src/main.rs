use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use hookedit_api::{ApiConfig, HttpApi};
use hookedit_core::{Entity, Patch, Webhook, WebhookIds, WEBHOOK_SELECTOR};
use hookedit_edit::{Collaborators, EditSession, Navigator, Notifier, Severity, View};
use tracing::{error, info};

mod input;

#[derive(Parser, Debug)]
#[command(name = "hookctl", version, about = "Edit or delete webhook integrations")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// API server root (default: $HOOKEDIT_API_URL)
    #[arg(long = "api-url", global = true)]
    api_url: Option<String>,

    /// API key sent as bearer token
    #[arg(long = "api-key", env = "HOOKEDIT_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout-secs", env = "HOOKEDIT_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the tracked fields of a webhook
    Get {
        application_id: String,
        webhook_id: String,
    },
    /// Edit a webhook and send only the fields that changed
    Edit {
        application_id: String,
        webhook_id: String,
        /// YAML/JSON file mapping field names to new values
        #[arg(long = "file")]
        file: Option<PathBuf>,
        /// Set a field, e.g. base_url=https://example.com or uplink_message={"path":"/up"}
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        /// Unset a field on the remote side
        #[arg(long = "clear", value_name = "FIELD")]
        clear: Vec<String>,
        /// Print the patch without sending it
        #[arg(long = "dry-run", action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Delete a webhook
    Delete {
        application_id: String,
        webhook_id: String,
        /// Confirm deletion
        #[arg(long = "yes", action = ArgAction::SetTrue)]
        yes: bool,
    },
}

/// Success toasts go to stdout, errors to stderr.
struct ConsoleSinks { output: Output }

impl Notifier for ConsoleSinks {
    fn notify(&self, message: &str, severity: Severity) {
        match (severity, self.output) {
            (Severity::Success, Output::Human) => println!("✓ {}", message),
            // keep stdout parseable in json mode
            (Severity::Success, Output::Json) => eprintln!("{}", message),
            (Severity::Error, _) => eprintln!("error: {}", message),
        }
    }
}

impl Navigator for ConsoleSinks {
    fn navigate(&self, path: &str) {
        info!(path = %path, "navigate");
        if self.output == Output::Human {
            println!("→ {}", path);
        }
    }
}

fn init_tracing() {
    let env = std::env::var("HOOKEDIT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("HOOKEDIT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid HOOKEDIT_METRICS_ADDR; expected host:port");
        }
    }
}

/// Flags win over the environment.
fn resolve_config(cli: &Cli) -> Result<ApiConfig> {
    let mut cfg = match &cli.api_url {
        Some(url) => ApiConfig::new(url.clone()),
        None => ApiConfig::from_env().context("pass --api-url or set HOOKEDIT_API_URL")?,
    };
    if let Some(key) = &cli.api_key {
        cfg.api_key = Some(key.clone());
    }
    if let Some(secs) = cli.timeout_secs.filter(|s| *s > 0) {
        cfg.timeout = Duration::from_secs(secs);
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let sinks = Arc::new(ConsoleSinks { output: cli.output });

    // Error boundary: any fetch/commit failure aborts the command
    if let Err(e) = run(cli, sinks.clone()).await {
        error!(error = ?e, "command failed");
        sinks.notify(&format!("{:#}", e), Severity::Error);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, sinks: Arc<ConsoleSinks>) -> Result<()> {
    let cfg = resolve_config(&cli)?;
    let api = Arc::new(HttpApi::new(&cfg)?);
    let deps = Collaborators::new(api, sinks.clone(), sinks.clone());

    match cli.command {
        Commands::Get { application_id, webhook_id } => {
            let ids = WebhookIds::new(&application_id, &webhook_id)?;
            info!(webhook = %ids, "get invoked");
            let mut session = EditSession::mount(ids, WEBHOOK_SELECTOR, deps);
            if let View::Form(webhook) = session.ready().await? {
                print_webhook(webhook, cli.output)?;
            }
        }
        Commands::Edit { application_id, webhook_id, file, set, clear, dry_run } => {
            let ids = WebhookIds::new(&application_id, &webhook_id)?;
            info!(webhook = %ids, dry_run, "edit invoked");
            let overlay = file.as_deref().map(input::read_overlay).transpose()?;
            let mut session = EditSession::mount(ids, WEBHOOK_SELECTOR, deps);
            session.ready().await?;
            let original = session.original().ok_or_else(|| anyhow!("webhook not loaded"))?;
            let edited = input::build_edited(&original, overlay.as_ref(), &set, &clear, WEBHOOK_SELECTOR)?;

            if dry_run {
                let ctl = session.controller().ok_or_else(|| anyhow!("webhook not loaded"))?;
                print_patch(&ctl.compute_patch(&edited), &original, cli.output)?;
                return Ok(());
            }
            let patch = session.submit(&edited).await?;
            print_patch(&patch, &original, cli.output)?;
        }
        Commands::Delete { application_id, webhook_id, yes } => {
            let ids = WebhookIds::new(&application_id, &webhook_id)?;
            if !yes {
                return Err(anyhow!("refusing to delete {} without --yes", ids));
            }
            info!(webhook = %ids, "delete invoked");
            let mut session = EditSession::mount(ids, WEBHOOK_SELECTOR, deps);
            session.ready().await?;
            session.delete().await?;
        }
    }

    Ok(())
}

fn print_webhook(webhook: &Webhook, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            println!("Edit Webhook  {}", webhook.ids);
            let entity = Entity::from_webhook(webhook, WEBHOOK_SELECTOR)?;
            for field in WEBHOOK_SELECTOR.fields() {
                let value = entity.get(*field).map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
                println!("  {:<16} {}", field.name(), value);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(webhook)?),
    }
    Ok(())
}

fn print_patch(patch: &Patch, original: &Entity, output: Output) -> Result<()> {
    match output {
        Output::Human => {
            if patch.is_empty() {
                println!("no changes");
                return Ok(());
            }
            let s = patch.summarize(original);
            println!("adds={} updates={} clears={}", s.adds, s.updates, s.clears);
            for (field, value) in patch.iter() {
                println!("  {:<16} {}", field.name(), value);
            }
        }
        Output::Json => println!("{}", serde_json::to_string_pretty(&patch.to_json())?),
    }
    Ok(())
}
