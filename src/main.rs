use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use shop_activity::config::Config;
use shop_activity::constants::DEFAULT_RECENT_LIMIT;
use shop_activity::domain::{activity_aliases, ActivityKind, Metadata};
use shop_activity::observability::metrics;
use shop_activity::storage::{self, ActivityStorage};
use shop_activity::ActivityLogger;

#[derive(Parser)]
#[command(name = "shop_activity")]
#[command(about = "Record and inspect shop user activity for the recommendation feed")]
#[command(version = "0.1.0")]
struct Cli {
    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one activity if its type is recognized
    Log {
        /// Acting user id
        #[arg(long)]
        user: i64,
        /// Product the activity refers to
        #[arg(long)]
        product: i64,
        /// Activity type or alias (e.g. view_product, view, buy)
        #[arg(long = "type")]
        activity_type: Option<String>,
        /// Metadata as a JSON object
        #[arg(long)]
        meta: Option<String>,
    },
    /// List canonical activity kinds and their aliases
    Kinds,
    /// Show a user's most recent activities
    Recent {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Count stored activities per kind
    Counts {
        /// Restrict to one product
        #[arg(long)]
        product: Option<i64>,
    },
}

fn parse_metadata(raw: Option<&str>) -> Result<Metadata> {
    match raw {
        Some(json) => serde_json::from_str(json).context("--meta must be a JSON object"),
        None => Ok(Metadata::new()),
    }
}

async fn run_log(
    storage: std::sync::Arc<dyn ActivityStorage>,
    user: i64,
    product: i64,
    activity_type: Option<&str>,
    metadata: Metadata,
) -> Result<()> {
    let logger = ActivityLogger::new(storage);
    match logger.try_log_activity(user, product, activity_type, metadata).await {
        Ok(Some(event)) => {
            metrics::activity::accepted(event.activity_type);
            info!(user, product, kind = %event.activity_type, "Activity recorded");
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(())
        }
        Ok(None) => {
            metrics::activity::rejected();
            warn!(user, product, raw_type = ?activity_type, "Unrecognized activity type");
            bail!("unrecognized activity type: {:?}", activity_type.unwrap_or(""))
        }
        Err(e) => {
            metrics::activity::write_error();
            Err(anyhow::Error::new(e).context("failed to store activity"))
        }
    }
}

fn print_kinds() {
    for kind in ActivityKind::ALL {
        let aliases: Vec<&str> = activity_aliases()
            .iter()
            .filter(|(_, target)| *target == kind)
            .map(|(alias, _)| *alias)
            .collect();
        if aliases.is_empty() {
            println!("{}", kind);
        } else {
            println!("{}  (aliases: {})", kind, aliases.join(", "));
        }
    }
}

async fn run_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Log {
            user,
            product,
            activity_type,
            meta,
        } => {
            let metadata = parse_metadata(meta.as_deref())?;
            let storage = storage::open_storage(&config.storage)?;
            run_log(storage, user, product, activity_type.as_deref(), metadata).await?;
        }
        Commands::Kinds => print_kinds(),
        Commands::Recent { user, limit } => {
            let storage = storage::open_storage(&config.storage)?;
            let events = storage
                .get_recent_activities_for_actor(user, Some(limit.unwrap_or(DEFAULT_RECENT_LIMIT)))
                .await?;
            if events.is_empty() {
                println!("No activity recorded for user {}", user);
            }
            for event in events {
                println!(
                    "{}  {:<12}  product {}",
                    event.created_at.format("%Y-%m-%d %H:%M:%S"),
                    event.activity_type.as_str(),
                    event.subject_id
                );
            }
        }
        Commands::Counts { product } => {
            let storage = storage::open_storage(&config.storage)?;
            let counts = storage.count_activities_by_kind(product).await?;
            for kind in ActivityKind::ALL {
                println!("{:<12} {}", kind.as_str(), counts.get(&kind).copied().unwrap_or(0));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = shop_activity::logging::init_logging(&config.logging)?;

    if cli.metrics {
        metrics::init()?;
    }

    // Metrics are printed even when the command fails
    let outcome = run_command(cli.command, &config).await;

    if let Some(rendered) = metrics::render() {
        println!("{}", rendered);
    }

    outcome
}
