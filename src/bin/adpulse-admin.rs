use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use adpulse::ads::{default_placements, AnalyticsSummary, Clock, SystemClock, TimeRange};
use adpulse::config::{Config, StoreBackend};
use adpulse::storage::{EventFilter, EventStore, SqliteEventStore};

#[derive(Parser)]
#[command(name = "adpulse-admin")]
#[command(about = "Adpulse admin management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print impression/click totals from the event store
    Summary {
        /// Only this ad id
        #[arg(long)]
        ad_id: Option<String>,
        /// Only this ad type
        #[arg(long)]
        ad_type: Option<String>,
        /// Window: 24h, 7d or 30d
        #[arg(long, default_value = "24h", value_parser = parse_time_range)]
        time_range: TimeRange,
    },
    /// List the built-in ad placements
    Placements,
}

fn parse_time_range(raw: &str) -> Result<TimeRange, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|_| format!("unsupported time range '{raw}' (expected 24h, 7d or 30d)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            ad_id,
            ad_type,
            time_range,
        } => {
            let config = Config::from_env()?;
            if config.store.backend != StoreBackend::Sqlite {
                bail!("summary reads a persistent store; set EVENT_STORE=sqlite");
            }

            let store = SqliteEventStore::new(&config.store.url, config.store.max_connections)
                .await
                .with_context(|| format!("failed to open {}", config.store.url))?;
            store.init().await?;

            let filter = EventFilter {
                since_ms: time_range.since(SystemClock.now_ms()),
                ad_id,
                ad_type,
            };
            let summary = AnalyticsSummary::from_events(store.query(&filter).await?);

            println!(
                "Impressions: {}  Clicks: {}  CTR: {:.2}%",
                summary.impressions, summary.clicks, summary.ctr
            );
            if summary.ad_performance.is_empty() {
                println!("No events in range.");
            } else {
                println!(
                    "{:<28} {:<12} {:>11} {:>8} {:>8} {:>9}",
                    "Ad ID", "Type", "Impressions", "Clicks", "CTR", "Revenue"
                );
                println!("{}", "-".repeat(81));
                for perf in summary.ad_performance {
                    println!(
                        "{:<28} {:<12} {:>11} {:>8} {:>7.2}% {:>9.2}",
                        perf.ad_id,
                        perf.ad_type,
                        perf.impressions,
                        perf.clicks,
                        perf.ctr,
                        perf.revenue
                    );
                }
            }
        }
        Commands::Placements => {
            println!(
                "{:<20} {:<24} {:<9} {:<12} {:<11} {}",
                "Key", "ID", "Size", "Slot", "Format", "Responsive"
            );
            println!("{}", "-".repeat(88));
            for (key, placement) in default_placements() {
                println!(
                    "{:<20} {:<24} {:<9} {:<12} {:<11} {}",
                    key,
                    placement.id,
                    placement.size,
                    placement.slot,
                    placement.format.as_str(),
                    if placement.responsive { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}
