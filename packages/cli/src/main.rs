//! tabletally command-line interface.
//!
//! Subcommands cover the whole lifecycle: schema bootstrap, sitemap
//! ingestion, batched extraction, and aggregate reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvest::{
    analytics, ingest_sitemap, BatchRunner, HttpFetcher, PostgresStore, ReferenceData,
    RunnerConfig,
};

mod config;
use config::Config;

#[derive(Parser)]
#[command(name = "tabletally")]
#[command(about = "Harvest and report metadata for recorded tabletop sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema
    DbInit,

    /// Ingest post URLs from a sitemap into the backlog
    IngestSitemap {
        /// Sitemap URL
        url: String,
    },

    /// Run batched metadata extraction over the backlog
    Extract {
        /// Records selected per batch
        #[arg(long, default_value_t = 25)]
        batch_size: usize,

        /// Delay between page fetches, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,

        /// Number of batches to run
        #[arg(long, conflicts_with = "until_empty")]
        batches: Option<usize>,

        /// Keep running batches until the backlog is empty
        #[arg(long)]
        until_empty: bool,

        /// Hard cap on total posts processed this run
        #[arg(long)]
        max_posts: Option<usize>,
    },

    /// Print aggregate reports
    Stats {
        /// Rows per report
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,harvest=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::DbInit => cmd_db_init(&config).await,
        Commands::IngestSitemap { url } => cmd_ingest_sitemap(&config, &url).await,
        Commands::Extract {
            batch_size,
            delay_ms,
            batches,
            until_empty,
            max_posts,
        } => cmd_extract(&config, batch_size, delay_ms, batches, until_empty, max_posts).await,
        Commands::Stats { limit } => cmd_stats(&config, limit).await,
    }
}

async fn get_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn cmd_db_init(config: &Config) -> Result<()> {
    let pool = get_pool(config).await?;
    let store = PostgresStore::new(pool);
    store.migrate().await.context("Failed to create schema")?;

    println!("Database initialized.");
    Ok(())
}

async fn cmd_ingest_sitemap(config: &Config, url: &str) -> Result<()> {
    let pool = get_pool(config).await?;
    let store = PostgresStore::new(pool);
    let client = reqwest::Client::new();

    let count = ingest_sitemap(&client, &store, url)
        .await
        .context("Sitemap ingestion failed")?;

    println!("Done. Ingested {count} URLs.");
    Ok(())
}

async fn cmd_extract(
    config: &Config,
    batch_size: usize,
    delay_ms: u64,
    batches: Option<usize>,
    until_empty: bool,
    max_posts: Option<usize>,
) -> Result<()> {
    let pool = get_pool(config).await?;
    let store = PostgresStore::new(pool);

    let refs = ReferenceData::load_from_dir(&config.data_dir)
        .context("Failed to load reference data")?;
    tracing::info!(
        groups = refs.groups.len(),
        systems = refs.systems.len(),
        data_dir = %config.data_dir.display(),
        "reference data loaded"
    );

    let mut runner_config = RunnerConfig::new()
        .with_batch_size(batch_size)
        .with_delay_ms(delay_ms);
    runner_config = if until_empty {
        runner_config.until_empty()
    } else {
        runner_config.with_max_batches(batches.unwrap_or(1))
    };
    if let Some(cap) = max_posts {
        runner_config = runner_config.with_max_posts(cap);
    }

    let fetcher = HttpFetcher::new();
    let summary = BatchRunner::new(&store, &fetcher, &refs, runner_config)
        .run()
        .await
        .context("Extraction run failed")?;

    println!(
        "Processed {} posts in {} batches: {} updated, {} failed.",
        summary.processed, summary.batches, summary.updated, summary.failed
    );
    Ok(())
}

async fn cmd_stats(config: &Config, limit: i64) -> Result<()> {
    let pool = get_pool(config).await?;

    let summary = analytics::summary(&pool).await?;
    println!("== Summary ==");
    println!("total posts:        {}", summary.total_posts);
    println!("with duration:      {}", summary.with_duration);
    println!("missing duration:   {}", summary.missing_duration);
    println!("hours (all):        {:.1}", summary.total_hours_all);
    println!("hours (sessions):   {:.1}", summary.total_hours_sessions);

    println!("\n== Top groups by hours ==");
    for row in analytics::top_groups_by_hours(&pool, limit).await? {
        println!("{:<40} {:>8.1}h {:>5} items", row.name, row.hours, row.items);
    }

    println!("\n== Top authors by hours ==");
    for row in analytics::top_authors_by_hours(&pool, limit).await? {
        println!("{:<40} {:>8.1}h {:>5} items", row.name, row.hours, row.items);
    }

    println!("\n== Top systems by hours ==");
    for row in analytics::top_systems_by_hours(&pool, limit).await? {
        println!("{:<40} {:>8.1}h {:>5} items", row.name, row.hours, row.items);
    }

    println!("\n== Top systems by session count ==");
    for row in analytics::top_systems_by_count(&pool, limit).await? {
        println!("{:<40} {:>5} sessions {:>8.1}h", row.name, row.sessions, row.hours);
    }

    println!("\n== Top campaigns by hours ==");
    for row in analytics::top_campaigns_by_hours(&pool, limit).await? {
        println!("{:<40} {:>8.1}h {:>5} items", row.name, row.hours, row.items);
    }

    println!("\n== Group x system by hours ==");
    for row in analytics::top_group_system_pairs(&pool, limit).await? {
        println!(
            "{:<28} {:<28} {:>8.1}h {:>5} sessions",
            row.group_name, row.name, row.hours, row.sessions
        );
    }

    println!("\n== Group x campaign by hours ==");
    for row in analytics::top_group_campaign_pairs(&pool, limit).await? {
        println!(
            "{:<28} {:<28} {:>8.1}h {:>5} sessions",
            row.group_name, row.name, row.hours, row.sessions
        );
    }

    println!("\n== Session posts missing duration ==");
    for row in analytics::missing_duration_urls(&pool, limit).await? {
        println!(
            "{}  [{}]",
            row.url,
            row.group_name.as_deref().unwrap_or("(unknown)")
        );
    }

    Ok(())
}
