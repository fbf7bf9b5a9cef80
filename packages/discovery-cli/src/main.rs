//! `dati-ask`: ask a question, get real rows from Italian open data.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use discovery::{
    CatalogExt, CkanCatalog, Discovery, DiscoveryConfig, DiscoveryRoute, Gazetteer, HttpFetcher,
    OpenAiExtractor, Ontology, PipelineResult, ValidatedFetcher, YearMatch,
};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "dati-ask", version, about = "Find real rows in Italian open data for a question")]
struct Args {
    /// The question, e.g. "Confronta i reati a Milano negli ultimi 5 anni"
    question: String,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Skip the language model even if OPENAI_API_KEY is set
    #[arg(long)]
    no_llm: bool,

    /// Topic ontology JSON replacing the built-in one
    #[arg(long, value_name = "FILE")]
    ontology: Option<PathBuf>,

    /// Gazetteer JSON replacing the built-in one
    #[arg(long, value_name = "FILE")]
    gazetteer: Option<PathBuf>,

    /// HTTP timeout in seconds (overrides HTTP_TIMEOUT_SECS)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Only accept years found in year/period columns
    #[arg(long)]
    strict_years: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,discovery=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let timeout = args
        .timeout
        .map(std::time::Duration::from_secs)
        .unwrap_or(config.http_timeout);

    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let client = ckan_client::CkanClient::new(&config.catalog_url).with_client(http.clone());
    let catalog = CkanCatalog::new(client).rate_limited(config.catalog_requests_per_second);
    let fetcher = ValidatedFetcher::new(HttpFetcher::with_timeout(timeout));

    let mut pipeline_config = DiscoveryConfig::default();
    if args.strict_years {
        pipeline_config = pipeline_config.with_year_match(YearMatch::NamedColumn);
    }

    let mut discovery = Discovery::new(catalog, fetcher).with_config(pipeline_config);

    if let Some(path) = &args.ontology {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ontology {}", path.display()))?;
        discovery =
            discovery.with_ontology(Ontology::from_json(&json).context("Invalid ontology JSON")?);
    }
    if let Some(path) = &args.gazetteer {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read gazetteer {}", path.display()))?;
        discovery =
            discovery.with_gazetteer(Gazetteer::from_json(&json).context("Invalid gazetteer JSON")?);
    }

    match (&config.openai_api_key, args.no_llm) {
        (Some(key), false) => {
            tracing::info!(model = %config.openai_model, "Using remote entity extraction");
            discovery = discovery.with_remote_extractor(
                OpenAiExtractor::new(key.clone())
                    .with_model(&config.openai_model)
                    .with_client(http),
            );
        }
        _ => tracing::info!("Using heuristic entity extraction only"),
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping");
            on_interrupt.cancel();
        }
    });

    let result = discovery.run_with_cancel(&args.question, cancel).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &PipelineResult) {
    let query = &result.query;
    println!(
        "{} {}",
        "Topic:".bold(),
        query.topic.canonical.bright_cyan()
    );
    println!(
        "{} {}",
        "Place:".bold(),
        query.geography.token().unwrap_or("-")
    );
    if let Some((first, last)) = query.year_range() {
        println!("{} {}-{}", "Years:".bold(), first, last);
    }

    let route = match &result.route {
        DiscoveryRoute::Targeted { variant, attempts, .. } => {
            format!("targeted search ({}, {} request(s))", variant, attempts)
        }
        DiscoveryRoute::BroadFallback { scanned, kept } => {
            format!("broad scan ({} scanned, {} kept)", scanned, kept)
        }
        DiscoveryRoute::NotFound => "nothing found".to_string(),
    };
    println!("{} {}", "Route:".bold(), route);

    for summary in &result.datasets {
        let marker = if summary.accepted { "✓".green() } else { "·".dimmed() };
        println!(
            "  {} {} [{}]",
            marker,
            summary.title,
            summary.formats.join(", ")
        );
    }

    if !result.has_real_data {
        println!("{}", "No usable data found.".yellow().bold());
        return;
    }

    if let Some(source) = &result.source {
        println!("{} {}", "Source:".bold(), source.resource_url);
        println!("{} {}", "Sample:".bold(), source.provenance.dimmed());
    }
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        println!("  {}", cells.join("  "));
    }
}
