use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use serpsim::aggregator::{Aggregator, KeywordReport};
use serpsim::analyzer::{AnalyzerKind, TextAnalyzer};
use serpsim::api::{AppState, create_router};
use serpsim::client::{SerpApiClient, truncate};
use serpsim::config::{
    BatchConfig, CONFIG, Credential, FieldPolicy, LocationPolicy, MAX_CALLS_PER_KEYWORD,
};
use serpsim::driver::BatchDriver;
use serpsim::export::{ArtifactStore, DirectoryStore, ZipArchiveStore, export_reports};
use serpsim::input::{parse_list, read_keywords_file};
use serpsim::similarity::TfIdfVectorizer;

#[derive(Parser)]
#[command(
    name = "serpsim",
    about = "Compare search results and AI overviews across locations and repeated calls",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one batch and print the per-keyword reports
    Run(RunArgs),
    /// Serve the batch API over HTTP
    Serve(ServeArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum AnalyzerArg {
    Plain,
    English,
}

impl From<AnalyzerArg> for AnalyzerKind {
    fn from(arg: AnalyzerArg) -> Self {
        match arg {
            AnalyzerArg::Plain => AnalyzerKind::Plain,
            AnalyzerArg::English => AnalyzerKind::English,
        }
    }
}

#[derive(Args)]
struct CommonArgs {
    /// API key; falls back to SERPAPI_API_KEY
    #[arg(long)]
    api_key: Option<String>,

    /// Search endpoint; falls back to SERPAPI_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Delay after each successful call, in milliseconds
    #[arg(long)]
    pacing_ms: Option<u64>,

    /// Per-request timeout, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Tokenization used for similarity scoring
    #[arg(long, value_enum, default_value = "plain")]
    analyzer: AnalyzerArg,
}

impl CommonArgs {
    fn credential(&self) -> Option<Credential> {
        self.api_key
            .clone()
            .or_else(|| CONFIG.api_key.clone())
            .map(Credential::new)
    }

    fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms.unwrap_or(CONFIG.pacing_ms))
    }

    fn client(&self) -> Result<SerpApiClient> {
        let base_url = self.base_url.clone().unwrap_or_else(|| CONFIG.base_url.clone());
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(CONFIG.timeout_secs));
        SerpApiClient::new(base_url, timeout)
    }

    fn aggregator(&self) -> Aggregator {
        Aggregator::new(TfIdfVectorizer::new(TextAnalyzer::for_kind(
            self.analyzer.into(),
        )))
    }
}

#[derive(Args)]
struct RunArgs {
    /// Semicolon-separated keywords, e.g. "best coffee; espresso"
    #[arg(short, long, required_unless_present = "keywords_file")]
    keywords: Option<String>,

    /// File with one keyword per line
    #[arg(long, conflicts_with = "keywords")]
    keywords_file: Option<PathBuf>,

    /// Semicolon-separated locations, e.g. "Austin, Texas; Paris, France"
    #[arg(short, long)]
    locations: String,

    /// Calls per keyword
    #[arg(
        short = 'n',
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CALLS_PER_KEYWORD as u64)
    )]
    num_calls: u64,

    #[arg(long, default_value = "google.com")]
    domain: String,

    #[arg(long, default_value = "us")]
    gl: String,

    #[arg(long, default_value = "en")]
    hl: String,

    /// Ask the API to bypass its cache
    #[arg(long)]
    no_cache: bool,

    /// Shuffle the locations per keyword instead of rotating in order
    #[arg(long)]
    shuffle: bool,

    /// Fail a call when an organic result lacks title, snippet or link
    #[arg(long)]
    strict_fields: bool,

    /// Directory for CSV exports and raw responses
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Bundle raw responses into one zip archive inside --out
    #[arg(long, requires = "out")]
    zip: bool,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on; falls back to SERPSIM_BIND_ADDR
    #[arg(long)]
    bind: Option<String>,

    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Also picks up `log` records from the library.
    tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_target(true)
        .init();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Serve(args) => serve(args).await,
    }
}

fn batch_config(args: &RunArgs) -> Result<BatchConfig> {
    let keywords = match (&args.keywords, &args.keywords_file) {
        (_, Some(path)) => read_keywords_file(path)?,
        (Some(raw), None) => parse_list(raw),
        (None, None) => Vec::new(),
    };
    let config = BatchConfig {
        keywords,
        locations: parse_list(&args.locations),
        num_calls: args.num_calls as usize,
        domain: args.domain.clone(),
        gl: args.gl.clone(),
        hl: args.hl.clone(),
        no_cache: args.no_cache,
        credential: args.common.credential().unwrap_or_default(),
        location_policy: if args.shuffle {
            LocationPolicy::Shuffle
        } else {
            LocationPolicy::Rotate
        },
        field_policy: if args.strict_fields {
            FieldPolicy::Strict
        } else {
            FieldPolicy::Lenient
        },
        pacing: args.common.pacing(),
    };
    config.validate()?;
    Ok(config)
}

async fn run(args: RunArgs) -> Result<()> {
    let config = batch_config(&args)?;
    let client = args.common.client()?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current call");
            on_ctrl_c.cancel();
        }
    });

    let mut driver = BatchDriver::new(client, config).with_cancellation(cancel);
    if let Some(out) = &args.out {
        let raw_store: Box<dyn ArtifactStore> = if args.zip {
            std::fs::create_dir_all(out)
                .with_context(|| format!("Failed to create {}", out.display()))?;
            Box::new(ZipArchiveStore::create(&out.join("raw_responses.zip"))?)
        } else {
            Box::new(DirectoryStore::new(out)?)
        };
        driver = driver.with_store(raw_store);
    }

    let result = driver.run().await;
    if let Some(store) = driver.take_store() {
        store.close()?;
    }

    let reports = args.common.aggregator().report_all(&result);

    if let Some(out) = &args.out {
        let mut store = DirectoryStore::new(out)?;
        export_reports(&mut store, &result.keywords, &reports)?;
        println!("Exports written to {}", store.root().display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    let summary = result.summary();
    println!(
        "run {}: {} answered, {} without result, {} failed{}",
        result.run_id,
        summary.answered,
        summary.no_result,
        summary.failed,
        if result.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}

fn print_report(report: &KeywordReport) {
    println!("== {}", report.keyword);
    println!(
        "   calls: {} answered, {} without result, {} failed",
        report.summary.answered, report.summary.no_result, report.summary.failed
    );
    if !report.no_result_indices.is_empty() {
        println!("   no answer/overview on calls: {:?}", report.no_result_indices);
    }
    for failure in &report.failures {
        println!(
            "   call {} ({}) failed [{}]: {}",
            failure.call_index, failure.location, failure.kind, failure.detail
        );
    }

    for doc in &report.documents {
        println!(
            "   [call {} / {}] {}",
            doc.call_index,
            doc.source_location,
            truncate(&doc.text, 120)
        );
    }

    if let Some(matrix) = &report.similarity {
        println!("   similarity:");
        for (label, row) in matrix.labels.iter().zip(&matrix.values) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.3}")).collect();
            println!("     {:<28} {}", label, cells.join("  "));
        }
        if let Some(mean) = report.mean_similarity {
            println!("     mean pairwise similarity: {mean:.3}");
        }
    }

    let overlap = &report.link_overlap;
    println!(
        "   links: {} shared, {} AI-only, {} organic-only",
        overlap.shared.len(),
        overlap.ai_only.len(),
        overlap.organic_only.len()
    );
    for link in &overlap.shared {
        println!("     shared: {link}");
    }

    let occ = &report.organic_occurrences;
    println!(
        "   organic links across calls: {} shared ({:.1}%), {} distinct ({:.1}%)",
        occ.shared_count, occ.shared_pct, occ.distinct_count, occ.distinct_pct
    );
}

async fn serve(args: ServeArgs) -> Result<()> {
    let client = args.common.client()?;
    let state = Arc::new(AppState::new(
        client,
        args.common.aggregator(),
        args.common.credential(),
        args.common.pacing(),
    ));
    let app = create_router(state);

    let addr = args.bind.unwrap_or_else(|| CONFIG.bind_addr.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
