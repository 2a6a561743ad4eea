// ABOUTME: CLI binary for sift: extracts a page's ordered image URLs and manages the local collection cache.
// ABOUTME: Results go to stdout, diagnostics to stderr; the exit code tells "no content" from "unreachable".

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sift_extract::{ErrorKind, ExtractError, Extraction, Pipeline, PipelineBuilder, PipelineConfig};
use sift_store::{resolve_store_dir, CacheStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILURE: u8 = 1;
const EXIT_NOT_FOUND: u8 = 2;
const EXIT_NETWORK: u8 = 3;
const EXIT_PARSE: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(version, about = "Extract the ordered image collection of a web page")]
struct Cli {
    /// Directory holding the collection cache (default: the user data directory)
    #[arg(long = "store-dir", global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the image URLs of a page, in reading order
    Extract(ExtractArgs),
    /// List cached collections, oldest first
    List {
        /// Output as JSON
        #[arg(long = "json")]
        json_output: bool,
    },
    /// Record that a cached collection has been saved locally
    MarkCached {
        canonical_url: String,
        local_path: String,
    },
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Page URL (with --html, the URL the file was saved from)
    url: String,

    /// Read the page from an HTML file instead of fetching it
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// Cache the collection after a successful extraction
    #[arg(long = "persist")]
    persist: bool,

    /// Output the full extraction as JSON
    #[arg(long = "json")]
    json_output: bool,

    /// JSON pipeline configuration file
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Fetch timeout in seconds
    #[arg(long = "timeout")]
    timeout: Option<u64>,

    #[arg(long = "user-agent")]
    user_agent: Option<String>,

    #[arg(long = "referer")]
    referer: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long = "insecure")]
    insecure: bool,

    /// Extra denylist substring (repeatable)
    #[arg(long = "deny")]
    deny: Vec<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sift_extract=info,sift_store=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn exit_code_for(err: &ExtractError) -> u8 {
    match err.kind {
        ErrorKind::NotFound => EXIT_NOT_FOUND,
        ErrorKind::Parse => EXIT_PARSE,
        kind if kind.is_network() => EXIT_NETWORK,
        _ => EXIT_FAILURE,
    }
}

fn build_pipeline(args: &ExtractArgs) -> Result<Pipeline, ExtractError> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let mut builder = PipelineBuilder::from_config(config);
    if let Some(secs) = args.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(ua) = &args.user_agent {
        builder = builder.user_agent(ua);
    }
    if let Some(referer) = &args.referer {
        builder = builder.referer(referer);
    }
    if args.insecure {
        builder = builder.verify_tls(false);
    }
    for item in &args.deny {
        builder = builder.deny(item);
    }
    builder.build()
}

fn print_extraction(extraction: &Extraction, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(extraction)?);
    } else {
        for url in &extraction.assets {
            println!("{}", url);
        }
    }
    Ok(())
}

async fn open_store(store_dir: Option<&Path>) -> Result<CacheStore> {
    let dir = resolve_store_dir(store_dir);
    CacheStore::open(&dir)
        .await
        .with_context(|| format!("opening cache in {}", dir.display()))
}

async fn run_extract(args: &ExtractArgs, store_dir: Option<&Path>) -> Result<ExitCode> {
    let pipeline = match build_pipeline(args) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(EXIT_FAILURE));
        }
    };

    let result = match &args.html {
        Some(path) => {
            let html = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            pipeline.extract_html(&html, &args.url)
        }
        None => pipeline.extract(&args.url).await,
    };

    let mut extraction = match result {
        Ok(extraction) => extraction,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(ExitCode::from(exit_code_for(&e)));
        }
    };

    if args.persist {
        match open_store(store_dir).await {
            Ok(store) => {
                pipeline.persist(&mut extraction, &store).await;
                store.close().await;
            }
            Err(e) => tracing::warn!(error = %format!("{:#}", e), "cache unavailable, not persisting"),
        }
    }

    print_extraction(&extraction, args.json_output)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_list(json_output: bool, store_dir: Option<&Path>) -> Result<ExitCode> {
    let store = open_store(store_dir).await?;
    let collections = store.list_all().await?;
    store.close().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&collections)?);
    } else {
        for c in &collections {
            let marker = if c.cached { "*" } else { " " };
            println!("{} {}\t{}\t{} assets", marker, c.canonical_url, c.title, c.assets.len());
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_mark_cached(
    canonical_url: &str,
    local_path: &str,
    store_dir: Option<&Path>,
) -> Result<ExitCode> {
    let store = open_store(store_dir).await?;
    let updated = store.mark_cached(canonical_url, local_path).await?;
    store.close().await;

    if updated {
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("error: no cached collection for {}", canonical_url);
        Ok(ExitCode::from(EXIT_NOT_FOUND))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let store_dir = cli.store_dir.as_deref();

    let outcome = match &cli.command {
        Command::Extract(args) => run_extract(args, store_dir).await,
        Command::List { json_output } => run_list(*json_output, store_dir).await,
        Command::MarkCached {
            canonical_url,
            local_path,
        } => run_mark_cached(canonical_url, local_path, store_dir).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
