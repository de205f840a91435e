use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use semflow::brief::{find_row, read_brief, write_brief};
use semflow::config::{Config, EmbedderBackend};
use semflow::drag::{DragSettings, RemovalMode};
use semflow::embeddings::download::{download_model, embedding_model_dir};
use semflow::embeddings::onnx::SentenceEmbedder;
use semflow::embeddings::openai::OpenAiEmbedder;
use semflow::embeddings::EmbeddingProvider;
use semflow::keywords::load_keywords_csv;
use semflow::nlp::google::GoogleNlpClassifier;
use semflow::nlp::taxonomy::{all_categories, search_categories};
use semflow::output::terminal;
use semflow::pipeline::{
    run_discover, run_populate, validate_draft, ClusterReport, ClusterSettings, ValidateOptions,
};

/// Semflow: semantic keyword clustering and draft category analysis.
///
/// Turns keyword exports into topic clusters with hub keywords and tiers,
/// flags clusters that cannibalize each other, and finds the terms dragging
/// a draft away from its target category.
#[derive(Parser)]
#[command(name = "semflow", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ClusterArgs {
    /// Keyword CSV (needs a keyword column; a volume column is optional)
    keywords: PathBuf,

    /// Drop keywords below this search volume (default: SEMFLOW_MIN_VOLUME or 10)
    #[arg(long)]
    min_volume: Option<f64>,

    /// Cosine distance threshold; lower makes tighter clusters (default: 0.5)
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of clusters to classify in parallel
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Write the brief here instead of a timestamped file in the output dir
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the full report as JSON instead of the terminal view
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster keywords and detect each cluster's natural category
    Discover {
        #[command(flatten)]
        args: ClusterArgs,

        /// Cross-cluster similarity that counts as cannibalization (default: 0.80)
        #[arg(long)]
        overlap: Option<f64>,
    },

    /// Cluster keywords and test each cluster against a target category
    Populate {
        #[command(flatten)]
        args: ClusterArgs,

        /// Target category, e.g. "/Travel/Hotels & Accommodations"
        #[arg(long)]
        target: String,
    },

    /// Validate a draft against a target category and its brief cluster
    Validate {
        /// Draft text file
        draft: PathBuf,

        /// Target category to optimize for
        #[arg(long)]
        target: String,

        /// Strategic brief CSV from a previous discover/populate run
        #[arg(long, requires = "cluster")]
        brief: Option<PathBuf>,

        /// Cluster id within the brief
        #[arg(long, requires = "brief")]
        cluster: Option<usize>,

        /// Run the drag search (one classifier call per candidate per round)
        #[arg(long)]
        drag: bool,

        /// Never let a removal leave fewer words than this (default: 5)
        #[arg(long, default_value = "5")]
        min_words: usize,

        /// Remove raw substrings instead of whole words
        #[arg(long)]
        substring: bool,

        /// Drag trials evaluated in parallel per round
        #[arg(long, default_value = "4")]
        concurrency: usize,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List content categories, optionally filtered
    Categories {
        /// Case-insensitive filter, e.g. "travel"
        filter: Option<String>,
    },

    /// Download the local ONNX embedding model (~90 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("semflow=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Discover { args, overlap } => {
            let config = Config::load()?;
            config.require_embedder()?;
            config.require_classifier()?;

            let mut settings = cluster_settings(&config, &args);
            if let Some(overlap) = overlap {
                settings.overlap_threshold = overlap;
            }

            let rows = load_keywords_csv(&args.keywords)?;
            let embedder = create_embedder(&config)?;
            let classifier = GoogleNlpClassifier::with_timeout(
                config.google_nlp_api_key.clone(),
                config.request_timeout,
            )?;

            println!("Discovering natural categories for {} keywords...", rows.len());
            let report = run_discover(&rows, embedder.as_ref(), &classifier, &settings).await?;

            let path = brief_path(&config, &args, "discover");
            write_brief(&path, &report.brief)?;
            finish_cluster_command(&report, &path, args.json, true)?;
        }

        Commands::Populate { args, target } => {
            let config = Config::load()?;
            config.require_embedder()?;
            config.require_classifier()?;

            let settings = cluster_settings(&config, &args);
            let rows = load_keywords_csv(&args.keywords)?;
            let embedder = create_embedder(&config)?;
            let classifier = GoogleNlpClassifier::with_timeout(
                config.google_nlp_api_key.clone(),
                config.request_timeout,
            )?;

            println!("Testing keyword clusters against '{target}'...");
            let report =
                run_populate(&rows, embedder.as_ref(), &classifier, &target, &settings).await?;

            let path = brief_path(&config, &args, "populate");
            write_brief(&path, &report.brief)?;
            finish_cluster_command(&report, &path, args.json, false)?;
        }

        Commands::Validate {
            draft,
            target,
            brief,
            cluster,
            drag,
            min_words,
            substring,
            concurrency,
            json,
        } => {
            let config = Config::load()?;
            config.require_classifier()?;

            let text = std::fs::read_to_string(&draft)
                .with_context(|| format!("Failed to read draft {}", draft.display()))?;

            let rows = match &brief {
                Some(path) => read_brief(path)?,
                None => Vec::new(),
            };
            let brief_row = match cluster {
                Some(id) => Some(find_row(&rows, id).with_context(|| {
                    format!("Cluster {id} not found in the strategic brief")
                })?),
                None => None,
            };

            let cancel = Arc::new(AtomicBool::new(false));
            if drag {
                println!(
                    "{}",
                    "Drag search makes one classifier call per candidate per round. Ctrl-C stops after the current round."
                        .yellow()
                );
                spawn_cancel_handler(cancel.clone());
            }

            let options = ValidateOptions {
                run_drag: drag,
                drag: DragSettings {
                    min_words,
                    removal_mode: if substring {
                        RemovalMode::Substring
                    } else {
                        RemovalMode::WordBoundary
                    },
                    concurrency,
                    // Leave room for the HTTP timeout to report first
                    call_timeout: Some(config.request_timeout.saturating_mul(2)),
                    ..Default::default()
                },
                cancel: Some(cancel),
            };

            let classifier = GoogleNlpClassifier::with_timeout(
                config.google_nlp_api_key.clone(),
                config.request_timeout,
            )?;
            let report = validate_draft(&classifier, &text, &target, brief_row, &options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                terminal::display_validation(&report);
            }
        }

        Commands::Categories { filter } => {
            let categories = match filter.as_deref() {
                Some(f) => search_categories(f),
                None => all_categories(),
            };
            terminal::display_categories(&categories);
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX embedding model...");
            println!("  Destination: {}", model_dir.display());

            download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("Set SEMFLOW_EMBEDDER=onnx to embed keywords locally.");
        }
    }

    Ok(())
}

/// Config values, overridden by whatever flags were given.
fn cluster_settings(config: &Config, args: &ClusterArgs) -> ClusterSettings {
    ClusterSettings {
        min_volume: args.min_volume.unwrap_or(config.min_volume),
        distance_threshold: args.threshold.unwrap_or(config.distance_threshold),
        overlap_threshold: config.overlap_threshold,
        concurrency: args.concurrency,
        show_progress: !args.json,
    }
}

fn create_embedder(config: &Config) -> Result<Box<dyn EmbeddingProvider>> {
    match config.embedder_backend {
        EmbedderBackend::OpenAi => {
            info!(model = %config.embedding_model, "Using OpenAI embeddings");
            Ok(Box::new(OpenAiEmbedder::with_timeout(
                config.openai_api_key.clone(),
                config.embedding_model.clone(),
                config.request_timeout,
            )?))
        }
        EmbedderBackend::Onnx => {
            info!("Using local ONNX sentence embeddings");
            let embedder = SentenceEmbedder::load(&embedding_model_dir(&config.model_dir))?;
            Ok(Box::new(embedder))
        }
    }
}

fn brief_path(config: &Config, args: &ClusterArgs, mode: &str) -> PathBuf {
    args.output.clone().unwrap_or_else(|| {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        config
            .output_dir
            .join(format!("strategic_brief_{mode}_{stamp}.csv"))
    })
}

fn finish_cluster_command(
    report: &ClusterReport,
    path: &Path,
    json: bool,
    show_cannibalization: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    terminal::display_brief(&report.brief);
    if show_cannibalization {
        terminal::display_cannibalization(report);
    }
    println!(
        "{} {} clusters from {} keywords saved to {}",
        "Brief:".bold(),
        report.brief.len(),
        report.keywords_clustered,
        path.display()
    );
    Ok(())
}

/// Raise the cancel flag on Ctrl-C so the drag search stops between rounds.
/// A second Ctrl-C exits immediately.
fn spawn_cancel_handler(flag: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current round (Ctrl-C again to quit now)...");
            flag.store(true, Ordering::Relaxed);
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}
