//! Tsumugi Preparation Tool
//!
//! Downloads a parallel corpus, trains the subword models and caches the
//! encoded sentences in a local data directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tsumugi::{
    DEFAULT_VOCAB_SIZE, DatasetRegistry, FetchProgress, Pipeline, PipelineConfig, Progress, Side,
    WMT14_EN_DE,
};
use tsumugi_core::{SequenceCodec, VocabularyIndex};

/// Default data directory for a dataset
fn default_data_dir(dataset: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tsumugi")
        .join(dataset)
}

#[derive(Parser)]
#[command(name = "tsumugi-prep")]
#[command(about = "Prepare parallel corpora for machine translation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dataset name
    #[arg(short, long, env = "TSUMUGI_DATASET", default_value = WMT14_EN_DE, global = true)]
    dataset: String,

    /// Data directory, one per dataset
    #[arg(short = 'D', long, env = "TSUMUGI_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Subword vocabulary size per language
    #[arg(short, long, default_value_t = DEFAULT_VOCAB_SIZE, global = true)]
    vocab_size: usize,

    /// Download timeout in seconds
    #[arg(long, default_value_t = 60, global = true)]
    timeout_secs: u64,

    /// JSON file with extra dataset definitions
    #[arg(long, env = "TSUMUGI_REGISTRY", global = true)]
    registry: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, normalize, train and encode the dataset
    Prepare,
    /// Decode vocabulary ids of a prepared dataset
    Decode {
        /// Language side: source or target
        #[arg(short, long, default_value = "source")]
        side: String,
        /// Ids to decode
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// List known datasets
    Datasets,
}

impl Cli {
    fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| default_data_dir(&self.dataset))
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_vocab_size(self.vocab_size)
            .with_fetch_timeout(Duration::from_secs(self.timeout_secs))
    }
}

fn load_registry(extra: Option<&Path>) -> Result<DatasetRegistry> {
    let mut registry = DatasetRegistry::builtin();
    if let Some(path) = extra {
        let loaded = DatasetRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load dataset registry {}", path.display()))?;
        registry.merge(loaded);
    }
    Ok(registry)
}

/// Download progress drawn as a terminal bar.
#[derive(Default)]
struct BarProgress {
    bar: Option<ProgressBar>,
}

impl FetchProgress for BarProgress {
    fn started(&mut self, url: &str, total: Option<u64>) {
        let bar = match total {
            Some(total) => {
                let style = ProgressStyle::with_template(
                    "[{elapsed_precise}] {msg:<24!} {wide_bar} {bytes}/{total_bytes}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
                ProgressBar::new(total).with_style(style)
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(url.rsplit('/').next().unwrap_or(url).to_string());
        self.bar = Some(bar);
    }

    fn advanced(&mut self, progress: Progress) {
        if let Some(bar) = &self.bar {
            bar.set_position(progress.transferred);
        }
    }

    fn finished(&mut self, _url: &str, _bytes: u64) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

fn prepare(cli: &Cli, registry: &DatasetRegistry) -> Result<()> {
    let data_dir = cli.data_dir();
    let mut pipeline = Pipeline::with_registry(registry, &cli.dataset, &data_dir, cli.config())?
        .with_progress(Box::new(BarProgress::default()));

    let (source, target) = pipeline
        .load()
        .with_context(|| format!("Failed to prepare {} in {}", cli.dataset, data_dir.display()))?;

    println!("dataset:   {}", cli.dataset);
    println!("directory: {}", data_dir.display());
    println!("sentences: {} source, {} target", source.len(), target.len());

    if let (Some(s), Some(t)) = (source.first(), target.first()) {
        let s = pipeline.sequences_to_texts(std::slice::from_ref(s), Side::Source)?;
        let t = pipeline.sequences_to_texts(std::slice::from_ref(t), Side::Target)?;
        println!("source[0]: {}", s[0].join(" "));
        println!("target[0]: {}", t[0].join(" "));
    }
    Ok(())
}

fn decode(cli: &Cli, registry: &DatasetRegistry, side: &str, ids: &[u32]) -> Result<()> {
    let side: Side = side.parse()?;
    let pipeline = Pipeline::with_registry(registry, &cli.dataset, cli.data_dir(), cli.config())?;
    let vocab_path = pipeline.artifacts(side)?.model.vocab_path;
    if !vocab_path.exists() {
        bail!(
            "No {side} vocabulary at {}; run `tsumugi-prep prepare` first",
            vocab_path.display()
        );
    }

    let vocab = VocabularyIndex::load(&vocab_path)?;
    let tokens = SequenceCodec::new(&vocab).decode_sequence(ids);
    println!("{}", tokens.join(" "));
    Ok(())
}

fn datasets(registry: &DatasetRegistry) {
    for (name, dataset) in registry.iter() {
        println!(
            "{name}\t{} -> {}\t{}",
            dataset.source_lang, dataset.target_lang, dataset.base_url
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let registry = load_registry(cli.registry.as_deref())?;

    match &cli.command {
        Commands::Prepare => {
            info!(dataset = %cli.dataset, vocab_size = cli.vocab_size, "preparing dataset");
            prepare(&cli, &registry)
        }
        Commands::Decode { side, ids } => decode(&cli, &registry, side, ids),
        Commands::Datasets => {
            datasets(&registry);
            Ok(())
        }
    }
}
