use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use clinrec::config::{ProtocolMode, ServerConfig};
use clinrec::index::{DictionaryIndex, IndexStats};
use clinrec::recognizer::{PoolStrategy, RecognizerPool};
use clinrec::server::{RecognizerServer, signals};
use clinrec::utils::StemLanguage;
use clinrec::utils::progress::LoadSpinner;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "clinrec", version)]
#[command(about = "Clinical concept recognition server")]
struct Cli {
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Dictionary file, one `<conceptId>\t<label>` per line
    dictionary: PathBuf,

    /// JSON config file (default: the per-user clinrec/config.json, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Stopword list, one term per line (default: built-in French list)
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Termination-term list, one term per line (default: built-in French list)
    #[arg(long)]
    termination_terms: Option<PathBuf>,

    /// Stemming language
    #[arg(long, value_enum)]
    language: Option<StemLanguage>,

    /// Times the stemmer is applied to each token
    #[arg(long)]
    stem_passes: Option<usize>,

    /// Number of pooled recognizers
    #[arg(long)]
    pool_size: Option<usize>,

    /// How recognizers are shared between connections
    #[arg(long, value_enum)]
    pool_strategy: Option<PoolStrategy>,

    /// Connections served at the same time
    #[arg(long)]
    max_workers: Option<usize>,

    /// Serve one `<ignored>\t<text>` request per connection, then close
    #[arg(long)]
    one_shot: bool,

    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Hide the load spinner
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Layer the command line over the file config
    fn apply(self, config: &mut ServerConfig) {
        config.port = self.port;
        config.dictionary = self.dictionary;
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if self.stopwords.is_some() {
            config.stopwords = self.stopwords;
        }
        if self.termination_terms.is_some() {
            config.termination_terms = self.termination_terms;
        }
        if let Some(language) = self.language {
            config.stemming.language = language;
        }
        if let Some(passes) = self.stem_passes {
            config.stemming.passes = passes;
        }
        if let Some(size) = self.pool_size {
            config.pool.size = size;
        }
        if let Some(strategy) = self.pool_strategy {
            config.pool.strategy = strategy;
        }
        if let Some(max_workers) = self.max_workers {
            config.workers.max_workers = max_workers;
        }
        if self.one_shot {
            config.protocol = ProtocolMode::OneShot;
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let quiet = cli.quiet;
    let mut config = ServerConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let analyzer = Arc::new(config.analyzer()?);
    info!(
        stopwords = analyzer.stopwords().len(),
        termination_terms = analyzer.termination_terms().len(),
        language = ?config.stemming.language,
        passes = config.stemming.passes,
        "analyzer ready"
    );

    let start = Instant::now();
    let spinner = LoadSpinner::start(
        &format!("Indexing {}", config.dictionary.display()),
        quiet,
    );
    let index = match DictionaryIndex::load(&config.dictionary, analyzer) {
        Ok(index) => index,
        Err(e) => {
            spinner.abandon();
            return Err(e).context("Failed to load dictionary");
        }
    };
    spinner.finish(format!(
        "Indexed {} concepts in {:.2}s",
        index.concept_count(),
        start.elapsed().as_secs_f64()
    ));

    let stats = IndexStats::collect(&index);
    stats.log();
    if stats.concepts == 0 {
        warn!("dictionary is empty, no text will be annotated");
    }

    let pool = RecognizerPool::for_index(Arc::new(index), config.pool.strategy, config.pool.size)
        .with_borrow_timeout(config.pool.borrow_timeout());

    let server = RecognizerServer::bind(&config, Arc::new(pool))?;
    signals::install(server.shutdown_handle()).context("Failed to install signal handlers")?;
    server.run()
}
