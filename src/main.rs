//! Psych main entry point
//!
//! This is the command-line interface for the psych therapist-directory crawler.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use psych::config::{load_config, load_config_or_default, Config};
use psych::crawler::{clear_dir, Coordinator};
use psych::output::{browse, generate_markdown_summary, CrawlSummary};
use psych::query::therapists;
use psych::record::{dedup_records, Predicate, Record, RecordFilter};
use psych::storage::{open_storage, SqliteStorage, Storage};
use psych::url::{build_start_url, Location};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Psych: a polite therapist-directory crawler
///
/// Psych walks the paginated results of a therapist directory for a given
/// location, stores one record per listing in a local database, and lets you
/// browse or query what it found.
#[derive(Parser, Debug)]
#[command(name = "psych")]
#[command(version = "1.0.0")]
#[command(about = "A polite therapist-directory crawler", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Directory holding the settings file, database and cache
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Database path (default: <config-dir>/psych.db)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Settings file (default: <config-dir>/psych.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove the response cache and the database
    Clear {
        /// Keep the database, only remove cached responses
        #[arg(long)]
        cache_only: bool,
    },

    /// Crawl the listings for a location and store them
    Fetch(FetchArgs),

    /// Browse stored listings in the terminal
    View,

    /// Print stored listings matching a filter as JSON
    Query(QueryArgs),

    /// Apply pending database migrations
    Migrate {
        /// Revert the most recent migration instead
        #[arg(long)]
        rollback: bool,
    },
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// State or province slug, e.g. "washington"
    #[arg(long)]
    state: Option<String>,

    /// County slug ending in "-county", used with --state
    #[arg(long)]
    county: Option<String>,

    /// City slug, used with --state
    #[arg(long)]
    city: Option<String>,

    /// Postal code; takes precedence over the other location flags
    #[arg(long)]
    zip: Option<String>,

    /// Country segment (us or ca); defaults to the settings file
    #[arg(long)]
    country: Option<String>,

    /// Open the browser once the crawl finishes
    #[arg(long)]
    view: bool,

    /// Write a markdown summary of the crawl to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    credentials: Option<String>,

    #[arg(long)]
    verified: Option<String>,

    #[arg(long)]
    statement: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    link: Option<String>,

    /// Only listings that are (true) or are not (false) accepting clients
    #[arg(long)]
    accepting: Option<bool>,

    /// How field flags are matched
    #[arg(long = "match", value_enum, default_value_t = MatchMode::Contains)]
    match_mode: MatchMode,

    #[arg(long)]
    limit: Option<u32>,

    #[arg(long)]
    offset: Option<u32>,

    /// A full filter as JSON, e.g. '{"title": {"prefix": "Dr"}}'; field
    /// flags given alongside override its entries
    #[arg(long, value_name = "JSON")]
    filter: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MatchMode {
    Exact,
    Prefix,
    Contains,
}

impl MatchMode {
    fn predicate(self, value: String) -> Predicate {
        match self {
            Self::Exact => Predicate::Equals(value),
            Self::Prefix => Predicate::Prefix(value),
            Self::Contains => Predicate::Contains(value),
        }
    }
}

/// Resolved filesystem locations for one invocation
#[derive(Debug)]
struct Paths {
    config_dir: PathBuf,
    db: PathBuf,
    settings: Option<PathBuf>,
}

impl Paths {
    fn resolve(cli: &Cli) -> anyhow::Result<Self> {
        let config_dir = match &cli.config_dir {
            Some(dir) => dir.clone(),
            None => default_config_dir()?,
        };
        let db = cli
            .db
            .clone()
            .unwrap_or_else(|| config_dir.join("psych.db"));

        Ok(Self {
            db,
            settings: cli.settings.clone(),
            config_dir,
        })
    }

    /// Loads settings: an explicit file must exist, the default one may not
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.settings {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load settings from {}", path.display()))?,
            None => {
                let path = self.config_dir.join("psych.toml");
                load_config_or_default(&path)
                    .with_context(|| format!("Failed to load settings from {}", path.display()))?
            }
        };

        if config.crawler.cache_dir.is_none() {
            config.crawler.cache_dir = Some(self.config_dir.join("cache"));
        }

        Ok(config)
    }
}

fn default_config_dir() -> anyhow::Result<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(xdg).join("psych"));
    }
    match std::env::var_os("HOME").filter(|v| !v.is_empty()) {
        Some(home) => Ok(PathBuf::from(home).join(".config").join("psych")),
        None => bail!("Cannot determine a config directory: set --config-dir, XDG_CONFIG_HOME or HOME"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let paths = Paths::resolve(&cli)?;
    tracing::debug!("Using config directory {}", paths.config_dir.display());

    match cli.command {
        Command::Clear { cache_only } => handle_clear(&paths, cache_only),
        Command::Fetch(args) => handle_fetch(&paths, args).await,
        Command::View => handle_view(&paths).await,
        Command::Query(args) => handle_query(&paths, args),
        Command::Migrate { rollback } => handle_migrate(&paths, rollback),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("psych=info,warn"),
            1 => EnvFilter::new("psych=debug,info"),
            2 => EnvFilter::new("psych=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `clear`: removes the cache directory and, unless told otherwise, the database
fn handle_clear(paths: &Paths, cache_only: bool) -> anyhow::Result<()> {
    let config = paths.load_config()?;

    if let Some(cache_dir) = &config.crawler.cache_dir {
        clear_dir(cache_dir)
            .with_context(|| format!("Failed to clear cache at {}", cache_dir.display()))?;
        tracing::info!("Cleared cache at {}", cache_dir.display());
    }

    if !cache_only {
        for path in [
            paths.db.clone(),
            sidecar(&paths.db, "-wal"),
            sidecar(&paths.db, "-shm"),
        ] {
            remove_if_exists(&path)?;
        }
        tracing::info!("Removed database {}", paths.db.display());
    }

    Ok(())
}

/// SQLite journal files live next to the database with a suffix appended
fn sidecar(db: &Path, suffix: &str) -> PathBuf {
    let mut name = db.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Handles `fetch`: crawl, dedup, persist, report
async fn handle_fetch(paths: &Paths, args: FetchArgs) -> anyhow::Result<()> {
    let config = paths.load_config()?;
    let mut storage = open_db(paths)?;

    let country = args
        .country
        .clone()
        .unwrap_or_else(|| config.site.country.clone());
    let location = Location {
        state: args.state,
        county: args.county,
        city: args.city,
        zip: args.zip,
    };
    let seed = build_start_url(&config.site.base_url, &country, &location)?;
    tracing::info!("Starting crawl at {}", seed);

    let coordinator = Coordinator::new(config.crawler.clone(), &config.selectors)
        .context("Failed to set up the crawler")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after in-flight pages");
            on_interrupt.cancel();
        }
    });

    let report = coordinator
        .run(seed.as_str(), cancel)
        .await
        .context("Crawl failed")?;

    let records = dedup_records(report.records.clone());
    let saved = storage
        .upsert_all(&records)
        .context("Failed to save listings")?;

    let summary = CrawlSummary::from_report(seed.as_str(), &report, records.len(), saved);
    println!("{}", summary);

    if let Some(path) = &args.summary {
        generate_markdown_summary(&summary, path)
            .with_context(|| format!("Failed to write summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    if args.view {
        let stored = storage.list().context("Failed to load listings")?;
        run_browser(stored).await?;
    }

    Ok(())
}

/// Handles `view`: browse everything in the store
async fn handle_view(paths: &Paths) -> anyhow::Result<()> {
    let storage = open_db(paths)?;
    let records = therapists(&storage, None).context("Failed to load listings")?;
    if records.is_empty() {
        bail!(
            "No listings stored in {}; run `psych fetch` first",
            paths.db.display()
        );
    }
    run_browser(records).await
}

async fn run_browser(records: Vec<Record>) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || browse(records))
        .await
        .context("Browser task failed")?
        .context("Terminal browser failed")
}

/// Handles `query`: prints matching listings as a JSON array
fn handle_query(paths: &Paths, args: QueryArgs) -> anyhow::Result<()> {
    let filter = build_filter(args)?;
    let storage = open_db(paths)?;

    let records = therapists(&storage, Some(&filter)).context("Query failed")?;
    tracing::debug!("Query matched {} listings", records.len());

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn build_filter(args: QueryArgs) -> anyhow::Result<RecordFilter> {
    let mut filter = match &args.filter {
        Some(json) => serde_json::from_str::<RecordFilter>(json).context("Invalid --filter JSON")?,
        None => RecordFilter::new(),
    };

    let mode = args.match_mode;
    let fields = [
        (args.title, &mut filter.title),
        (args.credentials, &mut filter.credentials),
        (args.verified, &mut filter.verified),
        (args.statement, &mut filter.statement),
        (args.phone, &mut filter.phone),
        (args.location, &mut filter.location),
        (args.link, &mut filter.link),
    ];
    for (value, slot) in fields {
        if let Some(value) = value {
            *slot = Some(mode.predicate(value));
        }
    }

    if args.accepting.is_some() {
        filter.accepting_appointments = args.accepting;
    }
    if args.limit.is_some() {
        filter.limit = args.limit;
    }
    if args.offset.is_some() {
        filter.offset = args.offset;
    }

    Ok(filter)
}

/// Handles `migrate`: apply pending migrations or revert the latest one
fn handle_migrate(paths: &Paths, rollback: bool) -> anyhow::Result<()> {
    let mut storage = SqliteStorage::open(&paths.db)
        .with_context(|| format!("Failed to open database {}", paths.db.display()))?;
    storage.init()?;

    if rollback {
        match storage.rollback()? {
            Some(version) => println!("Reverted migration {}", version),
            None => println!("No migrations to revert"),
        }
    } else {
        let applied = storage.migrate()?;
        if applied.is_empty() {
            println!("Database is up to date");
        } else {
            for version in &applied {
                println!("Applied migration {}", version);
            }
        }
    }

    println!("Schema version: {}", storage.schema_version()?);
    Ok(())
}

fn open_db(paths: &Paths) -> anyhow::Result<SqliteStorage> {
    open_storage(&paths.db)
        .with_context(|| format!("Failed to open database {}", paths.db.display()))
}
