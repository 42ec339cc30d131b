use anyhow::{Context, Result};
use clap::Parser;
use rustle_facts::config::FactsConfig;
use rustle_facts::facts::external::ExternalFacts;
use rustle_facts::facts::platform::default_registry;
use rustle_facts::facts::{Collection, HostContext, Platform};
use rustle_facts::output::{self, OutputFormat};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "rustle-facts")]
#[command(about = "Collect facts about the local host")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct RustleFactsCli {
    /// Facts to print (all facts when omitted)
    queries: Vec<String>,

    /// Output facts as JSON
    #[arg(short, long, conflicts_with = "yaml")]
    json: bool,

    /// Output facts as YAML
    #[arg(short, long)]
    yaml: bool,

    /// Configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// External fact directory (repeatable)
    #[arg(long = "external-dir")]
    external_dirs: Vec<PathBuf>,

    /// Skip external facts
    #[arg(long)]
    no_external_facts: bool,

    /// Read system files under this root instead of /
    #[arg(long)]
    root: Option<PathBuf>,

    /// Timeout in seconds for commands run while resolving facts
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<tracing::Level>,
}

impl RustleFactsCli {
    fn log_level(&self) -> tracing::Level {
        if let Some(level) = self.log_level {
            level
        } else if self.debug {
            tracing::Level::DEBUG
        } else if self.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }

    fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else if self.yaml {
            OutputFormat::Yaml
        } else {
            OutputFormat::Text
        }
    }

    /// File configuration with command line overrides applied.
    fn config(&self) -> Result<FactsConfig> {
        let mut config = match &self.config {
            Some(path) => FactsConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => FactsConfig::default(),
        };

        if !self.external_dirs.is_empty() {
            config.external_dirs = self.external_dirs.clone();
        }
        if self.no_external_facts {
            config.no_external_facts = true;
        }
        if self.root.is_some() {
            config.root = self.root.clone();
        }
        if self.timeout.is_some() {
            config.command_timeout_secs = self.timeout;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = RustleFactsCli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config()?;
    let platform = Platform::current();
    info!("Starting rustle-facts v{} on {platform}", env!("CARGO_PKG_VERSION"));

    let host = HostContext::from_config(&config);
    debug!("{host:?}");

    let mut collection = Collection::new(default_registry(platform, &host))
        .context("building the resolver registry")?;
    collection.block(config.blocked_facts.iter().cloned());

    let directories = config.external_directories();
    if !directories.is_empty() {
        let external = ExternalFacts::for_platform(platform, &host, config.external_timeout());
        collection.add_external_facts(&external, &directories);
    }

    let rendered = output::render(&mut collection, &cli.queries, cli.format())
        .context("rendering facts")?;
    print!("{rendered}");
    Ok(())
}
