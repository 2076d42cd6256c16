mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use runtime::{Agent, OpenAiBackend};
use storage::{ContactStore, HcpFilter};
use tools::{PlacesClient, PubMedClient, build_registry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "nova.toml";

#[derive(Parser)]
#[command(name = "nova")]
#[command(about = "An HCP outreach agent for pharma field teams", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Serve the web dashboard
    Serve {
        /// Bind address, overriding the configured one
        #[arg(short, long)]
        addr: Option<String>,
    },
    /// List HCP records from the contact store
    Hcps {
        /// Filter by specialty (exact match)
        #[arg(short, long)]
        specialty: Option<String>,
        /// Filter by city (exact match)
        #[arg(long)]
        city: Option<String>,
        /// Show only uncontacted records
        #[arg(short, long)]
        uncontacted: bool,
    },
    /// Import HCP records from a CSV file
    Import {
        /// CSV file with hcp_id,name,specialty,city,preferred_channel,contacted
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&config).await,
        Some(Commands::Serve { addr }) => cmd_serve(&config, addr).await,
        Some(Commands::Hcps {
            specialty,
            city,
            uncontacted,
        }) => cmd_hcps(&config, specialty, city, uncontacted),
        Some(Commands::Import { path }) => cmd_import(&config, &path),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        debug!(path = %path.display(), "loading config");
        Ok(Config::load(path)?)
    } else {
        debug!("no config file, using defaults");
        Ok(Config::default())
    }
}

fn open_store(config: &Config) -> Result<Arc<ContactStore>> {
    let path = Path::new(&config.store.path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Arc::new(ContactStore::open(path)?))
}

fn build_agent(config: &Config, store: Arc<ContactStore>) -> Result<Agent<OpenAiBackend>> {
    let api_key = config.openai_api_key()?;
    let mut builder = OpenAiBackend::builder(api_key, &config.backend.model);
    if let Some(base_url) = &config.backend.base_url {
        builder = builder.base_url(base_url);
    }
    let backend = builder.build();

    let places =
        PlacesClient::new(config.places_api_key()?).with_result_cap(config.places.result_cap);
    let mut pubmed = PubMedClient::new(config.entrez_email()?);
    if let Some(api_key) = config.ncbi_api_key() {
        pubmed = pubmed.with_api_key(api_key);
    }

    let registry = build_registry(store, places, pubmed).map_err(|e| Error::Registry(e.to_string()))?;
    Ok(Agent::new(backend, Arc::new(registry)).with_max_iterations(config.agent.max_iterations))
}

async fn cmd_chat(config: &Config) -> Result<()> {
    println!("nova v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(config)?;
    println!("Contact store: {} ({} records)", config.store.path, store.count()?);

    let mut agent = build_agent(config, store)?;
    println!("Model: {}", config.backend.model);
    println!("Type 'exit', 'quit' or 'bye' to leave; 'clear' resets the conversation.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "bye") {
            break;
        }
        if input == "clear" {
            agent.reset();
            println!("Conversation cleared.\n");
            continue;
        }

        let report = agent.run(input).await;
        println!("\n{}\n", report.answer);
    }

    println!("\nGoodbye.");
    Ok(())
}

async fn cmd_serve(config: &Config, addr: Option<String>) -> Result<()> {
    let store = open_store(config)?;
    let agent = build_agent(config, store.clone())?;
    let addr = addr.unwrap_or_else(|| config.server.addr.clone());

    println!("nova dashboard at http://{addr}/");
    let state = Arc::new(dashboard::AppState::new(agent, store));
    dashboard::serve(&addr, state).await?;
    Ok(())
}

fn cmd_hcps(
    config: &Config,
    specialty: Option<String>,
    city: Option<String>,
    uncontacted: bool,
) -> Result<()> {
    let store = open_store(config)?;

    let mut filter = HcpFilter::default();
    if let Some(specialty) = specialty {
        filter = filter.specialty(specialty);
    }
    if let Some(city) = city {
        filter = filter.city(city);
    }
    if uncontacted {
        filter = filter.contacted(false);
    }

    let records = store.find(&filter)?;
    if records.is_empty() {
        println!("No matching records.");
        return Ok(());
    }

    println!(
        "{:<6}  {:<24}  {:<16}  {:<12}  {:<10}  CONTACTED",
        "ID", "NAME", "SPECIALTY", "CITY", "CHANNEL"
    );
    println!("{}", "-".repeat(86));
    for record in records {
        println!(
            "{:<6}  {:<24}  {:<16}  {:<12}  {:<10}  {}",
            record.id,
            record.name,
            record.specialty,
            record.city,
            record.preferred_channel,
            if record.contacted { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn cmd_import(config: &Config, path: &Path) -> Result<()> {
    let store = open_store(config)?;
    let inserted = store.import_csv(path)?;
    println!(
        "Imported {inserted} new record(s); store now holds {}.",
        store.count()?
    );
    Ok(())
}
