mod http;
mod render;
mod server;
mod service;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dream_store::DataDir;
use rmcp::{ServiceExt, transport::stdio};
use tokio_util::sync::CancellationToken;

use crate::service::DreamService;

#[derive(Parser)]
#[command(
    name = "dreamsig",
    about = "Dream classifier and symbol engine: CLI, MCP server and HTTP API"
)]
struct Cli {
    /// Data directory (default: $DREAMSIG_DATA_DIR, then ~/.dreamsig)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a dream without recording it
    Classify {
        /// Dream narrative
        text: String,
    },

    /// Record a dream for a user
    Submit {
        #[arg(long)]
        user: String,

        /// Keyword associated with the dream (repeatable)
        #[arg(long = "keyword")]
        keywords: Vec<String>,

        /// Dream narrative
        text: String,
    },

    /// Show a user's symbol parameters
    Symbol {
        #[arg(long)]
        user: String,

        /// Also write the rendered SVG to this path
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Show a user's aggregate statistics
    Stats {
        #[arg(long)]
        user: String,
    },

    /// List a user's recorded dreams, oldest first
    History {
        #[arg(long)]
        user: String,

        /// Only the most recent N dreams
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export a user's profile to a JSON file
    Export {
        #[arg(long)]
        user: String,

        /// Output file path
        path: PathBuf,
    },

    /// Show the data directory, schema version and recorded users
    Info,

    /// Start MCP server on stdio transport
    Serve,

    /// Start the HTTP API
    Http {
        #[arg(long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
}

fn open_service(cli: &Cli) -> Result<DreamService> {
    let data_dir =
        DataDir::resolve(cli.data_dir.as_deref()).context("failed to resolve data directory")?;
    DreamService::open(data_dir).context("failed to open dream store")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Classify { text } => cmd_classify(&cli, text),
        Commands::Submit {
            user,
            keywords,
            text,
        } => cmd_submit(&cli, user, text, keywords),
        Commands::Symbol { user, svg } => cmd_symbol(&cli, user, svg.as_deref()),
        Commands::Stats { user } => cmd_stats(&cli, user),
        Commands::History { user, limit } => cmd_history(&cli, user, *limit),
        Commands::Export { user, path } => cmd_export(&cli, user, path),
        Commands::Info => cmd_info(&cli),
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Http { addr } => cmd_http(&cli, *addr).await,
    }
}

fn cmd_classify(cli: &Cli, text: &str) -> Result<()> {
    let service = open_service(cli)?;
    let c = service.classify(text).context("failed to classify dream")?;

    println!("quadrant:   {} ({})", c.quadrant, c.quadrant.describe());
    println!("valence:    {:.3}", c.axis_score.valence);
    println!("energy:     {:.3}", c.axis_score.energy);
    println!("confidence: {:.3}", c.confidence);
    println!("keywords:   {}", join_list(&c.matched_keywords));
    Ok(())
}

fn cmd_submit(cli: &Cli, user: &str, text: &str, keywords: &[String]) -> Result<()> {
    let service = open_service(cli)?;
    let s = service
        .submit(user, text, keywords)
        .context("failed to record dream")?;
    let c = &s.record.classified;

    println!("id:         {}", s.record.id);
    println!("dream:      #{}", s.record.sequence);
    println!("quadrant:   {} ({})", c.quadrant, c.quadrant.describe());
    println!("valence:    {:.3}", c.axis_score.valence);
    println!("energy:     {:.3}", c.axis_score.energy);
    println!("confidence: {:.3}", c.confidence);
    println!("keywords:   {}", join_list(&c.matched_keywords));
    println!("complexity: {}", s.params.complexity);
    Ok(())
}

fn cmd_symbol(cli: &Cli, user: &str, svg_path: Option<&Path>) -> Result<()> {
    let service = open_service(cli)?;
    let view = service
        .symbol(user, svg_path.is_some())
        .context("failed to load symbol")?;
    let p = &view.params;

    println!("user:       {}", view.user_id);
    println!("dreams:     {}", view.dream_count);
    println!("complexity: {}", p.complexity);
    println!("palette:    {:.3}", p.palette_bias);
    println!("symmetry:   {:.3}", p.symmetry_factor);
    println!("dominant:   {} ({})", p.dominant_quadrant, p.dominant_quadrant.describe());
    println!(
        "latest:     energy={:.3}, valence={:.3}",
        view.coordinates.0, view.coordinates.1
    );

    if let (Some(path), Some(svg)) = (svg_path, &view.svg) {
        std::fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
        println!("svg:        {}", path.display());
    }
    Ok(())
}

fn cmd_stats(cli: &Cli, user: &str) -> Result<()> {
    let service = open_service(cli)?;
    let stats = service.stats(user).context("failed to load stats")?;

    println!("user:       {user}");
    println!("dreams:     {}", stats.total_dreams);
    println!("valence:    {:.2}", stats.average_valence);
    println!("energy:     {:.2}", stats.average_energy);
    println!("confidence: {:.2}", stats.average_confidence);
    println!(
        "dominant:   {} ({})",
        stats.dominant_quadrant,
        stats.dominant_quadrant.describe()
    );
    let counts: Vec<String> = stats
        .quadrant_counts
        .iter()
        .map(|(q, n)| format!("{q}={n}"))
        .collect();
    println!("quadrants:  {}", counts.join(", "));
    Ok(())
}

fn cmd_history(cli: &Cli, user: &str, limit: Option<usize>) -> Result<()> {
    let service = open_service(cli)?;
    let dreams = service
        .history(user, limit)
        .context("failed to load history")?;

    if dreams.is_empty() {
        println!("(no dreams recorded)");
        return Ok(());
    }
    for d in &dreams {
        println!(
            "#{:<4} {:<13} {:>6.3} {:>6.3}  {}",
            d.sequence,
            d.classified.quadrant.as_str(),
            d.classified.axis_score.valence,
            d.classified.axis_score.energy,
            d.text
        );
    }
    Ok(())
}

fn cmd_export(cli: &Cli, user: &str, path: &Path) -> Result<()> {
    let service = open_service(cli)?;
    service
        .export(user, path)
        .with_context(|| format!("failed to export profile of '{user}'"))?;

    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_info(cli: &Cli) -> Result<()> {
    let service = open_service(cli)?;
    let info = service.info().context("failed to read store info")?;
    let schema = info
        .schema_version
        .map_or_else(|| "(none)".to_string(), |v| format!("v{v}"));

    println!("data dir:   {}", info.data_dir.display());
    println!("schema:     {schema}");
    println!("dreams:     {}", info.total_dreams);
    println!("users:      {}", join_list(&info.users));
    Ok(())
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let service = open_service(cli)?;
    tracing::info!(
        "starting MCP server on {}",
        service.data_dir().root().display()
    );

    let server = server::DreamServer::new(service);
    let service = match server.serve(stdio()).await {
        Ok(running) => running,
        Err(e) => {
            // The client went away before completing initialization.
            tracing::warn!("MCP session ended during initialization: {e}");
            return Ok(());
        }
    };
    let reason = service.waiting().await.context("MCP server task failed")?;
    tracing::info!("MCP server stopped: {reason:?}");
    Ok(())
}

async fn cmd_http(cli: &Cli, addr: SocketAddr) -> Result<()> {
    let service = open_service(cli)?;
    let shutdown = CancellationToken::new();
    http::cancel_on_signal(shutdown.clone());
    http::serve(service, addr, shutdown)
        .await
        .with_context(|| format!("HTTP server on {addr} failed"))
}

fn join_list<'a>(words: impl IntoIterator<Item = &'a String>) -> String {
    let words: Vec<&str> = words.into_iter().map(String::as_str).collect();
    if words.is_empty() {
        "(none)".to_string()
    } else {
        words.join(", ")
    }
}
