use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use torrentinfo::config::Config;
use torrentinfo::{Batch, Filter, Predicate, Result};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Inspect BitTorrent metainfo files
#[derive(Parser, Debug)]
#[command(name = "torrent", author, version, about, long_about = None)]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show torrent info
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// text, json or info-json
    #[arg(short, long)]
    output: Option<String>,

    /// Filter expression, e.g. `files > 1 && name ~ iso`
    #[arg(short, long)]
    filter: Option<String>,

    /// Append totals
    #[arg(short, long)]
    summary: bool,

    /// Only print totals
    #[arg(long, visible_alias = "so")]
    summary_only: bool,

    /// Include piece hashes in json output
    #[arg(long)]
    pieces: bool,

    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => Config::load_json_file(path)?,
        None => Config::default(),
    };
    if let Some(level) = &cli.log_level {
        cfg.log_level = level.clone();
    }
    let Command::Info(args) = &cli.command;
    if let Some(output) = &args.output {
        cfg.output = output.clone();
    }
    if let Some(filter) = &args.filter {
        cfg.filter = Some(filter.clone());
    }
    cfg.summary |= args.summary;
    cfg.summary_only |= args.summary_only;
    cfg.show_pieces |= args.pieces;
    Ok(cfg)
}

fn info(cfg: &Config, files: &[PathBuf]) -> Result<()> {
    // compile before touching any file so a bad expression fails fast
    let filter = cfg.filter.as_deref().map(Filter::compile).transpose()?;
    let renderer = cfg.renderer()?;

    let batch = Batch::load(files)?;
    let batch = batch.filter_opt(filter.as_ref().map(|f| f as &dyn Predicate));
    debug!(kept = batch.len(), "rendering");

    let stdout = io::stdout();
    let mut w = stdout.lock();
    renderer.render(&mut w, &batch)?;
    w.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("torrent: {err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();

    let result = match &cli.command {
        Command::Info(args) => info(&cfg, &args.files),
    };
    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
