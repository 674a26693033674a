//! filtergraph CLI
//!
//! Runs filter graphs from the command line, or serves requests over
//! newline-delimited JSON on stdin/stdout.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use filtergraph::prelude::*;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "filtergraph", version)]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a graph to an image file.
    Run(RunArgs),
    /// Answer JSON requests, one per line, from stdin.
    Serve,
    /// List all available filters.
    List,
    /// Show the defaults of one filter.
    Info {
        /// Filter tag, e.g. `gaussian`.
        tag: String,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Graph JSON file.
    #[arg(long)]
    graph: PathBuf,

    /// Input image.
    #[arg(long)]
    input: PathBuf,

    /// Output image.
    #[arg(long)]
    output: PathBuf,

    /// Also write the histogram image here.
    #[arg(long)]
    histogram: Option<PathBuf>,

    /// Print per-step timings as JSON.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())
        .with_context(|| format!("loading config {:?}", cli.config))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_level.as_str())).init();

    match cli.cmd {
        Command::Run(args) => cmd_run(args, &config),
        Command::Serve => cmd_serve(&config),
        Command::List => cmd_list(),
        Command::Info { tag } => cmd_info(&tag),
    }
}

fn cmd_run(args: RunArgs, config: &Config) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading graph {}", args.graph.display()))?;
    let graph = FilterGraph::from_json(&json).with_context(|| format!("parsing graph {}", args.graph.display()))?;

    let image = PixelBuffer::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    log::info!("Loaded {} ({}x{})", args.input.display(), image.width, image.height);

    let executor = Executor::new(SoftwareEngine::new()).with_options(config.executor_options());
    let output = executor.execute(&graph, image, PixelBuffer::histogram())?;

    save(&output.image, &args.output)?;
    if let Some(path) = &args.histogram {
        save(&output.histogram, path)?;
    }
    log::info!("Applied {} filter(s), wrote {}", graph.len(), args.output.display());

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&output.stats)?);
    }
    Ok(())
}

fn save(buffer: &PixelBuffer, path: &Path) -> anyhow::Result<()> {
    buffer.save(path).with_context(|| format!("writing {}", path.display()))
}

fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let worker = Worker::new(Executor::new(SoftwareEngine::new()).with_options(config.executor_options()));
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("reading request")?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(stdout, "{}", worker.handle_json(&line))?;
        stdout.flush()?;
    }
    Ok(())
}

fn cmd_list() -> anyhow::Result<()> {
    println!("Available filters ({} total):", FilterTag::ALL.len());
    println!();

    for category in [Category::Color, Category::Blur, Category::Edge, Category::Stylize] {
        println!("  {}", category.display_name());
        for tag in FilterTag::ALL.iter().filter(|tag| tag.category() == category) {
            println!("      {:<18} {}", tag.as_str(), tag.display_name());
        }
        println!();
    }
    Ok(())
}

fn cmd_info(tag: &str) -> anyhow::Result<()> {
    let tag: FilterTag = tag
        .parse()
        .map_err(anyhow::Error::msg)
        .context("use 'list' to see available filters")?;

    println!("Filter: {}", tag.display_name());
    println!("Tag: {}", tag.as_str());
    println!("Category: {}", tag.category().display_name());
    println!("Runs as: {}", if tag.is_convolution() { "convolution" } else { "in place" });
    println!("Default params: {}", tag.default_params());
    Ok(())
}
