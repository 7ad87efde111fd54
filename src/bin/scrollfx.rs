use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "scrollfx", version)]
struct Cli {
    /// Log engine diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the registered animations.
    List,
    /// Instantiate a page and print node styles at given scroll positions.
    Sample(SampleArgs),
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Input page JSON.
    #[arg(long)]
    page: PathBuf,

    /// Comma-separated scroll offsets in px.
    #[arg(long, value_delimiter = ',', default_value = "0")]
    scroll: Vec<f64>,

    /// Seed for burst vectors. Without it, runs are not reproducible.
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds of timers to run after each scroll.
    #[arg(long, default_value_t = 0.0)]
    settle: f64,

    /// Engine config JSON (trigger attribute, option prefix, id prefix).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only print nodes whose style differs from the default.
    #[arg(long)]
    changed_only: bool,
}

#[derive(serde::Serialize)]
struct Frame {
    scroll_y: f64,
    nodes: Vec<scrollfx::dom::NodeSnapshot>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::List => cmd_list(),
        Command::Sample(args) => cmd_sample(args),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn cmd_list() -> anyhow::Result<()> {
    for d in scrollfx::registry::descriptors() {
        let number = d.number.map_or_else(|| "-".to_string(), |n| n.to_string());
        let aliases = if d.aliases.is_empty() {
            "-".to_string()
        } else {
            d.aliases.join(",")
        };
        println!("{number:>2}  {:<20} {aliases:<24} {}", d.name, d.summary);
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse {what} JSON"))
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let page: scrollfx::PageSpec = read_json(&args.page, "page")?;
    let config: scrollfx::EngineConfig = match &args.config {
        Some(path) => read_json(path, "config")?,
        None => scrollfx::EngineConfig::default(),
    };
    anyhow::ensure!(
        page.viewport_height.is_finite() && page.viewport_height > 0.0,
        "viewport_height must be positive, got {}",
        page.viewport_height
    );

    let doc = scrollfx::Document::from_page(&page);
    let (services, sim) =
        scrollfx::Services::simulated(doc, page.viewport_height, args.seed.unwrap_or(0));
    let services = match args.seed {
        Some(_) => services,
        None => services.with_rng(scrollfx::SplitMix64::from_time()),
    }
    .with_config(config);

    let mut engine = scrollfx::Engine::new(services);
    let bound = engine.init_document();
    tracing::info!(bound, "instances bound");

    let mut frames = Vec::with_capacity(args.scroll.len());
    for y in &args.scroll {
        sim.scroll.scroll_to(*y);
        sim.timers.advance(args.settle);
        let nodes = sim
            .doc
            .borrow()
            .snapshot()
            .into_iter()
            .filter(|n| !args.changed_only || n.style != scrollfx::Style::default())
            .collect();
        frames.push(Frame {
            scroll_y: *y,
            nodes,
        });
    }
    engine.destroy();

    let out = serde_json::to_string_pretty(&frames).context("serialize frames")?;
    println!("{out}");
    Ok(())
}
