//! numberscope: command line front end for the sequence and visualizer engine
//!
//! - `list`: every sequence and visualizer kind
//! - `describe`: the parameters of one kind
//! - `terms`: evaluate a configured sequence
//! - `check`: validate a specimen query without drawing
//! - `render`: run a specimen to completion and write SVG or draw commands

mod bfile;

use anyhow::{Context, Result, anyhow, bail};
use bfile::BFileFetcher;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use numberscope_core::params::RawParams;
use numberscope_core::registry::{Category, KindDescriptor};
use numberscope_core::surface::{RecordingSurface, Surface, SvgSurface};
use numberscope_core::{Registry, Specimen, ValidationStatus};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Explore integer sequences through visualizers
#[derive(Parser)]
#[command(name = "numberscope")]
#[command(about = "Evaluate integer sequences and render them through visualizers")]
#[command(version)]
struct Cli {
    /// Directory of OEIS b-files backing the "OEIS Sequence" kind
    #[arg(long, global = true, env = "NUMBERSCOPE_BFILES")]
    bfiles: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Log more (-v for debug, -vv for trace); NUMBERSCOPE_LOG overrides when unset
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum RenderFormat {
    Svg,
    Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every registered sequence and visualizer kind
    List {
        /// Only show sequences
        #[arg(long, conflicts_with = "visualizers")]
        sequences: bool,

        /// Only show visualizers
        #[arg(long)]
        visualizers: bool,
    },

    /// Show the parameters of one kind
    Describe {
        /// Kind name, e.g. "Linear Recurrence"
        kind: String,
    },

    /// Print entries of a sequence
    Terms {
        /// Sequence kind name
        kind: String,

        /// Parameter setting, repeatable
        #[arg(short = 'p', long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,

        /// First index to print (default: the sequence's first index)
        #[arg(long, allow_negative_numbers = true)]
        from: Option<i64>,

        /// Number of entries to print
        #[arg(short = 'n', long, default_value = "20")]
        count: usize,
    },

    /// Validate a specimen query
    Check {
        /// Query string as found in a specimen URL
        query: String,
    },

    /// Run a specimen and write the drawing
    Render {
        /// Query string as found in a specimen URL
        query: String,

        /// Canvas width
        #[arg(long, default_value = "800")]
        width: f64,

        /// Canvas height
        #[arg(long, default_value = "800")]
        height: f64,

        /// Frame cap, overriding the query's
        #[arg(long)]
        frames: Option<u64>,

        /// What to write
        #[arg(long, default_value = "svg")]
        output_format: RenderFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("NUMBERSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_registry(bfiles: Option<PathBuf>) -> Result<Registry> {
    let mut registry = Registry::standard();
    if let Some(dir) = bfiles {
        debug!(dir = %dir.display(), "remote sequences served from b-files");
        registry.install_remote(Arc::new(BFileFetcher::new(dir)))?;
    }
    Ok(registry)
}

fn print_status(label: &str, status: &ValidationStatus) {
    for warning in &status.warnings {
        eprintln!("{} {label}: {warning}", "warning:".yellow().bold());
    }
    for error in &status.errors {
        eprintln!("{} {label}: {error}", "invalid:".red().bold());
    }
}

fn find_kind(registry: &Registry, name: &str) -> Result<KindDescriptor> {
    registry
        .describe()
        .into_iter()
        .find(|d| d.name == name)
        .ok_or_else(|| anyhow!("no sequence or visualizer named {name:?}; try `numberscope list`"))
}

fn cmd_list(registry: &Registry, sequences: bool, visualizers: bool, format: OutputFormat) -> Result<()> {
    let kinds: Vec<_> = registry
        .describe()
        .into_iter()
        .filter(|d| match d.category {
            Category::Sequence => !visualizers,
            Category::Visualizer => !sequences,
        })
        .collect();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&kinds)?),
        OutputFormat::Table => {
            for kind in &kinds {
                let category = match kind.category {
                    Category::Sequence => "sequence",
                    Category::Visualizer => "visualizer",
                };
                println!(
                    "{:>10}  {:<26} {}",
                    category.dimmed(),
                    kind.name.cyan(),
                    kind.description
                );
            }
        }
    }
    Ok(())
}

fn cmd_describe(registry: &Registry, name: &str, format: OutputFormat) -> Result<()> {
    let kind = find_kind(registry, name)?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&kind)?);
        return Ok(());
    }
    println!("{}  {}", kind.name.cyan().bold(), kind.description);
    println!("{}", "-".repeat(80));
    for param in &kind.params {
        let required = if param.required { "*" } else { " " };
        println!(
            "{}{:<18} {:<28} default={}",
            required.red(),
            param.name.yellow(),
            param.display_name,
            param.default.green()
        );
        if !param.description.is_empty() {
            println!("{:>20}{}", "", param.description.dimmed());
        }
        if !param.options.is_empty() {
            println!("{:>20}one of: {}", "", param.options.join(", "));
        }
        if let Some(controller) = &param.visible_if {
            println!("{:>20}shown depending on {controller}", "");
        }
    }
    Ok(())
}

async fn cmd_terms(
    registry: &Registry,
    kind: &str,
    params: Vec<(String, String)>,
    from: Option<i64>,
    count: usize,
    format: OutputFormat,
) -> Result<()> {
    let mut sequence = registry.create_sequence(kind)?;
    let raw: RawParams = params.into_iter().collect();
    let status = sequence.validate(&raw);
    print_status(kind, &status);
    if !status.is_valid() {
        bail!("{kind} settings are invalid");
    }
    sequence.initialize()?;
    if let Some(load) = sequence.load() {
        load.await.with_context(|| format!("loading {}", sequence.name()))?;
    }

    let start = from.unwrap_or_else(|| sequence.first());
    let end = sequence.last();
    let mut entries = Vec::with_capacity(count);
    for offset in 0..count as i64 {
        let Some(n) = start.checked_add(offset) else {
            break;
        };
        if end.is_some_and(|last| n > last) {
            break;
        }
        entries.push((n, sequence.get_element(n)?));
    }

    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = entries
                .iter()
                .map(|(n, value)| json!({ "n": n, "value": value.to_string() }))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "name": sequence.name(), "entries": rows }))?
            );
        }
        OutputFormat::Table => {
            println!("{}", sequence.name().cyan());
            for (n, value) in &entries {
                println!("{:>8}  {}", n.to_string().dimmed(), value);
            }
        }
    }
    Ok(())
}

fn cmd_check(registry: &Registry, query: &str) -> Result<()> {
    let specimen = Specimen::from_query(query)?;
    let mut sequence = registry.create_sequence(&specimen.sequence_kind)?;
    let mut visualizer = registry.create_visualizer(&specimen.visualizer_kind)?;
    let sequence_status = sequence.validate(&specimen.sequence_params);
    let visualizer_status = visualizer.validate(&specimen.visualizer_params);
    print_status(&specimen.sequence_kind, &sequence_status);
    print_status(&specimen.visualizer_kind, &visualizer_status);
    if !(sequence_status.is_valid() && visualizer_status.is_valid()) {
        bail!("specimen {:?} is invalid", specimen.name);
    }
    println!(
        "{} {} of {}",
        "ok:".green().bold(),
        specimen.visualizer_kind,
        sequence.name()
    );
    Ok(())
}

async fn cmd_render(
    registry: &Registry,
    query: &str,
    (width, height): (f64, f64),
    frames: Option<u64>,
    output_format: RenderFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut specimen = Specimen::from_query(query)?;
    if frames.is_some() {
        specimen.frames = frames;
    }
    let surface: Box<dyn Surface> = match output_format {
        RenderFormat::Svg => Box::new(SvgSurface::new(width, height)),
        RenderFormat::Commands => Box::new(RecordingSurface::new(width, height)),
    };
    let mut animation = specimen.instantiate(registry, surface)?;
    animation
        .prepare()
        .await
        .with_context(|| format!("loading {}", animation.sequence().name()))?;
    let drawn = animation.run()?;
    print_status(&specimen.visualizer_kind, animation.visualizer().status());
    info!(frames = drawn, specimen = %specimen.name, "render finished");

    let surface = animation
        .visualizer()
        .surface()
        .ok_or_else(|| anyhow!("visualizer released its surface"))?
        .as_any();
    let text = if let Some(svg) = surface.downcast_ref::<SvgSurface>() {
        svg.to_svg()
    } else if let Some(recording) = surface.downcast_ref::<RecordingSurface>() {
        serde_json::to_string_pretty(recording.commands())? + "\n"
    } else {
        bail!("unexpected surface type");
    };

    match output {
        Some(path) => {
            tokio::fs::write(&path, text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "wrote {} after {drawn} frames to {}",
                specimen.visualizer_kind.cyan(),
                path.display()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let registry = build_registry(cli.bfiles)?;
    match cli.command {
        Commands::List {
            sequences,
            visualizers,
        } => cmd_list(&registry, sequences, visualizers, cli.format),
        Commands::Describe { kind } => cmd_describe(&registry, &kind, cli.format),
        Commands::Terms {
            kind,
            params,
            from,
            count,
        } => cmd_terms(&registry, &kind, params, from, count, cli.format).await,
        Commands::Check { query } => cmd_check(&registry, &query),
        Commands::Render {
            query,
            width,
            height,
            frames,
            output_format,
            output,
        } => cmd_render(&registry, &query, (width, height), frames, output_format, output).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = run(cli).await {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
