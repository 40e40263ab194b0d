use clap::{Args, Parser, Subcommand, ValueEnum};
use edgeviz::{
    ingest::{self, HeaderMode, IngestOptions},
    layout::{self, LayoutConfig},
    progress,
    style::{OutputFormat, RenderStyle},
    viz::{self, VizOptions},
    SelfLoopPolicy,
};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Edgeviz: draw an edge table as a force-directed graph image
#[derive(Parser, Debug)]
#[command(
    name = "edgeviz",
    about = "Lay out an edge table (Node A, Node B, id, length) with a spring model and render it as an image",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out and render an edge table to an image
    Render(RenderArgs),
    /// Lay out an edge table and write node coordinates as CSV
    Layout(LayoutArgs),
    /// Print the default render style as JSON
    DefaultStyle,
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Path to the edge table: delimited text, or an .xlsx/.xls/.ods workbook
    #[arg(short, long, value_name = "TABLE")]
    input: PathBuf,
    /// Field delimiter for delimited text: a single character, or "tab"
    #[arg(long, value_name = "CHAR", default_value = ",", value_parser = parse_delimiter)]
    delimiter: u8,
    /// Accept any header names as long as there are four columns
    #[arg(long, conflicts_with = "no_header")]
    positional_header: bool,
    /// The table has no header row
    #[arg(long)]
    no_header: bool,
    /// Fail on rows whose two endpoints are the same node
    #[arg(long)]
    reject_self_loops: bool,
}

impl InputArgs {
    fn options(&self) -> IngestOptions {
        let header = if self.no_header {
            HeaderMode::None
        } else if self.positional_header {
            HeaderMode::Positional
        } else {
            HeaderMode::Validate
        };
        IngestOptions {
            delimiter: self.delimiter,
            header,
            self_loops: if self.reject_self_loops {
                SelfLoopPolicy::Reject
            } else {
                SelfLoopPolicy::Allow
            },
        }
    }
}

#[derive(Args, Debug, Clone)]
struct SimulationArgs {
    /// Seed for the initial random placement
    #[arg(long, value_name = "N", default_value_t = 42)]
    seed: u64,
    /// Optimal distance between connected nodes
    #[arg(long, value_name = "K", default_value_t = 0.5)]
    spring_constant: f64,
    /// Maximum number of simulation steps
    #[arg(long, value_name = "N", default_value_t = 50)]
    iterations: usize,
    /// Hide the progress bar
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

impl SimulationArgs {
    fn config(&self) -> LayoutConfig {
        LayoutConfig {
            seed: self.seed,
            spring_constant: self.spring_constant,
            iterations: self.iterations,
            ..LayoutConfig::default()
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FormatArg {
    Png,
    Tga,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Tga => OutputFormat::Tga,
        }
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    simulation: SimulationArgs,
    /// Path to the output image
    #[arg(short, long, value_name = "FILE", default_value = "graph.png")]
    output: PathBuf,
    /// Also write an HTML page embedding the image
    #[arg(long, value_name = "FILE")]
    html: Option<PathBuf>,
    /// Print the image in the terminal when done
    #[arg(long, default_value_t = false)]
    show: bool,
    /// JSON file with render style overrides
    #[arg(long, value_name = "JSON")]
    style: Option<PathBuf>,
    /// Title drawn above the graph (empty for none)
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,
    /// Canvas width in pixels
    #[arg(long, value_name = "PX")]
    width: Option<u32>,
    /// Canvas height in pixels
    #[arg(long, value_name = "PX")]
    height: Option<u32>,
    /// Output image format
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    input: InputArgs,
    #[command(flatten)]
    simulation: SimulationArgs,
    /// Path to the output CSV (stdout if omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("delimiter must be one ASCII character or \"tab\", got '{}'", s)),
        },
    }
}

fn build_style(args: &RenderArgs) -> Result<RenderStyle, Box<dyn Error>> {
    let mut style = match &args.style {
        Some(path) => RenderStyle::load(path)?,
        None => RenderStyle::default(),
    };
    if let Some(title) = &args.title {
        style.title = title.clone();
    }
    if let Some(width) = args.width {
        style.width = width;
    }
    if let Some(height) = args.height {
        style.height = height;
    }
    if let Some(format) = args.format {
        style.format = format.into();
    }
    Ok(style)
}

fn run_render(args: RenderArgs) -> Result<(), Box<dyn Error>> {
    let options = VizOptions {
        ingest: args.input.options(),
        layout: args.simulation.config(),
        style: build_style(&args)?,
        output: args.output.clone(),
        html: args.html.clone(),
        show: args.show,
        progress: !args.simulation.quiet,
    };
    let summary = viz::run_viz(&args.input.input, &options)?;
    info!(
        "[render] {} nodes, {} edges -> {} ({} bytes, {})",
        summary.nodes,
        summary.edges,
        args.output.display(),
        summary.bytes,
        summary.content_type
    );
    Ok(())
}

fn run_layout(args: LayoutArgs) -> Result<(), Box<dyn Error>> {
    let graph = ingest::load_graph(&args.input.input, &args.input.options())?;
    let config = args.simulation.config();
    let positions = if args.simulation.quiet {
        layout::compute_layout(&graph, &config)?
    } else {
        let pb = progress::layout_progress_bar(config.iterations);
        let result = layout::compute_layout_with_observer(&graph, &config, |stats| {
            progress::record_iteration(&pb, stats)
        });
        pb.finish_and_clear();
        result?
    };
    match &args.output {
        Some(path) => {
            viz::write_layout_csv(&graph, &positions, BufWriter::new(File::create(path)?))?;
            info!("[layout] wrote {} positions to {}", positions.len(), path.display());
        }
        None => viz::write_layout_csv(&graph, &positions, io::stdout().lock())?,
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Render(args) => run_render(args),
        Command::Layout(args) => run_layout(args),
        Command::DefaultStyle => RenderStyle::default()
            .to_json()
            .map(|json| println!("{}", json))
            .map_err(Into::into),
    };

    if let Err(err) = result {
        error!("[edgeviz error] {}", err);
        std::process::exit(1);
    }
}
