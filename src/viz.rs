// src/viz.rs

//! End-to-end pipeline: edge table → graph → layout → image → delivery.

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::deliver;
use crate::graph::{GraphModel, SchemaError, SelfLoopPolicy};
use crate::ingest::{self, IngestOptions};
use crate::layout::{self, Layout, LayoutConfig, LayoutError};
use crate::progress;
use crate::render::{self, RenderError, RenderedImage};
use crate::style::RenderStyle;

/// Above this many nodes the quadratic layout gets slow; we only warn.
pub const LARGE_GRAPH_NODES: usize = 5000;

/// Terminal width, in cells, used when printing the image.
const TERMINAL_WIDTH: u32 = 100;

/// Failure of the in-memory part of the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Lays out and draws `graph`. With `show_progress`, a progress bar tracks
/// the layout iterations on stderr.
pub fn render_graph(
    graph: &GraphModel,
    layout_config: &LayoutConfig,
    style: &RenderStyle,
    show_progress: bool,
) -> Result<(Layout, RenderedImage), PipelineError> {
    if graph.node_count() > LARGE_GRAPH_NODES {
        warn!(
            "[viz] laying out {} nodes; this may take a while",
            graph.node_count()
        );
    }

    let positions = if show_progress {
        let pb = progress::layout_progress_bar(layout_config.iterations);
        let result = layout::compute_layout_with_observer(graph, layout_config, |stats| {
            progress::record_iteration(&pb, stats)
        });
        pb.finish_and_clear();
        result?
    } else {
        layout::compute_layout(graph, layout_config)?
    };

    let image = if show_progress {
        let pb = progress::spinner_progress("render", "drawing graph");
        let result = render::draw(graph, &positions, style);
        pb.finish_and_clear();
        result?
    } else {
        render::draw(graph, &positions, style)?
    };
    Ok((positions, image))
}

/// Builds a graph from raw rows and renders it in one call.
pub fn visualize_rows<I, R, S>(
    rows: I,
    self_loops: SelfLoopPolicy,
    layout_config: &LayoutConfig,
    style: &RenderStyle,
) -> Result<RenderedImage, PipelineError>
where
    I: IntoIterator<Item = R>,
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut graph = GraphModel::with_self_loop_policy(self_loops);
    graph.add_edges(rows)?;
    let (_, image) = render_graph(&graph, layout_config, style, false)?;
    Ok(image)
}

/// Everything the command line can ask of one run.
#[derive(Debug, Clone, Default)]
pub struct VizOptions {
    pub ingest: IngestOptions,
    pub layout: LayoutConfig,
    pub style: RenderStyle,
    pub output: PathBuf,
    pub html: Option<PathBuf>,
    pub show: bool,
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VizSummary {
    pub nodes: usize,
    pub edges: usize,
    pub bytes: usize,
    pub content_type: &'static str,
}

/// Reads `input`, renders it and delivers the image as `options` asks.
pub fn run_viz(input: &Path, options: &VizOptions) -> Result<VizSummary, Box<dyn Error>> {
    info!("[viz] loading edge table from {}", input.display());
    let graph = ingest::load_graph(input, &options.ingest)?;
    if graph.is_empty() {
        warn!("[viz] {} has no edges; the image will be empty", input.display());
    }

    let (_, image) = render_graph(&graph, &options.layout, &options.style, options.progress)?;

    deliver::write_image(&image, &options.output)?;
    if let Some(html) = &options.html {
        deliver::write_html_page(&image, &options.style.title, html)?;
    }
    if options.show {
        deliver::show_in_terminal(&image, TERMINAL_WIDTH)?;
    }

    Ok(VizSummary {
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        bytes: image.bytes.len(),
        content_type: image.content_type(),
    })
}

/// Writes `node,x,y` rows for every node in graph order.
pub fn write_layout_csv<W: io::Write>(graph: &GraphModel, positions: &Layout, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["node", "x", "y"])?;
    for node in graph.nodes() {
        if let Some(p) = positions.get(node) {
            let (x, y) = (p.x.to_string(), p.y.to_string());
            wtr.write_record([node.as_str(), x.as_str(), y.as_str()])?;
        }
    }
    wtr.flush()?;
    Ok(())
}
