// src/lib.rs

//! Edge table in, force-directed graph image out.
//!
//! [`graph`] builds an undirected multigraph from `(Node A, Node B, id, length)`
//! rows, [`layout`] places its nodes with a seeded spring simulation, and
//! [`render`] draws the result to PNG or TGA bytes. [`ingest`], [`deliver`]
//! and [`viz`] wire those stages to files, HTML pages and the terminal.

pub mod graph;
pub mod layout;
pub mod raster;
pub mod style;
pub mod render;
pub mod ingest;
pub mod deliver;
pub mod progress;
pub mod viz;

pub use graph::{format_length, Edge, EdgeIndex, GraphModel, NodeId, SchemaError, SelfLoopPolicy};
pub use layout::{compute_layout, Layout, LayoutConfig, LayoutError, Position};
pub use render::{draw, plan, RenderError, RenderedImage, Scene};
pub use style::{OutputFormat, RenderStyle};
