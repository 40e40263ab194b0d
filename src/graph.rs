// src/graph.rs

//! In-memory edge-list graph built from tabular rows.
//!
//! The model is an undirected multigraph: nodes exist only as endpoints of
//! edges, and every accepted row becomes its own edge even when another edge
//! already joins the same pair.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tracing::debug;

/// Number of fields every row must carry: `(Node A, Node B, id, length)`.
pub const ROW_FIELDS: usize = 4;

/// Column names, in order, as they appear in a canonical header.
pub const COLUMN_NAMES: [&str; ROW_FIELDS] = ["Node A", "Node B", "id", "length"];

/// Opaque node identifier taken verbatim (minus surrounding whitespace)
/// from the source data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Position of an edge in the model's edge sequence.
pub type EdgeIndex = usize;

/// One undirected edge. `length` is display data only.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    pub id: String,
    pub length: f64,
    /// `length` as written in the source row (`10`, `10.0`, `1e3`).
    pub length_text: String,
}

impl Edge {
    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

/// Shortest text that reads back as `length`, with a signed two-digit
/// exponent when one is needed (`10.0`, `2.5`, `1.5e+20`, `1e-05`).
pub fn format_length(length: f64) -> String {
    let text = format!("{:?}", length);
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

/// What to do with rows whose two endpoints are the same node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfLoopPolicy {
    #[default]
    Allow,
    Reject,
}

/// Malformed row data. `row` is 1-based within the submitted batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("row {row}: expected {expected} fields (Node A, Node B, id, length), found {found}")]
    FieldCount {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}: field '{field}' is empty")]
    EmptyField { row: usize, field: &'static str },
    #[error("row {row}: length '{value}' is not a finite number")]
    InvalidLength { row: usize, value: String },
    #[error("row {row}: self-loop on node '{node}' is not allowed")]
    SelfLoop { row: usize, node: NodeId },
    #[error("header has {found} columns, expected {expected}")]
    HeaderWidth { expected: usize, found: usize },
    #[error("header column {column} is '{found}', expected '{expected}'")]
    HeaderName {
        column: usize,
        expected: &'static str,
        found: String,
    },
}

/// Append-only undirected multigraph.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<NodeId>,
    node_index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    self_loops: SelfLoopPolicy,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_self_loop_policy(policy: SelfLoopPolicy) -> Self {
        GraphModel {
            self_loops: policy,
            ..Self::default()
        }
    }

    pub fn self_loop_policy(&self) -> SelfLoopPolicy {
        self.self_loops
    }

    /// Validates every row and then appends one edge per row.
    ///
    /// Each row must hold exactly `(Node A, Node B, id, length)`. Nothing is
    /// inserted unless the whole batch is valid, so a failed call leaves the
    /// model as it was.
    pub fn add_edges<I, R, S>(&mut self, rows: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        let mut staged = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            staged.push(self.parse_row(i + 1, row.as_ref())?);
        }
        debug!("[graph] accepted {} rows", staged.len());
        for edge in staged {
            self.insert(edge);
        }
        Ok(())
    }

    /// Appends a single already-typed edge, with the same checks as
    /// [`GraphModel::add_edges`].
    pub fn add_edge(
        &mut self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
        id: impl Into<String>,
        length: f64,
    ) -> Result<EdgeIndex, SchemaError> {
        let edge = Edge {
            a: a.into(),
            b: b.into(),
            id: id.into(),
            length,
            length_text: format_length(length),
        };
        if !edge.length.is_finite() {
            return Err(SchemaError::InvalidLength {
                row: 1,
                value: edge.length.to_string(),
            });
        }
        self.check_edge(1, &edge)?;
        Ok(self.insert(edge))
    }

    fn parse_row<S: AsRef<str>>(&self, row: usize, fields: &[S]) -> Result<Edge, SchemaError> {
        if fields.len() != ROW_FIELDS {
            return Err(SchemaError::FieldCount {
                row,
                expected: ROW_FIELDS,
                found: fields.len(),
            });
        }
        let raw_length = fields[3].as_ref().trim();
        let length = raw_length
            .parse::<f64>()
            .ok()
            .filter(|l| l.is_finite())
            .ok_or_else(|| SchemaError::InvalidLength {
                row,
                value: raw_length.to_string(),
            })?;
        let edge = Edge {
            a: NodeId::new(fields[0].as_ref().trim()),
            b: NodeId::new(fields[1].as_ref().trim()),
            id: fields[2].as_ref().trim().to_string(),
            length,
            length_text: raw_length.to_string(),
        };
        self.check_edge(row, &edge)?;
        Ok(edge)
    }

    fn check_edge(&self, row: usize, edge: &Edge) -> Result<(), SchemaError> {
        if edge.a.as_str().is_empty() {
            return Err(SchemaError::EmptyField {
                row,
                field: COLUMN_NAMES[0],
            });
        }
        if edge.b.as_str().is_empty() {
            return Err(SchemaError::EmptyField {
                row,
                field: COLUMN_NAMES[1],
            });
        }
        if edge.is_self_loop() && self.self_loops == SelfLoopPolicy::Reject {
            return Err(SchemaError::SelfLoop {
                row,
                node: edge.a.clone(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, edge: Edge) -> EdgeIndex {
        self.intern(&edge.a);
        self.intern(&edge.b);
        self.edges.push(edge);
        self.edges.len() - 1
    }

    fn intern(&mut self, node: &NodeId) {
        if !self.node_index.contains_key(node) {
            self.node_index.insert(node.clone(), self.nodes.len());
            self.nodes.push(node.clone());
        }
    }

    /// Nodes in first-seen order. The order depends only on the input rows.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Edges in input order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.node_index.contains_key(node)
    }

    pub fn node_index(&self, node: &NodeId) -> Option<usize> {
        self.node_index.get(node).copied()
    }
}
