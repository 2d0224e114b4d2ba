//! Layout command implementation.
//!
//! Parses a log, builds one causal graph per execution and prints hosts,
//! ranked nodes and cross-host edges.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use vtrace_core::{
    CausalGraph, EventId, Execution, GraphConfig, GraphNode, HappenedBefore, LogFormat,
};

use crate::catalog::Catalog;
use crate::cli::LayoutArgs;
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, TableDisplay, truncate};

/// Handler for the layout command.
pub struct LayoutCommand<'a> {
    catalog: Option<&'a Path>,
}

impl<'a> LayoutCommand<'a> {
    /// Creates a new layout command handler.
    #[must_use]
    pub const fn new(catalog: Option<&'a Path>) -> Self {
        Self { catalog }
    }

    /// Executes the layout command.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read, parsed or laid out.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &LayoutArgs,
    ) -> Result<()> {
        let (log_format, path) = self.resolve(args)?;
        let raw = fs::read_to_string(&path).map_err(|source| CliError::Read {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), bytes = raw.len(), "laying out log");

        let mut parser = log_format.parser()?;
        let log = parser.parse(&raw)?;

        let executions: Vec<&Execution> = match &args.execution {
            Some(label) => vec![
                log.execution(label)
                    .ok_or_else(|| CliError::UnknownExecution(label.clone()))?,
            ],
            None => log.executions().iter().collect(),
        };

        let config = if args.lenient {
            GraphConfig::lenient()
        } else {
            GraphConfig::default()
        };

        let mut layouts = Vec::with_capacity(executions.len());
        for execution in executions {
            let graph = CausalGraph::build_with(execution.events().iter().cloned(), &config)?;
            layouts.push(ExecutionLayout::new(execution.label(), &graph, args));
        }

        format.write(out, &LayoutOutput { executions: layouts })
    }

    /// Picks the log format and file from flags, falling back to the
    /// `--example` entry and finally the default format.
    fn resolve(&self, args: &LayoutArgs) -> Result<(LogFormat, PathBuf)> {
        let mut format = LogFormat::default();
        let mut path = args.file.clone();

        if let Some(name) = &args.example {
            let catalog_path = self.catalog.ok_or_else(|| {
                CliError::Config("--example needs --catalog or VTRACE_CATALOG".into())
            })?;
            let catalog = Catalog::load(catalog_path)?;
            let entry = catalog
                .find(name)
                .ok_or_else(|| CliError::UnknownExample(name.clone()))?;
            debug!(example = %entry.title, "using catalog format");
            format = entry.format.clone();
            path = path.or_else(|| Some(entry.path_in(catalog_path)));
        }

        if let Some(pattern) = &args.pattern {
            format.pattern.clone_from(pattern);
        }
        if let Some(delimiter) = &args.delimiter {
            format.delimiter = Some(delimiter.clone());
        }

        let path = path.ok_or_else(|| CliError::Config("no log file given".into()))?;
        Ok((format, path))
    }
}

// Output types

/// Layout of every requested execution.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutput {
    /// Executions in source order.
    pub executions: Vec<ExecutionLayout>,
}

/// Layout of one execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionLayout {
    /// Execution label.
    pub label: String,
    /// Hosts in first-seen order.
    pub hosts: Vec<String>,
    /// Largest rank in the execution.
    pub max_rank: u32,
    /// Selected nodes, grouped by host.
    pub nodes: Vec<NodeRow>,
    /// Cross-host edges among the selected nodes.
    pub edges: Vec<EdgeRow>,
}

/// One laid-out event.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRow {
    /// Event id.
    pub id: EventId,
    /// Owning host.
    pub host: String,
    /// Vertical rank.
    pub rank: u32,
    /// Source line within the execution.
    pub line: usize,
    /// Event text.
    pub text: String,
    /// Immediate predecessor, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub happened_before: Option<HappenedBefore>,
    /// Extra captured fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// A cross-host happened-before edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRow {
    /// Source event.
    pub from: EventId,
    /// Source host.
    pub from_host: String,
    /// Dependent event.
    pub to: EventId,
    /// Dependent host.
    pub to_host: String,
}

impl ExecutionLayout {
    fn new(label: &str, graph: &CausalGraph, args: &LayoutArgs) -> Self {
        let selected: Vec<&GraphNode> = graph
            .nodes()
            .iter()
            .filter(|n| args.hosts.is_empty() || args.hosts.iter().any(|h| h == n.host()))
            .filter(|n| {
                args.contains
                    .as_deref()
                    .is_none_or(|text| n.event().text().contains(text))
            })
            .collect();

        let edge_nodes: Vec<&GraphNode> = if args.has_selection() {
            graph.filter(selected.iter().map(|n| n.id()))
        } else {
            graph.edges().collect()
        };

        let edges = edge_nodes
            .into_iter()
            .filter_map(|n| {
                let hb = n.happened_before()?;
                let source = graph.node(hb.source)?;
                Some(EdgeRow {
                    from: hb.source,
                    from_host: source.host().to_string(),
                    to: n.id(),
                    to_host: n.host().to_string(),
                })
            })
            .collect();

        Self {
            label: label.to_string(),
            hosts: graph.hosts().to_vec(),
            max_rank: graph.max_rank(),
            nodes: selected.into_iter().map(NodeRow::from).collect(),
            edges,
        }
    }
}

impl From<&GraphNode> for NodeRow {
    fn from(node: &GraphNode) -> Self {
        let event = node.event();
        Self {
            id: node.id(),
            host: node.host().to_string(),
            rank: node.pos(),
            line: event.line(),
            text: event.text().to_string(),
            happened_before: node.happened_before(),
            fields: event.fields().clone(),
        }
    }
}

impl TableDisplay for LayoutOutput {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (i, layout) in self.executions.iter().enumerate() {
            if i > 0 {
                writeln!(writer)?;
            }
            layout.write_table(writer)?;
        }
        Ok(())
    }
}

impl TableDisplay for ExecutionLayout {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        let label = if self.label.is_empty() {
            "(unlabelled)"
        } else {
            &self.label
        };
        writeln!(writer, "Execution: {label}")?;
        writeln!(writer, "Hosts:     {}", self.hosts.join(", "))?;
        writeln!(writer, "Max rank:  {}", self.max_rank)?;
        writeln!(writer)?;

        if self.nodes.is_empty() {
            writeln!(writer, "No matching events")?;
        } else {
            writeln!(
                writer,
                "{:>6}  {:>4}  {:<12}  {:>5}  {:<32}  {}",
                "ID", "RANK", "HOST", "LINE", "TEXT", "AFTER"
            )?;
            writeln!(writer, "{}", "─".repeat(80))?;
            for node in &self.nodes {
                let after = node.happened_before.map_or_else(
                    || "-".to_string(),
                    |hb| format!("{} {}", hb.source, edge_kind(hb)),
                );
                writeln!(
                    writer,
                    "{:>6}  {:>4}  {:<12}  {:>5}  {:<32}  {}",
                    node.id.to_string(),
                    node.rank,
                    truncate(&node.host, 12),
                    node.line,
                    truncate(&node.text, 32),
                    after
                )?;
            }
        }

        writeln!(writer)?;
        writeln!(writer, "Edges: {}", self.edges.len())?;
        for edge in &self.edges {
            writeln!(
                writer,
                "  {} ({}) -> {} ({})",
                edge.from, edge.from_host, edge.to, edge.to_host
            )?;
        }
        Ok(())
    }
}

const fn edge_kind(hb: HappenedBefore) -> &'static str {
    match hb.kind {
        vtrace_core::EdgeKind::Child => "(child)",
        vtrace_core::EdgeKind::External => "(external)",
    }
}
