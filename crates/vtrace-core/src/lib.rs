//! # vtrace-core
//!
//! Causal layout of distributed-system logs annotated with vector clocks.
//!
//! This crate provides:
//!
//! - [`VectorTimestamp`] - Per-event vector clock with causal comparison
//! - [`NamedRegex`] - Regex wrapper exposing its named groups
//! - [`LogParser`] - Splits a raw log into executions and [`LogEvent`]s
//! - [`CausalGraph`] - Happened-before edges and per-host ranks
//! - [`NodeGraph`] - Per-host sequences with cross-host family links
//! - [`LogFormat`] / [`GraphConfig`] - Serializable configuration
//!
//! ## Example
//!
//! ```rust
//! use vtrace_core::{CausalGraph, LogFormat};
//!
//! let raw = "start\na {\"a\": 1}\nsend\na {\"a\": 2}\nrecv\nb {\"a\": 2, \"b\": 1}\n";
//!
//! let mut parser = LogFormat::default().parser()?;
//! let log = parser.parse(raw)?;
//! let events = log.executions()[0].events().to_vec();
//!
//! let graph = CausalGraph::build(events)?;
//! assert_eq!(graph.hosts(), ["a", "b"]);
//! assert_eq!(graph.edges().count(), 1);
//! # Ok::<(), vtrace_core::TraceError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod graph;
pub mod node;
pub mod parser;
pub mod pattern;

// Re-export main types
pub use clock::VectorTimestamp;
pub use config::{DEFAULT_PATTERN, GraphConfig, LogFormat, MissingSourcePolicy};
pub use error::{ClockError, NodeError, Result, TraceError};
pub use event::{EventId, IdAllocator, LogEvent};
pub use graph::{CausalGraph, EdgeKind, GraphNode, HappenedBefore};
pub use node::{EventLog, GraphEvent, GraphObserver, NodeGraph, NodeId};
pub use parser::{Execution, ExecutionParser, LogParser, ParsedLog};
pub use pattern::NamedRegex;
