//! Causal graph construction over vector-clock events.
//!
//! [`CausalGraph::build`] groups events by host, links every event to its
//! immediate happened-before predecessor and assigns each event a rank
//! (vertical position) that is a valid topological numbering of those
//! links.
//!
//! Events on one host are assumed to arrive in host-local causal order; they
//! are never re-sorted by clock value.
//!
//! An event gets an external edge only when its clock update can be traced
//! to an exact clock snapshot on another host: for every host whose entry
//! changed since the local predecessor, the candidate source must agree with
//! the event's entry. Otherwise the edge is a child edge to the local
//! predecessor.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::clock::VectorTimestamp;
use crate::config::{GraphConfig, MissingSourcePolicy};
use crate::error::{Result, TraceError};
use crate::event::{EventId, LogEvent};
use crate::node::{NodeGraph, NodeId};

/// Kind of a happened-before edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Previous event on the same host
    Child,
    /// Event on another host whose clock snapshot this event observed
    External,
}

/// The immediate happened-before predecessor of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HappenedBefore {
    /// Edge classification
    pub kind: EdgeKind,
    /// The predecessor event
    pub source: EventId,
}

/// An event annotated with its happened-before edge and rank.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    event: Arc<LogEvent>,
    happened_before: Option<HappenedBefore>,
    pos: u32,
}

impl GraphNode {
    /// Returns the underlying event.
    #[must_use]
    pub fn event(&self) -> &Arc<LogEvent> {
        &self.event
    }

    /// Returns the event id.
    #[must_use]
    pub fn id(&self) -> EventId {
        self.event.id()
    }

    /// Returns the host that logged the event.
    #[must_use]
    pub fn host(&self) -> &str {
        self.event.host()
    }

    /// Returns the happened-before edge, absent for origin events.
    #[must_use]
    pub const fn happened_before(&self) -> Option<HappenedBefore> {
        self.happened_before
    }

    /// Returns the rank, starting at 1.
    #[must_use]
    pub const fn pos(&self) -> u32 {
        self.pos
    }

    /// Returns true if the happened-before edge crosses hosts.
    #[must_use]
    pub fn is_external(&self) -> bool {
        matches!(
            self.happened_before,
            Some(HappenedBefore {
                kind: EdgeKind::External,
                ..
            })
        )
    }
}

/// Events of a run, grouped by host, with happened-before edges and ranks.
#[derive(Debug, Clone, Default)]
pub struct CausalGraph {
    hosts: Vec<String>,
    /// Node range per host, parallel to `hosts`
    ranges: Vec<Range<usize>>,
    nodes: Vec<GraphNode>,
    index: HashMap<EventId, usize>,
}

impl CausalGraph {
    /// Builds the graph with the default (strict) configuration.
    ///
    /// # Errors
    ///
    /// See [`build_with`](Self::build_with).
    pub fn build<I>(events: I) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<LogEvent>>,
    {
        Self::build_with(events, &GraphConfig::default())
    }

    /// Builds the graph from events in input order.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::MissingCausalSource`] when an observed clock
    /// value matches no event (unless the config tolerates it) and
    /// [`TraceError::CausalCycle`] when the resulting edges are cyclic.
    pub fn build_with<I>(events: I, config: &GraphConfig) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<LogEvent>>,
    {
        let mut graph = Self::grouped(events);
        graph.resolve_happened_before(config)?;
        graph.assign_ranks()?;

        debug!(
            hosts = graph.hosts.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges().count(),
            "built causal graph"
        );
        Ok(graph)
    }

    fn grouped<I>(events: I) -> Self
    where
        I: IntoIterator<Item = Arc<LogEvent>>,
    {
        let mut hosts: Vec<String> = Vec::new();
        let mut host_index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<Arc<LogEvent>>> = Vec::new();

        for event in events {
            let h = *host_index.entry(event.host().to_string()).or_insert_with(|| {
                hosts.push(event.host().to_string());
                groups.push(Vec::new());
                hosts.len() - 1
            });
            groups[h].push(event);
        }

        let mut ranges = Vec::with_capacity(groups.len());
        let mut nodes = Vec::new();
        for group in groups {
            let start = nodes.len();
            nodes.extend(group.into_iter().map(|event| GraphNode {
                event,
                happened_before: None,
                pos: 0,
            }));
            ranges.push(start..nodes.len());
        }

        let index = nodes.iter().enumerate().map(|(i, n)| (n.id(), i)).collect();
        Self {
            hosts,
            ranges,
            nodes,
            index,
        }
    }

    /// Links every event to its immediate happened-before predecessor.
    fn resolve_happened_before(&mut self, config: &GraphConfig) -> Result<()> {
        // (host, own clock value) -> node; the first event wins on duplicates
        let mut by_clock: HashMap<(&str, u64), usize> = HashMap::new();
        for (i, node) in self.nodes.iter().enumerate() {
            let ts = node.event.timestamp();
            by_clock.entry((ts.host(), ts.own_time())).or_insert(i);
        }

        let mut links = Vec::with_capacity(self.nodes.len());
        for range in &self.ranges {
            for i in range.clone() {
                let event = &self.nodes[i].event;
                let link = if i == range.start {
                    if event.timestamp().has_foreign_hosts() {
                        let genesis = VectorTimestamp::genesis(event.host());
                        self.find_external(event, &genesis, &by_clock, config)?
                            .map(external)
                    } else {
                        None
                    }
                } else {
                    let prev = &self.nodes[i - 1].event;
                    let found =
                        self.find_external(event, prev.timestamp(), &by_clock, config)?;
                    Some(found.map_or(
                        HappenedBefore {
                            kind: EdgeKind::Child,
                            source: prev.id(),
                        },
                        external,
                    ))
                };
                links.push((i, link));
            }
        }

        for (i, link) in links {
            self.nodes[i].happened_before = link;
        }
        Ok(())
    }

    /// Finds the event on another host whose clock snapshot `event` observed
    /// since `prev`.
    fn find_external(
        &self,
        event: &LogEvent,
        prev: &VectorTimestamp,
        by_clock: &HashMap<(&str, u64), usize>,
        config: &GraphConfig,
    ) -> Result<Option<EventId>> {
        let ts = event.timestamp();
        let updated = ts.compare_updated_hosts(prev);

        for &host in &updated {
            let Some(value) = ts.get(host) else { continue };
            let Some(&x) = by_clock.get(&(host, value)) else {
                match config.missing_source {
                    MissingSourcePolicy::Error => {
                        return Err(TraceError::MissingCausalSource {
                            event: event.id(),
                            host: host.to_string(),
                            clock: value,
                        });
                    }
                    MissingSourcePolicy::FallBackToChild => {
                        warn!(
                            event = %event.id(),
                            host,
                            clock = value,
                            "no event carries observed clock value"
                        );
                        continue;
                    }
                }
            };

            let source = &self.nodes[x].event;
            if source.timestamp().compare_hosts(ts, updated.iter().copied()) {
                trace!(from = %source.id(), to = %event.id(), "external edge");
                return Ok(Some(source.id()));
            }
        }
        Ok(None)
    }

    /// Assigns ranks host by host, descending into the host of an external
    /// source first when that source is not ranked yet.
    ///
    /// Uses an explicit stack of `(host, last index to process)` frames so
    /// deep cross-host chains cannot exhaust the native stack.
    fn assign_ranks(&mut self) -> Result<()> {
        let host_count = self.hosts.len();
        let mut cursor: Vec<usize> = self.ranges.iter().map(|r| r.start).collect();
        let mut running = vec![0u32; host_count];
        let mut on_stack = vec![false; host_count];
        let mut ranked = vec![false; self.nodes.len()];
        let host_of = self.host_of_nodes();

        for start_host in 0..host_count {
            let end = self.ranges[start_host].end;
            if cursor[start_host] >= end {
                continue;
            }
            let mut stack = vec![(start_host, end - 1)];
            on_stack[start_host] = true;

            while let Some(&(h, target)) = stack.last() {
                if cursor[h] > target {
                    stack.pop();
                    on_stack[h] = false;
                    continue;
                }

                let i = cursor[h];
                let mut pos = running[h] + 1;
                if let Some(HappenedBefore {
                    kind: EdgeKind::External,
                    source,
                }) = self.nodes[i].happened_before
                {
                    let x = self.index[&source];
                    if !ranked[x] {
                        let xh = host_of[x];
                        if on_stack[xh] {
                            return Err(TraceError::CausalCycle {
                                host: self.hosts[xh].clone(),
                            });
                        }
                        stack.push((xh, x));
                        on_stack[xh] = true;
                        continue;
                    }
                    pos = pos.max(self.nodes[x].pos + 1);
                }

                self.nodes[i].pos = pos;
                ranked[i] = true;
                running[h] = pos;
                cursor[h] += 1;
            }
        }
        Ok(())
    }

    fn host_of_nodes(&self) -> Vec<usize> {
        let mut host_of = vec![0; self.nodes.len()];
        for (h, range) in self.ranges.iter().enumerate() {
            for i in range.clone() {
                host_of[i] = h;
            }
        }
        host_of
    }

    /// Returns every node, grouped by host in first-seen order.
    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Returns the node for `id`.
    #[must_use]
    pub fn node(&self, id: EventId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// Returns the nodes whose happened-before edge is external.
    pub fn edges(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.is_external())
    }

    /// Returns unique hosts in first-seen order.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns a host's nodes in input order.
    #[must_use]
    pub fn host_events(&self, host: &str) -> &[GraphNode] {
        self.hosts
            .iter()
            .position(|h| h == host)
            .map_or(&[], |h| &self.nodes[self.ranges[h].clone()])
    }

    /// Returns the largest rank, or 0 for an empty graph.
    #[must_use]
    pub fn max_rank(&self) -> u32 {
        self.nodes.iter().map(GraphNode::pos).max().unwrap_or(0)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Restricts the external edges to a selection of nodes.
    ///
    /// An edge survives only if both the event and its source are selected.
    /// Ranks are not recomputed.
    pub fn filter<I>(&self, selection: I) -> Vec<&GraphNode>
    where
        I: IntoIterator<Item = EventId>,
    {
        let selected: HashSet<EventId> = selection.into_iter().collect();
        self.edges()
            .filter(|n| {
                selected.contains(&n.id())
                    && n.happened_before
                        .is_some_and(|hb| selected.contains(&hb.source))
            })
            .collect()
    }

    /// Copies the graph into a [`NodeGraph`]: one sequence per host and a
    /// family link from every external source to its dependent event.
    ///
    /// # Errors
    ///
    /// Propagates node primitive errors, which indicate an inconsistent
    /// graph.
    pub fn to_node_graph(&self) -> Result<NodeGraph<EventId>> {
        let mut graph = NodeGraph::new();
        let mut ids: HashMap<EventId, NodeId> = HashMap::with_capacity(self.nodes.len());

        for (host, range) in self.hosts.iter().zip(&self.ranges) {
            let (_, tail) = graph.add_host(host);
            for node in &self.nodes[range.clone()] {
                let id = graph.create_node(node.id());
                graph.insert_prev(tail, id)?;
                ids.insert(node.id(), id);
            }
        }

        for node in self.edges() {
            let Some(hb) = node.happened_before else {
                continue;
            };
            if let (Some(&parent), Some(&child)) = (ids.get(&hb.source), ids.get(&node.id())) {
                graph.add_child(parent, child)?;
            }
        }
        Ok(graph)
    }
}

const fn external(source: EventId) -> HappenedBefore {
    HappenedBefore {
        kind: EdgeKind::External,
        source,
    }
}
