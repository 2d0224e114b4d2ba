//! Doubly-linked, multi-parent node graph.
//!
//! A [`NodeGraph`] holds one sequence per host, bracketed by head and tail
//! sentinels, and family links (parent/child) between nodes on different
//! hosts. Nodes live in an arena and are addressed by [`NodeId`].
//!
//! Invariants kept by every operation:
//! - `next(prev(n)) == n` and `prev(next(n)) == n` for linked nodes
//! - `x` is a child of `y` iff `y` is a parent of `x`
//! - a node has at most one parent and one child per host, never on its
//!   own host
//! - sentinels have no family and cannot be removed
//!
//! Structural changes are reported to subscribed [`GraphObserver`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::NodeError;

/// Handle to a node in a [`NodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A structural change to a [`NodeGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    /// `node` was linked between `prev` and `next`.
    AddNode {
        /// The inserted node
        node: NodeId,
        /// Its new predecessor
        prev: NodeId,
        /// Its new successor
        next: NodeId,
    },
    /// `node` was unlinked from between `prev` and `next`.
    RemoveNode {
        /// The removed node
        node: NodeId,
        /// Its former predecessor
        prev: NodeId,
        /// Its former successor
        next: NodeId,
    },
    /// A parent/child link was created.
    AddFamily {
        /// Parent side
        parent: NodeId,
        /// Child side
        child: NodeId,
    },
    /// A parent/child link was severed.
    RemoveFamily {
        /// Parent side
        parent: NodeId,
        /// Child side
        child: NodeId,
    },
}

/// Receives structural change notifications.
pub trait GraphObserver: Send {
    /// Called once per change, in the order changes happen.
    fn notify(&mut self, event: &GraphEvent);
}

/// Observer that records every event; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<GraphEvent>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<GraphEvent> {
        self.events.lock().clone()
    }

    /// Drains and returns the recorded events.
    pub fn take(&self) -> Vec<GraphEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl GraphObserver for EventLog {
    fn notify(&mut self, event: &GraphEvent) {
        self.events.lock().push(*event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sentinel {
    Head,
    Tail,
}

#[derive(Debug)]
struct Slot<T> {
    payload: Option<T>,
    sentinel: Option<Sentinel>,
    host: Option<String>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    parents: BTreeMap<String, NodeId>,
    children: BTreeMap<String, NodeId>,
}

impl<T> Slot<T> {
    const fn new(payload: Option<T>, sentinel: Option<Sentinel>, host: Option<String>) -> Self {
        Self {
            payload,
            sentinel,
            host,
            prev: None,
            next: None,
            parents: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }
}

/// Arena of nodes arranged in per-host sequences with cross-host family.
pub struct NodeGraph<T> {
    slots: Vec<Slot<T>>,
    hosts: Vec<(String, NodeId, NodeId)>,
    observers: Vec<Box<dyn GraphObserver>>,
}

impl<T> Default for NodeGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for NodeGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeGraph")
            .field("nodes", &self.slots.len())
            .field("hosts", &self.hosts.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T> NodeGraph<T> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            hosts: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Subscribes an observer to structural changes.
    pub fn subscribe(&mut self, observer: Box<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    fn notify(&mut self, event: GraphEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }

    /// Registers `host`, returning its `(head, tail)` sentinels.
    ///
    /// Registering a known host returns its existing sentinels.
    pub fn add_host(&mut self, host: &str) -> (NodeId, NodeId) {
        if let Some(&(_, head, tail)) = self.hosts.iter().find(|(h, _, _)| h == host) {
            return (head, tail);
        }
        let head = self.push_slot(Slot::new(None, Some(Sentinel::Head), Some(host.to_string())));
        let tail = self.push_slot(Slot::new(None, Some(Sentinel::Tail), Some(host.to_string())));
        self.slots[head.0].next = Some(tail);
        self.slots[tail.0].prev = Some(head);
        self.hosts.push((host.to_string(), head, tail));
        (head, tail)
    }

    /// Returns registered hosts in registration order.
    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(|(h, _, _)| h.as_str())
    }

    /// Returns the head sentinel of `host`.
    #[must_use]
    pub fn head(&self, host: &str) -> Option<NodeId> {
        self.hosts.iter().find(|(h, _, _)| h == host).map(|e| e.1)
    }

    /// Returns the tail sentinel of `host`.
    #[must_use]
    pub fn tail(&self, host: &str) -> Option<NodeId> {
        self.hosts.iter().find(|(h, _, _)| h == host).map(|e| e.2)
    }

    /// Creates a detached node carrying `payload`.
    pub fn create_node(&mut self, payload: T) -> NodeId {
        self.push_slot(Slot::new(Some(payload), None, None))
    }

    fn push_slot(&mut self, slot: Slot<T>) -> NodeId {
        self.slots.push(slot);
        NodeId(self.slots.len() - 1)
    }

    fn slot(&self, id: NodeId) -> Result<&Slot<T>, NodeError> {
        self.slots.get(id.0).ok_or(NodeError::UnknownNode(id.0))
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    /// Returns the node's payload; sentinels have none.
    #[must_use]
    pub fn payload(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.0).and_then(|s| s.payload.as_ref())
    }

    /// Returns the node's host, `None` while detached.
    #[must_use]
    pub fn host(&self, id: NodeId) -> Option<&str> {
        self.slots.get(id.0).and_then(|s| s.host.as_deref())
    }

    /// Returns the next node in the host sequence.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.next)
    }

    /// Returns the previous node in the host sequence.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.prev)
    }

    /// Returns true if `id` is a head sentinel.
    #[must_use]
    pub fn is_head(&self, id: NodeId) -> bool {
        self.sentinel(id) == Some(Sentinel::Head)
    }

    /// Returns true if `id` is a tail sentinel.
    #[must_use]
    pub fn is_tail(&self, id: NodeId) -> bool {
        self.sentinel(id) == Some(Sentinel::Tail)
    }

    fn sentinel(&self, id: NodeId) -> Option<Sentinel> {
        self.slots.get(id.0).and_then(|s| s.sentinel)
    }

    /// Returns true if the node is linked into a host sequence.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.host(id).is_some()
    }

    /// Returns the node's parents ordered by host.
    #[must_use]
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.slots
            .get(id.0)
            .map(|s| s.parents.values().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the node's children ordered by host.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.slots
            .get(id.0)
            .map(|s| s.children.values().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the node's parent on `host`.
    #[must_use]
    pub fn parent_on(&self, id: NodeId, host: &str) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.parents.get(host).copied())
    }

    /// Returns the node's child on `host`.
    #[must_use]
    pub fn child_on(&self, id: NodeId, host: &str) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.children.get(host).copied())
    }

    /// Returns the non-sentinel nodes of `host` from head to tail.
    #[must_use]
    pub fn host_nodes(&self, host: &str) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        let mut cursor = self.head(host).and_then(|h| self.next(h));
        while let Some(id) = cursor {
            if self.is_tail(id) {
                break;
            }
            nodes.push(id);
            cursor = self.next(id);
        }
        nodes
    }

    // ---------------------------------------------------------------
    // Sequence mutation
    // ---------------------------------------------------------------

    /// Moves `node` to directly after `anchor`, on `anchor`'s host.
    ///
    /// # Errors
    ///
    /// Fails if `anchor` is a tail or detached, or if `node` is a sentinel.
    pub fn insert_next(&mut self, anchor: NodeId, node: NodeId) -> Result<(), NodeError> {
        if self.is_tail(anchor) {
            return Err(NodeError::InsertAfterTail);
        }
        let next = self.slot(anchor)?.next.ok_or(NodeError::Detached)?;
        self.splice(anchor, node, next)
    }

    /// Moves `node` to directly before `anchor`, on `anchor`'s host.
    ///
    /// # Errors
    ///
    /// Fails if `anchor` is a head or detached, or if `node` is a sentinel.
    pub fn insert_prev(&mut self, anchor: NodeId, node: NodeId) -> Result<(), NodeError> {
        if self.is_head(anchor) {
            return Err(NodeError::InsertBeforeHead);
        }
        let prev = self.slot(anchor)?.prev.ok_or(NodeError::Detached)?;
        self.splice(prev, node, anchor)
    }

    /// Links `node` between the adjacent pair `prev`/`next`.
    fn splice(&mut self, prev: NodeId, node: NodeId, next: NodeId) -> Result<(), NodeError> {
        self.slot(node)?;
        if node == prev || node == next {
            return Ok(());
        }
        self.remove(node)?;

        let host = self.slot(prev)?.host.clone();
        {
            let slot = &mut self.slots[node.0];
            slot.prev = Some(prev);
            slot.next = Some(next);
            slot.host = host;
        }
        self.slots[prev.0].next = Some(node);
        self.slots[next.0].prev = Some(node);
        self.notify(GraphEvent::AddNode { node, prev, next });
        Ok(())
    }

    /// Unlinks `node` from its sequence and severs all its family links.
    ///
    /// Removing a detached node is a no-op.
    ///
    /// # Errors
    ///
    /// Fails on sentinels.
    pub fn remove(&mut self, node: NodeId) -> Result<(), NodeError> {
        let slot = self.slot(node)?;
        if slot.sentinel.is_some() {
            return Err(NodeError::RemoveSentinel);
        }
        let (Some(prev), Some(next)) = (slot.prev, slot.next) else {
            return Ok(());
        };

        self.slots[prev.0].next = Some(next);
        self.slots[next.0].prev = Some(prev);
        self.clear_family(node)?;
        self.notify(GraphEvent::RemoveNode { node, prev, next });

        let slot = &mut self.slots[node.0];
        slot.prev = None;
        slot.next = None;
        slot.host = None;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Family mutation
    // ---------------------------------------------------------------

    /// Checks that `a` and `b` may be family and returns their hosts.
    fn family_hosts(&self, a: NodeId, b: NodeId) -> Result<(String, String), NodeError> {
        let (sa, sb) = (self.slot(a)?, self.slot(b)?);
        if sa.sentinel.is_some() || sb.sentinel.is_some() {
            return Err(NodeError::SentinelFamily);
        }
        let (Some(ha), Some(hb)) = (&sa.host, &sb.host) else {
            return Err(NodeError::Detached);
        };
        if ha == hb {
            return Err(NodeError::SameHostFamily);
        }
        Ok((ha.clone(), hb.clone()))
    }

    /// Makes `child` a child of `parent`.
    ///
    /// Any existing child of `parent` on `child`'s host, and any existing
    /// parent of `child` on `parent`'s host, is unlinked first.
    ///
    /// # Errors
    ///
    /// Fails if either node is a sentinel or detached, or both share a host.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let (parent_host, child_host) = self.family_hosts(parent, child)?;
        if self.slots[parent.0].children.get(&child_host) == Some(&child) {
            return Ok(());
        }

        if let Some(old) = self.slots[parent.0].children.get(&child_host).copied() {
            self.remove_child(parent, old)?;
        }
        if let Some(old) = self.slots[child.0].parents.get(&parent_host).copied() {
            self.remove_child(old, child)?;
        }

        self.slots[parent.0].children.insert(child_host, child);
        self.slots[child.0].parents.insert(parent_host, parent);
        self.notify(GraphEvent::AddFamily { parent, child });
        Ok(())
    }

    /// Makes `parent` a parent of `child`.
    ///
    /// # Errors
    ///
    /// See [`add_child`](Self::add_child).
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), NodeError> {
        self.add_child(parent, child)
    }

    /// Severs the link where `child` is a child of `parent`, if present.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        self.slot(parent)?;
        self.slot(child)?;
        let Some(host) = self.slots[parent.0]
            .children
            .iter()
            .find(|(_, c)| **c == child)
            .map(|(h, _)| h.clone())
        else {
            return Ok(());
        };

        self.slots[parent.0].children.remove(&host);
        self.slots[child.0].parents.retain(|_, p| *p != parent);
        self.notify(GraphEvent::RemoveFamily { parent, child });
        Ok(())
    }

    /// Severs the link where `parent` is a parent of `child`, if present.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn remove_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), NodeError> {
        self.remove_child(parent, child)
    }

    /// Severs any family link between `a` and `b`, in either direction.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn remove_family(&mut self, a: NodeId, b: NodeId) -> Result<(), NodeError> {
        self.remove_child(a, b)?;
        self.remove_child(b, a)
    }

    /// Severs every child link of `node`.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn clear_children(&mut self, node: NodeId) -> Result<(), NodeError> {
        let children: Vec<NodeId> = self.slot(node)?.children.values().copied().collect();
        for child in children {
            self.remove_child(node, child)?;
        }
        Ok(())
    }

    /// Severs every parent link of `node`.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn clear_parents(&mut self, node: NodeId) -> Result<(), NodeError> {
        let parents: Vec<NodeId> = self.slot(node)?.parents.values().copied().collect();
        for parent in parents {
            self.remove_child(parent, node)?;
        }
        Ok(())
    }

    /// Severs every family link of `node`.
    ///
    /// # Errors
    ///
    /// Fails only on unknown node ids.
    pub fn clear_family(&mut self, node: NodeId) -> Result<(), NodeError> {
        self.clear_parents(node)?;
        self.clear_children(node)
    }
}
