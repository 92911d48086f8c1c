//! Registry of text nodes that currently have an injected mirror
//!
//! Entries hold only weak pointers, so membership never keeps a node alive.
//! Each node gets a synthetic [`NodeId`] on registration. Every lookup
//! re-checks reachability: the weak pointer must still resolve to the queried
//! node and the mirror must still sit in the run of mirrors that directly
//! follows the node's container. A container with several text nodes gets
//! one mirror per node, each inserted first, so older mirrors move further
//! down that run. An entry failing either check is treated as absent and
//! dropped on the next [`prune`](TranslatedRegistry::prune).

use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

use crate::parsers::html::dom::{get_class_list, get_parent_element, next_sibling};
use crate::translation::config::constants::MARKER_CLASS;

/// Stable identifier assigned when a node is first registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

struct Entry {
    id: NodeId,
    node: Weak<Node>,
    mirror: Weak<Node>,
}

impl Entry {
    /// The mirror, if the entry still describes a live injection for `node`
    fn live_mirror(&self, node: &Handle) -> Option<Handle> {
        let tracked = self.node.upgrade()?;
        if !Rc::ptr_eq(&tracked, node) {
            return None;
        }
        let mirror = self.mirror.upgrade()?;
        let container = get_parent_element(node)?;
        follows_container(&container, &mirror).then_some(mirror)
    }

    fn is_live(&self) -> bool {
        self.node
            .upgrade()
            .is_some_and(|node| self.live_mirror(&node).is_some())
    }
}

/// Keyed by allocation address; a held `Weak` pins the allocation, so an
/// address cannot be reused while its entry exists.
#[derive(Default)]
pub struct TranslatedRegistry {
    entries: HashMap<usize, Entry>,
    next_id: u64,
}

impl TranslatedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, node: &Handle) -> bool {
        self.mirror_of(node).is_some()
    }

    /// The mirror element injected for `node`
    pub fn mirror_of(&self, node: &Handle) -> Option<Handle> {
        self.entries.get(&key(node))?.live_mirror(node)
    }

    pub fn id_of(&self, node: &Handle) -> Option<NodeId> {
        let entry = self.entries.get(&key(node))?;
        entry.live_mirror(node).map(|_| entry.id)
    }

    /// Records that `mirror` now follows the container of `node`
    pub fn add(&mut self, node: &Handle, mirror: &Handle) -> NodeId {
        self.prune();

        let id = match self.entries.get(&key(node)) {
            Some(entry) if entry.node.upgrade().is_some_and(|n| Rc::ptr_eq(&n, node)) => entry.id,
            _ => {
                self.next_id += 1;
                NodeId(self.next_id)
            }
        };

        self.entries.insert(
            key(node),
            Entry {
                id,
                node: Rc::downgrade(node),
                mirror: Rc::downgrade(mirror),
            },
        );
        tracing::debug!("registered {}", id);
        id
    }

    pub fn remove(&mut self, node: &Handle) -> Option<NodeId> {
        let entry = self.entries.remove(&key(node))?;
        tracing::debug!("unregistered {}", entry.id);
        Some(entry.id)
    }

    /// Drops entries whose node or mirror is gone or detached
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        let pruned = before - self.entries.len();
        if pruned > 0 {
            tracing::debug!("pruned {} stale registry entries", pruned);
        }
        pruned
    }

    /// Live members only
    pub fn len(&self) -> usize {
        self.entries.values().filter(|entry| entry.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TranslatedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatedRegistry")
            .field("entries", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// Whether `mirror` is the container's next sibling or sits among the
/// mirrors that directly follow it
fn follows_container(container: &Handle, mirror: &Handle) -> bool {
    let mut current = next_sibling(container);
    while let Some(sibling) = current {
        if Rc::ptr_eq(&sibling, mirror) {
            return true;
        }
        if !get_class_list(&sibling).iter().any(|class| class == MARKER_CLASS) {
            return false;
        }
        current = next_sibling(&sibling);
    }
    false
}

fn key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}
