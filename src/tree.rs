//! Reporting tree mirroring the source directory
//!
//! Nodes live in an arena indexed by [`NodeId`] and are looked up by
//! `(parent, name)`, so discovering the same entry twice returns the
//! existing node instead of adding a duplicate sibling. Leaves record the
//! status of their copy; folders get a status from [`ReportTree::rollup`].

use crate::walk::EntryKind;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Handle to a node in a [`ReportTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Status shown for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeStatus {
    /// Copied, or for folders: every file below was copied or already present
    Copied,
    /// Copied under a new name, or for folders: some file below was renamed
    Renamed,
    /// Already present in the destination
    Duplicate,
    /// Failed and still needs attention, or for folders: some file below failed
    Pending,
}

/// Snapshot of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
    pub status: Option<NodeStatus>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Default)]
struct Arena {
    nodes: Vec<Node>,
    index: HashMap<(NodeId, String), NodeId>,
}

/// Thread-safe mirror of the discovered source tree
#[derive(Debug)]
pub struct ReportTree {
    arena: Mutex<Arena>,
}

/// Leaf statuses seen below a folder
#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    leaves: usize,
    settled: usize,
    renamed: usize,
    pending: usize,
}

impl Tally {
    fn add(&mut self, other: Tally) {
        self.leaves += other.leaves;
        self.settled += other.settled;
        self.renamed += other.renamed;
        self.pending += other.pending;
    }

    fn of_leaf(status: Option<NodeStatus>) -> Self {
        let mut tally = Tally {
            leaves: 1,
            ..Tally::default()
        };
        match status {
            Some(NodeStatus::Copied) | Some(NodeStatus::Duplicate) => tally.settled = 1,
            Some(NodeStatus::Renamed) => tally.renamed = 1,
            Some(NodeStatus::Pending) => tally.pending = 1,
            None => {}
        }
        tally
    }

    fn folder_status(&self) -> Option<NodeStatus> {
        if self.leaves == 0 {
            None
        } else if self.settled == self.leaves {
            Some(NodeStatus::Copied)
        } else if self.pending > 0 {
            Some(NodeStatus::Pending)
        } else if self.renamed > 0 {
            Some(NodeStatus::Renamed)
        } else {
            None
        }
    }
}

impl ReportTree {
    /// Create a tree whose root node stands for `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let path = root.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let root = Node {
            id: NodeId(0),
            parent: None,
            name,
            path,
            kind: EntryKind::Directory,
            status: None,
            children: Vec::new(),
        };

        Self {
            arena: Mutex::new(Arena {
                nodes: vec![root],
                index: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arena> {
        // A panic while holding the lock leaves the arena consistent
        self.arena.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Return the child of `parent` called `name`, creating it if absent
    pub fn insert_if_absent(
        &self,
        parent: NodeId,
        name: &str,
        path: &Path,
        kind: EntryKind,
    ) -> NodeId {
        let mut arena = self.lock();
        let key = (parent, name.to_string());
        if let Some(existing) = arena.index.get(&key) {
            return *existing;
        }

        let id = NodeId(arena.nodes.len());
        arena.nodes.push(Node {
            id,
            parent: Some(parent),
            name: name.to_string(),
            path: path.to_path_buf(),
            kind,
            status: None,
            children: Vec::new(),
        });
        if let Some(parent_node) = arena.nodes.get_mut(parent.0) {
            parent_node.children.push(id);
        }
        arena.index.insert(key, id);
        id
    }

    /// Record the status of a node
    pub fn record(&self, node: NodeId, status: NodeStatus) {
        if let Some(n) = self.lock().nodes.get_mut(node.0) {
            n.status = Some(status);
        }
    }

    pub fn status(&self, node: NodeId) -> Option<NodeStatus> {
        self.lock().nodes.get(node.0).and_then(|n| n.status)
    }

    pub fn node(&self, node: NodeId) -> Option<Node> {
        self.lock().nodes.get(node.0).cloned()
    }

    /// Find the child of `parent` called `name`
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.lock().index.get(&(parent, name.to_string())).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root node always exists
        false
    }

    /// Snapshot of all nodes in discovery order
    pub fn nodes(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    /// Recompute folder statuses from the statuses of their files
    ///
    /// Nodes are always created after their parent, so walking the arena
    /// backwards settles every child before its parent.
    pub fn rollup(&self) {
        let mut arena = self.lock();
        let mut tallies = vec![Tally::default(); arena.nodes.len()];

        for i in (0..arena.nodes.len()).rev() {
            let node = &mut arena.nodes[i];
            let tally = match node.kind {
                EntryKind::File => Tally::of_leaf(node.status),
                EntryKind::Directory => {
                    node.status = tallies[i].folder_status();
                    tallies[i]
                }
            };
            if let Some(parent) = node.parent {
                tallies[parent.0].add(tally);
            }
        }
    }
}
