//! Node table: ownership and lifecycle of every filesystem object.
//!
//! Nodes carry two independent counters. The link count tracks namespace
//! bindings (directory entries, plus the root's implicit binding and a
//! directory's own `.` accounting); the handle count tracks live
//! [`NodeHandle`](crate::fs::NodeHandle)s. A node is removed from the table
//! exactly when both reach zero, so "reachable from the namespace" and "has
//! open handles" stay independently observable.
//!
//! Counter misuse is a host bug, not a recoverable failure: decrements below
//! zero and operations on a dangling id panic.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::SystemTime;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::content::{ContentPolicy, FileContent};
use crate::dir::DirIndex;
use crate::error::{FsError, FsResult};
use crate::types::{FileKind, NodeAttr, NodeId};

/// Timestamp selector for [`Node::touch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Touch {
    /// Update the access time.
    pub atime: bool,
    /// Update the modification time.
    pub mtime: bool,
    /// Update the change time.
    pub ctime: bool,
}

impl Touch {
    /// Access only.
    pub fn access() -> Self {
        Self {
            atime: true,
            ..Self::default()
        }
    }

    /// Content modification: mtime and ctime together.
    pub fn modify() -> Self {
        Self {
            mtime: true,
            ctime: true,
            ..Self::default()
        }
    }

    /// Attribute change only.
    pub fn change() -> Self {
        Self {
            ctime: true,
            ..Self::default()
        }
    }
}

struct Timestamps {
    atime: SystemTime,
    mtime: SystemTime,
    ctime: SystemTime,
}

impl Timestamps {
    fn now() -> Self {
        let now = SystemTime::now();
        Self {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}

/// Type-specific payload of a node.
pub(crate) enum NodePayload {
    Regular { content: FileContent },
    Directory { index: DirIndex },
    Special { rdev: u64 },
}

/// One filesystem object: a regular file, directory, or special node.
pub struct Node {
    id: NodeId,
    kind: FileKind,
    payload: NodePayload,
    mode: u32,
    uid: u32,
    gid: u32,
    nlink: AtomicU32,
    handles: AtomicU32,
    times: RwLock<Timestamps>,
}

impl Node {
    fn new(id: NodeId, kind: FileKind, payload: NodePayload, mode: u32, uid: u32, gid: u32) -> Self {
        // a directory self-accounts its "." linkage
        let initial_nlink = if kind.is_dir() { 2 } else { 1 };
        Self {
            id,
            kind,
            payload,
            mode,
            uid,
            gid,
            nlink: AtomicU32::new(initial_nlink),
            handles: AtomicU32::new(0),
            times: RwLock::new(Timestamps::now()),
        }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node type.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Permission bits.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Current link count.
    pub fn nlink(&self) -> u32 {
        self.nlink.load(Ordering::SeqCst)
    }

    /// Current handle count.
    pub fn handles(&self) -> u32 {
        self.handles.load(Ordering::SeqCst)
    }

    /// Content store of a regular node.
    pub fn content(&self) -> FsResult<&FileContent> {
        match &self.payload {
            NodePayload::Regular { content } => Ok(content),
            NodePayload::Directory { .. } => {
                Err(FsError::is_a_directory(self.id.to_string()))
            }
            NodePayload::Special { .. } => Err(FsError::NotARegularFile),
        }
    }

    /// Directory index of a directory node.
    pub fn dir(&self) -> FsResult<&DirIndex> {
        match &self.payload {
            NodePayload::Directory { index } => Ok(index),
            _ => Err(FsError::NotADirectory),
        }
    }

    /// Device descriptor of a special node, zero otherwise.
    pub fn rdev(&self) -> u64 {
        match &self.payload {
            NodePayload::Special { rdev } => *rdev,
            _ => 0,
        }
    }

    /// Update the selected timestamps to the current instant.
    pub fn touch(&self, which: Touch) {
        let now = SystemTime::now();
        let mut times = self.times.write();
        if which.atime {
            times.atime = now;
        }
        if which.mtime {
            times.mtime = now;
        }
        if which.ctime {
            times.ctime = now;
        }
    }

    /// Snapshot the node's attributes.
    pub fn attr(&self) -> NodeAttr {
        let (size, blocks) = match &self.payload {
            NodePayload::Regular { content } => (content.size(), content.blocks()),
            _ => (0, 0),
        };
        let times = self.times.read();
        NodeAttr {
            id: self.id,
            kind: self.kind,
            mode: self.mode,
            nlink: self.nlink(),
            uid: self.uid,
            gid: self.gid,
            size,
            blocks,
            rdev: self.rdev(),
            atime: times.atime,
            mtime: times.mtime,
            ctime: times.ctime,
        }
    }

    pub(crate) fn inc_nlink(&self) {
        self.nlink.fetch_add(1, Ordering::SeqCst);
        self.touch(Touch::change());
    }

    /// Decrement the link count, returning the new value.
    pub(crate) fn dec_nlink(&self) -> u32 {
        let previous = self
            .nlink
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or_else(|_| panic!("nlink underflow on node {}", self.id));
        self.touch(Touch::change());
        previous - 1
    }

    fn inc_handles(&self) {
        self.handles.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the handle count, returning the new value.
    fn dec_handles(&self) -> u32 {
        let previous = self
            .handles
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .unwrap_or_else(|_| panic!("handle underflow on node {}", self.id));
        previous - 1
    }
}

/// Owner of every node in one filesystem instance.
pub struct NodeTable {
    nodes: DashMap<NodeId, Arc<Node>>,
    next_id: AtomicU64,
    max_nodes: Option<u64>,
    policy: Arc<ContentPolicy>,
}

impl NodeTable {
    /// Create an empty table.
    ///
    /// The first allocation receives [`NodeId::ROOT`].
    pub fn new(policy: Arc<ContentPolicy>, max_nodes: Option<u64>) -> Self {
        Self {
            nodes: DashMap::new(),
            next_id: AtomicU64::new(NodeId::ROOT.0),
            max_nodes,
            policy,
        }
    }

    /// Allocate a node with a fresh id.
    ///
    /// Link count starts at 1, or 2 for directories; timestamps at now; the
    /// payload is empty content, an empty index, or the device descriptor.
    pub fn allocate(
        &self,
        kind: FileKind,
        mode: u32,
        rdev: u64,
        uid: u32,
        gid: u32,
    ) -> FsResult<Arc<Node>> {
        if let Some(max) = self.max_nodes
            && self.nodes.len() as u64 >= max
        {
            return Err(FsError::exhausted(format!("node limit {max} reached")));
        }
        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
            .map(NodeId)
            .map_err(|_| FsError::exhausted("node id space"))?;

        let payload = match kind {
            FileKind::Regular => NodePayload::Regular {
                content: FileContent::new(Arc::clone(&self.policy)),
            },
            FileKind::Directory => NodePayload::Directory {
                index: DirIndex::new(),
            },
            FileKind::Special => NodePayload::Special { rdev },
        };
        let node = Arc::new(Node::new(id, kind, payload, mode, uid, gid));
        self.nodes.insert(id, Arc::clone(&node));
        debug!(ino = %id, kind = %kind, mode = %format_args!("{mode:o}"), "node allocated");
        Ok(node)
    }

    /// Fetch a live node.
    ///
    /// # Panics
    ///
    /// Panics on a dangling id: using an identifier after its node was
    /// destroyed is a host logic error, not a recoverable condition.
    pub fn get(&self, id: NodeId) -> Arc<Node> {
        self.nodes
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_else(|| panic!("dangling node id {id}"))
    }

    /// True iff the id refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Live node count.
    pub fn len(&self) -> u64 {
        self.nodes.len() as u64
    }

    /// True iff no nodes are live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Take a handle reference on a node.
    pub fn retain(&self, id: NodeId) {
        self.get(id).inc_handles();
    }

    /// Drop a handle reference, destroying the node if it was the last
    /// reference and the namespace no longer binds it.
    pub fn release(&self, id: NodeId) {
        let node = self.get(id);
        if node.dec_handles() == 0 {
            self.reap_if_dead(&node);
        }
    }

    /// Record that the namespace dropped a binding; destroys the node when
    /// neither bindings nor handles remain.
    pub(crate) fn unbind(&self, node: &Node) {
        if node.dec_nlink() == 0 {
            self.reap_if_dead(node);
        }
    }

    fn reap_if_dead(&self, node: &Node) {
        if node.nlink() == 0
            && node.handles() == 0
            && self.nodes.remove(&node.id()).is_some()
        {
            trace!(ino = %node.id(), "node destroyed");
        }
    }
}
