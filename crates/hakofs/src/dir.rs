//! Per-directory name index.
//!
//! Maps child names to node ids for exactly one directory node. The map is
//! insertion-ordered because enumeration promises insertion order, and it is
//! guarded by a single mutex: namespace operations hold the guard across
//! their whole check/allocate/insert (or check/remove) sequence, so two
//! racing creates of one name can never both succeed and a lookup never
//! observes a half-applied mutation.
//!
//! The implicit `.`/`..` entries are never stored; they are link-count
//! accounting, handled by the namespace layer.

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};

use crate::NAME_MAX;
use crate::error::{FsError, FsResult};
use crate::types::NodeId;

/// Check a single-component name against the index's rules.
pub(crate) fn validate_name(name: &str) -> FsResult<()> {
    if name.len() > NAME_MAX {
        return Err(FsError::NameTooLong(name.len()));
    }
    if name.is_empty() {
        return Err(FsError::invalid("empty name"));
    }
    if name == "." || name == ".." {
        return Err(FsError::invalid(format!("reserved name: {name}")));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::invalid(format!("name contains a separator: {name:?}")));
    }
    Ok(())
}

/// Name index scoped to one directory node.
pub struct DirIndex {
    entries: Mutex<IndexMap<String, NodeId>>,
}

impl DirIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Acquire the directory's mutation scope.
    pub fn lock(&self) -> DirGuard<'_> {
        DirGuard {
            entries: self.entries.lock(),
        }
    }

    /// Query a name. `Ok(None)` is the negative result, not an error.
    pub fn lookup(&self, name: &str) -> FsResult<Option<NodeId>> {
        self.lock().lookup(name)
    }

    /// True iff the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// All entries in insertion order.
    pub fn snapshot(&self) -> Vec<(String, NodeId)> {
        self.entries
            .lock()
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect()
    }
}

impl Default for DirIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Held mutation scope over one directory.
pub struct DirGuard<'a> {
    entries: MutexGuard<'a, IndexMap<String, NodeId>>,
}

impl DirGuard<'_> {
    /// Query a name under the held lock.
    pub fn lookup(&self, name: &str) -> FsResult<Option<NodeId>> {
        if name.len() > NAME_MAX {
            return Err(FsError::NameTooLong(name.len()));
        }
        Ok(self.entries.get(name).copied())
    }

    /// Bind `name` to `child`.
    pub fn insert(&mut self, name: &str, child: NodeId) -> FsResult<()> {
        validate_name(name)?;
        if self.entries.contains_key(name) {
            return Err(FsError::name_exists(name));
        }
        self.entries.insert(name.to_string(), child);
        Ok(())
    }

    /// Iterate entries in insertion order under the held lock.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Unbind `name`, returning the node it was bound to.
    pub fn remove(&mut self, name: &str) -> FsResult<NodeId> {
        // shift_remove keeps the insertion order of the survivors
        self.entries
            .shift_remove(name)
            .ok_or_else(|| FsError::not_found(name))
    }

    /// True iff the directory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
