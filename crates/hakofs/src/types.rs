//! Core filesystem types.
//!
//! These types are the plain-data half of the API: everything a host needs
//! to inspect nodes and report statistics, serializable so a bridge can ship
//! them over RPC unchanged.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier of a node within one filesystem instance.
///
/// Assigned monotonically starting at 1 (the root) and never reused while
/// the instance lives. Ids are meaningless across instances.
#[derive(
    Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// The root directory's id. Fixed for every instance.
    pub const ROOT: NodeId = NodeId(1);

    /// The raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Node type discriminant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    /// Regular file with byte content.
    Regular,
    /// Directory with named children.
    Directory,
    /// Device or other special node; carries an opaque descriptor.
    Special,
}

impl FileKind {
    /// Returns true if this is a regular file.
    pub fn is_regular(&self) -> bool {
        matches!(self, FileKind::Regular)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Directory)
    }

    /// Returns true if this is a special node.
    pub fn is_special(&self) -> bool {
        matches!(self, FileKind::Special)
    }
}

/// Node attributes (metadata snapshot).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeAttr {
    /// Node id.
    pub id: NodeId,
    /// Node type.
    pub kind: FileKind,
    /// Permission bits (e.g. 0o644).
    pub mode: u32,
    /// Number of namespace bindings.
    pub nlink: u32,
    /// Owner id (instance default policy, not caller-derived).
    pub uid: u32,
    /// Group id.
    pub gid: u32,
    /// Logical size in bytes. Zero for directories and special nodes.
    pub size: u64,
    /// Allocated storage in 512-byte units.
    pub blocks: u64,
    /// Device descriptor for special nodes, zero otherwise.
    pub rdev: u64,
    /// Last access time.
    pub atime: SystemTime,
    /// Last content modification time.
    pub mtime: SystemTime,
    /// Last attribute change time.
    pub ctime: SystemTime,
}

impl NodeAttr {
    /// Returns true if this is a regular file.
    pub fn is_regular(&self) -> bool {
        self.kind.is_regular()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// One directory entry as seen by enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntryInfo {
    /// Entry name (single component, not a path).
    pub name: String,
    /// Bound node id.
    pub id: NodeId,
    /// Node type of the bound child.
    pub kind: FileKind,
}

/// Filesystem instance statistics.
///
/// A memory-resident design has no fixed capacity unless the mount set one,
/// so `blocks_total`/`nodes_total` are `None` when unbounded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatVfs {
    /// Instance type tag.
    pub magic: u32,
    /// Block size in bytes.
    pub block_size: u32,
    /// Blocks currently allocated to file content.
    pub blocks_used: u64,
    /// Block capacity, if the mount set a byte quota.
    pub blocks_total: Option<u64>,
    /// Live node count.
    pub nodes: u64,
    /// Node capacity, if the mount set one.
    pub nodes_total: Option<u64>,
    /// Maximum name length in bytes.
    pub name_max: u32,
    /// Preferred read size hint from the mount options.
    pub rsize: u32,
    /// Preferred write size hint from the mount options.
    pub wsize: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_file_kind_predicates() {
        assert!(FileKind::Regular.is_regular());
        assert!(!FileKind::Regular.is_dir());
        assert!(FileKind::Directory.is_dir());
        assert!(FileKind::Special.is_special());
    }

    #[test]
    fn test_file_kind_strings() {
        assert_eq!(FileKind::Directory.to_string(), "directory");
        assert_eq!(FileKind::from_str("regular").unwrap(), FileKind::Regular);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::ROOT.to_string(), "1");
        assert_eq!(NodeId::ROOT.as_u64(), 1);
    }
}
