//! # hakofs
//!
//! An embeddable, volatile, in-memory filesystem core. hakofs owns the
//! object model — superblock-equivalent instance, node table, directory
//! indexes, file content pages — and leaves path walking, mount-point
//! management, and syscall translation to the host that embeds it. Key
//! components:
//!
//! - [`Filesystem`] - one mounted instance; namespace operations and I/O
//! - [`MountOptions`] - parsed mount configuration (`key=value` strings)
//! - [`NodeHandle`] - RAII retention of a node, independent of link count
//! - [`FsError`] / [`FsResult`] - the recoverable-failure taxonomy
//!
//! ## Design Decisions
//!
//! - **Resolved-parent API, no path walking**: every namespace operation
//!   takes a parent [`NodeId`] plus a single name component. The host's
//!   dispatch layer resolves paths; the core never sees a `/`.
//! - **Two counters per node**: the link count tracks namespace bindings,
//!   the handle count tracks open references. A node dies exactly when both
//!   are zero, so unlinked-but-open files keep working.
//! - **Instance values, not singletons**: mounting returns a [`Filesystem`]
//!   you own. Instances never share state.
//! - **Synchronous, caller-threaded**: operations run to completion on the
//!   calling thread; safety under concurrent callers comes from one mutex
//!   per directory, atomic counters, and a per-file reader/writer lock.
//!
//! ```
//! use hakofs::{Filesystem, MountOptions};
//!
//! let fs = Filesystem::mount(MountOptions::default()).unwrap();
//! let file = fs.create(fs.root(), "greeting", 0o644).unwrap();
//! fs.write(file, 0, b"hello").unwrap();
//! assert_eq!(fs.read(file, 0, 5).unwrap(), b"hello");
//! fs.unmount();
//! ```

pub mod config;
pub mod content;
pub mod dir;
pub mod error;
pub mod fs;
pub mod node;
pub mod types;

/// Maximum name length in bytes for one directory entry.
pub const NAME_MAX: usize = 255;

pub use config::{MountFlags, MountOptions};
pub use content::{ByteQuota, ContentPolicy, FileContent, PAGE_SIZE};
pub use dir::{DirGuard, DirIndex};
pub use error::{FsError, FsResult};
pub use fs::{BLOCK_SIZE, FS_TYPE, Filesystem, MAGIC, MAX_FILE_SIZE, NodeHandle};
pub use node::{Node, NodeTable, Touch};
pub use types::{DirEntryInfo, FileKind, NodeAttr, NodeId, StatVfs};
