//! Filesystem instance: mount lifecycle, namespace operations, content I/O.
//!
//! A [`Filesystem`] is one mounted instance — an explicit value, not a
//! process-wide singleton; any number of instances coexist and tear down
//! independently. The host's dispatch layer resolves paths down to a parent
//! directory id plus one name and calls in here; the core never walks
//! multi-segment paths.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::MountOptions;
use crate::content::{ContentPolicy, PAGE_SIZE};
use crate::error::{FsError, FsResult};
use crate::node::{Node, NodeTable, Touch};
use crate::types::{DirEntryInfo, FileKind, NodeAttr, NodeId, StatVfs};

/// Instance type tag, "hako" in ASCII.
pub const MAGIC: u32 = 0x6861_6b6f;

/// Filesystem type name a host registers this core under.
pub const FS_TYPE: &str = "hakofs";

/// Block size reported to hosts. One content page.
pub const BLOCK_SIZE: u32 = PAGE_SIZE as u32;

/// Largest logical file size an instance accepts.
pub const MAX_FILE_SIZE: u64 = 1 << 43;

/// One mounted in-memory filesystem.
pub struct Filesystem {
    options: MountOptions,
    table: NodeTable,
    policy: Arc<ContentPolicy>,
}

impl Filesystem {
    /// Mount an instance from parsed options.
    ///
    /// Materializes the root directory and fixes the instance constants.
    pub fn mount(options: MountOptions) -> FsResult<Self> {
        options.validate()?;
        let policy = Arc::new(ContentPolicy::new(MAX_FILE_SIZE, options.size));
        let table = NodeTable::new(Arc::clone(&policy), options.nr_inodes);

        let root = table.allocate(
            FileKind::Directory,
            options.root_mode,
            0,
            options.uid,
            options.gid,
        )?;
        debug_assert_eq!(root.id(), NodeId::ROOT);

        info!(
            magic = %format_args!("{MAGIC:#x}"),
            root_mode = %format_args!("{:o}", options.root_mode),
            read_only = options.flags.read_only,
            "mounted"
        );
        Ok(Self {
            options,
            table,
            policy,
        })
    }

    /// Mount from the host's raw option bytes (see [`MountOptions::parse`]).
    pub fn mount_raw(config_data: &[u8]) -> FsResult<Self> {
        Self::mount(MountOptions::parse(config_data)?)
    }

    /// Tear the instance down.
    ///
    /// Everything reachable from the root is dropped with the instance. The
    /// host is responsible for draining handles first; a `NodeHandle` that
    /// outlives its filesystem is prevented by the borrow it carries.
    pub fn unmount(self) {
        info!(nodes = self.table.len(), "unmounting");
    }

    /// The root directory's id.
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The mount options this instance was created with.
    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    // ========================================================================
    // Namespace operations
    // ========================================================================

    /// Look `name` up under `parent`.
    ///
    /// `Ok(None)` is the negative result — the name is simply not bound —
    /// and callers must treat it as a valid outcome, not a failure.
    pub fn lookup(&self, parent: NodeId, name: &str) -> FsResult<Option<NodeId>> {
        self.table.get(parent).dir()?.lookup(name)
    }

    /// Create a node of any kind under `parent`: the single primitive
    /// `create` and `mkdir` are defined in terms of.
    ///
    /// Holds the parent's directory lock across the existence check, the
    /// allocation, the insert, and the link accounting, so the operation is
    /// atomic with respect to that directory.
    pub fn mknod(
        &self,
        parent: NodeId,
        name: &str,
        kind: FileKind,
        mode: u32,
        rdev: u64,
    ) -> FsResult<NodeId> {
        self.ensure_writable()?;
        let parent_node = self.table.get(parent);
        let dir = parent_node.dir()?;

        let mut entries = dir.lock();
        crate::dir::validate_name(name)?;
        if entries.lookup(name)?.is_some() {
            return Err(FsError::name_exists(name));
        }
        let node = self
            .table
            .allocate(kind, mode, rdev, self.options.uid, self.options.gid)?;
        entries.insert(name, node.id())?;
        if kind.is_dir() {
            // the child's ".." now binds the parent
            parent_node.inc_nlink();
        }
        drop(entries);

        parent_node.touch(Touch::modify());
        debug!(dir = %parent, name, ino = %node.id(), kind = %kind, "mknod");
        Ok(node.id())
    }

    /// Create a regular file under `parent`.
    pub fn create(&self, parent: NodeId, name: &str, mode: u32) -> FsResult<NodeId> {
        self.mknod(parent, name, FileKind::Regular, mode, 0)
    }

    /// Create a directory under `parent`.
    pub fn mkdir(&self, parent: NodeId, name: &str, mode: u32) -> FsResult<NodeId> {
        self.mknod(parent, name, FileKind::Directory, mode, 0)
    }

    /// Remove a regular or special node's binding under `parent`.
    ///
    /// The node itself is destroyed once no handle retains it.
    pub fn unlink(&self, parent: NodeId, name: &str) -> FsResult<()> {
        self.ensure_writable()?;
        let parent_node = self.table.get(parent);
        let dir = parent_node.dir()?;

        let mut entries = dir.lock();
        let child_id = entries
            .lookup(name)?
            .ok_or_else(|| FsError::not_found(name))?;
        let child = self.table.get(child_id);
        if child.kind().is_dir() {
            return Err(FsError::is_a_directory(name));
        }
        entries.remove(name)?;
        self.table.unbind(&child);
        drop(entries);

        parent_node.touch(Touch::modify());
        debug!(dir = %parent, name, ino = %child_id, "unlink");
        Ok(())
    }

    /// Remove an empty directory under `parent`.
    ///
    /// Failure leaves every entry and link count untouched.
    pub fn rmdir(&self, parent: NodeId, name: &str) -> FsResult<()> {
        self.ensure_writable()?;
        let parent_node = self.table.get(parent);
        let dir = parent_node.dir()?;

        let mut entries = dir.lock();
        let child_id = entries
            .lookup(name)?
            .ok_or_else(|| FsError::not_found(name))?;
        let child = self.table.get(child_id);
        let child_index = child.dir()?;

        // parent-before-child lock order, same as every tree-edge traversal
        let child_entries = child_index.lock();
        if !child_entries.is_empty() {
            return Err(FsError::not_empty(name));
        }
        entries.remove(name)?;
        // "." goes away with the directory, then the parent's entry
        child.dec_nlink();
        self.table.unbind(&child);
        drop(child_entries);
        drop(entries);

        // the child's ".." no longer binds the parent
        parent_node.dec_nlink();
        parent_node.touch(Touch::modify());
        debug!(dir = %parent, name, ino = %child_id, "rmdir");
        Ok(())
    }

    /// Bind an additional name to an existing regular or special node.
    pub fn link(&self, parent: NodeId, name: &str, node: NodeId) -> FsResult<()> {
        self.ensure_writable()?;
        let target = self.table.get(node);
        if target.kind().is_dir() {
            return Err(FsError::is_a_directory(name));
        }
        let parent_node = self.table.get(parent);
        let dir = parent_node.dir()?;

        let mut entries = dir.lock();
        entries.insert(name, node)?;
        target.inc_nlink();
        drop(entries);

        parent_node.touch(Touch::modify());
        debug!(dir = %parent, name, ino = %node, "link");
        Ok(())
    }

    /// Enumerate a directory in insertion order.
    pub fn readdir(&self, dir: NodeId) -> FsResult<Vec<DirEntryInfo>> {
        let node = self.table.get(dir);
        let index = node.dir()?;

        // nodes are only destroyed under their directory's lock, so every
        // bound id stays live while the guard is held
        let entries = index
            .lock()
            .iter()
            .map(|(name, id)| DirEntryInfo {
                name: name.to_string(),
                id,
                kind: self.table.get(id).kind(),
            })
            .collect();
        self.touch_atime(&node);
        Ok(entries)
    }

    /// Snapshot a node's attributes.
    pub fn getattr(&self, node: NodeId) -> NodeAttr {
        self.table.get(node).attr()
    }

    /// Update a node's timestamps.
    pub fn touch(&self, node: NodeId, which: Touch) {
        self.table.get(node).touch(which);
    }

    // ========================================================================
    // Content I/O
    // ========================================================================

    /// Read up to `len` bytes of a regular file at `offset`.
    ///
    /// A short (or empty) result at end of file is success, not an error.
    pub fn read(&self, node: NodeId, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        let node = self.table.get(node);
        let bytes = node.content()?.read(offset, len)?;
        self.touch_atime(&node);
        trace!(ino = %node.id(), offset, len = bytes.len(), "read");
        Ok(bytes)
    }

    /// Write all of `data` to a regular file at `offset`.
    pub fn write(&self, node: NodeId, offset: u64, data: &[u8]) -> FsResult<usize> {
        self.ensure_writable()?;
        let node = self.table.get(node);
        let written = node.content()?.write(offset, data)?;
        node.touch(Touch::modify());
        trace!(ino = %node.id(), offset, len = written, "write");
        Ok(written)
    }

    /// Shrink or zero-extend a regular file.
    pub fn truncate(&self, node: NodeId, new_size: u64) -> FsResult<()> {
        self.ensure_writable()?;
        let node = self.table.get(node);
        node.content()?.truncate(new_size)?;
        node.touch(Touch::modify());
        debug!(ino = %node.id(), new_size, "truncate");
        Ok(())
    }

    // ========================================================================
    // Handles and statistics
    // ========================================================================

    /// Open a node, retaining it for the handle's lifetime.
    ///
    /// A node stays alive while any handle exists, even after its last
    /// namespace binding is unlinked.
    pub fn open(&self, node: NodeId) -> FsResult<NodeHandle<'_>> {
        self.table.retain(node);
        trace!(ino = %node, "open");
        Ok(NodeHandle { fs: self, node })
    }

    /// Take a handle reference without the RAII guard.
    pub fn retain(&self, node: NodeId) {
        self.table.retain(node);
    }

    /// Drop a handle reference taken with [`Filesystem::retain`].
    pub fn release(&self, node: NodeId) {
        self.table.release(node);
    }

    /// Instance statistics for the host's status reporting.
    pub fn statvfs(&self) -> StatVfs {
        let quota = &self.policy.quota;
        StatVfs {
            magic: MAGIC,
            block_size: BLOCK_SIZE,
            blocks_used: quota.used() / BLOCK_SIZE as u64,
            blocks_total: quota.limit().map(|limit| limit / BLOCK_SIZE as u64),
            nodes: self.table.len(),
            nodes_total: self.options.nr_inodes,
            name_max: crate::NAME_MAX as u32,
            rsize: self.options.rsize,
            wsize: self.options.wsize,
        }
    }

    fn ensure_writable(&self) -> FsResult<()> {
        if self.options.flags.read_only {
            return Err(FsError::ReadOnly);
        }
        Ok(())
    }

    fn touch_atime(&self, node: &Node) {
        if !self.options.flags.noatime {
            node.touch(Touch::access());
        }
    }
}

impl Drop for Filesystem {
    fn drop(&mut self) {
        debug!(nodes = self.table.len(), "instance dropped");
    }
}

/// RAII handle retaining one node.
///
/// Dropping the handle releases the retention; the node is destroyed once
/// neither handles nor namespace bindings remain.
pub struct NodeHandle<'fs> {
    fs: &'fs Filesystem,
    node: NodeId,
}

impl NodeHandle<'_> {
    /// The retained node's id.
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Snapshot the retained node's attributes.
    pub fn attr(&self) -> NodeAttr {
        self.fs.getattr(self.node)
    }

    /// Read through the handle.
    pub fn read(&self, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        self.fs.read(self.node, offset, len)
    }

    /// Write through the handle.
    pub fn write(&self, offset: u64, data: &[u8]) -> FsResult<usize> {
        self.fs.write(self.node, offset, data)
    }

    /// Truncate through the handle.
    pub fn truncate(&self, new_size: u64) -> FsResult<()> {
        self.fs.truncate(self.node, new_size)
    }
}

impl Drop for NodeHandle<'_> {
    fn drop(&mut self) {
        self.fs.table.release(self.node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> Filesystem {
        Filesystem::mount(MountOptions::default()).unwrap()
    }

    #[test]
    fn test_mount_materializes_root() {
        let fs = mount();
        let root = fs.getattr(fs.root());
        assert!(root.is_dir());
        assert_eq!(root.mode, 0o755);
        assert_eq!(root.nlink, 2);
        assert_eq!(fs.statvfs().nodes, 1);
    }

    #[test]
    fn test_create_then_lookup() {
        let fs = mount();
        let id = fs.create(fs.root(), "notes.txt", 0o644).unwrap();
        assert_eq!(fs.lookup(fs.root(), "notes.txt").unwrap(), Some(id));
        assert!(fs.getattr(id).is_regular());
    }

    #[test]
    fn test_negative_lookup_is_not_an_error() {
        let fs = mount();
        assert_eq!(fs.lookup(fs.root(), "missing").unwrap(), None);
    }

    #[test]
    fn test_lookup_name_too_long() {
        let fs = mount();
        let long = "x".repeat(crate::NAME_MAX + 1);
        assert!(matches!(
            fs.lookup(fs.root(), &long),
            Err(FsError::NameTooLong(_))
        ));
    }

    #[test]
    fn test_create_duplicate_fails() {
        let fs = mount();
        fs.create(fs.root(), "a", 0o644).unwrap();
        assert!(matches!(
            fs.create(fs.root(), "a", 0o644),
            Err(FsError::NameExists(_))
        ));
    }

    #[test]
    fn test_mkdir_link_accounting() {
        let fs = mount();
        let before = fs.getattr(fs.root()).nlink;

        let dir = fs.mkdir(fs.root(), "d", 0o755).unwrap();
        assert_eq!(fs.getattr(dir).nlink, 2);
        assert_eq!(fs.getattr(fs.root()).nlink, before + 1);

        fs.rmdir(fs.root(), "d").unwrap();
        assert_eq!(fs.getattr(fs.root()).nlink, before);
        assert_eq!(fs.lookup(fs.root(), "d").unwrap(), None);
    }

    #[test]
    fn test_rmdir_not_empty_changes_nothing() {
        let fs = mount();
        let dir = fs.mkdir(fs.root(), "d", 0o755).unwrap();
        fs.create(dir, "child", 0o644).unwrap();

        let root_links = fs.getattr(fs.root()).nlink;
        let dir_links = fs.getattr(dir).nlink;

        for _ in 0..2 {
            assert!(matches!(
                fs.rmdir(fs.root(), "d"),
                Err(FsError::NotEmpty(_))
            ));
        }
        assert_eq!(fs.getattr(fs.root()).nlink, root_links);
        assert_eq!(fs.getattr(dir).nlink, dir_links);
        assert_eq!(fs.lookup(fs.root(), "d").unwrap(), Some(dir));
        assert!(fs.lookup(dir, "child").unwrap().is_some());
    }

    #[test]
    fn test_rmdir_of_file_fails() {
        let fs = mount();
        fs.create(fs.root(), "f", 0o644).unwrap();
        assert!(matches!(
            fs.rmdir(fs.root(), "f"),
            Err(FsError::NotADirectory)
        ));
    }

    #[test]
    fn test_unlink_of_directory_fails() {
        let fs = mount();
        fs.mkdir(fs.root(), "d", 0o755).unwrap();
        assert!(matches!(
            fs.unlink(fs.root(), "d"),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_unlink_missing_fails() {
        let fs = mount();
        assert!(matches!(
            fs.unlink(fs.root(), "ghost"),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_write_read_round_trip() {
        let fs = mount();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        let payload = b"the quick brown fox".repeat(400);

        assert_eq!(fs.write(id, 0, &payload).unwrap(), payload.len());
        assert_eq!(fs.read(id, 0, payload.len()).unwrap(), payload);
        assert_eq!(fs.getattr(id).size, payload.len() as u64);
    }

    #[test]
    fn test_sparse_write_reads_zero_gap() {
        let fs = mount();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        let k = 10_000u64;

        fs.write(id, k, b"end").unwrap();
        assert_eq!(fs.read(id, 0, k as usize).unwrap(), vec![0u8; k as usize]);
        assert_eq!(fs.read(id, k, 3).unwrap(), b"end");
    }

    #[test]
    fn test_read_write_on_directory_fails() {
        let fs = mount();
        assert!(matches!(
            fs.read(fs.root(), 0, 10),
            Err(FsError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.write(fs.root(), 0, b"x"),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_mknod_special_carries_rdev() {
        let fs = mount();
        let id = fs
            .mknod(fs.root(), "null", FileKind::Special, 0o666, 0x0103)
            .unwrap();
        let attr = fs.getattr(id);
        assert_eq!(attr.kind, FileKind::Special);
        assert_eq!(attr.rdev, 0x0103);
        assert!(matches!(fs.read(id, 0, 1), Err(FsError::NotARegularFile)));
    }

    #[test]
    fn test_link_binds_second_name() {
        let fs = mount();
        let id = fs.create(fs.root(), "a", 0o644).unwrap();
        fs.write(id, 0, b"shared").unwrap();

        fs.link(fs.root(), "b", id).unwrap();
        assert_eq!(fs.getattr(id).nlink, 2);
        assert_eq!(fs.lookup(fs.root(), "b").unwrap(), Some(id));

        fs.unlink(fs.root(), "a").unwrap();
        assert_eq!(fs.getattr(id).nlink, 1);
        assert_eq!(fs.read(id, 0, 6).unwrap(), b"shared");
    }

    #[test]
    fn test_link_to_directory_fails() {
        let fs = mount();
        let dir = fs.mkdir(fs.root(), "d", 0o755).unwrap();
        assert!(matches!(
            fs.link(fs.root(), "d2", dir),
            Err(FsError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_readdir_insertion_order() {
        let fs = mount();
        fs.create(fs.root(), "zed", 0o644).unwrap();
        fs.mkdir(fs.root(), "abc", 0o755).unwrap();
        fs.create(fs.root(), "mid", 0o644).unwrap();
        fs.unlink(fs.root(), "zed").unwrap();
        fs.create(fs.root(), "tail", 0o644).unwrap();

        let names: Vec<_> = fs
            .readdir(fs.root())
            .unwrap()
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, ["abc", "mid", "tail"]);

        let kinds: Vec<_> = fs
            .readdir(fs.root())
            .unwrap()
            .into_iter()
            .map(|entry| entry.kind)
            .collect();
        assert_eq!(kinds[0], FileKind::Directory);
    }

    #[test]
    fn test_unlink_destroys_unretained_node() {
        let fs = mount();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.unlink(fs.root(), "f").unwrap();
        assert!(!fs.table.contains(id));
    }

    #[test]
    fn test_open_handle_keeps_unlinked_node_alive() {
        let fs = mount();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.write(id, 0, b"orphan").unwrap();

        let handle = fs.open(id).unwrap();
        fs.unlink(fs.root(), "f").unwrap();

        // unlinked from the namespace, but the handle still works
        assert_eq!(fs.lookup(fs.root(), "f").unwrap(), None);
        assert_eq!(handle.attr().nlink, 0);
        assert_eq!(handle.read(0, 6).unwrap(), b"orphan");
        handle.write(6, b"!").unwrap();

        drop(handle);
        assert!(!fs.table.contains(id));
    }

    #[test]
    #[should_panic(expected = "dangling node id")]
    fn test_destroyed_id_is_a_logic_error() {
        let fs = mount();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.unlink(fs.root(), "f").unwrap();
        let _ = fs.read(id, 0, 1);
    }

    #[test]
    fn test_create_race_single_winner() {
        use std::thread;

        let fs = mount();
        let threads = 8;

        let results: Vec<FsResult<NodeId>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|_| scope.spawn(|| fs.create(fs.root(), "x", 0o644)))
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().unwrap())
                .collect()
        });

        let wins = results.iter().filter(|r| r.is_ok()).count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(FsError::NameExists(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(losses, threads - 1);

        let entries = fs.readdir(fs.root()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "x");
    }

    #[test]
    fn test_parent_mtime_bumped_by_create() {
        let fs = mount();
        let before = fs.getattr(fs.root());
        std::thread::sleep(std::time::Duration::from_millis(5));
        fs.create(fs.root(), "f", 0o644).unwrap();
        let after = fs.getattr(fs.root());
        assert!(after.mtime > before.mtime);
        assert!(after.ctime > before.ctime);
    }

    #[test]
    fn test_read_only_mount_refuses_mutation() {
        let fs = Filesystem::mount(MountOptions::new().read_only()).unwrap();
        assert!(matches!(
            fs.create(fs.root(), "f", 0o644),
            Err(FsError::ReadOnly)
        ));
        assert!(matches!(
            fs.mkdir(fs.root(), "d", 0o755),
            Err(FsError::ReadOnly)
        ));
        // queries still work
        assert_eq!(fs.lookup(fs.root(), "f").unwrap(), None);
        assert!(fs.readdir(fs.root()).unwrap().is_empty());
    }

    #[test]
    fn test_noatime_suppresses_access_time() {
        let fs = Filesystem::mount(MountOptions::new().noatime()).unwrap();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.write(id, 0, b"data").unwrap();

        let before = fs.getattr(id).atime;
        std::thread::sleep(std::time::Duration::from_millis(5));
        fs.read(id, 0, 4).unwrap();
        assert_eq!(fs.getattr(id).atime, before);
    }

    #[test]
    fn test_statvfs_reports_usage() {
        let fs = Filesystem::mount(MountOptions::new().with_size(1 << 20)).unwrap();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.write(id, 0, &[1u8; PAGE_SIZE + 1]).unwrap();

        let stats = fs.statvfs();
        assert_eq!(stats.magic, MAGIC);
        assert_eq!(stats.block_size, BLOCK_SIZE);
        assert_eq!(stats.blocks_used, 2);
        assert_eq!(stats.blocks_total, Some((1 << 20) / BLOCK_SIZE as u64));
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.name_max, 255);
    }

    #[test]
    fn test_quota_released_on_unlink() {
        let fs = Filesystem::mount(MountOptions::new().with_size(2 * PAGE_SIZE as u64)).unwrap();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        fs.write(id, 0, &[1u8; 2 * PAGE_SIZE]).unwrap();

        let full = fs.create(fs.root(), "g", 0o644).unwrap();
        assert!(matches!(
            fs.write(full, 0, b"x"),
            Err(FsError::ResourceExhausted(_))
        ));

        fs.unlink(fs.root(), "f").unwrap();
        assert_eq!(fs.write(full, 0, b"x").unwrap(), 1);
    }

    #[test]
    fn test_uid_gid_policy_from_options() {
        let fs = Filesystem::mount(MountOptions::new().with_owner(1000, 100)).unwrap();
        let id = fs.create(fs.root(), "f", 0o644).unwrap();
        let attr = fs.getattr(id);
        assert_eq!(attr.uid, 1000);
        assert_eq!(attr.gid, 100);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = mount();
        let b = mount();
        let id_a = a.create(a.root(), "same", 0o644).unwrap();
        let id_b = b.create(b.root(), "same", 0o644).unwrap();

        a.write(id_a, 0, b"alpha").unwrap();
        b.write(id_b, 0, b"beta").unwrap();
        assert_eq!(a.read(id_a, 0, 5).unwrap(), b"alpha");
        assert_eq!(b.read(id_b, 0, 4).unwrap(), b"beta");

        a.unmount();
        assert_eq!(b.read(id_b, 0, 4).unwrap(), b"beta");
    }

    #[test]
    fn test_mount_raw_option_string() {
        let fs = Filesystem::mount_raw(b"uid=7,gid=7,mode=700").unwrap();
        let root = fs.getattr(fs.root());
        assert_eq!(root.mode, 0o700);
        assert_eq!(root.uid, 7);

        assert!(matches!(
            Filesystem::mount_raw(b"rsize=7"),
            Err(FsError::Misconfigured(_))
        ));
    }
}
