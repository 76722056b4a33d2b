//! File content storage.
//!
//! Each regular node owns a [`FileContent`]: a page-indexed sparse byte
//! sequence. Pages are allocated lazily on write; holes read back as zeros.
//! Readers share the lock, writers are exclusive, so no read ever observes a
//! torn write.
//!
//! Growth is charged against the instance-wide [`ByteQuota`] one page at a
//! time; shrinking and node destruction give the pages back.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::{FsError, FsResult};

/// Content page size in bytes. Also the instance block size.
pub const PAGE_SIZE: usize = 4096;

type Page = Box<[u8; PAGE_SIZE]>;

fn blank_page() -> Page {
    Box::new([0u8; PAGE_SIZE])
}

/// Instance-wide content byte accounting.
///
/// `limit` of `None` is unbounded; charging still tracks usage so statistics
/// stay meaningful.
#[derive(Debug)]
pub struct ByteQuota {
    used: AtomicU64,
    limit: Option<u64>,
}

impl ByteQuota {
    /// Create a quota with an optional byte limit.
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            used: AtomicU64::new(0),
            limit,
        }
    }

    /// Bytes currently charged.
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    /// The configured limit, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Try to charge `bytes`; false when the limit would be exceeded.
    fn try_charge(&self, bytes: u64) -> bool {
        self.used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                let next = current.checked_add(bytes)?;
                match self.limit {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .is_ok()
    }

    /// Give bytes back.
    fn release(&self, bytes: u64) {
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_sub(bytes))
            });
    }
}

/// Per-instance content limits, shared by every [`FileContent`].
#[derive(Debug)]
pub struct ContentPolicy {
    /// Largest allowed logical file size.
    pub max_file_size: u64,
    /// Instance byte quota.
    pub quota: ByteQuota,
}

impl ContentPolicy {
    /// Create a policy.
    pub fn new(max_file_size: u64, quota_limit: Option<u64>) -> Self {
        Self {
            max_file_size,
            quota: ByteQuota::new(quota_limit),
        }
    }
}

struct PageMap {
    pages: BTreeMap<u64, Page>,
    size: u64,
}

/// Sparse page-indexed byte storage for one regular file.
pub struct FileContent {
    inner: RwLock<PageMap>,
    policy: Arc<ContentPolicy>,
}

impl FileContent {
    /// Create empty content governed by the instance policy.
    pub fn new(policy: Arc<ContentPolicy>) -> Self {
        Self {
            inner: RwLock::new(PageMap {
                pages: BTreeMap::new(),
                size: 0,
            }),
            policy,
        }
    }

    /// Logical size in bytes.
    pub fn size(&self) -> u64 {
        self.inner.read().size
    }

    /// Allocated page count.
    pub fn pages(&self) -> u64 {
        self.inner.read().pages.len() as u64
    }

    /// Allocated storage in 512-byte units.
    pub fn blocks(&self) -> u64 {
        self.pages() * (PAGE_SIZE as u64 / 512)
    }

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes (possibly none) when `offset` is at or past the
    /// logical size. Holes read as zeros.
    pub fn read(&self, offset: u64, len: usize) -> FsResult<Vec<u8>> {
        offset
            .checked_add(len as u64)
            .ok_or_else(|| FsError::invalid("read range overflows"))?;

        let map = self.inner.read();
        if offset >= map.size {
            return Ok(Vec::new());
        }
        let len = len.min((map.size - offset) as usize);
        let mut out = vec![0u8; len];

        let mut cursor = 0usize;
        while cursor < len {
            let pos = offset + cursor as u64;
            let page_no = pos / PAGE_SIZE as u64;
            let page_off = (pos % PAGE_SIZE as u64) as usize;
            let chunk = (PAGE_SIZE - page_off).min(len - cursor);
            if let Some(page) = map.pages.get(&page_no) {
                out[cursor..cursor + chunk].copy_from_slice(&page[page_off..page_off + chunk]);
            }
            cursor += chunk;
        }
        Ok(out)
    }

    /// Write all of `data` at `offset`, extending sparsely as needed.
    ///
    /// Either the whole range is written or nothing is: pages the range
    /// needs are charged against the quota before any byte is copied.
    pub fn write(&self, offset: u64, data: &[u8]) -> FsResult<usize> {
        let end = offset
            .checked_add(data.len() as u64)
            .ok_or_else(|| FsError::invalid("write range overflows"))?;
        if end > self.policy.max_file_size {
            return Err(FsError::exhausted(format!(
                "write to offset {end} exceeds the maximum file size"
            )));
        }
        if data.is_empty() {
            return Ok(0);
        }

        let mut map = self.inner.write();

        let first_page = offset / PAGE_SIZE as u64;
        let last_page = (end - 1) / PAGE_SIZE as u64;
        let missing = (first_page..=last_page)
            .filter(|no| !map.pages.contains_key(no))
            .count() as u64;
        if !self.policy.quota.try_charge(missing * PAGE_SIZE as u64) {
            return Err(FsError::exhausted("content quota exceeded"));
        }

        let mut cursor = 0usize;
        while cursor < data.len() {
            let pos = offset + cursor as u64;
            let page_no = pos / PAGE_SIZE as u64;
            let page_off = (pos % PAGE_SIZE as u64) as usize;
            let chunk = (PAGE_SIZE - page_off).min(data.len() - cursor);
            let page = map.pages.entry(page_no).or_insert_with(blank_page);
            page[page_off..page_off + chunk].copy_from_slice(&data[cursor..cursor + chunk]);
            cursor += chunk;
        }
        map.size = map.size.max(end);
        Ok(data.len())
    }

    /// Shrink to `new_size`, or zero-extend logically.
    ///
    /// Shrinking drops whole pages past the end and zeroes the tail of the
    /// last kept page, so a later extension can never read stale bytes.
    pub fn truncate(&self, new_size: u64) -> FsResult<()> {
        if new_size > self.policy.max_file_size {
            return Err(FsError::exhausted(format!(
                "truncate to {new_size} exceeds the maximum file size"
            )));
        }

        let mut map = self.inner.write();
        if new_size < map.size {
            let keep_pages = new_size.div_ceil(PAGE_SIZE as u64);
            let dropped = map.pages.split_off(&keep_pages);
            self.policy
                .quota
                .release(dropped.len() as u64 * PAGE_SIZE as u64);

            let tail_off = (new_size % PAGE_SIZE as u64) as usize;
            if tail_off != 0
                && let Some(page) = map.pages.get_mut(&(new_size / PAGE_SIZE as u64))
            {
                page[tail_off..].fill(0);
            }
        }
        map.size = new_size;
        Ok(())
    }
}

impl Drop for FileContent {
    fn drop(&mut self) {
        let map = self.inner.get_mut();
        self.policy
            .quota
            .release(map.pages.len() as u64 * PAGE_SIZE as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unbounded() -> Arc<ContentPolicy> {
        Arc::new(ContentPolicy::new(u64::MAX, None))
    }

    #[test]
    fn test_write_read_round_trip() {
        let content = FileContent::new(unbounded());
        content.write(0, b"hello world").unwrap();
        assert_eq!(content.read(0, 11).unwrap(), b"hello world");
        assert_eq!(content.size(), 11);
    }

    #[test]
    fn test_read_past_eof_is_short() {
        let content = FileContent::new(unbounded());
        content.write(0, b"abc").unwrap();
        assert_eq!(content.read(0, 100).unwrap(), b"abc");
        assert_eq!(content.read(3, 10).unwrap(), b"");
        assert_eq!(content.read(1000, 10).unwrap(), b"");
    }

    #[test]
    fn test_sparse_hole_reads_zero() {
        let content = FileContent::new(unbounded());
        let offset = 3 * PAGE_SIZE as u64 + 17;
        content.write(offset, b"tail").unwrap();

        assert_eq!(content.read(0, offset as usize).unwrap(), vec![0u8; offset as usize]);
        assert_eq!(content.read(offset, 4).unwrap(), b"tail");
        // only one page is actually allocated
        assert_eq!(content.pages(), 1);
        assert_eq!(content.size(), offset + 4);
    }

    #[test]
    fn test_write_spanning_pages() {
        let content = FileContent::new(unbounded());
        let data: Vec<u8> = (0..3 * PAGE_SIZE + 100).map(|i| (i % 251) as u8).collect();
        content.write(10, &data).unwrap();
        assert_eq!(content.read(10, data.len()).unwrap(), data);
        assert_eq!(content.pages(), 4);
    }

    #[test]
    fn test_truncate_shrinks_and_zeroes_tail() {
        let content = FileContent::new(unbounded());
        content.write(0, &[0xAA; 2 * PAGE_SIZE]).unwrap();
        content.truncate(10).unwrap();
        assert_eq!(content.size(), 10);
        assert_eq!(content.pages(), 1);

        // the bytes past the cut must not resurface after regrowth
        content.truncate(100).unwrap();
        assert_eq!(content.read(10, 90).unwrap(), vec![0u8; 90]);
    }

    #[test]
    fn test_truncate_extends_logically() {
        let content = FileContent::new(unbounded());
        content.truncate(5000).unwrap();
        assert_eq!(content.size(), 5000);
        assert_eq!(content.pages(), 0);
        assert_eq!(content.read(0, 5000).unwrap(), vec![0u8; 5000]);
    }

    #[test]
    fn test_max_file_size() {
        let policy = Arc::new(ContentPolicy::new(100, None));
        let content = FileContent::new(policy);
        content.write(0, &[1; 100]).unwrap();
        assert!(matches!(
            content.write(50, &[1; 51]),
            Err(FsError::ResourceExhausted(_))
        ));
        assert!(matches!(
            content.truncate(101),
            Err(FsError::ResourceExhausted(_))
        ));
    }

    #[test]
    fn test_quota_charges_and_releases() {
        let policy = Arc::new(ContentPolicy::new(u64::MAX, Some(2 * PAGE_SIZE as u64)));
        let content = FileContent::new(Arc::clone(&policy));

        content.write(0, &[1; 2 * PAGE_SIZE]).unwrap();
        assert_eq!(policy.quota.used(), 2 * PAGE_SIZE as u64);

        // a third page will not fit
        assert!(matches!(
            content.write(2 * PAGE_SIZE as u64, b"x"),
            Err(FsError::ResourceExhausted(_))
        ));
        // and the failed write changed nothing
        assert_eq!(content.size(), 2 * PAGE_SIZE as u64);

        content.truncate(1).unwrap();
        assert_eq!(policy.quota.used(), PAGE_SIZE as u64);

        drop(content);
        assert_eq!(policy.quota.used(), 0);
    }

    #[test]
    fn test_overflow_offsets_rejected() {
        let content = FileContent::new(unbounded());
        assert!(matches!(
            content.read(u64::MAX, 2),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(matches!(
            content.write(u64::MAX, b"ab"),
            Err(FsError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        use std::thread;

        let content = Arc::new(FileContent::new(unbounded()));
        content.write(0, &[7u8; PAGE_SIZE]).unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let content = Arc::clone(&content);
            handles.push(thread::spawn(move || {
                for _ in 0..200 {
                    let bytes = content.read(0, PAGE_SIZE).unwrap();
                    // whole-file writer exclusion: a read sees one value only
                    assert!(bytes.iter().all(|b| *b == bytes[0]));
                }
            }));
        }
        for round in 0..200u8 {
            content.write(0, &[round; PAGE_SIZE]).unwrap();
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
