//! Mount configuration.
//!
//! The host hands over its raw mount data as bytes; [`MountOptions::parse`]
//! understands the classic comma-separated `key=value` option string. Fields
//! the core does not interpret (`iocharset`, anything unknown) are carried
//! opaquely and can be read back by the host.

use indexmap::IndexMap;

use crate::error::{FsError, FsResult};

/// Default root directory permission bits.
pub const DEFAULT_ROOT_MODE: u32 = 0o755;

/// Default read/write size hint (one block).
pub const DEFAULT_IO_SIZE: u32 = 4096;

/// Behavior flags for a mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MountFlags {
    /// Refuse every mutating operation.
    pub read_only: bool,
    /// Do not maintain access timestamps.
    pub noatime: bool,
}

/// Parsed mount configuration.
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Preferred read size hint, bytes. Power of two.
    pub rsize: u32,
    /// Preferred write size hint, bytes. Power of two.
    pub wsize: u32,
    /// Behavior flags.
    pub flags: MountFlags,
    /// Root directory permission bits.
    pub root_mode: u32,
    /// Owner id assigned to new nodes.
    pub uid: u32,
    /// Group id assigned to new nodes.
    pub gid: u32,
    /// Total content quota in bytes. `None` is unbounded.
    pub size: Option<u64>,
    /// Maximum live node count. `None` is unbounded.
    pub nr_inodes: Option<u64>,
    /// Charset table name. Carried for the host, not interpreted.
    pub iocharset: Option<String>,
    /// Unrecognized options, in the order they appeared.
    pub extra: IndexMap<String, String>,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            rsize: DEFAULT_IO_SIZE,
            wsize: DEFAULT_IO_SIZE,
            flags: MountFlags::default(),
            root_mode: DEFAULT_ROOT_MODE,
            uid: 0,
            gid: 0,
            size: None,
            nr_inodes: None,
            iocharset: None,
            extra: IndexMap::new(),
        }
    }
}

impl MountOptions {
    /// Create options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw option string as supplied by the host at mount time.
    ///
    /// Accepts `key=value` pairs and bare flags separated by commas, e.g.
    /// `rsize=8192,uid=1000,noatime,size=64m`. Empty input yields the
    /// defaults. Unknown options are carried in [`MountOptions::extra`]
    /// rather than rejected.
    pub fn parse(data: &[u8]) -> FsResult<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| FsError::misconfigured("mount options are not valid UTF-8"))?;

        let mut opts = Self::default();
        for token in text.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                None => match token {
                    "ro" => opts.flags.read_only = true,
                    "rw" => opts.flags.read_only = false,
                    "noatime" => opts.flags.noatime = true,
                    "atime" => opts.flags.noatime = false,
                    _ => {
                        opts.extra.insert(token.to_string(), String::new());
                    }
                },
                Some((key, value)) => match key {
                    "rsize" => opts.rsize = parse_number(key, value)? as u32,
                    "wsize" => opts.wsize = parse_number(key, value)? as u32,
                    "mode" => opts.root_mode = parse_octal(key, value)?,
                    "uid" => opts.uid = parse_number(key, value)? as u32,
                    "gid" => opts.gid = parse_number(key, value)? as u32,
                    "size" => opts.size = nonzero(parse_bytes(key, value)?),
                    "nr_inodes" => opts.nr_inodes = nonzero(parse_number(key, value)?),
                    "iocharset" => opts.iocharset = Some(value.to_string()),
                    _ => {
                        opts.extra.insert(key.to_string(), value.to_string());
                    }
                },
            }
        }
        opts.validate()?;
        Ok(opts)
    }

    /// Check invariants the rest of the instance relies on.
    pub fn validate(&self) -> FsResult<()> {
        for (name, value) in [("rsize", self.rsize), ("wsize", self.wsize)] {
            if value == 0 || !value.is_power_of_two() {
                return Err(FsError::misconfigured(format!(
                    "{name} must be a nonzero power of two, got {value}"
                )));
            }
        }
        if self.root_mode & !0o7777 != 0 {
            return Err(FsError::misconfigured(format!(
                "mode {:o} has bits outside the permission range",
                self.root_mode
            )));
        }
        Ok(())
    }

    /// Set the byte quota.
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.size = nonzero(bytes);
        self
    }

    /// Set the node-count limit.
    pub fn with_nr_inodes(mut self, count: u64) -> Self {
        self.nr_inodes = nonzero(count);
        self
    }

    /// Set the read-only flag.
    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    /// Set the noatime flag.
    pub fn noatime(mut self) -> Self {
        self.flags.noatime = true;
        self
    }

    /// Set the default owner/group for new nodes.
    pub fn with_owner(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

fn nonzero(value: u64) -> Option<u64> {
    (value != 0).then_some(value)
}

fn parse_number(key: &str, value: &str) -> FsResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| FsError::misconfigured(format!("{key}={value} is not a number")))
}

fn parse_octal(key: &str, value: &str) -> FsResult<u32> {
    u32::from_str_radix(value, 8)
        .map_err(|_| FsError::misconfigured(format!("{key}={value} is not octal")))
}

/// Parse a byte count with an optional `k`/`m`/`g` suffix.
fn parse_bytes(key: &str, value: &str) -> FsResult<u64> {
    let (digits, shift) = match value.as_bytes().last() {
        Some(b'k' | b'K') => (&value[..value.len() - 1], 10),
        Some(b'm' | b'M') => (&value[..value.len() - 1], 20),
        Some(b'g' | b'G') => (&value[..value.len() - 1], 30),
        _ => (value, 0),
    };
    let n = parse_number(key, digits)?;
    n.checked_shl(shift)
        .filter(|scaled| scaled >> shift == n)
        .ok_or_else(|| FsError::misconfigured(format!("{key}={value} overflows")))
}
