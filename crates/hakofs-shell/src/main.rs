//! hakofs-shell: a minimal host for the hakofs core.
//!
//! The core refuses to walk paths, so this binary is the "dispatch layer":
//! it resolves each path component-by-component with `lookup`, keeps the
//! working directory as a stack of resolved ids, and maps every `FsError`
//! to a printed message. One instance is mounted for the process lifetime.
//!
//! ```bash
//! hakofs-shell --options size=64m,uid=1000
//! hakofs> mkdir /projects
//! hakofs> write /projects/readme hello world
//! hakofs> cat /projects/readme
//! ```

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Parser;
use hakofs::{FileKind, Filesystem, FsError, FsResult, NodeId};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hakofs-shell", about = "Interactive shell over an in-memory hakofs instance")]
struct Cli {
    /// Mount option string, e.g. "size=64m,uid=1000,noatime"
    #[arg(long, default_value = "")]
    options: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let fs = Filesystem::mount_raw(cli.options.as_bytes())?;
    let mut shell = Shell::new(fs);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "hakofs> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match shell.dispatch(line.trim()) {
            Ok(ControlFlow::Continue) => {}
            Ok(ControlFlow::Quit) => break,
            Err(e) => eprintln!("error: {e}"),
        }
    }
    shell.fs.unmount();
    Ok(())
}

enum ControlFlow {
    Continue,
    Quit,
}

/// The host side: path resolution state over one mounted instance.
struct Shell {
    fs: Filesystem,
    /// Working directory as a resolved stack; index 0 is the root.
    cwd: Vec<(String, NodeId)>,
}

impl Shell {
    fn new(fs: Filesystem) -> Self {
        let root = fs.root();
        Self {
            fs,
            cwd: vec![(String::new(), root)],
        }
    }

    fn dispatch(&mut self, line: &str) -> FsResult<ControlFlow> {
        let mut parts = line.splitn(3, char::is_whitespace).filter(|s| !s.is_empty());
        let Some(cmd) = parts.next() else {
            return Ok(ControlFlow::Continue);
        };
        let arg1 = parts.next();
        let rest = parts.next();

        match (cmd, arg1) {
            ("quit" | "exit", _) => return Ok(ControlFlow::Quit),
            ("help", _) => print_help(),
            ("pwd", _) => println!("{}", self.pwd()),
            ("statfs", _) => {
                let s = self.fs.statvfs();
                println!(
                    "magic {:#x}  block {}  blocks used {}{}  nodes {}{}  name_max {}",
                    s.magic,
                    s.block_size,
                    s.blocks_used,
                    s.blocks_total
                        .map(|t| format!("/{t}"))
                        .unwrap_or_default(),
                    s.nodes,
                    s.nodes_total
                        .map(|t| format!("/{t}"))
                        .unwrap_or_default(),
                    s.name_max,
                );
            }
            ("ls", path) => {
                let dir = match path {
                    Some(p) => self.resolve(p)?.1,
                    None => self.cwd_id(),
                };
                for entry in self.fs.readdir(dir)? {
                    let attr = self.fs.getattr(entry.id);
                    println!(
                        "{:>6}  {:9}  {:>8}  {}",
                        entry.id, entry.kind, attr.size, entry.name
                    );
                }
            }
            ("cd", Some(path)) => {
                let (stack, id) = self.resolve(path)?;
                // readdir doubles as the is-a-directory check
                self.fs.readdir(id)?;
                self.cwd = stack;
            }
            ("mkdir", Some(path)) => {
                let (parent, name) = self.resolve_parent(path)?;
                self.fs.mkdir(parent, &name, 0o755)?;
            }
            ("touch", Some(path)) => {
                let (parent, name) = self.resolve_parent(path)?;
                match self.fs.lookup(parent, &name)? {
                    Some(id) => self.fs.touch(id, hakofs::Touch::modify()),
                    None => {
                        self.fs.create(parent, &name, 0o644)?;
                    }
                }
            }
            ("mknod", Some(path)) => {
                let rdev = parse_rdev(rest)?;
                let (parent, name) = self.resolve_parent(path)?;
                self.fs.mknod(parent, &name, FileKind::Special, 0o600, rdev)?;
            }
            ("write", Some(path)) => {
                let data = rest.unwrap_or_default().as_bytes();
                let id = self.resolve_or_create(path)?;
                self.fs.truncate(id, 0)?;
                self.fs.write(id, 0, data)?;
            }
            ("append", Some(path)) => {
                let data = rest.unwrap_or_default().as_bytes();
                let id = self.resolve_or_create(path)?;
                let size = self.fs.getattr(id).size;
                self.fs.write(id, size, data)?;
            }
            ("cat", Some(path)) => {
                let (_, id) = self.resolve(path)?;
                let size = self.fs.getattr(id).size;
                let bytes = self.fs.read(id, 0, size as usize)?;
                io::stdout().write_all(&bytes).map_err(|e| {
                    FsError::invalid(format!("stdout: {e}"))
                })?;
                println!();
            }
            ("truncate", Some(path)) => {
                let size: u64 = rest
                    .unwrap_or_default()
                    .parse()
                    .map_err(|_| FsError::invalid("truncate needs a byte count"))?;
                let (_, id) = self.resolve(path)?;
                self.fs.truncate(id, size)?;
            }
            ("ln", Some(existing)) => {
                let target = rest.ok_or_else(|| FsError::invalid("ln <existing> <new>"))?;
                let (_, id) = self.resolve(existing)?;
                let (parent, name) = self.resolve_parent(target)?;
                self.fs.link(parent, &name, id)?;
            }
            ("rm", Some(path)) => {
                let (parent, name) = self.resolve_parent(path)?;
                self.fs.unlink(parent, &name)?;
            }
            ("rmdir", Some(path)) => {
                let (parent, name) = self.resolve_parent(path)?;
                self.fs.rmdir(parent, &name)?;
            }
            ("stat", Some(path)) => {
                let (_, id) = self.resolve(path)?;
                let a = self.fs.getattr(id);
                println!(
                    "node {}  kind {}  mode {:o}  nlink {}  uid {}  gid {}  size {}  blocks {}",
                    a.id, a.kind, a.mode, a.nlink, a.uid, a.gid, a.size, a.blocks
                );
            }
            (cmd, _) => {
                return Err(FsError::invalid(format!(
                    "unknown or incomplete command: {cmd} (try help)"
                )));
            }
        }
        Ok(ControlFlow::Continue)
    }

    fn cwd_id(&self) -> NodeId {
        self.cwd.last().expect("cwd stack never empty").1
    }

    fn pwd(&self) -> String {
        if self.cwd.len() == 1 {
            return "/".to_string();
        }
        self.cwd
            .iter()
            .skip(1)
            .map(|(name, _)| format!("/{name}"))
            .collect()
    }

    /// Walk `path` component-by-component, returning the resolved stack and
    /// the final node id. This is the path resolution the core leaves to us.
    fn resolve(&self, path: &str) -> FsResult<(Vec<(String, NodeId)>, NodeId)> {
        let mut stack = if path.starts_with('/') {
            vec![self.cwd[0].clone()]
        } else {
            self.cwd.clone()
        };
        for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if component == ".." {
                if stack.len() > 1 {
                    stack.pop();
                }
                continue;
            }
            let here = stack.last().expect("stack never empty").1;
            let next = self
                .fs
                .lookup(here, component)?
                .ok_or_else(|| FsError::not_found(component))?;
            stack.push((component.to_string(), next));
        }
        let id = stack.last().expect("stack never empty").1;
        Ok((stack, id))
    }

    /// Resolve everything but the last component; return (parent, name).
    fn resolve_parent(&self, path: &str) -> FsResult<(NodeId, String)> {
        let trimmed = path.trim_end_matches('/');
        let (dir_part, name) = match trimmed.rsplit_once('/') {
            Some((dir, name)) => (dir, name),
            None => ("", trimmed),
        };
        if name.is_empty() || name == "." || name == ".." {
            return Err(FsError::invalid(format!("not a creatable name: {path}")));
        }
        let parent = if dir_part.is_empty() {
            if path.starts_with('/') {
                self.fs.root()
            } else {
                self.cwd_id()
            }
        } else {
            self.resolve(dir_part)?.1
        };
        Ok((parent, name.to_string()))
    }

    fn resolve_or_create(&self, path: &str) -> FsResult<NodeId> {
        let (parent, name) = self.resolve_parent(path)?;
        match self.fs.lookup(parent, &name)? {
            Some(id) => Ok(id),
            None => self.fs.create(parent, &name, 0o644),
        }
    }
}

fn parse_rdev(arg: Option<&str>) -> FsResult<u64> {
    let text = arg.ok_or_else(|| FsError::invalid("mknod <path> <major>:<minor>"))?;
    let (major, minor) = text
        .split_once(':')
        .ok_or_else(|| FsError::invalid("device is <major>:<minor>"))?;
    let major: u64 = major
        .parse()
        .map_err(|_| FsError::invalid("bad major number"))?;
    let minor: u64 = minor
        .parse()
        .map_err(|_| FsError::invalid("bad minor number"))?;
    Ok((major << 20) | minor)
}

fn print_help() {
    println!(
        r#"commands:
    ls [path]                list a directory
    cd <path> | pwd          change / print the working directory
    mkdir <path>             create a directory
    touch <path>             create an empty file (or bump its times)
    mknod <path> <maj>:<min> create a device node
    write <path> <text>      replace a file's contents
    append <path> <text>     append to a file
    cat <path>               print a file
    truncate <path> <size>   shrink or zero-extend a file
    ln <existing> <new>      add a hard link
    rm <path>                unlink a file
    rmdir <path>             remove an empty directory
    stat <path>              show node attributes
    statfs                   show instance statistics
    quit                     leave"#
    );
}
