use super::{DirEntry, EntryKind, FileSystem, Metadata, components, is_within, parent};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone)]
struct Node {
    kind: EntryKind,
    data: Vec<u8>,
    modified: i64,
    mode: u32,
}

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

#[derive(Debug, Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    denied: BTreeSet<String>,
}

/// An in-memory [`FileSystem`].
///
/// Modification times come from a logical clock that starts at the current
/// wall-clock time and advances by one millisecond on every write, so two
/// writes never share a timestamp. Paths registered with [`MemoryFs::deny`]
/// fail every operation with `PermissionDenied`.
#[derive(Debug)]
pub struct MemoryFs {
    tree: RwLock<Tree>,
    clock: AtomicI64,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::default()),
            clock: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
        }
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Writes a file, creating missing parent directories first.
    ///
    /// # Errors
    /// Returns an error if the path is invalid or collides with a file.
    pub fn insert_file(&self, path: &str, contents: impl AsRef<[u8]>) -> io::Result<()> {
        self.create_dir_all(parent(path))?;
        self.write(path, contents.as_ref())
    }

    /// Overrides the modification time of an entry.
    ///
    /// # Errors
    /// Returns `NotFound` if the entry does not exist.
    pub fn set_modified(&self, path: &str, millis: i64) -> io::Result<()> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        let node = tree.nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.modified = millis;
        Ok(())
    }

    /// Makes every operation on `path` and its descendants fail.
    pub fn deny(&self, path: &str) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.denied.insert(path.to_string());
    }

    /// Lifts a restriction added with [`MemoryFs::deny`].
    pub fn allow(&self, path: &str) {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.denied.remove(path);
    }

    /// All files and their contents, keyed by path.
    #[must_use]
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.nodes
            .iter()
            .filter(|(_, node)| node.kind == EntryKind::File)
            .map(|(path, node)| (path.clone(), node.data.clone()))
            .collect()
    }

    /// All directory paths.
    #[must_use]
    pub fn directories(&self) -> BTreeSet<String> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.nodes
            .iter()
            .filter(|(_, node)| node.kind == EntryKind::Directory)
            .map(|(path, _)| path.clone())
            .collect()
    }
}

fn not_found(path: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such entry: {path}"))
}

impl Tree {
    fn check_access(&self, path: &str) -> io::Result<()> {
        components(path)?;
        if self.denied.iter().any(|denied| is_within(path, denied)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access denied: {path}"),
            ));
        }
        Ok(())
    }

    fn kind_of(&self, path: &str) -> Option<EntryKind> {
        if path.is_empty() {
            return Some(EntryKind::Directory);
        }
        self.nodes.get(path).map(|node| node.kind)
    }
}

impl FileSystem for MemoryFs {
    fn read_dir(&self, dir: &str) -> io::Result<Vec<DirEntry>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(dir)?;
        match tree.kind_of(dir) {
            Some(EntryKind::Directory) => {}
            Some(EntryKind::File) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("not a directory: {dir}"),
                ));
            }
            None => return Err(not_found(dir)),
        }

        Ok(tree
            .nodes
            .iter()
            .filter(|(path, _)| !path.is_empty() && parent(path) == dir)
            .map(|(path, node)| DirEntry {
                name: super::file_name(path).to_string(),
                kind: node.kind,
            })
            .collect())
    }

    fn metadata(&self, path: &str) -> io::Result<Metadata> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        if path.is_empty() {
            return Ok(Metadata {
                kind: EntryKind::Directory,
                size: 0,
                modified: None,
            });
        }
        let node = tree.nodes.get(path).ok_or_else(|| not_found(path))?;
        Ok(Metadata {
            kind: node.kind,
            size: node.data.len() as u64,
            modified: Some(node.modified),
        })
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        match tree.nodes.get(path) {
            Some(node) if node.kind == EntryKind::File => Ok(node.data.clone()),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {path}"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let modified = self.tick();
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        if path.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "cannot write the root"));
        }
        if tree.kind_of(parent(path)) != Some(EntryKind::Directory) {
            return Err(not_found(parent(path)));
        }
        if tree.kind_of(path) == Some(EntryKind::Directory) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("is a directory: {path}"),
            ));
        }

        let mode = tree.nodes.get(path).map_or(FILE_MODE, |node| node.mode);
        tree.nodes.insert(
            path.to_string(),
            Node {
                kind: EntryKind::File,
                data: contents.to_vec(),
                modified,
                mode,
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &str) -> io::Result<()> {
        let modified = self.tick();
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;

        let mut current = String::new();
        for part in components(path)? {
            current = super::join(&current, part);
            match tree.kind_of(&current) {
                Some(EntryKind::Directory) => {}
                Some(EntryKind::File) => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("a file is in the way: {current}"),
                    ));
                }
                None => {
                    tree.nodes.insert(
                        current.clone(),
                        Node {
                            kind: EntryKind::Directory,
                            data: Vec::new(),
                            modified,
                            mode: DIR_MODE,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    fn remove(&self, path: &str) -> io::Result<()> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        if path.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "refusing to remove the capability root",
            ));
        }
        if !tree.nodes.contains_key(path) {
            return Err(not_found(path));
        }
        if let Some(denied) = tree.denied.iter().find(|d| is_within(d, path)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access denied: {denied}"),
            ));
        }

        tree.nodes.retain(|key, _| !is_within(key, path));
        Ok(())
    }

    fn permissions(&self, path: &str) -> io::Result<Option<u32>> {
        let tree = self.tree.read().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        if path.is_empty() {
            return Ok(Some(DIR_MODE));
        }
        let node = tree.nodes.get(path).ok_or_else(|| not_found(path))?;
        Ok(Some(node.mode))
    }

    fn set_permissions(&self, path: &str, mode: u32) -> io::Result<()> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.check_access(path)?;
        let node = tree.nodes.get_mut(path).ok_or_else(|| not_found(path))?;
        node.mode = mode & 0o7777;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_creates_parents() -> io::Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("a/b/c.txt", "hello")?;

        assert_eq!(mem.metadata("a/b")?.kind, EntryKind::Directory);
        assert_eq!(mem.read("a/b/c.txt")?, b"hello");
        assert_eq!(mem.read_dir("a")?.len(), 1);

        Ok(())
    }

    #[test]
    fn test_clock_is_strictly_increasing() -> io::Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("x.txt", "1")?;
        let first = mem.metadata("x.txt")?.modified;
        mem.write("x.txt", b"2")?;
        let second = mem.metadata("x.txt")?.modified;

        assert!(second > first);

        Ok(())
    }

    #[test]
    fn test_remove_directory_is_recursive() -> io::Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("dir/one.txt", "1")?;
        mem.insert_file("dir/sub/two.txt", "2")?;
        mem.insert_file("dirty.txt", "keep")?;

        mem.remove("dir")?;

        assert!(!mem.exists("dir/sub/two.txt"));
        assert!(mem.exists("dirty.txt"));
        assert_eq!(mem.remove("dir").unwrap_err().kind(), io::ErrorKind::NotFound);

        Ok(())
    }

    #[test]
    fn test_denied_paths_fail() -> io::Result<()> {
        let mem = MemoryFs::new();
        mem.insert_file("private/key.pem", "secret")?;
        mem.deny("private");

        assert_eq!(
            mem.read_dir("private").unwrap_err().kind(),
            io::ErrorKind::PermissionDenied
        );
        assert!(mem.read("private/key.pem").is_err());
        assert!(mem.remove("private").is_err());

        mem.allow("private");
        assert!(mem.read("private/key.pem").is_ok());

        Ok(())
    }

    #[test]
    fn test_write_into_missing_parent_fails() {
        let mem = MemoryFs::new();
        assert_eq!(
            mem.write("nope/file.txt", b"x").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
