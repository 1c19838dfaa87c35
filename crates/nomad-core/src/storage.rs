//! Byte-oriented file surface consumed by the archive formats.
//!
//! Files are addressed by flat names relative to a storage root. Every
//! failure is returned as an `io::Error`; nothing here aborts the process.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Open/read/write/seek/remove by name.
pub trait Storage {
    type Reader: Read;
    type Writer: Write + Seek;

    fn open_read(&self, name: &str) -> io::Result<Self::Reader>;

    /// Create (or truncate) a file for writing.
    fn create(&self, name: &str) -> io::Result<Self::Writer>;

    fn exists(&self, name: &str) -> bool;

    fn remove(&self, name: &str) -> io::Result<()>;

    /// Atomically replace `to` with `from`.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Names of every file under the storage root.
    fn list(&self) -> io::Result<Vec<String>>;

    fn read_all(&self, name: &str) -> io::Result<Vec<u8>> {
        let mut reader = self.open_read(name)?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Storage rooted at a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Use `root` as the storage directory, creating it if needed.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("disk storage rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl Storage for DiskStorage {
    type Reader = BufReader<fs::File>;
    type Writer = BufWriter<fs::File>;

    fn open_read(&self, name: &str) -> io::Result<Self::Reader> {
        fs::File::open(self.path(name)).map(BufReader::new)
    }

    fn create(&self, name: &str) -> io::Result<Self::Writer> {
        fs::File::create(self.path(name)).map(BufWriter::new)
    }

    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path(name))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    fn list(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_all(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(name))
    }
}

#[derive(Debug, Default)]
struct MemoryFiles {
    files: BTreeMap<String, Vec<u8>>,
    bytes_read: HashMap<String, u64>,
}

/// In-memory storage shared between clones.
///
/// Tracks how many bytes have been pulled through `open_read` per file, so
/// callers can check that a load path stayed inside a byte range.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<MemoryFiles>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, bytes: Vec<u8>) {
        self.inner.borrow_mut().files.insert(name.to_string(), bytes);
    }

    pub fn file(&self, name: &str) -> Option<Vec<u8>> {
        self.inner.borrow().files.get(name).cloned()
    }

    /// Total bytes consumed from `name` through readers since the last reset.
    pub fn bytes_read(&self, name: &str) -> u64 {
        self.inner
            .borrow()
            .bytes_read
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_access_tracking(&self) {
        self.inner.borrow_mut().bytes_read.clear();
    }

    fn not_found(name: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("no such file: {name}"))
    }
}

impl Storage for MemoryStorage {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn open_read(&self, name: &str) -> io::Result<Self::Reader> {
        let data = self.file(name).ok_or_else(|| Self::not_found(name))?;
        Ok(MemoryReader {
            name: name.to_string(),
            data: Cursor::new(data),
            inner: Rc::clone(&self.inner),
        })
    }

    fn create(&self, name: &str) -> io::Result<Self::Writer> {
        self.insert(name, Vec::new());
        Ok(MemoryWriter {
            name: name.to_string(),
            buf: Cursor::new(Vec::new()),
            inner: Rc::clone(&self.inner),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.borrow().files.contains_key(name)
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        self.inner
            .borrow_mut()
            .files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(name))
    }

    fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        let mut inner = self.inner.borrow_mut();
        let data = inner.files.remove(from).ok_or_else(|| Self::not_found(from))?;
        inner.files.insert(to.to_string(), data);
        Ok(())
    }

    fn list(&self) -> io::Result<Vec<String>> {
        Ok(self.inner.borrow().files.keys().cloned().collect())
    }
}

/// Reader handed out by `MemoryStorage`; counts consumed bytes.
#[derive(Debug)]
pub struct MemoryReader {
    name: String,
    data: Cursor<Vec<u8>>,
    inner: Rc<RefCell<MemoryFiles>>,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.data.read(buf)?;
        *self
            .inner
            .borrow_mut()
            .bytes_read
            .entry(self.name.clone())
            .or_insert(0) += n as u64;
        Ok(n)
    }
}

/// Writer handed out by `MemoryStorage`. Contents become visible on flush
/// and when the writer is dropped.
#[derive(Debug)]
pub struct MemoryWriter {
    name: String,
    buf: Cursor<Vec<u8>>,
    inner: Rc<RefCell<MemoryFiles>>,
}

impl MemoryWriter {
    fn commit(&self) {
        self.inner
            .borrow_mut()
            .files
            .insert(self.name.clone(), self.buf.get_ref().clone());
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        // Only commit if the file was not removed or replaced in the meantime.
        let still_ours = self.inner.borrow().files.contains_key(&self.name);
        if still_ours {
            self.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_write_then_read() {
        let storage = MemoryStorage::new();
        {
            let mut w = storage.create("a.bin").expect("create");
            w.write_all(b"hello world").expect("write");
            w.seek(SeekFrom::Start(0)).expect("seek");
            w.write_all(b"J").expect("patch");
            w.flush().expect("flush");
        }
        assert_eq!(storage.read_all("a.bin").expect("read"), b"Jello world");
        assert_eq!(storage.bytes_read("a.bin"), 11);
    }

    #[test]
    fn test_memory_tracks_partial_reads() {
        let storage = MemoryStorage::new();
        storage.insert("big", vec![7u8; 4096]);

        let mut r = storage.open_read("big").expect("open");
        let mut head = [0u8; 16];
        r.read_exact(&mut head).expect("read head");
        assert_eq!(storage.bytes_read("big"), 16);

        storage.reset_access_tracking();
        assert_eq!(storage.bytes_read("big"), 0);
    }

    #[test]
    fn test_memory_missing_file_is_error() {
        let storage = MemoryStorage::new();
        let err = storage.open_read("nope").expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(storage.remove("nope").is_err());
    }

    #[test]
    fn test_memory_rename_and_list() {
        let storage = MemoryStorage::new();
        storage.insert("tmp", b"x".to_vec());
        storage.rename("tmp", "final").expect("rename");
        assert!(!storage.exists("tmp"));
        assert_eq!(storage.list().expect("list"), vec!["final".to_string()]);
    }

    #[test]
    fn test_disk_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DiskStorage::new(dir.path().join("saves")).expect("storage");

        {
            let mut w = storage.create("slot0.ngd").expect("create");
            w.write_all(&[1, 2, 3]).expect("write");
            w.flush().expect("flush");
        }
        assert!(storage.exists("slot0.ngd"));
        assert_eq!(storage.read_all("slot0.ngd").expect("read"), vec![1, 2, 3]);

        storage.rename("slot0.ngd", "slot1.ngd").expect("rename");
        assert_eq!(storage.list().expect("list"), vec!["slot1.ngd".to_string()]);

        storage.remove("slot1.ngd").expect("remove");
        assert!(!storage.exists("slot1.ngd"));
    }
}
