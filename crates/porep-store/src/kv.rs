//! Ordered byte-keyed stores.
//!
//! [`FileStore`] keeps the whole map in memory and commits it atomically on
//! [`KvStore::flush`]: the new image goes to a temp file, is fsynced, then
//! renamed over the previous one. A crash or an error before the rename leaves
//! the last committed image untouched.
//!
//! Image layout (`records.bin`):
//! ```text
//! [MAGIC "PRBS"][VERSION u32][COUNT u64]
//! COUNT × ([KEY_LEN u32][KEY][VAL_LEN u32][VAL])
//! [BLAKE3(all preceding bytes) 32]
//! ```
//! Integers are little-endian.

use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the committed image inside the store directory.
pub const STORE_FILE: &str = "records.bin";

const MAGIC: [u8; 4] = *b"PRBS";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 8;
const DIGEST_LEN: usize = 32;

/// Minimal key-value API the snapshot layer needs.
pub trait KvStore {
    /// Value under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite `key`.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key`; returns whether it was present.
    fn delete(&mut self, key: &[u8]) -> Result<bool>;

    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Make every write so far durable.
    fn flush(&mut self) -> Result<()>;

    /// Remove every key starting with `prefix`; returns how many were removed.
    fn delete_prefix(&mut self, prefix: &[u8]) -> Result<usize> {
        let keys: Vec<Vec<u8>> = self
            .scan_prefix(prefix)?
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        let mut removed = 0;
        for k in keys {
            if self.delete(&k)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn scan(map: &BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    map.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemStore {
    map: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        Ok(self.map.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(scan(&self.map, prefix))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Durable store rooted at a directory.
///
/// Open it once per process and pass the handle down. [`FileStore::close`]
/// commits pending writes; dropping the handle without closing discards them
/// so a failed run never leaves a half-written image behind.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    map: BTreeMap<Vec<u8>, Vec<u8>>,
    dirty: bool,
}

impl FileStore {
    /// Open (creating if needed) the store in `dir` and load its last committed image.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(STORE_FILE);
        let map = if path.exists() {
            decode(&path, &fs::read(&path)?)?
        } else {
            BTreeMap::new()
        };
        info!(dir = %dir.display(), records = map.len(), "store opened");
        Ok(Self {
            dir,
            map,
            dirty: false,
        })
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of records (committed or pending).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether there are writes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Commit pending writes and release the handle.
    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        debug!(dir = %self.dir.display(), "store closed");
        Ok(())
    }

    fn image_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.insert(key.to_vec(), value.to_vec());
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<bool> {
        let removed = self.map.remove(key).is_some();
        self.dirty |= removed;
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(scan(&self.map, prefix))
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let path = self.image_path();
        let tmp = path.with_extension("tmp");
        let image = encode(&self.map)?;
        {
            let mut f = File::create(&tmp)?;
            f.write_all(&image)?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        self.dirty = false;
        debug!(path = %path.display(), records = self.map.len(), bytes = image.len(), "store flushed");
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                dir = %self.dir.display(),
                "store dropped with uncommitted writes; keeping the last committed image"
            );
        }
    }
}

fn len_prefix(len: usize, what: &'static str) -> Result<[u8; 4]> {
    u32::try_from(len)
        .map(u32::to_le_bytes)
        .map_err(|_| StoreError::RecordTooLarge { what, len })
}

fn encode(map: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(HEADER_LEN + DIGEST_LEN);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(map.len() as u64).to_le_bytes());
    for (k, v) in map {
        buf.extend_from_slice(&len_prefix(k.len(), "key")?);
        buf.extend_from_slice(k);
        buf.extend_from_slice(&len_prefix(v.len(), "value")?);
        buf.extend_from_slice(v);
    }
    let digest = blake3::hash(&buf);
    buf.extend_from_slice(digest.as_bytes());
    Ok(buf)
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, n: usize, what: &str) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(n)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| StoreError::Truncated(format!("{what} at offset {pos}")))?;
    let out = &buf[*pos..end];
    *pos = end;
    Ok(out)
}

fn read_u32(buf: &[u8], pos: &mut usize, what: &str) -> Result<u32> {
    let mut b = [0u8; 4];
    b.copy_from_slice(take(buf, pos, 4, what)?);
    Ok(u32::from_le_bytes(b))
}

fn decode(path: &Path, bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    if bytes.len() < HEADER_LEN + DIGEST_LEN {
        return Err(StoreError::Truncated(format!(
            "{} is {} bytes",
            path.display(),
            bytes.len()
        )));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - DIGEST_LEN);
    if blake3::hash(body).as_bytes() != trailer {
        return Err(StoreError::ChecksumMismatch(path.to_path_buf()));
    }
    if body[0..4] != MAGIC {
        return Err(StoreError::InvalidMagic(path.to_path_buf()));
    }

    let mut pos = 4;
    let version = read_u32(body, &mut pos, "version")?;
    if version != VERSION {
        return Err(StoreError::UnsupportedVersion(version));
    }
    let mut count = [0u8; 8];
    count.copy_from_slice(take(body, &mut pos, 8, "record count")?);
    let count = u64::from_le_bytes(count);

    let mut map = BTreeMap::new();
    for _ in 0..count {
        let klen = read_u32(body, &mut pos, "key length")? as usize;
        let key = take(body, &mut pos, klen, "key")?.to_vec();
        let vlen = read_u32(body, &mut pos, "value length")? as usize;
        let value = take(body, &mut pos, vlen, "value")?.to_vec();
        map.insert(key, value);
    }
    if pos != body.len() {
        return Err(StoreError::Truncated(format!(
            "{} trailing bytes after {count} records",
            body.len() - pos
        )));
    }
    Ok(map)
}
