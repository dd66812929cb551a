// crates/porep-seal/src/sector.rs

//! On-disk layout of a sector and the opaque ids the miner files it under.

use blake3::Hasher;
use porep_core::{hexser, ActorId, SectorNumber};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Length of a [`FileId`].
pub const FILE_ID_LEN: usize = 16;

/// Opaque id of a file or directory owned by a miner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(#[serde(with = "hexser::array")] pub [u8; FILE_ID_LEN]);

impl FileId {
    /// Deterministic id of `role` in `miner`'s sector `sector`.
    #[must_use]
    pub fn derive(miner: ActorId, sector: SectorNumber, role: FileRole) -> Self {
        let mut h = Hasher::new_derive_key("porep-bench sector file id v1");
        h.update(&miner.to_le_bytes());
        h.update(&sector.to_le_bytes());
        h.update(role.tag().as_bytes());
        let mut out = [0u8; FILE_ID_LEN];
        out.copy_from_slice(&h.finalize().as_bytes()[..FILE_ID_LEN]);
        Self(out)
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FILE_ID_LEN] {
        &self.0
    }

    /// Parse from exactly [`FILE_ID_LEN`] bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; FILE_ID_LEN]>::try_from(bytes).ok().map(Self)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// What a registered path is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileRole {
    /// Unsealed staging file the pieces are packed into.
    Staged,
    /// Sealed replica.
    Sealed,
    /// Per-sector cache directory (holds `p_aux`).
    Cache,
}

impl FileRole {
    const fn tag(self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::Sealed => "sealed",
            Self::Cache => "cache",
        }
    }
}

/// Paths of one sector inside the working directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectorPaths {
    /// Sector number.
    pub sector: SectorNumber,
    /// Staged (unsealed) data file.
    pub staged: PathBuf,
    /// Sealed replica file.
    pub sealed: PathBuf,
    /// Cache directory.
    pub cache: PathBuf,
}

impl SectorPaths {
    /// Canonical layout of sector `sector` under `dir`.
    #[must_use]
    pub fn layout(dir: &Path, sector: SectorNumber) -> Self {
        Self {
            sector,
            staged: dir.join(format!("staged-{sector}")),
            sealed: dir.join(format!("sealed-{sector}")),
            cache: dir.join(format!("cache-{sector}")),
        }
    }

    /// Path registered under `role`.
    #[must_use]
    pub fn path(&self, role: FileRole) -> &Path {
        match role {
            FileRole::Staged => &self.staged,
            FileRole::Sealed => &self.sealed,
            FileRole::Cache => &self.cache,
        }
    }
}
