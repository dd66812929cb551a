// crates/porep-store/src/snapshot.rs

//! Validator and miner snapshots that carry protocol state from phase 1 to phase 2.
//!
//! Four namespaces share one store, disjoint by their first key byte:
//!
//! | namespace | key                         | value                         |
//! |-----------|-----------------------------|-------------------------------|
//! | validator | `0x01`                      | JSON [`Validator`]            |
//! | miner     | `0x10`                      | JSON [`Miner`] (no storage)   |
//! | file      | `0x20 ‖ file id`            | UTF-8 path                    |
//! | statement | `0x30 ‖ statement id`       | JSON [`SealedSector`]         |
//!
//! The miner's files and sealed sectors are written as one record each, so
//! they stay addressable by id instead of living inside one blob.

use crate::error::{Result, StoreError};
use crate::kv::KvStore;
use porep_core::{StatementId, Validator};
use porep_seal::{FileId, Miner, MinerStorage, SealedSector};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

/// Key of the validator singleton.
pub const VALIDATOR_KEY: &[u8] = &[0x01];
/// Key of the miner singleton.
pub const MINER_KEY: &[u8] = &[0x10];
/// First byte of every file-path record key.
pub const FILE_PREFIX: u8 = 0x20;
/// First byte of every sealed-sector record key.
pub const STATEMENT_PREFIX: u8 = 0x30;

/// One of the four record families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Namespace {
    /// The validator singleton.
    Validator,
    /// The miner singleton.
    Miner,
    /// Registered file paths.
    File,
    /// Sealed sectors.
    Statement,
}

impl Namespace {
    /// Every namespace, in key order.
    pub const ALL: [Self; 4] = [Self::Validator, Self::Miner, Self::File, Self::Statement];

    /// Leading key byte.
    #[must_use]
    pub const fn prefix(self) -> u8 {
        match self {
            Self::Validator => VALIDATOR_KEY[0],
            Self::Miner => MINER_KEY[0],
            Self::File => FILE_PREFIX,
            Self::Statement => STATEMENT_PREFIX,
        }
    }

    /// Name used in logs and errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Validator => "validator",
            Self::Miner => "miner",
            Self::File => "file",
            Self::Statement => "statement",
        }
    }
}

/// Record key of a file path.
#[must_use]
pub fn file_key(id: &FileId) -> Vec<u8> {
    prefixed(FILE_PREFIX, id.as_bytes())
}

/// Record key of a sealed sector.
#[must_use]
pub fn statement_key(id: &StatementId) -> Vec<u8> {
    prefixed(STATEMENT_PREFIX, id.as_bytes())
}

fn prefixed(prefix: u8, id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + id.len());
    key.push(prefix);
    key.extend_from_slice(id);
    key
}

fn encode<T: Serialize>(what: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StoreError::Codec {
        what: what.to_owned(),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(what: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Codec {
        what: what.to_owned(),
        reason: e.to_string(),
    })
}

/// Record counts per namespace.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Validator singletons (0 or 1).
    pub validators: usize,
    /// Miner singletons (0 or 1).
    pub miners: usize,
    /// File-path records.
    pub files: usize,
    /// Sealed-sector records.
    pub statements: usize,
}

impl Inventory {
    /// Whether every namespace is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.validators == 0 && self.miners == 0 && self.files == 0 && self.statements == 0
    }
}

/// Count records in every namespace.
pub fn inventory<S: KvStore + ?Sized>(store: &S) -> Result<Inventory> {
    let count = |ns: Namespace| store.scan_prefix(&[ns.prefix()]).map(|v| v.len());
    Ok(Inventory {
        validators: count(Namespace::Validator)?,
        miners: count(Namespace::Miner)?,
        files: count(Namespace::File)?,
        statements: count(Namespace::Statement)?,
    })
}

/// Delete every record of all four namespaces. Returns how many were removed.
pub fn clear<S: KvStore + ?Sized>(store: &mut S) -> Result<usize> {
    let mut removed = 0;
    for ns in Namespace::ALL {
        let n = store.delete_prefix(&[ns.prefix()])?;
        debug!(namespace = ns.name(), removed = n, "namespace cleared");
        removed += n;
    }
    info!(removed, "store cleared");
    Ok(removed)
}

/// Write `miner` and `validator`.
///
/// Per-item records go first; the miner and validator singletons are written
/// last so a failure part-way never leaves singletons pointing at missing items.
pub fn save<S: KvStore + ?Sized>(store: &mut S, miner: &Miner, validator: &Validator) -> Result<()> {
    let storage = miner.storage();
    for (id, path) in &storage.files {
        store.put(&file_key(id), path.as_bytes())?;
    }
    for (id, sector) in &storage.statements {
        store.put(&statement_key(id), &encode("statement record", sector)?)?;
    }
    store.put(MINER_KEY, &encode("miner", miner)?)?;
    store.put(VALIDATOR_KEY, &encode("validator", validator)?)?;
    info!(
        miner = miner.id(),
        files = storage.files.len(),
        statements = storage.statements.len(),
        "snapshot saved"
    );
    Ok(())
}

/// Read the validator singleton.
pub fn load_validator<S: KvStore + ?Sized>(store: &S) -> Result<Validator> {
    let bytes = store
        .get(VALIDATOR_KEY)?
        .ok_or(StoreError::MissingRecord("validator"))?;
    decode("validator", &bytes)
}

/// Read the miner singleton and rebuild its storage from the file and statement namespaces.
pub fn load_miner<S: KvStore + ?Sized>(store: &S) -> Result<Miner> {
    let bytes = store.get(MINER_KEY)?.ok_or(StoreError::MissingRecord("miner"))?;
    let mut miner: Miner = decode("miner", &bytes)?;

    let mut storage = MinerStorage::new();
    for (key, value) in store.scan_prefix(&[FILE_PREFIX])? {
        let id = FileId::from_slice(&key[1..]).ok_or(StoreError::InvalidKey {
            namespace: "file",
            len: key.len(),
        })?;
        let path = String::from_utf8(value).map_err(|e| StoreError::Codec {
            what: format!("path of file {id}"),
            reason: e.to_string(),
        })?;
        storage.files.insert(id, path);
    }
    for (key, value) in store.scan_prefix(&[STATEMENT_PREFIX])? {
        let id = StatementId::from_slice(&key[1..]).ok_or(StoreError::InvalidKey {
            namespace: "statement",
            len: key.len(),
        })?;
        let sector: SealedSector = decode("statement record", &value)?;
        if sector.statement.id != id {
            return Err(StoreError::Codec {
                what: format!("statement record {id}"),
                reason: format!("record holds statement {}", sector.statement.id),
            });
        }
        storage.statements.insert(id, sector);
    }
    miner.replace_storage(storage);
    Ok(miner)
}

/// Read both parties; the validator first, so an unpopulated store fails on it.
pub fn restore<S: KvStore + ?Sized>(store: &S) -> Result<(Miner, Validator)> {
    let validator = load_validator(store)?;
    let miner = load_miner(store)?;
    info!(
        miner = miner.id(),
        files = miner.storage().files.len(),
        statements = miner.storage().statements.len(),
        "snapshot restored"
    );
    Ok((miner, validator))
}
