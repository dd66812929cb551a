// crates/porep-seal/src/miner.rs

//! The proving party.
//!
//! A [`Miner`] packs pieces into a sector, seals it, commits to the result
//! with a [`Statement`] and later answers the validator's [`Challenge`].
//!
//! Its bookkeeping lives in [`MinerStorage`]: registered file paths keyed by
//! [`FileId`] and sealed sectors keyed by [`StatementId`]. Both maps are left
//! out of the miner's own serde form; the persistent store writes them as
//! individually addressable records and hands them back through
//! [`Miner::replace_storage`].

use crate::mock::MockSeal;
use crate::sector::{FileId, FileRole, SectorPaths};
use anyhow::{anyhow, bail, ensure, Context, Result};
use porep_core::{
    hexser, ActorId, Challenge, Cid, PieceInfo, Proof, ProofType, SectorNumber, Statement,
    StatementId, Validator,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Everything the miner remembers about one sealed sector.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedSector {
    /// Statement committed for the sector.
    pub statement: Statement,
    /// Nonce mixed into the replica id.
    pub nonce: u64,
    /// Replica id the sector was sealed under.
    #[serde(with = "hexser::array")]
    pub replica_id: [u8; 32],
    /// Staged data file.
    pub staged: FileId,
    /// Sealed replica.
    pub sealed: FileId,
    /// Cache directory.
    pub cache: FileId,
}

/// Sub-collections persisted outside the miner's singleton record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MinerStorage {
    /// Registered paths (UTF-8) by file id.
    pub files: BTreeMap<FileId, String>,
    /// Sealed sectors by statement id.
    pub statements: BTreeMap<StatementId, SealedSector>,
}

impl MinerStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path registered under `id`.
    pub fn resolve(&self, id: &FileId) -> Result<PathBuf> {
        self.files
            .get(id)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("no file registered under id {id}"))
    }

    fn register(&mut self, id: FileId, path: &Path) -> Result<()> {
        let s = path
            .to_str()
            .ok_or_else(|| anyhow!("path {} is not valid UTF-8", path.display()))?;
        self.files.insert(id, s.to_owned());
        Ok(())
    }
}

/// `p_aux` contents written to a sector's cache directory.
#[derive(Debug, Serialize, Deserialize)]
struct PersistentAux {
    #[serde(with = "hexser::array")]
    replica_id: [u8; 32],
    comm_r: Cid,
    comm_d: Cid,
}

/// The proving party of one benchmark run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Miner {
    id: ActorId,
    proof_type: ProofType,
    next_sector: SectorNumber,
    #[serde(default)]
    pledged: bool,
    #[serde(skip)]
    storage: MinerStorage,
}

impl Miner {
    /// New miner with empty storage.
    #[must_use]
    pub fn new(id: ActorId, proof_type: ProofType) -> Self {
        Self {
            id,
            proof_type,
            next_sector: 0,
            pledged: false,
            storage: MinerStorage::new(),
        }
    }

    /// Actor id.
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Proof type every sector of this miner uses.
    #[must_use]
    pub const fn proof_type(&self) -> ProofType {
        self.proof_type
    }

    /// Number the next sector will get.
    #[must_use]
    pub const fn next_sector(&self) -> SectorNumber {
        self.next_sector
    }

    /// Whether the miner has pledged to a validator.
    #[must_use]
    pub const fn is_pledged(&self) -> bool {
        self.pledged
    }

    /// File and statement bookkeeping.
    #[must_use]
    pub const fn storage(&self) -> &MinerStorage {
        &self.storage
    }

    /// Mutable bookkeeping, for callers registering extra files.
    pub fn storage_mut(&mut self) -> &mut MinerStorage {
        &mut self.storage
    }

    /// Swap in freshly loaded storage, returning the previous one.
    pub fn replace_storage(&mut self, storage: MinerStorage) -> MinerStorage {
        std::mem::replace(&mut self.storage, storage)
    }

    /// Register with `validator`.
    pub fn pledge(&mut self, validator: &mut Validator) {
        validator.register_pledge(self.id);
        self.pledged = true;
    }

    /// Create the next sector's files under `dir` and register them.
    pub fn init_sector_dir(&mut self, dir: &Path) -> Result<SectorPaths> {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let paths = SectorPaths::layout(dir, self.next_sector);

        File::create(&paths.staged).with_context(|| format!("create {}", paths.staged.display()))?;
        File::create(&paths.sealed).with_context(|| format!("create {}", paths.sealed.display()))?;
        fs::create_dir_all(&paths.cache)
            .with_context(|| format!("creating {}", paths.cache.display()))?;

        for role in [FileRole::Staged, FileRole::Sealed, FileRole::Cache] {
            let id = FileId::derive(self.id, paths.sector, role);
            self.storage.register(id, paths.path(role))?;
        }
        debug!(sector = paths.sector, dir = %dir.display(), "sector directory initialized");
        Ok(paths)
    }

    /// Pack `inputs` into the staged file of `paths`, in order.
    pub fn assemble_pieces(&self, paths: &SectorPaths, inputs: &[PathBuf]) -> Result<Vec<PieceInfo>> {
        ensure!(!inputs.is_empty(), "no input files to assemble");
        let staged = OpenOptions::new()
            .append(true)
            .open(&paths.staged)
            .with_context(|| format!("open {}", paths.staged.display()))?;
        let mut w = BufWriter::new(staged);

        let mut pieces = Vec::with_capacity(inputs.len());
        let mut used: u64 = 0;
        for input in inputs {
            let f = File::open(input).with_context(|| format!("open {}", input.display()))?;
            let piece = MockSeal::add_piece(BufReader::new(f), &mut w)
                .with_context(|| format!("adding piece {}", input.display()))?;
            used += piece.size;
            ensure!(
                used <= self.proof_type.sector_size(),
                "pieces need {used} bytes, a {} sector holds {}",
                self.proof_type,
                self.proof_type.sector_size()
            );
            pieces.push(piece);
        }
        w.flush()?;
        debug!(sector = paths.sector, pieces = pieces.len(), used, "pieces assembled");
        Ok(pieces)
    }

    /// Seal the pending sector under `dir` and commit to it.
    ///
    /// `id` is the statement id and sealing ticket; `nonce` is mixed into the
    /// replica id. The sector must have been created with
    /// [`Self::init_sector_dir`] and filled with [`Self::assemble_pieces`].
    pub fn commit_statement(
        &mut self,
        id: StatementId,
        nonce: u64,
        dir: &Path,
        pieces: Vec<PieceInfo>,
    ) -> Result<Statement> {
        let sector = self.next_sector;
        let paths = SectorPaths::layout(dir, sector);
        let staged = FileId::derive(self.id, sector, FileRole::Staged);
        let sealed = FileId::derive(self.id, sector, FileRole::Sealed);
        let cache = FileId::derive(self.id, sector, FileRole::Cache);
        ensure!(
            self.storage.files.contains_key(&staged),
            "sector {sector} was never initialized under {}",
            dir.display()
        );
        ensure!(!pieces.is_empty(), "sector {sector} has no pieces");
        if self.storage.statements.contains_key(&id) {
            bail!("statement id {id} already committed");
        }

        let unsealed_cid = MockSeal::unsealed_cid(&pieces);
        let replica_id =
            MockSeal::replica_id(self.id, sector, &id, nonce, &unsealed_cid, self.proof_type);
        let sealed_cid = MockSeal::seal(&paths.staged, &paths.sealed, &replica_id)
            .with_context(|| format!("sealing sector {sector}"))?;

        let aux = PersistentAux {
            replica_id,
            comm_r: sealed_cid,
            comm_d: unsealed_cid,
        };
        let aux_path = paths.cache.join("p_aux");
        fs::write(&aux_path, serde_json::to_vec_pretty(&aux)?)
            .with_context(|| format!("writing {}", aux_path.display()))?;

        let statement = Statement {
            id,
            sector_number: sector,
            proof_type: self.proof_type,
            sealed_cid,
            unsealed_cid,
            pieces,
            miner_id: self.id,
        };
        self.storage.statements.insert(
            id,
            SealedSector {
                statement: statement.clone(),
                nonce,
                replica_id,
                staged,
                sealed,
                cache,
            },
        );
        self.next_sector += 1;

        info!(statement = %id, sector, comm_r = %sealed_cid, comm_d = %unsealed_cid, "sector sealed");
        Ok(statement)
    }

    /// Answer `chal` for the sector its statement id points at.
    ///
    /// Re-reads the sealed replica and refuses to answer if it no longer
    /// matches the committed CommR.
    pub fn answer_challenge(&self, chal: &Challenge) -> Result<Proof> {
        let sector = self
            .storage
            .statements
            .get(&chal.statement_id)
            .ok_or_else(|| anyhow!("no sealed sector for statement {}", chal.statement_id))?;
        let st = &sector.statement;
        ensure!(
            st.miner_id == self.id,
            "statement {} belongs to miner {}, not {}",
            st.id,
            st.miner_id,
            self.id
        );

        let sealed_path = self.storage.resolve(&sector.sealed)?;
        let on_disk = MockSeal::digest_replica(&sealed_path)?;
        ensure!(
            on_disk == st.sealed_cid,
            "replica {} hashes to {on_disk}, committed {}",
            sealed_path.display(),
            st.sealed_cid
        );

        let bytes = MockSeal::prove(
            st.miner_id,
            st.sector_number,
            st.proof_type,
            &st.sealed_cid,
            &st.unsealed_cid,
            &st.id,
            &chal.content,
        );
        debug!(statement = %st.id, bytes = bytes.len(), "challenge answered");
        Ok(Proof::new(bytes))
    }
}
