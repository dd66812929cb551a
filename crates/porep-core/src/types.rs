//! Protocol value objects exchanged between the miner and the validator.
//!
//! Everything here is plain data: [`Statement`], [`Challenge`] and [`Proof`]
//! carry no behavior beyond accessors and the structural checks in
//! [`Statement::validate`]. Serialized forms are JSON-friendly (binary ids as
//! hex strings) and tolerate unknown fields so newer writers stay readable.

use crate::error::ProtocolError;
use crate::hexser;
use serde::{Deserialize, Serialize};
use std::fmt;

/// On-chain actor identifier of a miner.
pub type ActorId = u64;

/// Per-miner sector sequence number.
pub type SectorNumber = u64;

/// Length in bytes of every randomness input (statement ids and challenge content).
pub const RANDOMNESS_LEN: usize = 32;

/// Smallest padded piece the sealing pipeline accepts.
pub const MIN_PIECE_SIZE: u64 = 128;

/// Random identifier of a [`Statement`]; doubles as the sealing ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatementId(#[serde(with = "hexser::array")] pub [u8; RANDOMNESS_LEN]);

impl StatementId {
    /// Wrap raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; RANDOMNESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes of the id.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RANDOMNESS_LEN] {
        &self.0
    }

    /// `true` if every byte is zero (never produced by a healthy random source).
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Parse from a byte slice of exactly [`RANDOMNESS_LEN`] bytes.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; RANDOMNESS_LEN]>::try_from(bytes).ok().map(Self)
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Unpredictable randomness issued by the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractiveRandomness(#[serde(with = "hexser::array")] pub [u8; RANDOMNESS_LEN]);

impl InteractiveRandomness {
    /// Raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RANDOMNESS_LEN] {
        &self.0
    }
}

impl fmt::Display for InteractiveRandomness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Registered seal proof: fixes sector size and proof parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProofType {
    /// 2 KiB sectors (test-sized).
    StackedDrg2KiBV1,
    /// 8 MiB sectors.
    StackedDrg8MiBV1,
    /// 512 MiB sectors.
    StackedDrg512MiBV1,
    /// 32 GiB sectors (production-sized).
    StackedDrg32GiBV1,
}

impl ProofType {
    /// All supported proof types, smallest first.
    pub const ALL: [Self; 4] = [
        Self::StackedDrg2KiBV1,
        Self::StackedDrg8MiBV1,
        Self::StackedDrg512MiBV1,
        Self::StackedDrg32GiBV1,
    ];

    /// Padded sector size in bytes.
    #[must_use]
    pub const fn sector_size(self) -> u64 {
        match self {
            Self::StackedDrg2KiBV1 => 2 << 10,
            Self::StackedDrg8MiBV1 => 8 << 20,
            Self::StackedDrg512MiBV1 => 512 << 20,
            Self::StackedDrg32GiBV1 => 32 << 30,
        }
    }

    /// Short sector-size label (`2KiB`, `32GiB`, ...).
    #[must_use]
    pub const fn sector_size_label(self) -> &'static str {
        match self {
            Self::StackedDrg2KiBV1 => "2KiB",
            Self::StackedDrg8MiBV1 => "8MiB",
            Self::StackedDrg512MiBV1 => "512MiB",
            Self::StackedDrg32GiBV1 => "32GiB",
        }
    }

    /// Human label accepted on the command line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StackedDrg2KiBV1 => "2K",
            Self::StackedDrg8MiBV1 => "8M",
            Self::StackedDrg512MiBV1 => "512M",
            Self::StackedDrg32GiBV1 => "32G",
        }
    }

    /// Bytes of user data that fit in a sector after fr32 padding (127 of every 128 bytes).
    #[must_use]
    pub const fn unpadded_space(self) -> u64 {
        let size = self.sector_size();
        size - size / 128
    }

    /// Parse a short label (`2K`, `8m`, ` 512M `, ...). Case-insensitive.
    #[must_use]
    pub fn from_label(input: &str) -> Option<Self> {
        let wanted = input.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|t| t.label() == wanted)
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sector_size_label())
    }
}

/// What a [`Cid`] commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentKind {
    /// A single piece (CommP).
    Piece,
    /// The unsealed sector data (CommD).
    Unsealed,
    /// The sealed replica (CommR).
    Sealed,
}

impl CommitmentKind {
    const fn prefix(self) -> &'static str {
        match self {
            Self::Piece => "commp",
            Self::Unsealed => "commd",
            Self::Sealed => "commr",
        }
    }
}

/// Content identifier of a sector commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cid {
    /// Commitment codec.
    pub kind: CommitmentKind,
    /// 32-byte digest.
    #[serde(with = "hexser::array")]
    pub digest: [u8; 32],
}

impl Cid {
    /// Construct a new CID.
    #[inline]
    #[must_use]
    pub const fn new(kind: CommitmentKind, digest: [u8; 32]) -> Self {
        Self { kind, digest }
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), hex::encode(self.digest))
    }
}

/// Metadata of one piece packed into a sector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceInfo {
    /// Padded piece size in bytes (power of two).
    pub size: u64,
    /// Piece commitment.
    pub piece_cid: Cid,
}

/// A miner's commitment to a sealed sector.
///
/// Immutable once produced; only meaningful together with the [`Challenge`]
/// later derived from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Random id; also the sealing ticket and first randomness input to verification.
    pub id: StatementId,
    /// Sector number the statement covers.
    pub sector_number: SectorNumber,
    /// Declared proof parameters.
    pub proof_type: ProofType,
    /// Commitment to the sealed replica.
    pub sealed_cid: Cid,
    /// Commitment to the unsealed data.
    pub unsealed_cid: Cid,
    /// Pieces the sector was built from, in packing order.
    pub pieces: Vec<PieceInfo>,
    /// Owning miner.
    pub miner_id: ActorId,
}

impl Statement {
    /// Structural checks applied before a validator accepts a statement.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidStatement`] naming the first failed check.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let reject = |why: String| Err(ProtocolError::InvalidStatement(why));

        if self.id.is_zero() {
            return reject("statement id is all zeroes".into());
        }
        if self.sealed_cid.kind != CommitmentKind::Sealed {
            return reject(format!("sealed CID has kind {:?}", self.sealed_cid.kind));
        }
        if self.unsealed_cid.kind != CommitmentKind::Unsealed {
            return reject(format!("unsealed CID has kind {:?}", self.unsealed_cid.kind));
        }
        if self.pieces.is_empty() {
            return reject("statement lists no pieces".into());
        }

        let mut total: u64 = 0;
        for (i, p) in self.pieces.iter().enumerate() {
            if p.piece_cid.kind != CommitmentKind::Piece {
                return reject(format!("piece {i} has CID kind {:?}", p.piece_cid.kind));
            }
            if p.size < MIN_PIECE_SIZE || !p.size.is_power_of_two() {
                return reject(format!("piece {i} has invalid padded size {}", p.size));
            }
            total = total.saturating_add(p.size);
        }
        if total > self.proof_type.sector_size() {
            return reject(format!(
                "pieces occupy {total} bytes, sector holds {}",
                self.proof_type.sector_size()
            ));
        }
        Ok(())
    }
}

/// Validator-issued randomness bound to one statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Back-reference to the challenged statement.
    pub statement_id: StatementId,
    /// Fresh interactive randomness.
    pub content: InteractiveRandomness,
}

impl Challenge {
    /// Construct a challenge for `statement_id`.
    #[inline]
    #[must_use]
    pub const fn new(statement_id: StatementId, content: InteractiveRandomness) -> Self {
        Self {
            statement_id,
            content,
        }
    }
}

/// Opaque proof bytes answering a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Backend-defined encoding.
    #[serde(with = "hexser::bytes")]
    pub content: Vec<u8>,
}

impl Proof {
    /// Wrap proof bytes.
    #[inline]
    #[must_use]
    pub const fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    /// Proof bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    /// Length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the proof is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
