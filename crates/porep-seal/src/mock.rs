// crates/porep-seal/src/mock.rs

//! Transparent stand-in for the sealing/proving backend.
//!
//! ⚠️ **Security note:** nothing here is a proof of replication. Commitments
//! are BLAKE3 digests and the "proof" is a keyed BLAKE3 transcript over the
//! statement and challenge. It exists so the commit/challenge/verify protocol
//! and its persistence can run end to end with realistic I/O costs (every
//! proof re-reads the sealed replica), not to resist a malicious prover.
//!
//! Pipeline:
//! 1. [`MockSeal::add_piece`]: stream a piece into the staged file, commit to it.
//! 2. [`MockSeal::unsealed_cid`]: commit to the ordered piece list (CommD).
//! 3. [`MockSeal::replica_id`] + [`MockSeal::seal`]: encode the staged data with a
//!    replica-specific keystream and commit to the result (CommR).
//! 4. [`MockSeal::prove`] / [`SealVerifier::verify_seal`]: bind CommR, CommD,
//!    the statement id and the interactive randomness into 192 proof bytes.

use anyhow::{ensure, Context, Result};
use blake3::Hasher;
use porep_core::{
    ActorId, BackendError, Cid, CommitmentKind, InteractiveRandomness, PieceInfo, ProofType,
    SealVerifier, SealVerifyInfo, SectorNumber, StatementId, MIN_PIECE_SIZE,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Length of a mock seal proof (matches a Groth16 PoRep proof).
pub const PROOF_LEN: usize = 192;

const PIECE_CTX: &str = "porep-bench mock-seal v1 piece commitment";
const UNSEALED_CTX: &str = "porep-bench mock-seal v1 unsealed commitment";
const REPLICA_CTX: &str = "porep-bench mock-seal v1 replica id";
const SEALED_CTX: &str = "porep-bench mock-seal v1 sealed commitment";
const PROOF_CTX: &str = "porep-bench mock-seal v1 proof";

const CHUNK: usize = 64 * 1024;

/// Mock backend; used as a type parameter (`verify_proof::<MockSeal>`).
#[derive(Clone, Copy, Debug, Default)]
pub struct MockSeal;

impl MockSeal {
    /// Padded size of a piece holding `unpadded` bytes: fr32 expansion
    /// (128 per 127), rounded up to a power of two, at least [`MIN_PIECE_SIZE`].
    #[must_use]
    pub fn padded_piece_size(unpadded: u64) -> u64 {
        let padded = unpadded.div_ceil(127) * 128;
        padded.max(MIN_PIECE_SIZE).next_power_of_two()
    }

    /// Copy `piece` into `staged` and return its piece metadata.
    pub fn add_piece<R: Read, W: Write>(mut piece: R, staged: &mut W) -> Result<PieceInfo> {
        let mut hasher = Hasher::new_derive_key(PIECE_CTX);
        let mut buf = vec![0u8; CHUNK];
        let mut len: u64 = 0;
        loop {
            let n = piece.read(&mut buf).context("reading piece")?;
            if n == 0 {
                break;
            }
            staged.write_all(&buf[..n]).context("writing staged sector")?;
            hasher.update(&buf[..n]);
            len += n as u64;
        }
        ensure!(len > 0, "empty piece");
        Ok(PieceInfo {
            size: Self::padded_piece_size(len),
            piece_cid: Cid::new(CommitmentKind::Piece, *hasher.finalize().as_bytes()),
        })
    }

    /// Commitment to the ordered piece list.
    #[must_use]
    pub fn unsealed_cid(pieces: &[PieceInfo]) -> Cid {
        let mut h = Hasher::new_derive_key(UNSEALED_CTX);
        h.update(&(pieces.len() as u64).to_le_bytes());
        for p in pieces {
            h.update(&p.size.to_le_bytes());
            h.update(&p.piece_cid.digest);
        }
        Cid::new(CommitmentKind::Unsealed, *h.finalize().as_bytes())
    }

    /// Replica id binding the sealed copy to its owner, sector, ticket and data.
    #[must_use]
    pub fn replica_id(
        miner: ActorId,
        sector: SectorNumber,
        ticket: &StatementId,
        nonce: u64,
        unsealed: &Cid,
        proof_type: ProofType,
    ) -> [u8; 32] {
        let mut h = Hasher::new_derive_key(REPLICA_CTX);
        h.update(&miner.to_le_bytes());
        h.update(&sector.to_le_bytes());
        h.update(ticket.as_bytes());
        h.update(&nonce.to_le_bytes());
        h.update(&unsealed.digest);
        h.update(&proof_type.sector_size().to_le_bytes());
        *h.finalize().as_bytes()
    }

    /// Encode `staged` into `sealed` under `replica_id` and return CommR.
    pub fn seal(staged: &Path, sealed: &Path, replica_id: &[u8; 32]) -> Result<Cid> {
        let src = File::open(staged).with_context(|| format!("open {}", staged.display()))?;
        let dst = File::create(sealed).with_context(|| format!("create {}", sealed.display()))?;
        let mut rdr = BufReader::new(src);
        let mut w = BufWriter::new(dst);

        let mut keystream = Hasher::new_keyed(replica_id).finalize_xof();
        let mut commit = Hasher::new_derive_key(SEALED_CTX);
        let mut buf = vec![0u8; CHUNK];
        let mut ks = vec![0u8; CHUNK];
        loop {
            let n = rdr.read(&mut buf).context("reading staged sector")?;
            if n == 0 {
                break;
            }
            keystream.fill(&mut ks[..n]);
            for (b, k) in buf[..n].iter_mut().zip(&ks[..n]) {
                *b ^= k;
            }
            w.write_all(&buf[..n]).context("writing sealed replica")?;
            commit.update(&buf[..n]);
        }
        w.flush()?;
        w.get_ref().sync_data()?;
        Ok(Cid::new(CommitmentKind::Sealed, *commit.finalize().as_bytes()))
    }

    /// Re-derive CommR from a replica on disk.
    pub fn digest_replica(sealed: &Path) -> Result<Cid> {
        let f = File::open(sealed).with_context(|| format!("open {}", sealed.display()))?;
        let mut h = Hasher::new_derive_key(SEALED_CTX);
        h.update_reader(BufReader::new(f))
            .with_context(|| format!("reading {}", sealed.display()))?;
        Ok(Cid::new(CommitmentKind::Sealed, *h.finalize().as_bytes()))
    }

    /// Proof bytes for a statement and challenge.
    #[must_use]
    pub fn prove(
        miner: ActorId,
        sector: SectorNumber,
        proof_type: ProofType,
        sealed: &Cid,
        unsealed: &Cid,
        randomness: &StatementId,
        interactive: &InteractiveRandomness,
    ) -> Vec<u8> {
        let mut h = Hasher::new_keyed(&sealed.digest);
        h.update(PROOF_CTX.as_bytes());
        h.update(&miner.to_le_bytes());
        h.update(&sector.to_le_bytes());
        h.update(&proof_type.sector_size().to_le_bytes());
        h.update(&unsealed.digest);
        h.update(randomness.as_bytes());
        h.update(interactive.as_bytes());
        let mut out = vec![0u8; PROOF_LEN];
        h.finalize_xof().fill(&mut out);
        out
    }
}

impl SealVerifier for MockSeal {
    fn verify_seal(info: &SealVerifyInfo<'_>) -> Result<bool, BackendError> {
        if info.sealed_cid.kind != CommitmentKind::Sealed {
            return Err(BackendError::Malformed(format!(
                "sealed CID {} is not a replica commitment",
                info.sealed_cid
            )));
        }
        if info.unsealed_cid.kind != CommitmentKind::Unsealed {
            return Err(BackendError::Malformed(format!(
                "unsealed CID {} is not a data commitment",
                info.unsealed_cid
            )));
        }
        if info.proof.len() != PROOF_LEN {
            return Ok(false);
        }
        let expected = Self::prove(
            info.miner_id,
            info.sector_number,
            info.proof_type,
            info.sealed_cid,
            info.unsealed_cid,
            info.randomness,
            info.interactive_randomness,
        );
        Ok(expected.as_slice() == info.proof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_sizes() {
        assert_eq!(MockSeal::padded_piece_size(1), 128);
        assert_eq!(MockSeal::padded_piece_size(127), 128);
        assert_eq!(MockSeal::padded_piece_size(128), 256);
        assert_eq!(MockSeal::padded_piece_size(2032), 2048);
        assert_eq!(
            MockSeal::padded_piece_size(ProofType::StackedDrg8MiBV1.unpadded_space()),
            8 << 20
        );
    }

    #[test]
    fn add_piece_copies_and_commits() {
        let data = vec![0xabu8; 300];
        let mut staged = Vec::new();
        let info = MockSeal::add_piece(&data[..], &mut staged).unwrap();
        assert_eq!(staged, data);
        assert_eq!(info.size, 512);
        assert_eq!(info.piece_cid.kind, CommitmentKind::Piece);

        let again = MockSeal::add_piece(&data[..], &mut Vec::<u8>::new()).unwrap();
        assert_eq!(again, info);
    }

    #[test]
    fn empty_piece_is_rejected() {
        assert!(MockSeal::add_piece(&b""[..], &mut Vec::<u8>::new()).is_err());
    }

    #[test]
    fn verify_rejects_short_proof_and_malformed_cids() {
        let sealed = Cid::new(CommitmentKind::Sealed, [1; 32]);
        let unsealed = Cid::new(CommitmentKind::Unsealed, [2; 32]);
        let ticket = StatementId::new([3; 32]);
        let chal = InteractiveRandomness([4; 32]);
        let mut info = SealVerifyInfo {
            miner_id: 1,
            sector_number: 0,
            proof_type: ProofType::StackedDrg2KiBV1,
            sealed_cid: &sealed,
            unsealed_cid: &unsealed,
            randomness: &ticket,
            interactive_randomness: &chal,
            proof: &[0u8; 10],
        };
        assert!(!MockSeal::verify_seal(&info).unwrap());

        info.unsealed_cid = &sealed;
        assert!(matches!(
            MockSeal::verify_seal(&info),
            Err(BackendError::Malformed(_))
        ));
    }
}
