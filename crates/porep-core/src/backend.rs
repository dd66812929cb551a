//! Seam to the external seal-verification routine.
//!
//! Implementors provide a *stateless* associated function, used as a type
//! parameter: `validator.verify_proof::<MockSeal>(&proof)`, so
//! [`crate::Validator`] never holds a backend handle.
//!
//! ## Contract
//! - `Ok(true)`: the proof is valid for exactly these inputs.
//! - `Ok(false)`: the proof was checked and rejected.
//! - `Err(_)`: the check could not be carried out (malformed inputs,
//!   unsupported parameters, internal failure). Never conflate with `Ok(false)`.

use crate::types::{ActorId, Cid, InteractiveRandomness, ProofType, SectorNumber, StatementId};
use thiserror::Error;

/// Everything the verification routine binds a proof to.
#[derive(Clone, Copy, Debug)]
pub struct SealVerifyInfo<'a> {
    /// Owning miner.
    pub miner_id: ActorId,
    /// Sector covered by the statement.
    pub sector_number: SectorNumber,
    /// Declared proof parameters.
    pub proof_type: ProofType,
    /// Commitment to the sealed replica.
    pub sealed_cid: &'a Cid,
    /// Commitment to the unsealed data.
    pub unsealed_cid: &'a Cid,
    /// First randomness input: the statement id.
    pub randomness: &'a StatementId,
    /// Second randomness input: the challenge content.
    pub interactive_randomness: &'a InteractiveRandomness,
    /// Proof bytes under test.
    pub proof: &'a [u8],
}

/// Failures of the verification computation itself.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Inputs are structurally unusable.
    #[error("malformed verification input: {0}")]
    Malformed(String),
    /// The backend has no parameters for this proof type.
    #[error("unsupported proof type {0:?}")]
    Unsupported(ProofType),
    /// Anything else that stopped the computation.
    #[error("internal backend failure: {0}")]
    Internal(String),
}

/// External seal verification.
pub trait SealVerifier {
    /// Check `info.proof` against the statement and challenge fields in `info`.
    ///
    /// # Errors
    /// Only when verification cannot be carried out; see the module docs.
    fn verify_seal(info: &SealVerifyInfo<'_>) -> Result<bool, BackendError>;
}
