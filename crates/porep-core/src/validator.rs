//! The verifying party's protocol state machine.
//!
//! ```text
//! Empty --handle_statement--> Committed --generate_challenge--> Challenged --verify_proof--> Verified
//!                                               ^                    |
//!                                               +-- (replaces) ------+
//! ```
//!
//! ## Invariants
//! - A challenge is only generated while a statement is held, and its
//!   `statement_id` equals that statement's id.
//! - Challenge content is 32 bytes read from a secure source; a failed read is
//!   an error, never a fallback to weaker randomness.
//! - Generating a second challenge replaces the first; the old one is gone.
//! - `Verified` is terminal for the run.

use crate::backend::{SealVerifier, SealVerifyInfo};
use crate::error::ProtocolError;
use crate::keeper::Keeper;
use crate::types::{ActorId, Challenge, InteractiveRandomness, Proof, Statement, RANDOMNESS_LEN};
use rand::rngs::OsRng;
use rand::{TryCryptoRng, TryRngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Observable protocol state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidatorState {
    /// No statement yet.
    Empty,
    /// Statement held, no challenge.
    Committed,
    /// Challenge issued, proof pending.
    Challenged,
    /// Proof checked; `valid` is the outcome.
    Verified {
        /// Verification result.
        valid: bool,
    },
}

/// Full verifier-side state for one benchmark run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    keeper: Keeper,
    #[serde(default)]
    outcome: Option<bool>,
    #[serde(default)]
    pledges: BTreeSet<ActorId>,
}

impl Validator {
    /// Fresh validator in [`ValidatorState::Empty`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the statement/challenge register.
    #[must_use]
    pub const fn keeper(&self) -> &Keeper {
        &self.keeper
    }

    /// Current statement, if any.
    #[must_use]
    pub const fn statement(&self) -> Option<&Statement> {
        self.keeper.statement()
    }

    /// Current challenge, if any.
    #[must_use]
    pub const fn challenge(&self) -> Option<&Challenge> {
        self.keeper.challenge()
    }

    /// Recorded verification outcome, once verified.
    #[must_use]
    pub const fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    /// Derive the state from the register contents.
    #[must_use]
    pub fn state(&self) -> ValidatorState {
        match (self.keeper.statement(), self.keeper.challenge(), self.outcome) {
            (_, _, Some(valid)) => ValidatorState::Verified { valid },
            (Some(_), Some(_), None) => ValidatorState::Challenged,
            (Some(_), None, None) => ValidatorState::Committed,
            (None, _, None) => ValidatorState::Empty,
        }
    }

    /// Record a miner's pledge. Returns `false` if it had already pledged.
    pub fn register_pledge(&mut self, miner: ActorId) -> bool {
        let fresh = self.pledges.insert(miner);
        debug!(miner, fresh, "miner pledged");
        fresh
    }

    /// Whether `miner` has pledged to this validator.
    #[must_use]
    pub fn is_pledged(&self, miner: ActorId) -> bool {
        self.pledges.contains(&miner)
    }

    /// Accept a statement (`Empty → Committed`).
    ///
    /// The statement is checked structurally; its cryptographic content is
    /// trusted to the backend that produced it. Any challenge bound to a
    /// previously held statement is dropped.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidStatement`] on a malformed statement,
    /// [`ProtocolError::AlreadyVerified`] once the run is terminal.
    pub fn handle_statement(&mut self, st: Statement) -> Result<(), ProtocolError> {
        if self.outcome.is_some() {
            return Err(ProtocolError::AlreadyVerified {
                op: "handle_statement",
            });
        }
        st.validate()?;

        if let Some(stale) = self.keeper.clear_challenge() {
            debug!(statement = %stale.statement_id, "dropping challenge of replaced statement");
        }
        info!(
            statement = %st.id,
            sector = st.sector_number,
            miner = st.miner_id,
            proof_type = %st.proof_type,
            "statement committed"
        );
        self.keeper.set_statement(st);
        Ok(())
    }

    /// Issue a challenge from the operating system's secure random source
    /// (`Committed → Challenged`).
    ///
    /// # Errors
    /// See [`Self::generate_challenge_with`].
    pub fn generate_challenge(&mut self) -> Result<&Challenge, ProtocolError> {
        self.generate_challenge_with(&mut OsRng)
    }

    /// Issue a challenge drawing randomness from `rng`.
    ///
    /// # Errors
    /// - [`ProtocolError::MissingStatement`] if no statement is held,
    /// - [`ProtocolError::AlreadyVerified`] once the run is terminal,
    /// - [`ProtocolError::Entropy`] if `rng` fails.
    pub fn generate_challenge_with<R>(&mut self, rng: &mut R) -> Result<&Challenge, ProtocolError>
    where
        R: TryRngCore + TryCryptoRng + ?Sized,
    {
        const OP: &str = "generate_challenge";
        if self.outcome.is_some() {
            return Err(ProtocolError::AlreadyVerified { op: OP });
        }
        let statement_id = self
            .keeper
            .statement()
            .ok_or(ProtocolError::MissingStatement { op: OP })?
            .id;

        let mut content = [0u8; RANDOMNESS_LEN];
        rng.try_fill_bytes(&mut content)
            .map_err(|e| ProtocolError::Entropy(e.to_string()))?;

        if let Some(prev) = self.keeper.challenge() {
            warn!(
                statement = %prev.statement_id,
                "replacing live challenge; the previous one cannot be recovered"
            );
        }
        let chal = self
            .keeper
            .set_challenge(Challenge::new(statement_id, InteractiveRandomness(content)));
        info!(statement = %chal.statement_id, challenge = %chal.content, "challenge generated");
        Ok(chal)
    }

    /// Check `proof` against the held statement and challenge
    /// (`Challenged → Verified`).
    ///
    /// Returns the backend's verdict; `Ok(false)` is a rejected proof and is
    /// recorded as the run's outcome. A backend error leaves the state at
    /// `Challenged`.
    ///
    /// # Errors
    /// Precondition violations when no statement/challenge is held, the
    /// challenge is bound to another statement, or the run is already
    /// verified; [`ProtocolError::Backend`] when verification cannot run.
    pub fn verify_proof<V: SealVerifier>(&mut self, proof: &Proof) -> Result<bool, ProtocolError> {
        const OP: &str = "verify_proof";
        if self.outcome.is_some() {
            return Err(ProtocolError::AlreadyVerified { op: OP });
        }
        let st = self
            .keeper
            .statement()
            .ok_or(ProtocolError::MissingStatement { op: OP })?;
        let chal = self
            .keeper
            .challenge()
            .ok_or(ProtocolError::MissingChallenge { op: OP })?;
        if chal.statement_id != st.id {
            return Err(ProtocolError::ChallengeMismatch {
                op: OP,
                statement: st.id,
                challenge: chal.statement_id,
            });
        }

        let info = SealVerifyInfo {
            miner_id: st.miner_id,
            sector_number: st.sector_number,
            proof_type: st.proof_type,
            sealed_cid: &st.sealed_cid,
            unsealed_cid: &st.unsealed_cid,
            randomness: &st.id,
            interactive_randomness: &chal.content,
            proof: proof.bytes(),
        };
        let valid = V::verify_seal(&info)?;

        info!(statement = %st.id, valid, proof_len = proof.len(), "proof verified");
        self.outcome = Some(valid);
        Ok(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::types::{Cid, CommitmentKind, PieceInfo, ProofType, StatementId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Accepts proofs equal to the challenge content.
    struct EchoVerifier;
    impl SealVerifier for EchoVerifier {
        fn verify_seal(info: &SealVerifyInfo<'_>) -> Result<bool, BackendError> {
            Ok(info.proof == info.interactive_randomness.as_bytes())
        }
    }

    struct BrokenVerifier;
    impl SealVerifier for BrokenVerifier {
        fn verify_seal(_: &SealVerifyInfo<'_>) -> Result<bool, BackendError> {
            Err(BackendError::Internal("parameters missing".into()))
        }
    }

    /// Secure source whose every read fails.
    struct ClosedRng;
    impl TryRngCore for ClosedRng {
        type Error = std::io::Error;
        fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
            Err(std::io::Error::other("entropy source closed"))
        }
        fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
            Err(std::io::Error::other("entropy source closed"))
        }
        fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), Self::Error> {
            Err(std::io::Error::other("entropy source closed"))
        }
    }
    impl TryCryptoRng for ClosedRng {}

    fn statement(tag: u8) -> Statement {
        Statement {
            id: StatementId::new([tag; 32]),
            sector_number: u64::from(tag),
            proof_type: ProofType::StackedDrg2KiBV1,
            sealed_cid: Cid::new(CommitmentKind::Sealed, [1u8; 32]),
            unsealed_cid: Cid::new(CommitmentKind::Unsealed, [2u8; 32]),
            pieces: vec![PieceInfo {
                size: 2048,
                piece_cid: Cid::new(CommitmentKind::Piece, [3u8; 32]),
            }],
            miner_id: 1000,
        }
    }

    fn challenged() -> Validator {
        let mut v = Validator::new();
        v.handle_statement(statement(9)).unwrap();
        v.generate_challenge_with(&mut StdRng::seed_from_u64(1)).unwrap();
        v
    }

    #[test]
    fn happy_path_walks_every_state() {
        let mut v = Validator::new();
        assert_eq!(v.state(), ValidatorState::Empty);

        v.handle_statement(statement(9)).unwrap();
        assert_eq!(v.state(), ValidatorState::Committed);

        let chal = *v.generate_challenge().unwrap();
        assert_eq!(chal.statement_id, StatementId::new([9u8; 32]));
        assert_eq!(v.state(), ValidatorState::Challenged);

        let proof = Proof::new(chal.content.0.to_vec());
        assert!(v.verify_proof::<EchoVerifier>(&proof).unwrap());
        assert_eq!(v.state(), ValidatorState::Verified { valid: true });
    }

    #[test]
    fn challenge_without_statement_is_a_precondition_violation() {
        let mut v = Validator::new();
        let err = v.generate_challenge().unwrap_err();
        assert!(matches!(err, ProtocolError::MissingStatement { .. }));
        assert!(err.is_precondition());
        assert!(v.challenge().is_none());
    }

    #[test]
    fn verify_without_challenge_is_a_precondition_violation() {
        let mut v = Validator::new();
        v.handle_statement(statement(9)).unwrap();
        let err = v.verify_proof::<EchoVerifier>(&Proof::new(vec![])).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingChallenge { .. }));
        assert!(err.is_precondition());
        assert_eq!(v.state(), ValidatorState::Committed);
    }

    #[test]
    fn entropy_failure_issues_no_challenge() {
        let mut v = Validator::new();
        v.handle_statement(statement(9)).unwrap();
        let err = v.generate_challenge_with(&mut ClosedRng).unwrap_err();
        assert!(matches!(&err, ProtocolError::Entropy(msg) if msg.contains("closed")));
        assert!(!err.is_precondition());
        assert!(v.challenge().is_none());
        assert_eq!(v.state(), ValidatorState::Committed);
    }

    #[test]
    fn entropy_failure_keeps_the_live_challenge() {
        let mut v = challenged();
        let live = *v.challenge().unwrap();
        assert!(matches!(
            v.generate_challenge_with(&mut ClosedRng),
            Err(ProtocolError::Entropy(_))
        ));
        assert_eq!(v.challenge(), Some(&live));
    }

    #[test]
    fn rejected_proof_and_backend_failure_are_distinct() {
        let mut v = challenged();
        let err = v.verify_proof::<BrokenVerifier>(&Proof::new(vec![1])).unwrap_err();
        assert!(matches!(err, ProtocolError::Backend(_)));
        assert!(!err.is_precondition());
        assert_eq!(v.state(), ValidatorState::Challenged);

        assert!(!v.verify_proof::<EchoVerifier>(&Proof::new(vec![1])).unwrap());
        assert_eq!(v.state(), ValidatorState::Verified { valid: false });
    }

    #[test]
    fn verified_is_terminal() {
        let mut v = challenged();
        let content = v.challenge().unwrap().content.0.to_vec();
        v.verify_proof::<EchoVerifier>(&Proof::new(content.clone())).unwrap();

        assert!(matches!(
            v.generate_challenge(),
            Err(ProtocolError::AlreadyVerified { .. })
        ));
        assert!(matches!(
            v.verify_proof::<EchoVerifier>(&Proof::new(content)),
            Err(ProtocolError::AlreadyVerified { .. })
        ));
        assert!(v.handle_statement(statement(4)).is_err());
    }

    #[test]
    fn second_challenge_replaces_first() {
        let mut v = challenged();
        let first = *v.challenge().unwrap();
        let second = *v
            .generate_challenge_with(&mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_ne!(first.content, second.content);
        assert_eq!(v.challenge(), Some(&second));
        assert_eq!(v.state(), ValidatorState::Challenged);
    }

    #[test]
    fn new_statement_drops_stale_challenge() {
        let mut v = challenged();
        v.handle_statement(statement(5)).unwrap();
        assert_eq!(v.state(), ValidatorState::Committed);
        assert_eq!(v.statement().map(|s| s.id), Some(StatementId::new([5u8; 32])));
    }

    #[test]
    fn invalid_statement_leaves_state_untouched() {
        let mut v = Validator::new();
        let mut bad = statement(9);
        bad.pieces.clear();
        assert!(matches!(
            v.handle_statement(bad),
            Err(ProtocolError::InvalidStatement(_))
        ));
        assert_eq!(v.state(), ValidatorState::Empty);
    }

    #[test]
    fn pledges_are_recorded_once() {
        let mut v = Validator::new();
        assert!(v.register_pledge(42));
        assert!(!v.register_pledge(42));
        assert!(v.is_pledged(42));
        assert!(!v.is_pledged(7));
    }

    #[test]
    fn serde_roundtrip_keeps_statement() {
        let mut v = Validator::new();
        v.register_pledge(1000);
        v.handle_statement(statement(9)).unwrap();

        let json = serde_json::to_vec(&v).unwrap();
        let back: Validator = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, v);
        assert_eq!(back.state(), ValidatorState::Committed);
    }
}
