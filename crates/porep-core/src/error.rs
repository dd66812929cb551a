//! Error taxonomy of the protocol state machine.
//!
//! Two classes matter to callers: precondition violations (a driver asked for
//! a transition the current state does not allow) and everything else.
//! A rejected proof is not an error at all; see [`crate::Validator::verify_proof`].

use crate::backend::BackendError;
use crate::types::StatementId;
use thiserror::Error;

/// Failures raised by [`crate::Validator`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The operation needs a committed statement and none is present.
    #[error("{op}: no statement has been committed to the validator")]
    MissingStatement {
        /// Operation that was attempted.
        op: &'static str,
    },
    /// The operation needs a live challenge and none is present.
    #[error("{op}: no challenge has been generated for the committed statement")]
    MissingChallenge {
        /// Operation that was attempted.
        op: &'static str,
    },
    /// The live challenge references a different statement than the one held.
    #[error("{op}: challenge references statement {challenge}, validator holds {statement}")]
    ChallengeMismatch {
        /// Operation that was attempted.
        op: &'static str,
        /// Statement currently held.
        statement: StatementId,
        /// Statement the challenge points at.
        challenge: StatementId,
    },
    /// The run already reached its terminal state.
    #[error("{op}: the protocol run has already been verified")]
    AlreadyVerified {
        /// Operation that was attempted.
        op: &'static str,
    },
    /// A statement failed structural validation.
    #[error("statement rejected: {0}")]
    InvalidStatement(String),
    /// The secure random source could not be read.
    #[error("secure randomness unavailable: {0}")]
    Entropy(String),
    /// The verification backend could not complete.
    #[error("verification backend failed")]
    Backend(#[from] BackendError),
}

impl ProtocolError {
    /// `true` for state-machine misuse (a driver bug rather than a data condition).
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::MissingStatement { .. }
                | Self::MissingChallenge { .. }
                | Self::ChallengeMismatch { .. }
                | Self::AlreadyVerified { .. }
        )
    }
}
