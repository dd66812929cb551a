//! Two-slot register holding the validator's live statement and challenge.
//!
//! No validation happens here and nothing is kept as history: setting a slot
//! discards its previous value. Holds one statement-challenge-proof cycle.

use crate::types::{Challenge, Statement};
use serde::{Deserialize, Serialize};

/// Current statement and challenge of a validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keeper {
    #[serde(default)]
    statement: Option<Statement>,
    #[serde(default)]
    challenge: Option<Challenge>,
}

impl Keeper {
    /// Empty register.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            statement: None,
            challenge: None,
        }
    }

    /// Store `st`, replacing any previous statement.
    pub fn set_statement(&mut self, st: Statement) -> &Statement {
        self.statement.insert(st)
    }

    /// Current statement, if any.
    #[must_use]
    pub const fn statement(&self) -> Option<&Statement> {
        self.statement.as_ref()
    }

    /// Store `chal`, replacing any previous challenge.
    pub fn set_challenge(&mut self, chal: Challenge) -> &Challenge {
        self.challenge.insert(chal)
    }

    /// Current challenge, if any.
    #[must_use]
    pub const fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// Drop the current challenge.
    pub fn clear_challenge(&mut self) -> Option<Challenge> {
        self.challenge.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InteractiveRandomness, StatementId};

    #[test]
    fn empty_register_returns_none() {
        let k = Keeper::new();
        assert!(k.statement().is_none());
        assert!(k.challenge().is_none());
    }

    #[test]
    fn setting_a_challenge_overwrites() {
        let mut k = Keeper::new();
        let id = StatementId::new([1u8; 32]);
        k.set_challenge(Challenge::new(id, InteractiveRandomness([2u8; 32])));
        k.set_challenge(Challenge::new(id, InteractiveRandomness([3u8; 32])));
        assert_eq!(k.challenge().map(|c| c.content.0[0]), Some(3));
        assert!(k.clear_challenge().is_some());
        assert!(k.challenge().is_none());
    }
}
