//! porep-core: statement/challenge/proof data model and the validator state machine.
//!
//! This crate is the **stable boundary** shared by the miner, the persistent
//! store and the benchmark driver:
//! - protocol value objects ([`Statement`], [`Challenge`], [`Proof`], [`ProofType`], ...),
//! - the [`Keeper`] register and the [`Validator`] state machine,
//! - the [`SealVerifier`] seam to the external verification routine, and
//! - the [`ProtocolError`] taxonomy.
//!
//! ```no_run
//! use porep_core::prelude::*;
//! # struct Backend;
//! # impl SealVerifier for Backend {
//! #   fn verify_seal(_: &SealVerifyInfo<'_>) -> Result<bool, BackendError> { unimplemented!() }
//! # }
//! # fn run(statement: Statement, answer: impl Fn(&Challenge) -> Proof) -> Result<(), ProtocolError> {
//! let mut validator = Validator::new();
//! validator.handle_statement(statement)?;
//! let challenge = *validator.generate_challenge()?;
//! let valid = validator.verify_proof::<Backend>(&answer(&challenge))?;
//! # let _ = valid;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::doc_markdown
)]

/// Seam to the external seal-verification routine.
pub mod backend;
/// Protocol error taxonomy.
pub mod error;
/// Serde adapters rendering binary ids as hex.
pub mod hexser;
/// Two-slot statement/challenge register.
pub mod keeper;
/// Protocol value objects.
pub mod types;
/// Validator state machine.
pub mod validator;

pub use backend::*;
pub use error::*;
pub use keeper::*;
pub use types::*;
pub use validator::*;

/// Commonly-used items for quick imports.
///
/// ```rust
/// use porep_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        backend::{BackendError, SealVerifier, SealVerifyInfo},
        error::ProtocolError,
        types::*,
        validator::{Validator, ValidatorState},
    };
}
