// crates/porep-seal/src/lib.rs

//! porep-seal: the proving side of the benchmark.
//!
//! - [`Miner`]: pledge, sector directory setup, piece assembly, statement
//!   commit and challenge response.
//! - [`MockSeal`]: transparent, deterministic stand-in for the sealing and
//!   verification backend; implements [`porep_core::SealVerifier`].
//! - [`synthetic`]: random piece data sized to a proof type.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

/// Miner role and its bookkeeping.
pub mod miner;
/// Mock sealing/proving backend.
pub mod mock;
/// Sector layout and file ids.
pub mod sector;
/// Synthetic input data.
pub mod synthetic;

pub use miner::{Miner, MinerStorage, SealedSector};
pub use mock::{MockSeal, PROOF_LEN};
pub use sector::{FileId, FileRole, SectorPaths, FILE_ID_LEN};
