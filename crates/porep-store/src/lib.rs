// crates/porep-store/src/lib.rs

//! porep-store: persistence between the benchmark's two phases.
//!
//! [`kv`] provides an ordered byte-keyed store with an atomic, checksummed
//! on-disk image; [`snapshot`] maps the miner and validator onto it.
//!
//! ```no_run
//! use porep_store::{snapshot, FileStore, KvStore};
//! # fn main() -> Result<(), porep_store::StoreError> {
//! let mut store = FileStore::open("bench")?;
//! let inv = snapshot::inventory(&store)?;
//! println!("{inv:?}");
//! snapshot::clear(&mut store)?;
//! store.flush()?;
//! # Ok(()) }
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
pub mod kv;
pub mod snapshot;

pub use error::{Result, StoreError};
pub use kv::{FileStore, KvStore, MemStore, STORE_FILE};
pub use snapshot::{clear, inventory, restore, save, Inventory};
