use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the record store and the snapshot layer above it.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading, writing or renaming the image failed.
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),
    /// The image does not start with the store magic.
    #[error("invalid magic bytes in {}", .0.display())]
    InvalidMagic(PathBuf),
    /// The image was written by an incompatible format version.
    #[error("unsupported store format version {0}")]
    UnsupportedVersion(u32),
    /// The trailing digest does not cover the image body.
    #[error("checksum mismatch in {}", .0.display())]
    ChecksumMismatch(PathBuf),
    /// The image ends before a declared field.
    #[error("store file truncated: {0}")]
    Truncated(String),
    /// A singleton record the caller needs is absent.
    #[error("missing {0} record (has phase 1 been run against this store?)")]
    MissingRecord(&'static str),
    /// A key in a per-item namespace has the wrong length.
    #[error("malformed {namespace} key of {len} bytes")]
    InvalidKey {
        /// Namespace the key was found in.
        namespace: &'static str,
        /// Full key length, prefix included.
        len: usize,
    },
    /// A key or value is too long for its 32-bit length prefix.
    #[error("{what} of {len} bytes does not fit a 32-bit length prefix")]
    RecordTooLarge {
        /// `"key"` or `"value"`.
        what: &'static str,
        /// Offending length.
        len: usize,
    },
    /// A record could not be serialized or parsed.
    #[error("encoding or decoding {what}: {reason}")]
    Codec {
        /// Record being processed.
        what: String,
        /// Underlying codec message.
        reason: String,
    },
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
