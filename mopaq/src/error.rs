//! Error types for MPQ archive operations

use std::io;
use std::path::PathBuf;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading, writing, or manipulating MPQ archives
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with a recognizable MPQ or user-data signature
    #[error("not an MPQ archive: {0}")]
    NotAnArchive(String),

    /// The header, or one of its tables, failed a structural check
    #[error("invalid MPQ format: {0}")]
    InvalidFormat(String),

    /// `format_version` in the header did not map to a known `FormatVersion`
    #[error("unsupported MPQ format version: {0}")]
    UnsupportedVersion(u16),

    /// A table's size failed validation (e.g. hash table size not a power of two)
    #[error("hash table error: {0}")]
    HashTable(String),

    /// A block table entry or sector failed validation
    #[error("block table error: {0}")]
    BlockTable(String),

    /// A sector failed to compress, decompress, or failed its CRC check
    #[error("compression error: {0}")]
    Compression(String),

    /// Decryption was attempted without (or with the wrong) key
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The requested file is not present in the archive
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// `Add` was called without `overwrite` for a name that already exists
    #[error("file already exists in archive: {0}")]
    FileExists(String),

    /// No free slot was found while inserting into the hash table
    #[error("hash table is full, no space for new entry")]
    NoHashTableSpace,

    /// A locale string did not match the closed locale table and was not 4 hex digits
    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    /// An `info`/`list -p` property name was not recognized
    #[error("unknown property: {0}")]
    UnknownProperty(String),

    /// A path given by the caller does not exist
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// Archive or trailer signature failed verification
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The archive carries no signature of the requested kind
    #[error("archive has no signature")]
    NoSignature,

    /// A game profile name was not recognized
    #[error("unknown game profile: {0}")]
    UnknownGameProfile(String),
}

impl Error {
    /// Construct an [`Error::InvalidFormat`] from anything displayable
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Error::InvalidFormat(msg.into())
    }

    /// Construct an [`Error::HashTable`] from anything displayable
    pub fn hash_table(msg: impl Into<String>) -> Self {
        Error::HashTable(msg.into())
    }

    /// Construct an [`Error::BlockTable`] from anything displayable
    pub fn block_table(msg: impl Into<String>) -> Self {
        Error::BlockTable(msg.into())
    }

    /// Construct an [`Error::Compression`] from anything displayable
    pub fn compression(msg: impl Into<String>) -> Self {
        Error::Compression(msg.into())
    }

    /// Construct an [`Error::Decryption`] from anything displayable
    pub fn decryption(msg: impl Into<String>) -> Self {
        Error::Decryption(msg.into())
    }
}
