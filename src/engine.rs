//! The lookup engine boundary.
//!
//! The trie search over the on-disk database, the file opening and the
//! memory mapping all live in an external native engine. This module pins
//! down that boundary as a trait so the rest of the crate is engine-agnostic:
//! the `native` module binds the real engine, and tests drive the same
//! pipeline with scripted engines.

use crate::entry_data::EntryDataList;
use crate::error::{DecodeError, LookupError, OpenError};
use std::net::IpAddr;
use std::path::Path;

/// How the engine opens a database file.
///
/// Discriminants are the engine's native mode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum OpenMode {
    /// Map the database file into memory.
    MemoryMap = 1,
    /// The engine's full mode mask.
    Mask = 7,
}

/// Result of a search, prior to materializing the matched record.
#[derive(Debug, Clone)]
pub struct LookupOutcome<R> {
    /// The matched entry, or `None` when the address has no record.
    pub entry: Option<R>,
    /// Prefix length of the matched network; 0 when nothing matched.
    pub prefix_len: u16,
}

/// An external lookup engine.
///
/// Implementations translate their native status codes into the crate's
/// error types and hand flattened records back as owned [`EntryDataList`]s;
/// any native allocation backing a record is released before the call
/// returns, on success and on error alike.
pub trait Engine {
    /// Open database handle.
    ///
    /// Immutable after construction and safe for concurrent read-only use
    /// from any number of threads. Released exactly once, when dropped.
    type Handle: Send + Sync;

    /// Opaque reference to a matched record, valid against the handle that
    /// produced it.
    type EntryRef;

    /// Open the database at `path`.
    fn open(path: &Path, mode: OpenMode) -> Result<Self::Handle, OpenError>;

    /// The engine's version string.
    fn version() -> String;

    /// Search for the address given as text.
    ///
    /// Address-family resolution is the engine's (or the platform
    /// resolver's) job; resolution failures are reported as
    /// [`LookupError::AddressResolution`], search failures as
    /// [`LookupError::Engine`].
    fn lookup_text(
        handle: &Self::Handle,
        address: &str,
    ) -> Result<LookupOutcome<Self::EntryRef>, LookupError>;

    /// Search for an already-resolved address, skipping text resolution.
    fn lookup_addr(
        handle: &Self::Handle,
        address: IpAddr,
    ) -> Result<LookupOutcome<Self::EntryRef>, LookupError>;

    /// Materialize a matched entry into its flattened node list.
    fn entry_data_list(
        handle: &Self::Handle,
        entry: Self::EntryRef,
    ) -> Result<EntryDataList, DecodeError>;
}
