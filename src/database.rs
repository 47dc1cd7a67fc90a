//! Database façade.
//!
//! [`Database`] owns an engine handle for its whole life and strings the
//! pipeline together: engine lookup, entry materialization, record decode.
//! It is the only place the two halves meet; callers that need the matched
//! network's prefix length can run the halves separately via
//! [`lookup_outcome`](Database::lookup_outcome) and
//! [`decode_outcome`](Database::decode_outcome).

use crate::data_value::DataValue;
use crate::decoder::Decoder;
use crate::engine::{Engine, LookupOutcome, OpenMode};
use crate::error::{Error, LookupError, OpenError};
use std::net::IpAddr;
use std::path::Path;

/// An open database.
///
/// The underlying handle is immutable after open, so a `Database` can serve
/// any number of concurrent lookups from multiple threads without locking.
///
/// With the `native` feature enabled, `Database<Native>` queries the real
/// engine:
///
/// ```ignore
/// use mmdb_client::{Database, Native, OpenMode};
///
/// let db = Database::<Native>::open("GeoLite2-Country.mmdb", OpenMode::MemoryMap)?;
/// if let Some(record) = db.lookup("89.160.20.112")? {
///     println!("{}", record.to_json());
/// }
/// ```
pub struct Database<E: Engine> {
    handle: E::Handle,
    decoder: Decoder,
}

impl<E: Engine> Database<E> {
    /// Open the database file at `path`.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self, OpenError> {
        let handle = E::open(path.as_ref(), mode)?;
        Ok(Self::from_handle(handle))
    }

    /// Wrap an already-open engine handle (primarily for testing engines
    /// whose handles are constructed elsewhere).
    pub fn from_handle(handle: E::Handle) -> Self {
        Self {
            handle,
            decoder: Decoder::new(),
        }
    }

    /// Override the decoder's nesting bound.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.decoder = Decoder::with_max_depth(depth);
        self
    }

    /// The engine's version string.
    pub fn version() -> String {
        E::version()
    }

    /// Look up an IP address given as text.
    ///
    /// Returns `Ok(None)` when the database has no record for the address.
    pub fn lookup(&self, address: &str) -> Result<Option<DataValue>, Error> {
        let outcome = E::lookup_text(&self.handle, address)?;
        self.decode_outcome(outcome)
    }

    /// Look up an already-resolved address, skipping text resolution.
    pub fn lookup_addr(&self, address: IpAddr) -> Result<Option<DataValue>, Error> {
        let outcome = E::lookup_addr(&self.handle, address)?;
        self.decode_outcome(outcome)
    }

    /// Run only the search half of the pipeline.
    ///
    /// The outcome carries the matched network's prefix length and can be
    /// fed to [`decode_outcome`](Self::decode_outcome).
    pub fn lookup_outcome(
        &self,
        address: &str,
    ) -> Result<LookupOutcome<E::EntryRef>, LookupError> {
        E::lookup_text(&self.handle, address)
    }

    /// Decode a search outcome into a record value.
    ///
    /// A missed lookup short-circuits to `Ok(None)`; the entry is never
    /// materialized. On a hit, the materialized node list is owned by this
    /// call alone and released before it returns, whatever the result.
    pub fn decode_outcome(
        &self,
        outcome: LookupOutcome<E::EntryRef>,
    ) -> Result<Option<DataValue>, Error> {
        let entry = match outcome.entry {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let list = E::entry_data_list(&self.handle, entry).map_err(Error::Decode)?;
        self.decoder.decode_list(list).map_err(Error::Decode)
    }

    /// Release the database handle.
    ///
    /// Equivalent to dropping the value; provided for callers that want the
    /// release to be visible in the code.
    pub fn close(self) {}
}
