//! mmdb-client - Typed Lookups Against MaxMind-Format IP Databases
//!
//! mmdb-client is a client library for MaxMind-format binary IP databases
//! (GeoIP country/city, anonymous-IP, ASN, and anything else the format
//! carries). The native lookup engine - libmaxminddb - owns the on-disk
//! search tree and the memory mapping; this crate owns everything typed on
//! top of it: the record decoder, the value tree, the engine boundary, and
//! the error taxonomy.
//!
//! # Quick Start - Decoding
//!
//! The heart of the crate is the decoder, which rebuilds a nested record
//! from the engine's flattened pre-order node list. It works on any list,
//! including synthetic ones:
//!
//! ```rust
//! use mmdb_client::{DataValue, Decoder, EntryData, EntryDataList};
//!
//! // {"country": {"iso_code": "US"}} flattened in pre-order
//! let list = EntryDataList::new(vec![
//!     EntryData::Map { count: 1 },
//!     EntryData::utf8("country"),
//!     EntryData::Map { count: 1 },
//!     EntryData::utf8("iso_code"),
//!     EntryData::utf8("US"),
//! ]);
//!
//! let record = Decoder::new().decode_list(list)?.expect("non-empty record");
//! let iso = record.lookup_path(&["country", "iso_code"]);
//! assert_eq!(iso.and_then(|v| v.as_str()), Some("US"));
//! # Ok::<(), mmdb_client::DecodeError>(())
//! ```
//!
//! # Quick Start - Database Lookups
//!
//! With the `native` feature enabled (requires libmaxminddb at link time),
//! [`Database`] runs the full pipeline against a real database file:
//!
//! ```ignore
//! use mmdb_client::{Database, Native, OpenMode};
//!
//! let db = Database::<Native>::open("GeoLite2-City.mmdb", OpenMode::MemoryMap)?;
//!
//! if let Some(record) = db.lookup("89.160.20.112")? {
//!     println!("{}", record.to_json());
//! }
//! ```
//!
//! # Key Properties
//!
//! - **Typed results**: records come back as a closed [`DataValue`] union,
//!   so matches are exhaustive and nothing is silently coerced
//! - **Strict decoding**: unknown tags, non-string map keys, bad UTF-8,
//!   truncated lists, and runaway nesting fail with typed errors
//! - **Deterministic release**: engine allocations are freed exactly once
//!   on every path, success or failure
//! - **Concurrent reads**: one open database serves lookups from any number
//!   of threads without locking
//! - **Engine-agnostic core**: the engine boundary is a trait; the decoder
//!   and facade are fully exercisable without the native library
//!
//! # Architecture
//!
//! ```text
//! caller
//!   |
//!   v
//! Database<E>           facade: handle lifecycle, error translation
//!   |
//!   v
//! Engine (trait)        native trie search, out of scope   <- libmaxminddb
//!   |
//!   v
//! EntryDataList         owned flattened pre-order record
//!   |
//!   v
//! Decoder               recursive reconstruction (the core)
//!   |
//!   v
//! DataValue             nested typed record value
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
/// Dynamic record values
pub mod data_value;
/// Database facade
pub mod database;
/// Record decoding
pub mod decoder;
/// Lookup engine boundary
pub mod engine;
/// Flattened entry data lists
pub mod entry_data;
/// Error types
pub mod error;
/// Native engine binding (libmaxminddb)
#[cfg(feature = "native")]
pub mod native;

// Re-exports for the common path

/// Decoded record value
pub use crate::data_value::DataValue;

/// Open database facade
pub use crate::database::Database;

pub use crate::decoder::{Decoder, DEFAULT_MAX_DEPTH};
pub use crate::engine::{Engine, LookupOutcome, OpenMode};
pub use crate::entry_data::{Cursor, EntryData, EntryDataList};
pub use crate::error::{DecodeError, Error, LookupError, OpenError};

#[cfg(feature = "native")]
pub use crate::native::Native;

/// A database backed by the native lookup engine.
#[cfg(feature = "native")]
pub type NativeDatabase = Database<Native>;

/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
