//! Native lookup engine binding (libmaxminddb).
//!
//! The [`ffi`] submodule declares the engine's C ABI; [`Native`] wraps it in
//! the crate's [`Engine`] contract. The handle is closed exactly once on
//! drop, and the engine-allocated entry data list is freed exactly once on
//! every path out of materialization, via a drop guard.
//!
//! Everything unsafe stays inside this module: lists cross the boundary as
//! owned [`EntryDataList`] values and status codes cross as typed errors
//! carrying the engine's own descriptions.

use crate::engine::{Engine, LookupOutcome, OpenMode};
use crate::entry_data::{EntryData, EntryDataList};
use crate::error::{DecodeError, LookupError, OpenError};
use std::ffi::{CStr, CString};
use std::mem;
use std::net::IpAddr;
use std::os::raw::c_int;
use std::path::Path;
use std::ptr;

/// Raw C ABI of the native engine.
#[allow(non_camel_case_types, non_snake_case)]
pub mod ffi {
    use std::os::raw::{c_char, c_int, c_void};

    /// Operation completed.
    pub const MMDB_SUCCESS: c_int = 0;
    /// The database file could not be opened.
    pub const MMDB_FILE_OPEN_ERROR: c_int = 1;
    /// The search tree is corrupt.
    pub const MMDB_CORRUPT_SEARCH_TREE_ERROR: c_int = 2;
    /// The database metadata is invalid.
    pub const MMDB_INVALID_METADATA_ERROR: c_int = 3;
    /// An I/O operation failed.
    pub const MMDB_IO_ERROR: c_int = 4;
    /// The engine ran out of memory.
    pub const MMDB_OUT_OF_MEMORY_ERROR: c_int = 5;
    /// The database format is unknown.
    pub const MMDB_UNKNOWN_DATABASE_FORMAT_ERROR: c_int = 6;
    /// The data section is invalid or corrupt.
    pub const MMDB_INVALID_DATA_ERROR: c_int = 7;
    /// A lookup path is invalid.
    pub const MMDB_INVALID_LOOKUP_PATH_ERROR: c_int = 8;
    /// A lookup path does not match the data.
    pub const MMDB_LOOKUP_PATH_DOES_NOT_MATCH_DATA_ERROR: c_int = 9;
    /// A node number is out of range.
    pub const MMDB_INVALID_NODE_NUMBER_ERROR: c_int = 10;
    /// IPv6 lookup against an IPv4-only database.
    pub const MMDB_IPV6_LOOKUP_IN_IPV4_DATABASE_ERROR: c_int = 11;

    /// Extended type marker.
    pub const MMDB_DATA_TYPE_EXTENDED: u32 = 0;
    /// Pointer into the data section (resolved by the engine before lists
    /// reach us).
    pub const MMDB_DATA_TYPE_POINTER: u32 = 1;
    /// UTF-8 string.
    pub const MMDB_DATA_TYPE_UTF8_STRING: u32 = 2;
    /// 64-bit float.
    pub const MMDB_DATA_TYPE_DOUBLE: u32 = 3;
    /// Raw bytes.
    pub const MMDB_DATA_TYPE_BYTES: u32 = 4;
    /// Unsigned 16-bit integer.
    pub const MMDB_DATA_TYPE_UINT16: u32 = 5;
    /// Unsigned 32-bit integer.
    pub const MMDB_DATA_TYPE_UINT32: u32 = 6;
    /// Map of key/value pairs.
    pub const MMDB_DATA_TYPE_MAP: u32 = 7;
    /// Signed 32-bit integer.
    pub const MMDB_DATA_TYPE_INT32: u32 = 8;
    /// Unsigned 64-bit integer.
    pub const MMDB_DATA_TYPE_UINT64: u32 = 9;
    /// Unsigned 128-bit integer.
    pub const MMDB_DATA_TYPE_UINT128: u32 = 10;
    /// Array of values.
    pub const MMDB_DATA_TYPE_ARRAY: u32 = 11;
    /// Data cache container (never appears in entry data lists).
    pub const MMDB_DATA_TYPE_CONTAINER: u32 = 12;
    /// End marker (never appears in entry data lists).
    pub const MMDB_DATA_TYPE_END_MARKER: u32 = 13;
    /// Boolean value.
    pub const MMDB_DATA_TYPE_BOOLEAN: u32 = 14;
    /// 32-bit float.
    pub const MMDB_DATA_TYPE_FLOAT: u32 = 15;

    /// IPv4 subtree start node cache.
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_ipv4_start_node_s {
        /// Netmask depth of the cached node.
        pub netmask: u16,
        /// Node number of the IPv4 subtree root.
        pub node_value: u32,
    }

    /// One localized database description.
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_description_s {
        /// Language code.
        pub language: *const c_char,
        /// Description text.
        pub description: *const c_char,
    }

    /// Language list of the metadata section.
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_metadata_languages_s {
        /// Number of languages.
        pub count: usize,
        /// Language name array.
        pub names: *mut *const c_char,
    }

    /// Description list of the metadata section.
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_metadata_description_list_s {
        /// Number of descriptions.
        pub count: usize,
        /// Description array.
        pub descriptions: *mut *mut MMDB_description_s,
    }

    /// Parsed database metadata.
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_metadata_s {
        /// Number of search tree nodes.
        pub node_count: u32,
        /// Record size in bits.
        pub record_size: u16,
        /// IP version the tree was built for.
        pub ip_version: u16,
        /// Database type name.
        pub database_type: *const c_char,
        /// Available record languages.
        pub languages: MMDB_metadata_languages_s,
        /// Binary format major version.
        pub binary_format_major_version: u16,
        /// Binary format minor version.
        pub binary_format_minor_version: u16,
        /// Build timestamp (seconds since the epoch).
        pub build_epoch: u64,
        /// Localized descriptions.
        pub description: MMDB_metadata_description_list_s,
    }

    /// An open database (`MMDB_s`). Filled by `MMDB_open`, released by
    /// `MMDB_close`.
    #[repr(C)]
    pub struct MMDB_s {
        /// Flags the database was opened with.
        pub flags: u32,
        /// Database file path.
        pub filename: *const c_char,
        /// Database file size.
        pub file_size: isize,
        /// Mapped file contents.
        pub file_content: *const u8,
        /// Start of the data section.
        pub data_section: *const u8,
        /// Data section size in bytes.
        pub data_section_size: u32,
        /// Start of the metadata section.
        pub metadata_section: *const u8,
        /// Metadata section size in bytes.
        pub metadata_section_size: u32,
        /// Bytes per search tree record pair.
        pub full_record_byte_size: u16,
        /// Search tree depth (32 or 128).
        pub depth: u16,
        /// Cached IPv4 subtree entry point.
        pub ipv4_start_node: MMDB_ipv4_start_node_s,
        /// Parsed metadata.
        pub metadata: MMDB_metadata_s,
    }

    /// Typed payload of one entry data node.
    ///
    /// `uint128` assumes an engine built with the native 128-bit integer
    /// mode (the mode the engine's own build configuration selects on
    /// mainstream toolchains).
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub union MMDB_entry_data_value_u {
        /// Data section offset.
        pub pointer: u32,
        /// String data; not NUL-terminated, `data_size` bytes long.
        pub utf8_string: *const c_char,
        /// 64-bit float value.
        pub double_value: f64,
        /// Byte data, `data_size` bytes long.
        pub bytes: *const u8,
        /// Unsigned 16-bit value.
        pub uint16: u16,
        /// Unsigned 32-bit value.
        pub uint32: u32,
        /// Signed 32-bit value.
        pub int32: i32,
        /// Unsigned 64-bit value.
        pub uint64: u64,
        /// Unsigned 128-bit value.
        pub uint128: u128,
        /// Boolean value.
        pub boolean: bool,
        /// 32-bit float value.
        pub float_value: f32,
    }

    /// One node of a materialized record (`MMDB_entry_data_s`).
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_entry_data_s {
        /// Whether the node holds data.
        pub has_data: bool,
        /// Typed payload, selected by `type_`.
        pub value: MMDB_entry_data_value_u,
        /// Offset of the node in the data section.
        pub offset: u32,
        /// Offset of the following node.
        pub offset_to_next: u32,
        /// Element count for containers, byte length for strings and bytes.
        pub data_size: u32,
        /// One of the `MMDB_DATA_TYPE_*` tags.
        pub type_: u32,
    }

    /// A matched record prior to materialization (`MMDB_entry_s`).
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_entry_s {
        /// Owning database.
        pub mmdb: *const MMDB_s,
        /// Record offset in the data section.
        pub offset: u32,
    }

    /// Search result (`MMDB_lookup_result_s`).
    #[repr(C)]
    #[derive(Copy, Clone)]
    pub struct MMDB_lookup_result_s {
        /// Whether the search matched a record.
        pub found_entry: bool,
        /// The matched entry; meaningful only when `found_entry` is true.
        pub entry: MMDB_entry_s,
        /// Prefix length of the matched network.
        pub netmask: u16,
    }

    /// Node of the engine-allocated entry data list
    /// (`MMDB_entry_data_list_s`). Freed as a whole with
    /// `MMDB_free_entry_data_list`.
    #[repr(C)]
    pub struct MMDB_entry_data_list_s {
        /// This node's data.
        pub entry_data: MMDB_entry_data_s,
        /// Next node, or null at the end of the list.
        pub next: *mut MMDB_entry_data_list_s,
        /// Engine-internal allocation pool.
        pub pool: *mut c_void,
    }

    #[allow(improper_ctypes)]
    #[link(name = "maxminddb")]
    extern "C" {
        /// Open the database at `filename` into caller-allocated storage.
        pub fn MMDB_open(filename: *const c_char, flags: u32, mmdb: *mut MMDB_s) -> c_int;

        /// Search for an address given as text. Resolver failures land in
        /// `gai_error`, engine failures in `mmdb_error`.
        pub fn MMDB_lookup_string(
            mmdb: *const MMDB_s,
            ipstr: *const c_char,
            gai_error: *mut c_int,
            mmdb_error: *mut c_int,
        ) -> MMDB_lookup_result_s;

        /// Search for an already-resolved socket address.
        #[cfg(unix)]
        pub fn MMDB_lookup_sockaddr(
            mmdb: *const MMDB_s,
            sockaddr: *const libc::sockaddr,
            mmdb_error: *mut c_int,
        ) -> MMDB_lookup_result_s;

        /// Search for an already-resolved socket address.
        #[cfg(windows)]
        pub fn MMDB_lookup_sockaddr(
            mmdb: *const MMDB_s,
            sockaddr: *const winapi::shared::ws2def::SOCKADDR,
            mmdb_error: *mut c_int,
        ) -> MMDB_lookup_result_s;

        /// Materialize a matched entry into a linked node list.
        pub fn MMDB_get_entry_data_list(
            start: *mut MMDB_entry_s,
            entry_data_list: *mut *mut MMDB_entry_data_list_s,
        ) -> c_int;

        /// Free a list produced by `MMDB_get_entry_data_list`.
        pub fn MMDB_free_entry_data_list(entry_data_list: *mut MMDB_entry_data_list_s);

        /// Close a database and release its resources.
        pub fn MMDB_close(mmdb: *mut MMDB_s);

        /// The engine's version string.
        pub fn MMDB_lib_version() -> *const c_char;

        /// Describe an engine status code.
        pub fn MMDB_strerror(error_code: c_int) -> *const c_char;
    }
}

/// The native lookup engine.
pub struct Native;

/// Handle to a natively opened database.
pub struct NativeHandle {
    // Boxed so the address stays stable for entries that point back at it.
    db: Box<ffi::MMDB_s>,
}

// The engine never writes to the handle after MMDB_open fills it; every
// lookup takes it by const pointer.
unsafe impl Send for NativeHandle {}
unsafe impl Sync for NativeHandle {}

impl Drop for NativeHandle {
    fn drop(&mut self) {
        unsafe { ffi::MMDB_close(&mut *self.db) };
    }
}

/// A matched record awaiting materialization.
pub struct NativeEntry {
    entry: ffi::MMDB_entry_s,
}

/// Describe an engine status code using the engine's own message table.
fn engine_strerror(code: c_int) -> String {
    unsafe { CStr::from_ptr(ffi::MMDB_strerror(code)) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(unix)]
fn resolver_strerror(code: c_int) -> String {
    unsafe { CStr::from_ptr(libc::gai_strerror(code)) }
        .to_string_lossy()
        .into_owned()
}

#[cfg(windows)]
fn resolver_strerror(code: c_int) -> String {
    format!("resolver error {}", code)
}

#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Option<CString> {
    use std::os::unix::ffi::OsStrExt;
    CString::new(path.as_os_str().as_bytes()).ok()
}

#[cfg(windows)]
fn path_to_cstring(path: &Path) -> Option<CString> {
    CString::new(path.to_str()?).ok()
}

fn outcome_from(result: ffi::MMDB_lookup_result_s) -> LookupOutcome<NativeEntry> {
    if result.found_entry {
        LookupOutcome {
            entry: Some(NativeEntry {
                entry: result.entry,
            }),
            prefix_len: result.netmask,
        }
    } else {
        LookupOutcome {
            entry: None,
            prefix_len: 0,
        }
    }
}

#[cfg(unix)]
fn sockaddr_lookup(
    handle: &NativeHandle,
    address: IpAddr,
    error: &mut c_int,
) -> ffi::MMDB_lookup_result_s {
    match address {
        IpAddr::V4(v4) => {
            let mut sa: libc::sockaddr_in = unsafe { mem::zeroed() };
            sa.sin_family = libc::AF_INET as libc::sa_family_t;
            sa.sin_addr.s_addr = u32::from(v4).to_be();
            unsafe {
                ffi::MMDB_lookup_sockaddr(
                    &*handle.db,
                    &sa as *const libc::sockaddr_in as *const libc::sockaddr,
                    error,
                )
            }
        }
        IpAddr::V6(v6) => {
            let mut sa: libc::sockaddr_in6 = unsafe { mem::zeroed() };
            sa.sin6_family = libc::AF_INET6 as libc::sa_family_t;
            sa.sin6_addr.s6_addr = v6.octets();
            unsafe {
                ffi::MMDB_lookup_sockaddr(
                    &*handle.db,
                    &sa as *const libc::sockaddr_in6 as *const libc::sockaddr,
                    error,
                )
            }
        }
    }
}

#[cfg(windows)]
fn sockaddr_lookup(
    handle: &NativeHandle,
    address: IpAddr,
    error: &mut c_int,
) -> ffi::MMDB_lookup_result_s {
    use winapi::shared::ws2def::{AF_INET, AF_INET6, SOCKADDR, SOCKADDR_IN};
    use winapi::shared::ws2ipdef::SOCKADDR_IN6_LH;

    match address {
        IpAddr::V4(v4) => {
            let mut sa: SOCKADDR_IN = unsafe { mem::zeroed() };
            sa.sin_family = AF_INET as u16;
            unsafe {
                *sa.sin_addr.S_un.S_addr_mut() = u32::from(v4).to_be();
                ffi::MMDB_lookup_sockaddr(
                    &*handle.db,
                    &sa as *const SOCKADDR_IN as *const SOCKADDR,
                    error,
                )
            }
        }
        IpAddr::V6(v6) => {
            let mut sa: SOCKADDR_IN6_LH = unsafe { mem::zeroed() };
            sa.sin6_family = AF_INET6 as u16;
            unsafe {
                *sa.sin6_addr.u.Byte_mut() = v6.octets();
                ffi::MMDB_lookup_sockaddr(
                    &*handle.db,
                    &sa as *const SOCKADDR_IN6_LH as *const SOCKADDR,
                    error,
                )
            }
        }
    }
}

/// Frees the engine-allocated list exactly once, on every exit path.
struct ListGuard(*mut ffi::MMDB_entry_data_list_s);

impl Drop for ListGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { ffi::MMDB_free_entry_data_list(self.0) };
        }
    }
}

/// Convert one native node into its owned representation.
///
/// Tags outside the recognized set (pointers, raw bytes, cache containers,
/// end markers, future additions) are a hard failure, never skipped.
fn convert_entry_data(data: &ffi::MMDB_entry_data_s) -> Result<EntryData, DecodeError> {
    let node = match data.type_ {
        ffi::MMDB_DATA_TYPE_ARRAY => EntryData::Array {
            count: data.data_size,
        },
        ffi::MMDB_DATA_TYPE_MAP => EntryData::Map {
            count: data.data_size,
        },
        ffi::MMDB_DATA_TYPE_BOOLEAN => EntryData::Bool(unsafe { data.value.boolean }),
        ffi::MMDB_DATA_TYPE_DOUBLE => EntryData::Double(unsafe { data.value.double_value }),
        ffi::MMDB_DATA_TYPE_FLOAT => EntryData::Float(unsafe { data.value.float_value }),
        ffi::MMDB_DATA_TYPE_INT32 => EntryData::Int32(unsafe { data.value.int32 }),
        ffi::MMDB_DATA_TYPE_UINT16 => EntryData::Uint16(unsafe { data.value.uint16 }),
        ffi::MMDB_DATA_TYPE_UINT32 => EntryData::Uint32(unsafe { data.value.uint32 }),
        ffi::MMDB_DATA_TYPE_UINT64 => EntryData::Uint64(unsafe { data.value.uint64 }),
        ffi::MMDB_DATA_TYPE_UINT128 => {
            EntryData::Uint128(unsafe { data.value.uint128 }.to_be_bytes())
        }
        ffi::MMDB_DATA_TYPE_UTF8_STRING => {
            let len = data.data_size;
            let ptr = unsafe { data.value.utf8_string };
            let bytes = if ptr.is_null() {
                Vec::new()
            } else {
                unsafe { std::slice::from_raw_parts(ptr as *const u8, len as usize) }.to_vec()
            };
            EntryData::Utf8 { bytes, len }
        }
        other => return Err(DecodeError::UnsupportedType(other)),
    };
    Ok(node)
}

impl Engine for Native {
    type Handle = NativeHandle;
    type EntryRef = NativeEntry;

    fn open(path: &Path, mode: OpenMode) -> Result<NativeHandle, OpenError> {
        let c_path = path_to_cstring(path).ok_or_else(|| OpenError {
            code: ffi::MMDB_FILE_OPEN_ERROR,
            message: format!("unrepresentable path: {}", path.display()),
        })?;

        let mut db: Box<ffi::MMDB_s> = Box::new(unsafe { mem::zeroed() });
        let status = unsafe { ffi::MMDB_open(c_path.as_ptr(), mode as u32, &mut *db) };
        if status != ffi::MMDB_SUCCESS {
            return Err(OpenError {
                code: status,
                message: engine_strerror(status),
            });
        }
        Ok(NativeHandle { db })
    }

    fn version() -> String {
        unsafe { CStr::from_ptr(ffi::MMDB_lib_version()) }
            .to_string_lossy()
            .into_owned()
    }

    fn lookup_text(
        handle: &NativeHandle,
        address: &str,
    ) -> Result<LookupOutcome<NativeEntry>, LookupError> {
        let c_addr = CString::new(address).map_err(|_| LookupError::AddressResolution {
            code: 0,
            message: "address contains an interior NUL byte".to_string(),
        })?;

        let mut gai_error: c_int = 0;
        let mut db_error: c_int = ffi::MMDB_SUCCESS;
        let result = unsafe {
            ffi::MMDB_lookup_string(&*handle.db, c_addr.as_ptr(), &mut gai_error, &mut db_error)
        };

        if gai_error != 0 {
            return Err(LookupError::AddressResolution {
                code: gai_error,
                message: resolver_strerror(gai_error),
            });
        }
        if db_error != ffi::MMDB_SUCCESS {
            return Err(LookupError::Engine {
                code: db_error,
                message: engine_strerror(db_error),
            });
        }
        Ok(outcome_from(result))
    }

    fn lookup_addr(
        handle: &NativeHandle,
        address: IpAddr,
    ) -> Result<LookupOutcome<NativeEntry>, LookupError> {
        let mut db_error: c_int = ffi::MMDB_SUCCESS;
        let result = sockaddr_lookup(handle, address, &mut db_error);
        if db_error != ffi::MMDB_SUCCESS {
            return Err(LookupError::Engine {
                code: db_error,
                message: engine_strerror(db_error),
            });
        }
        Ok(outcome_from(result))
    }

    // The entry already points back at its owning handle; the parameter
    // only enforces the handle-outlives-entry ordering at the type level.
    fn entry_data_list(
        _handle: &NativeHandle,
        entry: NativeEntry,
    ) -> Result<EntryDataList, DecodeError> {
        let mut entry = entry.entry;
        let mut list_ptr: *mut ffi::MMDB_entry_data_list_s = ptr::null_mut();
        let status = unsafe { ffi::MMDB_get_entry_data_list(&mut entry, &mut list_ptr) };
        let guard = ListGuard(list_ptr);

        if status != ffi::MMDB_SUCCESS {
            return Err(DecodeError::Engine {
                code: status,
                message: engine_strerror(status),
            });
        }

        let mut nodes = Vec::new();
        let mut current = guard.0;
        while !current.is_null() {
            let data = unsafe { &(*current).entry_data };
            nodes.push(convert_entry_data(data)?);
            current = unsafe { (*current).next };
        }
        Ok(EntryDataList::new(nodes))
    }
}
