//! Record decoding.
//!
//! Rebuilds a nested [`DataValue`] from the engine's flattened pre-order
//! node list. A single shared cursor is threaded through the recursion: every
//! call decodes the subtree under the cursor and leaves the cursor on the
//! first node *after* that subtree, so container loops never have to guess
//! how many nodes a child consumed and can never double-advance.
//!
//! Decoding is strict: unknown tags, non-string map keys, invalid UTF-8,
//! truncated lists, and runaway nesting all fail with a typed
//! [`DecodeError`] instead of being skipped or coerced.

use crate::data_value::DataValue;
use crate::entry_data::{Cursor, EntryData, EntryDataList};
use crate::error::DecodeError;
use std::collections::BTreeMap;

/// Default bound on container nesting.
///
/// Deep enough for any real record; shallow enough that a corrupted list
/// claiming unbounded nesting fails with [`DecodeError::TooDeep`] long
/// before the call stack is at risk.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Decodes flattened node lists into [`DataValue`] trees.
///
/// Duplicate map keys resolve last-write-wins: a later pair overwrites an
/// earlier one with the same key.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_depth: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    /// A decoder with the default depth bound.
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// A decoder bounding container nesting at `max_depth`.
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Decode a whole flattened record.
    ///
    /// Takes ownership of the list: it is exclusively this operation's and
    /// is dropped on every exit path. An empty list decodes to `None`;
    /// otherwise the subtree rooted at the first node becomes the record
    /// value. Nodes after that subtree, if any, are ignored.
    pub fn decode_list(&self, list: EntryDataList) -> Result<Option<DataValue>, DecodeError> {
        let mut cursor = list.cursor();
        if cursor.current().is_none() {
            return Ok(None);
        }
        let value = self.decode_value(&mut cursor, 0)?;
        Ok(Some(value))
    }

    /// Decode the subtree under the cursor, leaving the cursor on the first
    /// node after it.
    fn decode_value(&self, cursor: &mut Cursor<'_>, depth: usize) -> Result<DataValue, DecodeError> {
        if depth >= self.max_depth {
            return Err(DecodeError::TooDeep(self.max_depth));
        }
        let node = cursor.current().ok_or(DecodeError::UnexpectedEnd)?;
        match node {
            EntryData::Array { count } => self.decode_array(*count, cursor, depth),
            EntryData::Map { count } => self.decode_map(*count, cursor, depth),
            _ => {
                let value = decode_scalar(node)?;
                cursor.advance();
                Ok(value)
            }
        }
    }

    fn decode_array(
        &self,
        count: u32,
        cursor: &mut Cursor<'_>,
        depth: usize,
    ) -> Result<DataValue, DecodeError> {
        // Declared counts are untrusted; cap the preallocation.
        let mut items = Vec::with_capacity((count as usize).min(64));
        cursor.advance();
        for _ in 0..count {
            items.push(self.decode_value(cursor, depth + 1)?);
        }
        Ok(DataValue::Array(items))
    }

    fn decode_map(
        &self,
        count: u32,
        cursor: &mut Cursor<'_>,
        depth: usize,
    ) -> Result<DataValue, DecodeError> {
        let mut map = BTreeMap::new();
        cursor.advance();
        for _ in 0..count {
            let key_node = cursor.current().ok_or(DecodeError::UnexpectedEnd)?;
            let key = match key_node {
                EntryData::Utf8 { bytes, len } => decode_utf8(bytes, *len)?,
                _ => return Err(DecodeError::InvalidKey),
            };
            cursor.advance();
            let value = self.decode_value(cursor, depth + 1)?;
            // Last write wins for duplicate keys.
            map.insert(key, value);
        }
        Ok(DataValue::Map(map))
    }
}

/// Decode one non-container node.
///
/// A container node reaching this path is a contract violation and reports
/// the node's own tag as unsupported rather than silently producing nothing.
fn decode_scalar(node: &EntryData) -> Result<DataValue, DecodeError> {
    match node {
        EntryData::Bool(b) => Ok(DataValue::Bool(*b)),
        EntryData::Double(d) => Ok(DataValue::Double(*d)),
        EntryData::Float(f) => Ok(DataValue::Float(*f)),
        EntryData::Int32(i) => Ok(DataValue::Int32(*i)),
        EntryData::Uint16(u) => Ok(DataValue::Uint16(*u)),
        EntryData::Uint32(u) => Ok(DataValue::Uint32(*u)),
        EntryData::Uint64(u) => Ok(DataValue::Uint64(*u)),
        EntryData::Uint128(bytes) => Ok(DataValue::Uint128(*bytes)),
        EntryData::Utf8 { bytes, len } => Ok(DataValue::String(decode_utf8(bytes, *len)?)),
        EntryData::Array { .. } | EntryData::Map { .. } => {
            Err(DecodeError::UnsupportedType(node.type_tag()))
        }
    }
}

/// Decode exactly `len` bytes of `bytes` as UTF-8 text.
///
/// The declared length is authoritative: trailing buffer bytes are ignored,
/// and a buffer shorter than the declared length is corrupt data.
fn decode_utf8(bytes: &[u8], len: u32) -> Result<String, DecodeError> {
    let len = len as usize;
    if len > bytes.len() {
        return Err(DecodeError::InvalidEncoding);
    }
    std::str::from_utf8(&bytes[..len])
        .map(str::to_owned)
        .map_err(|_| DecodeError::InvalidEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(nodes: Vec<EntryData>) -> Result<Option<DataValue>, DecodeError> {
        Decoder::new().decode_list(EntryDataList::new(nodes))
    }

    /// Flatten a value tree into its pre-order node list.
    fn flatten(value: &DataValue, out: &mut Vec<EntryData>) {
        match value {
            DataValue::Null => panic!("null has no node encoding"),
            DataValue::Bool(b) => out.push(EntryData::Bool(*b)),
            DataValue::Double(d) => out.push(EntryData::Double(*d)),
            DataValue::Float(f) => out.push(EntryData::Float(*f)),
            DataValue::Int32(i) => out.push(EntryData::Int32(*i)),
            DataValue::Uint16(u) => out.push(EntryData::Uint16(*u)),
            DataValue::Uint32(u) => out.push(EntryData::Uint32(*u)),
            DataValue::Uint64(u) => out.push(EntryData::Uint64(*u)),
            DataValue::Uint128(b) => out.push(EntryData::Uint128(*b)),
            DataValue::String(s) => out.push(EntryData::utf8(s)),
            DataValue::Array(items) => {
                out.push(EntryData::Array {
                    count: items.len() as u32,
                });
                for item in items {
                    flatten(item, out);
                }
            }
            DataValue::Map(entries) => {
                out.push(EntryData::Map {
                    count: entries.len() as u32,
                });
                for (key, value) in entries {
                    out.push(EntryData::utf8(key));
                    flatten(value, out);
                }
            }
        }
    }

    #[test]
    fn test_empty_list_is_absent_record() {
        assert_eq!(decode(vec![]), Ok(None));
    }

    #[test]
    fn test_scalar_kinds() {
        assert_eq!(decode(vec![EntryData::Bool(true)]), Ok(Some(DataValue::Bool(true))));
        assert_eq!(
            decode(vec![EntryData::Double(3.25)]),
            Ok(Some(DataValue::Double(3.25)))
        );
        assert_eq!(
            decode(vec![EntryData::Float(-0.5)]),
            Ok(Some(DataValue::Float(-0.5)))
        );
        assert_eq!(
            decode(vec![EntryData::Int32(-42)]),
            Ok(Some(DataValue::Int32(-42)))
        );
        assert_eq!(
            decode(vec![EntryData::Uint64(u64::MAX)]),
            Ok(Some(DataValue::Uint64(u64::MAX)))
        );

        let wide = u128::MAX.to_be_bytes();
        assert_eq!(
            decode(vec![EntryData::Uint128(wide)]),
            Ok(Some(DataValue::Uint128(wide)))
        );

        assert_eq!(
            decode(vec![EntryData::utf8("café")]),
            Ok(Some(DataValue::String("café".to_string())))
        );
    }

    #[test]
    fn test_string_length_is_authoritative() {
        // Trailing buffer content past the declared length never leaks into
        // the decoded text.
        let node = EntryData::Utf8 {
            bytes: b"hello\0garbage".to_vec(),
            len: 5,
        };
        assert_eq!(
            decode(vec![node]),
            Ok(Some(DataValue::String("hello".to_string())))
        );
    }

    #[test]
    fn test_string_buffer_shorter_than_declared_length() {
        let node = EntryData::Utf8 {
            bytes: b"short".to_vec(),
            len: 10,
        };
        assert_eq!(decode(vec![node]), Err(DecodeError::InvalidEncoding));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let node = EntryData::Utf8 {
            bytes: vec![0xFF, 0xFE, 0xFD],
            len: 3,
        };
        assert_eq!(decode(vec![node]), Err(DecodeError::InvalidEncoding));
    }

    #[test]
    fn test_array_preserves_length_and_order() {
        let result = decode(vec![
            EntryData::Array { count: 3 },
            EntryData::Uint32(1),
            EntryData::Uint32(2),
            EntryData::Uint32(3),
        ])
        .unwrap()
        .unwrap();

        assert_eq!(
            result,
            DataValue::Array(vec![
                DataValue::Uint32(1),
                DataValue::Uint32(2),
                DataValue::Uint32(3),
            ])
        );
    }

    #[test]
    fn test_empty_containers_consume_only_their_own_node() {
        let result = decode(vec![
            EntryData::Array { count: 2 },
            EntryData::Array { count: 0 },
            EntryData::Map { count: 0 },
        ])
        .unwrap()
        .unwrap();

        assert_eq!(
            result,
            DataValue::Array(vec![
                DataValue::Array(vec![]),
                DataValue::Map(BTreeMap::new()),
            ])
        );
    }

    #[test]
    fn test_nested_container_does_not_double_advance() {
        // The nested array sits between two scalars; the outer loop must
        // resume exactly one node past it.
        let result = decode(vec![
            EntryData::Array { count: 3 },
            EntryData::Uint32(1),
            EntryData::Array { count: 2 },
            EntryData::utf8("a"),
            EntryData::utf8("b"),
            EntryData::Uint32(9),
        ])
        .unwrap()
        .unwrap();

        assert_eq!(
            result,
            DataValue::Array(vec![
                DataValue::Uint32(1),
                DataValue::Array(vec![
                    DataValue::String("a".to_string()),
                    DataValue::String("b".to_string()),
                ]),
                DataValue::Uint32(9),
            ])
        );
    }

    #[test]
    fn test_cursor_lands_after_decoded_subtree() {
        let list = EntryDataList::new(vec![
            EntryData::Map { count: 1 },
            EntryData::utf8("k"),
            EntryData::Array { count: 1 },
            EntryData::Uint16(7),
            EntryData::utf8("trailing"),
        ]);
        let mut cursor = list.cursor();
        Decoder::new().decode_value(&mut cursor, 0).unwrap();

        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.current(), Some(&EntryData::utf8("trailing")));
    }

    #[test]
    fn test_country_and_port_ranges_scenario() {
        let result = decode(vec![
            EntryData::Map { count: 2 },
            EntryData::utf8("country"),
            EntryData::Map { count: 1 },
            EntryData::utf8("iso_code"),
            EntryData::utf8("US"),
            EntryData::utf8("port_ranges"),
            EntryData::Array { count: 2 },
            EntryData::Uint16(80),
            EntryData::Uint16(443),
        ])
        .unwrap()
        .unwrap();

        let country = result.get("country").expect("country key");
        assert_eq!(
            country.lookup_path(&["iso_code"]).and_then(|v| v.as_str()),
            Some("US")
        );

        let ports = result.get("port_ranges").and_then(|v| v.as_slice()).unwrap();
        assert_eq!(ports, &[DataValue::Uint16(80), DataValue::Uint16(443)]);
    }

    #[test]
    fn test_map_of_n_pairs_is_fully_reachable() {
        let mut nodes = vec![EntryData::Map { count: 4 }];
        for i in 0..4 {
            nodes.push(EntryData::utf8(&format!("key{}", i)));
            nodes.push(EntryData::Uint32(i));
        }

        let result = decode(nodes).unwrap().unwrap();
        let map = result.as_map().unwrap();
        assert_eq!(map.len(), 4);
        for i in 0..4u32 {
            assert_eq!(map.get(&format!("key{}", i)), Some(&DataValue::Uint32(i)));
        }
    }

    #[test]
    fn test_non_string_map_key_is_invalid_key() {
        let result = decode(vec![
            EntryData::Map { count: 1 },
            EntryData::Int32(5),
            EntryData::utf8("value"),
        ]);
        assert_eq!(result, Err(DecodeError::InvalidKey));
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let result = decode(vec![
            EntryData::Map { count: 2 },
            EntryData::utf8("k"),
            EntryData::Uint32(1),
            EntryData::utf8("k"),
            EntryData::Uint32(2),
        ])
        .unwrap()
        .unwrap();

        let map = result.as_map().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some(&DataValue::Uint32(2)));
    }

    #[test]
    fn test_truncated_array_is_unexpected_end() {
        let result = decode(vec![
            EntryData::Array { count: 3 },
            EntryData::Uint32(1),
            EntryData::Uint32(2),
        ]);
        assert_eq!(result, Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn test_truncated_map_is_unexpected_end() {
        let result = decode(vec![EntryData::Map { count: 1 }, EntryData::utf8("orphan")]);
        assert_eq!(result, Err(DecodeError::UnexpectedEnd));
    }

    #[test]
    fn test_container_reaching_scalar_path_is_unsupported() {
        assert_eq!(
            decode_scalar(&EntryData::Map { count: 1 }),
            Err(DecodeError::UnsupportedType(7))
        );
        assert_eq!(
            decode_scalar(&EntryData::Array { count: 1 }),
            Err(DecodeError::UnsupportedType(11))
        );
    }

    #[test]
    fn test_nesting_past_depth_bound_is_too_deep() {
        let mut nodes: Vec<EntryData> =
            std::iter::repeat(EntryData::Array { count: 1 }).take(600).collect();
        nodes.push(EntryData::Uint32(0));

        assert_eq!(decode(nodes), Err(DecodeError::TooDeep(DEFAULT_MAX_DEPTH)));
    }

    #[test]
    fn test_depth_bound_is_configurable() {
        let nodes = vec![
            EntryData::Array { count: 1 },
            EntryData::Array { count: 1 },
            EntryData::Array { count: 1 },
            EntryData::Uint32(0),
        ];

        let tight = Decoder::with_max_depth(2);
        assert_eq!(
            tight.decode_list(EntryDataList::new(nodes.clone())),
            Err(DecodeError::TooDeep(2))
        );

        let loose = Decoder::with_max_depth(8);
        assert!(loose.decode_list(EntryDataList::new(nodes)).is_ok());
    }

    #[test]
    fn test_flatten_then_decode_round_trip() {
        let mut location = BTreeMap::new();
        location.insert("latitude".to_string(), DataValue::Double(37.751));
        location.insert("longitude".to_string(), DataValue::Double(-97.822));
        location.insert("accuracy_radius".to_string(), DataValue::Uint16(1000));

        let mut record = BTreeMap::new();
        record.insert("location".to_string(), DataValue::Map(location));
        record.insert(
            "subdivisions".to_string(),
            DataValue::Array(vec![
                DataValue::String("CA".to_string()),
                DataValue::String("OR".to_string()),
            ]),
        );
        record.insert("is_satellite".to_string(), DataValue::Bool(false));
        record.insert(
            "network".to_string(),
            DataValue::Uint128(0x2001_0db8_0000_0000_0000_0000_0000_0000u128.to_be_bytes()),
        );
        record.insert("empty_tags".to_string(), DataValue::Array(vec![]));
        let tree = DataValue::Map(record);

        let mut nodes = Vec::new();
        flatten(&tree, &mut nodes);

        assert_eq!(decode(nodes), Ok(Some(tree)));
    }
}
