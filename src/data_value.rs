//! Dynamic record values.
//!
//! A matched database entry decodes into a [`DataValue`]: a closed tagged
//! union mirroring the data types the engine's record format can express.
//! Callers get exhaustive-match safety from the enum itself; the accessor
//! methods are a thin convenience layer on top and never coerce between
//! variants.

use std::collections::BTreeMap;

/// A decoded record value.
///
/// Maps use [`BTreeMap`] so iteration order is deterministic and equality is
/// independent of the order pairs were decoded in.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// IEEE 754 double precision float.
    Double(f64),
    /// IEEE 754 single precision float.
    Float(f32),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 16-bit integer.
    Uint16(u16),
    /// Unsigned 32-bit integer.
    Uint32(u32),
    /// Unsigned 64-bit integer.
    Uint64(u64),
    /// Unsigned 128-bit integer, kept as its big-endian byte representation.
    ///
    /// Conversion to a native integer type is caller policy; see
    /// [`as_u128`](Self::as_u128).
    Uint128([u8; 16]),
    /// UTF-8 string.
    String(String),
    /// Ordered list of values.
    Array(Vec<DataValue>),
    /// String-keyed map of values.
    Map(BTreeMap<String, DataValue>),
}

impl DataValue {
    /// Borrow the string contents, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean value, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as an `f64`, if this is a `Double` or `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Double(d) => Some(*d),
            DataValue::Float(f) => Some(*f as f64),
            _ => None,
        }
    }

    /// The value as a `u64`, if this is an unsigned integer of 64 bits or
    /// fewer. No truncation is performed.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::Uint16(v) => Some(*v as u64),
            DataValue::Uint32(v) => Some(*v as u64),
            DataValue::Uint64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an `i64`, if this is an `Int32`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::Int32(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// The 128-bit payload converted to a native `u128`, if this is a
    /// `Uint128`.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            DataValue::Uint128(bytes) => Some(u128::from_be_bytes(*bytes)),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an `Array`.
    pub fn as_slice(&self) -> Option<&[DataValue]> {
        match self {
            DataValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the map, if this is a `Map`.
    pub fn as_map(&self) -> Option<&BTreeMap<String, DataValue>> {
        match self {
            DataValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// True for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Look up a direct child by map key.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        match self {
            DataValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    /// Walk a path of map keys and array indices into the value tree.
    ///
    /// Each segment is a map key, or a decimal index when the current value
    /// is an array - the same path semantics the engine uses for its own
    /// dotted-path getters.
    ///
    /// ```
    /// use mmdb_client::DataValue;
    /// use std::collections::BTreeMap;
    ///
    /// let mut country = BTreeMap::new();
    /// country.insert("iso_code".to_string(), DataValue::String("US".to_string()));
    /// let mut record = BTreeMap::new();
    /// record.insert("country".to_string(), DataValue::Map(country));
    /// let record = DataValue::Map(record);
    ///
    /// let iso = record.lookup_path(&["country", "iso_code"]);
    /// assert_eq!(iso.and_then(|v| v.as_str()), Some("US"));
    /// ```
    pub fn lookup_path(&self, path: &[&str]) -> Option<&DataValue> {
        let mut current = self;
        for segment in path {
            current = match current {
                DataValue::Map(map) => map.get(*segment)?,
                DataValue::Array(items) => {
                    let index: usize = segment.parse().ok()?;
                    items.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Render the value as JSON.
    ///
    /// `Uint128` becomes a decimal string so the full range survives the
    /// trip; everything else maps onto its natural JSON counterpart.
    pub fn to_json(&self) -> serde_json::Value {
        self.into()
    }
}

impl From<&DataValue> for serde_json::Value {
    fn from(value: &DataValue) -> Self {
        use serde_json::json;

        match value {
            DataValue::Null => serde_json::Value::Null,
            DataValue::Bool(b) => json!(b),
            DataValue::Double(d) => json!(d),
            DataValue::Float(f) => json!(f),
            DataValue::Int32(i) => json!(i),
            DataValue::Uint16(u) => json!(u),
            DataValue::Uint32(u) => json!(u),
            DataValue::Uint64(u) => json!(u),
            DataValue::Uint128(bytes) => json!(u128::from_be_bytes(*bytes).to_string()),
            DataValue::String(s) => json!(s),
            DataValue::Array(items) => {
                json!(items.iter().map(serde_json::Value::from).collect::<Vec<_>>())
            }
            DataValue::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.into());
                }
                json!(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> DataValue {
        let mut country = BTreeMap::new();
        country.insert("iso_code".to_string(), DataValue::String("US".to_string()));
        country.insert("geoname_id".to_string(), DataValue::Uint32(6252001));

        let mut record = BTreeMap::new();
        record.insert("country".to_string(), DataValue::Map(country));
        record.insert(
            "port_ranges".to_string(),
            DataValue::Array(vec![DataValue::Uint16(80), DataValue::Uint16(443)]),
        );
        record.insert("anonymous".to_string(), DataValue::Bool(false));
        DataValue::Map(record)
    }

    #[test]
    fn test_accessors_do_not_coerce() {
        assert_eq!(DataValue::String("x".into()).as_str(), Some("x"));
        assert_eq!(DataValue::Uint32(5).as_str(), None);
        assert_eq!(DataValue::Uint16(80).as_u64(), Some(80));
        assert_eq!(DataValue::Int32(-1).as_u64(), None);
        assert_eq!(DataValue::Float(1.5).as_f64(), Some(1.5));
        assert!(DataValue::Null.is_null());
    }

    #[test]
    fn test_uint128_round_trips_through_bytes() {
        let n: u128 = 0x0123_4567_89AB_CDEF_0123_4567_89AB_CDEF;
        let value = DataValue::Uint128(n.to_be_bytes());
        assert_eq!(value.as_u128(), Some(n));
    }

    #[test]
    fn test_lookup_path_walks_maps_and_arrays() {
        let record = sample_record();

        let iso = record.lookup_path(&["country", "iso_code"]);
        assert_eq!(iso.and_then(|v| v.as_str()), Some("US"));

        let second_port = record.lookup_path(&["port_ranges", "1"]);
        assert_eq!(second_port.and_then(|v| v.as_u64()), Some(443));

        assert!(record.lookup_path(&["country", "missing"]).is_none());
        assert!(record.lookup_path(&["port_ranges", "nope"]).is_none());
        assert!(record.lookup_path(&["port_ranges", "7"]).is_none());
    }

    #[test]
    fn test_json_rendering() {
        let json = sample_record().to_json();
        assert_eq!(json["country"]["iso_code"], "US");
        assert_eq!(json["port_ranges"][0], 80);
        assert_eq!(json["anonymous"], false);

        let wide = DataValue::Uint128(u128::MAX.to_be_bytes());
        assert_eq!(wide.to_json(), serde_json::json!(u128::MAX.to_string()));

        assert_eq!(DataValue::Null.to_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_map_equality_ignores_insertion_order() {
        let mut a = BTreeMap::new();
        a.insert("x".to_string(), DataValue::Uint32(1));
        a.insert("y".to_string(), DataValue::Uint32(2));

        let mut b = BTreeMap::new();
        b.insert("y".to_string(), DataValue::Uint32(2));
        b.insert("x".to_string(), DataValue::Uint32(1));

        assert_eq!(DataValue::Map(a), DataValue::Map(b));
    }
}
