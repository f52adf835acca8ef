//! Value serialization.
//!
//! Every value travels as a byte sequence.  Byte values pass through
//! untouched, strings pass through as UTF-8, and everything else
//! round-trips through the pluggable [`PayloadMapper`].  Decoding an
//! absent value into a numeric or boolean type yields that type's zero
//! value instead of failing; callers rely on reading a typed default from
//! keys they never wrote.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{CacheError, CacheResult};

/// Pluggable structured encoding for non-primitive payloads.
///
/// The mapper is injected once, at construction, and shared process-wide
/// behind an `Arc`; there is deliberately no way to swap it after façades
/// have been built from it.  `serde_json::Value` is the interchange form,
/// which keeps the trait object-safe while leaving the textual rendering
/// (compact, pretty, escaped, ...) to the implementation.
pub trait PayloadMapper: Send + Sync {
    /// Renders a structured value to its wire text.
    fn to_text(&self, value: &serde_json::Value) -> CacheResult<String>;
    /// Parses wire text back into a structured value.
    fn from_text(&self, text: &str) -> CacheResult<serde_json::Value>;
}

/// The default mapper: compact JSON via `serde_json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonMapper;

impl PayloadMapper for JsonMapper {
    fn to_text(&self, value: &serde_json::Value) -> CacheResult<String> {
        serde_json::to_string(value).map_err(CacheError::from)
    }

    fn from_text(&self, text: &str) -> CacheResult<serde_json::Value> {
        serde_json::from_str(text).map_err(CacheError::from)
    }
}

/// A value that can be stored in and loaded from the cache.
///
/// `decode` receives `None` when the store reported absence.  Numeric and
/// boolean impls answer absence with `Some(0)` / `Some(false)`; all other
/// impls answer `None`.
pub trait CacheValue: Sized {
    /// Encodes the value to its wire bytes.
    fn encode(&self, mapper: &dyn PayloadMapper) -> CacheResult<Vec<u8>>;
    /// Decodes wire bytes, or the documented default when absent.
    fn decode(bytes: Option<&[u8]>, mapper: &dyn PayloadMapper) -> CacheResult<Option<Self>>;
}

/// Encodes any serializable value through the mapper.  Building block for
/// [`implement_mapped_value!`]; rarely called directly.
pub fn encode_with_mapper<T: Serialize>(
    value: &T,
    mapper: &dyn PayloadMapper,
) -> CacheResult<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(mapper.to_text(&value)?.into_bytes())
}

/// Decodes mapper-encoded bytes into any deserializable value, answering
/// absence (missing or empty bytes) with `None`.
pub fn decode_with_mapper<T: DeserializeOwned>(
    bytes: Option<&[u8]>,
    mapper: &dyn PayloadMapper,
) -> CacheResult<Option<T>> {
    let bytes = match bytes {
        None => return Ok(None),
        Some(b) if b.is_empty() => return Ok(None),
        Some(b) => b,
    };
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CacheError::codec(format!("payload is not valid UTF-8: {e}")))?;
    let value = mapper.from_text(text)?;
    Ok(Some(serde_json::from_value(value)?))
}

/// Implements [`CacheValue`] for types that round-trip through the payload
/// mapper.  Works for any type that is `serde::Serialize` and
/// `serde::de::DeserializeOwned`:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use shardcache::implement_mapped_value;
///
/// #[derive(Serialize, Deserialize)]
/// struct Vehicle {
///     plate: String,
///     speed: u32,
/// }
///
/// implement_mapped_value!(Vehicle);
/// ```
#[macro_export]
macro_rules! implement_mapped_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::CacheValue for $t {
                fn encode(
                    &self,
                    mapper: &dyn $crate::PayloadMapper,
                ) -> $crate::CacheResult<Vec<u8>> {
                    $crate::encode_with_mapper(self, mapper)
                }

                fn decode(
                    bytes: Option<&[u8]>,
                    mapper: &dyn $crate::PayloadMapper,
                ) -> $crate::CacheResult<Option<Self>> {
                    $crate::decode_with_mapper(bytes, mapper)
                }
            }
        )*
    };
}

macro_rules! primitive_cache_value {
    ($($t:ty => $zero:expr),* $(,)?) => {
        $(
            impl CacheValue for $t {
                fn encode(&self, mapper: &dyn PayloadMapper) -> CacheResult<Vec<u8>> {
                    encode_with_mapper(self, mapper)
                }

                fn decode(
                    bytes: Option<&[u8]>,
                    mapper: &dyn PayloadMapper,
                ) -> CacheResult<Option<Self>> {
                    match decode_with_mapper(bytes, mapper)? {
                        Some(v) => Ok(Some(v)),
                        None => Ok(Some($zero)),
                    }
                }
            }
        )*
    };
}

primitive_cache_value! {
    bool => false,
    i8 => 0,
    i16 => 0,
    i32 => 0,
    i64 => 0,
    isize => 0,
    u8 => 0,
    u16 => 0,
    u32 => 0,
    u64 => 0,
    usize => 0,
    f32 => 0.0,
    f64 => 0.0,
    char => '\0',
}

impl CacheValue for Vec<u8> {
    fn encode(&self, _mapper: &dyn PayloadMapper) -> CacheResult<Vec<u8>> {
        Ok(self.clone())
    }

    fn decode(bytes: Option<&[u8]>, _mapper: &dyn PayloadMapper) -> CacheResult<Option<Self>> {
        Ok(bytes.map(|b| b.to_vec()))
    }
}

impl CacheValue for String {
    fn encode(&self, _mapper: &dyn PayloadMapper) -> CacheResult<Vec<u8>> {
        Ok(self.as_bytes().to_vec())
    }

    fn decode(bytes: Option<&[u8]>, _mapper: &dyn PayloadMapper) -> CacheResult<Option<Self>> {
        match bytes {
            None => Ok(None),
            Some(b) if b.is_empty() => Ok(None),
            Some(b) => String::from_utf8(b.to_vec())
                .map(Some)
                .map_err(|e| CacheError::codec(format!("payload is not valid UTF-8: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Vehicle {
        plate: String,
        speed: u32,
    }

    implement_mapped_value!(Vehicle);

    #[test]
    fn absent_primitives_decode_to_zero_values() {
        let mapper = JsonMapper;
        assert_eq!(bool::decode(None, &mapper).unwrap(), Some(false));
        assert_eq!(i64::decode(Some(b""), &mapper).unwrap(), Some(0));
        assert_eq!(f64::decode(None, &mapper).unwrap(), Some(0.0));
    }

    #[test]
    fn absent_objects_decode_to_none() {
        let mapper = JsonMapper;
        assert_eq!(Vehicle::decode(None, &mapper).unwrap(), None);
        assert_eq!(Vehicle::decode(Some(b""), &mapper).unwrap(), None);
        assert_eq!(String::decode(None, &mapper).unwrap(), None);
        assert_eq!(Vec::<u8>::decode(None, &mapper).unwrap(), None);
    }

    #[test]
    fn strings_pass_through_without_structured_encoding() {
        let mapper = JsonMapper;
        let encoded = String::from("Plain Text").encode(&mapper).unwrap();
        assert_eq!(encoded, b"Plain Text");
        assert_eq!(
            String::decode(Some(b"Plain Text"), &mapper).unwrap(),
            Some("Plain Text".into())
        );
    }

    #[test]
    fn bytes_pass_through_unchanged() {
        let mapper = JsonMapper;
        let raw = vec![0u8, 159, 146, 150];
        assert_eq!(raw.encode(&mapper).unwrap(), raw);
        assert_eq!(Vec::<u8>::decode(Some(&raw), &mapper).unwrap(), Some(raw));
    }

    #[test]
    fn mapped_values_round_trip() {
        let mapper = JsonMapper;
        let v = Vehicle {
            plate: "B-42".into(),
            speed: 88,
        };
        let bytes = v.encode(&mapper).unwrap();
        assert_eq!(Vehicle::decode(Some(&bytes), &mapper).unwrap(), Some(v));
    }

    #[test]
    fn numbers_round_trip_through_the_mapper() {
        let mapper = JsonMapper;
        let bytes = 42i64.encode(&mapper).unwrap();
        assert_eq!(bytes, b"42");
        assert_eq!(i64::decode(Some(&bytes), &mapper).unwrap(), Some(42));
    }
}
