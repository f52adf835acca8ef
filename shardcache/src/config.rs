//! Key-space configuration: maps a logical `(node, item)` pair to a key
//! template, an expiration policy, and the list of logical databases the
//! key may land on.
//!
//! The registry is built once at startup and is read-only afterwards, so it
//! can be shared freely between threads.  Failure to load or resolve a pair
//! is a configuration error, never a runtime one.

use std::io;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::errors::{CacheError, CacheResult};

/// One resolved key configuration record.
///
/// Records are immutable after load.  `expire` of `None` means the key is
/// persistent; `shards` lists the logical database indexes the composed key
/// is distributed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    /// Configuration group ("node") the record belongs to.
    pub node: String,
    /// Entry name within the group.
    pub item: String,
    /// Key template the physical key is composed from.
    pub key: String,
    /// Default time-to-live in seconds, if any.
    pub expire: Option<i64>,
    /// Logical databases the key is sharded over.
    pub shards: Vec<i64>,
}

/// Serde shape of the key-space document.
///
/// The concrete file format is replaceable; anything that deserializes into
/// this shape works.  Groups and items keep their document order because
/// lookup is first-match-wins: a later duplicate `(node, item)` entry is
/// shadowed, not rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct KeySpaceDoc {
    /// Named groups in document order.
    pub groups: Vec<GroupDoc>,
}

/// A configuration group; its `db` and `expire` are defaults inherited by
/// every item unless the item overrides them.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDoc {
    /// Group name, used as the node part of the identity.
    pub name: String,
    /// Default shard list, in the `"0-3,7"` comma/range syntax.
    #[serde(default)]
    pub db: Option<String>,
    /// Default expiration, colon-separated seconds:minutes:hours:days.
    #[serde(default)]
    pub expire: Option<String>,
    /// Entries of the group, in document order.
    pub items: Vec<ItemDoc>,
}

/// A named entry inside a group.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDoc {
    /// Item name, used as the item part of the identity.
    pub name: String,
    /// Key template; empty or missing templates are rejected when the key
    /// is composed, not at load time.
    #[serde(default)]
    pub key: Option<String>,
    /// Shard-list override.
    #[serde(default)]
    pub db: Option<String>,
    /// Expiration override.
    #[serde(default)]
    pub expire: Option<String>,
}

/// The loaded, ordered key-space registry.
#[derive(Debug, Clone)]
pub struct KeySpace {
    records: Vec<KeyConfig>,
}

impl KeySpace {
    /// Builds the registry from an already-deserialized document.
    pub fn from_document(doc: &KeySpaceDoc) -> KeySpace {
        let mut records = Vec::new();
        for group in &doc.groups {
            let group_shards = group
                .db
                .as_deref()
                .map(parse_shard_list)
                .unwrap_or_default();
            let group_expire = group.expire.as_deref().and_then(parse_expire);
            for item in &group.items {
                let shards = match item.db.as_deref() {
                    Some(s) => parse_shard_list(s),
                    None => group_shards.clone(),
                };
                let expire = item
                    .expire
                    .as_deref()
                    .and_then(parse_expire)
                    .or(group_expire);
                records.push(KeyConfig {
                    node: group.name.clone(),
                    item: item.name.clone(),
                    key: item.key.clone().unwrap_or_default(),
                    expire,
                    shards,
                });
            }
        }
        debug!("key space loaded with {} records", records.len());
        KeySpace { records }
    }

    /// Parses a JSON rendering of [`KeySpaceDoc`].
    pub fn from_json(json: &str) -> CacheResult<KeySpace> {
        let doc: KeySpaceDoc = serde_json::from_str(json)
            .map_err(|e| CacheError::config(format!("key space document: {e}")))?;
        Ok(KeySpace::from_document(&doc))
    }

    /// Loads a JSON key-space file.  A missing or malformed file is a fatal
    /// configuration error.
    pub fn from_json_file(path: impl AsRef<Path>) -> CacheResult<KeySpace> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e: io::Error| {
            CacheError::config(format!("key space file {}: {e}", path.display()))
        })?;
        KeySpace::from_json(&text)
    }

    /// Resolves a `(node, item)` pair to its record.  The first matching
    /// record wins; comparison is by value, not identity.
    pub fn resolve(&self, node: &str, item: &str) -> Option<&KeyConfig> {
        self.records
            .iter()
            .find(|r| r.node == node && r.item == item)
    }

    /// The key template for a pair, if configured.
    pub fn key(&self, node: &str, item: &str) -> Option<&str> {
        self.resolve(node, item).map(|r| r.key.as_str())
    }

    /// The configured expiration for a pair, in seconds.
    pub fn expire(&self, node: &str, item: &str) -> Option<i64> {
        self.resolve(node, item).and_then(|r| r.expire)
    }

    /// The shard list for a pair.
    pub fn shards(&self, node: &str, item: &str) -> Option<&[i64]> {
        self.resolve(node, item).map(|r| r.shards.as_slice())
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records were loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses a comma-separated shard list.
///
/// Each token is a single integer or an inclusive `a-b` range, expanded
/// only when `a <= b`.  Malformed tokens are skipped silently.
pub fn parse_shard_list(val: &str) -> Vec<i64> {
    let mut list = Vec::new();
    for token in val.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.contains('-') {
            let parts: Vec<&str> = token.split('-').collect();
            if parts.len() != 2 {
                continue;
            }
            let (begin, end) = (parts[0].trim().parse::<i64>(), parts[1].trim().parse::<i64>());
            if let (Ok(begin), Ok(end)) = (begin, end) {
                if begin <= end {
                    list.extend(begin..=end);
                }
            }
        } else if let Ok(v) = token.parse::<i64>() {
            list.push(v);
        }
    }
    list
}

/// Parses a colon-separated expiration into seconds.
///
/// Segments are weighted in the given left-to-right order: seconds,
/// minutes, hours, days (`"30:5:2"` is 30s + 5min + 2h = 7530).  At most
/// four segments are read; any parse failure in a used segment yields
/// `None`, which callers treat as "persistent".
pub fn parse_expire(val: &str) -> Option<i64> {
    if val.is_empty() {
        return None;
    }
    const WEIGHTS: [i64; 4] = [1, 60, 60 * 60, 60 * 60 * 24];
    let mut total: i64 = 0;
    for (segment, weight) in val.split(':').zip(WEIGHTS) {
        let v = segment.trim().parse::<i64>().ok()?;
        total += v * weight;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(json: &str) -> KeySpace {
        KeySpace::from_json(json).unwrap()
    }

    #[test]
    fn parse_shard_ranges() {
        assert_eq!(parse_shard_list("0-2,5"), vec![0, 1, 2, 5]);
        assert_eq!(parse_shard_list("3-1"), Vec::<i64>::new());
        assert_eq!(parse_shard_list("x,2"), vec![2]);
        assert_eq!(parse_shard_list(""), Vec::<i64>::new());
        assert_eq!(parse_shard_list(" 1 , 4-6 "), vec![1, 4, 5, 6]);
        assert_eq!(parse_shard_list("1-2-3,9"), vec![9]);
    }

    #[test]
    fn parse_expire_weights_segments_in_given_order() {
        assert_eq!(parse_expire("30:5:2"), Some(30 + 5 * 60 + 2 * 3600));
        assert_eq!(parse_expire("45"), Some(45));
        assert_eq!(parse_expire("0:0:0:1"), Some(86400));
        assert_eq!(parse_expire(""), None);
        assert_eq!(parse_expire("abc"), None);
        assert_eq!(parse_expire("10:x"), None);
    }

    #[test]
    fn group_defaults_are_inherited_and_overridable() {
        let ks = doc(
            r#"{"groups": [{
                "name": "UserDb",
                "db": "0-1",
                "expire": "0:30",
                "items": [
                    {"name": "Session", "key": "sess"},
                    {"name": "Profile", "key": "prof", "db": "5", "expire": "10"}
                ]
            }]}"#,
        );
        let sess = ks.resolve("UserDb", "Session").unwrap();
        assert_eq!(sess.shards, vec![0, 1]);
        assert_eq!(sess.expire, Some(1800));
        let prof = ks.resolve("UserDb", "Profile").unwrap();
        assert_eq!(prof.shards, vec![5]);
        assert_eq!(prof.expire, Some(10));
    }

    #[test]
    fn first_match_wins_on_duplicates() {
        let ks = doc(
            r#"{"groups": [{
                "name": "N",
                "items": [
                    {"name": "a", "key": "first"},
                    {"name": "a", "key": "second"}
                ]
            }]}"#,
        );
        assert_eq!(ks.key("N", "a"), Some("first"));
    }

    #[test]
    fn lookup_uses_value_equality() {
        let ks = doc(r#"{"groups": [{"name": "GeoDb", "items": [{"name": "VehGps", "key": "veh"}]}]}"#);
        let node = String::from("Geo") + "Db";
        let item = format!("Veh{}", "Gps");
        assert!(ks.resolve(&node, &item).is_some());
        assert!(ks.resolve("GeoDb", "missing").is_none());
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = KeySpace::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), crate::CacheErrorKind::Config);
    }
}
