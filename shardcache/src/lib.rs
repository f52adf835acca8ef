//! shardcache is a typed, configuration-driven cache layer over a Redis
//! deployment whose logical databases act as shards.
//!
//! Every cache key is described by a configuration record resolved from a
//! `(node, item)` pair: the record carries the key template, the default
//! expiration, and the list of logical databases the key is distributed
//! over.  A façade bound to one record composes the physical key from its
//! call arguments, deterministically picks the shard the key lands on,
//! issues the command there, and decodes the reply into the caller's type.
//!
//! # Basic usage
//!
//! Load a key space, build a context, and bind a façade:
//!
//! ```no_run
//! use std::sync::Arc;
//! use shardcache::{CacheContext, JsonMapper, KeySpace, SetWhen, StringCache};
//!
//! fn run() -> shardcache::CacheResult<()> {
//!     let keyspace = Arc::new(KeySpace::from_json(
//!         r#"{"groups": [{
//!             "name": "UserDb",
//!             "db": "0-3",
//!             "expire": "0:30",
//!             "items": [{"name": "Session", "key": "session"}]
//!         }]}"#,
//!     )?);
//!     let context = CacheContext::new(keyspace, "app:", Arc::new(JsonMapper));
//!
//!     let client = redis::Client::open("redis://127.0.0.1/")?;
//!     let mut sessions: StringCache<String, _> =
//!         StringCache::new("UserDb", "Session", client.get_connection()?, &context)?;
//!
//!     sessions.set(&"alice".to_string(), SetWhen::Always, &[&42i64])?;
//!     let user = sessions.get(&[&42i64])?;
//!     # let _ = user;
//!     Ok(())
//! }
//! ```
//!
//! # Façade families
//!
//! One façade per data-structure family, all sharing the key-management
//! surface of [`RedisCache`]:
//!
//! * [`StringCache`]: one value per key.
//! * [`HashCache`]: typed field/value pairs.
//! * [`SetCache`]: unordered members, with union/intersect/difference.
//! * [`SortedSetCache`]: members ranked by a float score.
//! * [`GeoCache`]: named positions and radius queries.
//! * [`ListCache`]: a typed double-ended list.
//!
//! [`CacheFactory`] builds façades over fresh connections from one shared
//! client; for embedding or testing, every façade is also directly
//! constructible over any [`redis::ConnectionLike`] value.
//!
//! # Payload mapping
//!
//! Values travel as bytes produced by a [`PayloadMapper`], injected once
//! through the [`CacheContext`].  Primitives, `String` and `Vec<u8>` work
//! out of the box; any serde type opts in with one macro line:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Vehicle {
//!     id: i64,
//!     plate: String,
//! }
//!
//! shardcache::implement_mapped_value!(Vehicle);
//! ```
//!
//! Reads of absent keys never fail: numeric and boolean types answer their
//! zero value, everything else answers `None`.

#![deny(non_camel_case_types)]
#![warn(missing_docs)]

mod codec;
mod config;
mod errors;
mod facade;
mod factory;
mod geo;
mod iter;
mod key;
mod shard;
mod types;

pub use crate::codec::{
    decode_with_mapper, encode_with_mapper, CacheValue, JsonMapper, PayloadMapper,
};
pub use crate::config::{
    parse_expire, parse_shard_list, GroupDoc, ItemDoc, KeyConfig, KeySpace, KeySpaceDoc,
};
pub use crate::errors::{CacheError, CacheErrorKind, CacheResult};
pub use crate::facade::{
    CacheBinding, CacheContext, GeoCache, HashCache, ListCache, RedisCache, SetCache,
    SortedSetCache, StringCache,
};
pub use crate::factory::{CacheFactory, CacheFamily, CacheName};
pub use crate::geo::{GeoMember, GeoPos, GeoRadiusResult, RadiusReply, Unit};
pub use crate::iter::{HashScanCursor, ScanCursor, ScoredScanCursor};
pub use crate::key::{compose_key, normalize_node, KeyPart};
pub use crate::shard::select_shard;
pub use crate::types::{Exclude, Order, ScoredValue, SetOperation, SetWhen};
