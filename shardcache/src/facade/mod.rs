//! The typed façade family.
//!
//! Each façade binds one `(node, item)` key configuration to one
//! data-structure family and translates domain calls into: compose the
//! physical key, select its shard, issue the command on the bound
//! connection, decode the reply.  Façades hold no cache data; all state
//! lives in the remote store.

use std::sync::Arc;

use log::trace;
use redis::{cmd, ConnectionLike};

use crate::codec::{CacheValue, PayloadMapper};
use crate::config::{KeyConfig, KeySpace};
use crate::errors::{CacheError, CacheResult};
use crate::key::{compose_key, normalize_node, KeyPart};
use crate::shard::select_shard;

mod geo;
mod hash;
mod list;
mod set;
mod string;
mod zset;

pub use geo::GeoCache;
pub use hash::HashCache;
pub use list::ListCache;
pub use set::SetCache;
pub use string::StringCache;
pub use zset::SortedSetCache;

/// Shared, immutable context every façade is constructed from: the loaded
/// key space, the global key prefix, and the payload mapper.
///
/// All three are set once and never swapped afterwards; concurrent readers
/// need no synchronization.
#[derive(Clone)]
pub struct CacheContext {
    keyspace: Arc<KeySpace>,
    prefix: String,
    mapper: Arc<dyn PayloadMapper>,
}

impl CacheContext {
    /// Builds a context.  `prefix` is prepended verbatim to every composed
    /// key.
    pub fn new(
        keyspace: Arc<KeySpace>,
        prefix: impl Into<String>,
        mapper: Arc<dyn PayloadMapper>,
    ) -> CacheContext {
        CacheContext {
            keyspace,
            prefix: prefix.into(),
            mapper,
        }
    }

    /// The loaded key space.
    pub fn keyspace(&self) -> &KeySpace {
        &self.keyspace
    }

    /// The global key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The payload mapper.
    pub fn mapper(&self) -> &Arc<dyn PayloadMapper> {
        &self.mapper
    }
}

/// One façade's resolved configuration: the record it is bound to, the
/// normalized node prefix, and handles shared with the context.
pub struct CacheBinding {
    config: KeyConfig,
    prefix: String,
    node_prefix: String,
    mapper: Arc<dyn PayloadMapper>,
}

impl CacheBinding {
    /// Resolves `(node, item)` against the context's key space.  An empty
    /// node or item, or an unconfigured pair, is a fatal configuration
    /// error surfaced here, before any connection is touched.
    pub fn bind(node: &str, item: &str, context: &CacheContext) -> CacheResult<CacheBinding> {
        if node.is_empty() {
            return Err(CacheError::validation("node is empty"));
        }
        if item.is_empty() {
            return Err(CacheError::validation("item is empty"));
        }
        let config = context
            .keyspace
            .resolve(node, item)
            .cloned()
            .ok_or_else(|| CacheError::config(format!("{node}/{item} is not configured")))?;
        Ok(CacheBinding {
            node_prefix: normalize_node(&config.node),
            config,
            prefix: context.prefix.clone(),
            mapper: Arc::clone(&context.mapper),
        })
    }

    /// The bound key configuration.
    pub fn config(&self) -> &KeyConfig {
        &self.config
    }

    /// Composes the full physical key for `args`.
    pub fn cache_key(&self, args: &[&dyn KeyPart]) -> CacheResult<String> {
        compose_key(&self.config, &self.prefix, &self.node_prefix, args)
    }

    /// The shard a composed key lands on.
    pub fn shard(&self, key: &str) -> i64 {
        select_shard(&self.config.shards, key)
    }

    pub(crate) fn mapper(&self) -> &dyn PayloadMapper {
        &*self.mapper
    }

    pub(crate) fn mapper_arc(&self) -> Arc<dyn PayloadMapper> {
        Arc::clone(&self.mapper)
    }

    /// Composes the key, selects its shard on `con`, and returns the key.
    /// Every operation re-resolves both; no routing decision is cached.
    pub(crate) fn route<C: ConnectionLike>(
        &self,
        con: &mut C,
        args: &[&dyn KeyPart],
    ) -> CacheResult<String> {
        let key = self.cache_key(args)?;
        self.route_key(con, &key)?;
        Ok(key)
    }

    /// Selects the shard of an already-composed key.
    pub(crate) fn route_key<C: ConnectionLike>(&self, con: &mut C, key: &str) -> CacheResult<()> {
        let shard = self.shard(key);
        trace!("key {key} routed to shard {shard}");
        cmd("SELECT").arg(shard).query::<()>(con)?;
        Ok(())
    }

    pub(crate) fn encode<T: CacheValue>(&self, value: &T) -> CacheResult<Vec<u8>> {
        value.encode(self.mapper())
    }

    pub(crate) fn decode<T: CacheValue>(&self, bytes: Option<Vec<u8>>) -> CacheResult<Option<T>> {
        T::decode(bytes.as_deref(), self.mapper())
    }

    /// Encodes a whole batch up front, so a failing element is rejected
    /// before the first command reaches the server.
    pub(crate) fn encode_all<T: CacheValue>(&self, values: &[T]) -> CacheResult<Vec<Vec<u8>>> {
        values.iter().map(|v| self.encode(v)).collect()
    }
}

/// Operations shared by every façade: key management for the bound record.
///
/// Absence outcomes (`DEL`/`EXISTS` on a missing key) report `false`, never
/// an error.
pub trait RedisCache {
    /// The connection type the façade drives.
    type Con: ConnectionLike;

    /// The façade's binding.
    fn binding(&self) -> &CacheBinding;

    /// Splits the façade into its binding and connection.
    fn parts(&mut self) -> (&CacheBinding, &mut Self::Con);

    /// The bound key configuration.
    fn key_config(&self) -> &KeyConfig {
        self.binding().config()
    }

    /// The full physical key for `args`.
    fn cache_key(&self, args: &[&dyn KeyPart]) -> CacheResult<String> {
        self.binding().cache_key(args)
    }

    /// Deletes the key.  Returns whether anything was removed.
    fn remove(&mut self, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let (binding, con) = self.parts();
        let key = binding.route(con, args)?;
        let removed: i64 = cmd("DEL").arg(&key).query(con)?;
        Ok(removed > 0)
    }

    /// Whether the key exists.
    fn contains(&mut self, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let (binding, con) = self.parts();
        let key = binding.route(con, args)?;
        let found: i64 = cmd("EXISTS").arg(&key).query(con)?;
        Ok(found > 0)
    }

    /// Applies the configured expiration to the key; a record without one
    /// makes the key persistent.
    fn expire(&mut self, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let seconds = self.binding().config().expire.unwrap_or(0);
        self.expire_in(seconds, args)
    }

    /// Sets the key to expire in `seconds`; zero or negative makes it
    /// persistent.
    fn expire_in(&mut self, seconds: i64, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let (binding, con) = self.parts();
        let key = binding.route(con, args)?;
        let applied: i64 = if seconds > 0 {
            cmd("EXPIRE").arg(&key).arg(seconds).query(con)?
        } else {
            cmd("PERSIST").arg(&key).query(con)?
        };
        Ok(applied > 0)
    }

    /// Removes any expiration from the key.
    fn persist(&mut self, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let (binding, con) = self.parts();
        let key = binding.route(con, args)?;
        let applied: i64 = cmd("PERSIST").arg(&key).query(con)?;
        Ok(applied > 0)
    }

    /// Round-trips a `PING` on the bound connection.
    fn ping(&mut self) -> CacheResult<String> {
        let (_, con) = self.parts();
        let pong: String = cmd("PING").query(con)?;
        Ok(pong)
    }
}

macro_rules! implement_redis_cache {
    ($name:ident < $($g:ident),* >) => {
        impl<$($g,)* C> crate::facade::RedisCache for $name<$($g,)* C>
        where
            $($g: crate::codec::CacheValue,)*
            C: redis::ConnectionLike,
        {
            type Con = C;

            fn binding(&self) -> &crate::facade::CacheBinding {
                &self.binding
            }

            fn parts(&mut self) -> (&crate::facade::CacheBinding, &mut C) {
                (&self.binding, &mut self.con)
            }
        }
    };
}

pub(crate) use implement_redis_cache;
