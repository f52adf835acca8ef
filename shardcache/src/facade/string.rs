//! The string façade: one typed value per key.

use std::marker::PhantomData;

use redis::{cmd, ConnectionLike, Value};

use crate::codec::CacheValue;
use crate::errors::CacheResult;
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::key::KeyPart;
use crate::types::SetWhen;

/// Typed access to plain string keys (`GET`/`SET`/`INCRBY`).
pub struct StringCache<T, C> {
    binding: CacheBinding,
    con: C,
    _value: PhantomData<fn() -> T>,
}

implement_redis_cache!(StringCache<T>);

impl<T: CacheValue, C: ConnectionLike> StringCache<T, C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(StringCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
            _value: PhantomData,
        })
    }

    /// Reads the value, or `None`/the typed default when the key is
    /// absent.
    pub fn get(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("GET").arg(&key).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Writes the value without touching its expiration.  Returns `false`
    /// when the `when` condition skipped the write.
    pub fn set(&mut self, value: &T, when: SetWhen, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        self.set_cmd(value, None, when, args)
    }

    /// Writes the value with a time-to-live of `ttl_seconds`.
    pub fn set_for(
        &mut self,
        value: &T,
        ttl_seconds: i64,
        when: SetWhen,
        args: &[&dyn KeyPart],
    ) -> CacheResult<bool> {
        self.set_cmd(value, Some(ttl_seconds), when, args)
    }

    fn set_cmd(
        &mut self,
        value: &T,
        ttl_seconds: Option<i64>,
        when: SetWhen,
        args: &[&dyn KeyPart],
    ) -> CacheResult<bool> {
        let payload = self.binding.encode(value)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut set = cmd("SET");
        set.arg(&key).arg(payload);
        if let Some(ttl) = ttl_seconds {
            set.arg("EX").arg(ttl);
        }
        if let Some(condition) = when.condition_arg() {
            set.arg(condition);
        }
        // A skipped conditional write answers Nil instead of OK.
        let reply: Value = set.query(&mut self.con)?;
        Ok(!matches!(reply, Value::Nil))
    }

    /// Atomically adds `delta` to the value, which must be numeric on the
    /// server side.  A missing key counts from zero.
    pub fn increment(&mut self, delta: i64, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("INCRBY").arg(&key).arg(delta).query(&mut self.con)?)
    }

    /// Atomically subtracts `delta` from the value.
    pub fn decrement(&mut self, delta: i64, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.increment(-delta, args)
    }
}
