//! The hash façade: typed fields and values under one key.

use std::collections::HashMap;
use std::marker::PhantomData;

use redis::{cmd, ConnectionLike};

use crate::codec::CacheValue;
use crate::errors::{CacheError, CacheResult};
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::iter::{HashScanCursor, RawScan};
use crate::key::KeyPart;

/// Typed access to hash keys (`HGET`/`HSET`/`HSCAN`).
pub struct HashCache<F, V, C> {
    binding: CacheBinding,
    con: C,
    _entry: PhantomData<fn() -> (F, V)>,
}

implement_redis_cache!(HashCache<F, V>);

impl<F: CacheValue, V: CacheValue, C: ConnectionLike> HashCache<F, V, C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(HashCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
            _entry: PhantomData,
        })
    }

    /// Writes one field.  Returns whether the field was newly created.
    pub fn set(&mut self, field: &F, value: &V, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let field = self.binding.encode(field)?;
        let value = self.binding.encode(value)?;
        let key = self.binding.route(&mut self.con, args)?;
        let created: i64 = cmd("HSET")
            .arg(&key)
            .arg(field)
            .arg(value)
            .query(&mut self.con)?;
        Ok(created > 0)
    }

    /// Writes a batch of fields; a `None` value deletes its field instead.
    /// Every entry is encoded before the first command is sent, so a bad
    /// element rejects the whole batch without partial writes.
    pub fn set_many(
        &mut self,
        entries: &[(F, Option<V>)],
        args: &[&dyn KeyPart],
    ) -> CacheResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut writes = Vec::new();
        let mut deletes = Vec::new();
        for (field, value) in entries {
            let field = self.binding.encode(field)?;
            match value {
                Some(value) => writes.push((field, self.binding.encode(value)?)),
                None => deletes.push(field),
            }
        }
        let key = self.binding.route(&mut self.con, args)?;
        if !writes.is_empty() {
            let mut set = cmd("HSET");
            set.arg(&key);
            for (field, value) in &writes {
                set.arg(field).arg(value);
            }
            set.query::<()>(&mut self.con)?;
        }
        if !deletes.is_empty() {
            let mut del = cmd("HDEL");
            del.arg(&key);
            for field in &deletes {
                del.arg(field);
            }
            del.query::<()>(&mut self.con)?;
        }
        Ok(())
    }

    /// Reads the whole hash.
    pub fn get_all(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Vec<(F, V)>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: HashMap<Vec<u8>, Vec<u8>> = cmd("HGETALL").arg(&key).query(&mut self.con)?;
        let mut entries = Vec::with_capacity(raw.len());
        for (field, value) in raw {
            let field = self.binding.decode::<F>(Some(field))?;
            let value = self.binding.decode::<V>(Some(value))?;
            if let (Some(field), Some(value)) = (field, value) {
                entries.push((field, value));
            }
        }
        Ok(entries)
    }

    /// Reads one field.
    pub fn get(&mut self, field: &F, args: &[&dyn KeyPart]) -> CacheResult<Option<V>> {
        let field = self.binding.encode(field)?;
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("HGET").arg(&key).arg(field).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Reads several fields in one round trip; each absent field decodes
    /// to its type's default policy.
    pub fn get_many(&mut self, fields: &[F], args: &[&dyn KeyPart]) -> CacheResult<Vec<Option<V>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let encoded = self.binding.encode_all(fields)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut get = cmd("HMGET");
        get.arg(&key);
        for field in &encoded {
            get.arg(field);
        }
        let raw: Vec<Option<Vec<u8>>> = get.query(&mut self.con)?;
        raw.into_iter().map(|v| self.binding.decode(v)).collect()
    }

    /// All field names.
    pub fn fields(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Vec<F>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("HKEYS").arg(&key).query(&mut self.con)?;
        self.decode_present(raw)
    }

    /// All values.
    pub fn values(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Vec<V>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("HVALS").arg(&key).query(&mut self.con)?;
        self.decode_present(raw)
    }

    /// Number of fields.
    pub fn len(&mut self, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("HLEN").arg(&key).query(&mut self.con)?)
    }

    /// Whether the field exists.
    pub fn contains_field(&mut self, field: &F, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let field = self.binding.encode(field)?;
        let key = self.binding.route(&mut self.con, args)?;
        let found: i64 = cmd("HEXISTS").arg(&key).arg(field).query(&mut self.con)?;
        Ok(found > 0)
    }

    /// Deletes one field.  Returns whether it existed.
    pub fn remove_field(&mut self, field: &F, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let field = self.binding.encode(field)?;
        let key = self.binding.route(&mut self.con, args)?;
        let removed: i64 = cmd("HDEL").arg(&key).arg(field).query(&mut self.con)?;
        Ok(removed > 0)
    }

    /// Deletes several fields; returns how many existed.
    pub fn remove_fields(&mut self, fields: &[F], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let encoded = self.binding.encode_all(fields)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut del = cmd("HDEL");
        del.arg(&key);
        for field in &encoded {
            del.arg(field);
        }
        Ok(del.query(&mut self.con)?)
    }

    /// Atomically adds `delta` to a numeric field.
    pub fn increment(&mut self, field: &F, delta: i64, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let field = self.binding.encode(field)?;
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("HINCRBY")
            .arg(&key)
            .arg(field)
            .arg(delta)
            .query(&mut self.con)?)
    }

    /// Atomically subtracts `delta` from a numeric field.
    pub fn decrement(&mut self, field: &F, delta: i64, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.increment(field, -delta, args)
    }

    /// Scans the hash incrementally, yielding decoded `(field, value)`
    /// pairs.
    pub fn scan(
        &mut self,
        pattern: &str,
        page_size: usize,
        args: &[&dyn KeyPart],
    ) -> CacheResult<HashScanCursor<'_, F, V, C>> {
        if pattern.is_empty() {
            return Err(CacheError::validation("scan pattern is empty"));
        }
        if page_size == 0 {
            return Err(CacheError::validation("scan page size is zero"));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mapper = self.binding.mapper_arc();
        let raw = RawScan::open(&mut self.con, "HSCAN", key, pattern.to_string(), page_size)?;
        Ok(HashScanCursor::new(raw, mapper))
    }

    fn decode_present<T: CacheValue>(&self, raw: Vec<Vec<u8>>) -> CacheResult<Vec<T>> {
        let mut out = Vec::with_capacity(raw.len());
        for bytes in raw {
            if let Some(item) = self.binding.decode(Some(bytes))? {
                out.push(item);
            }
        }
        Ok(out)
    }
}
