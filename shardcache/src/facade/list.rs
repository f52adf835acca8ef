//! The list façade: a typed double-ended list under one key.

use std::marker::PhantomData;

use redis::{cmd, ConnectionLike};

use crate::codec::CacheValue;
use crate::errors::{CacheError, CacheResult};
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::key::KeyPart;

/// Typed access to list keys (`LPUSH`/`LRANGE`/`LREM`).
pub struct ListCache<T, C> {
    binding: CacheBinding,
    con: C,
    _item: PhantomData<fn() -> T>,
}

implement_redis_cache!(ListCache<T>);

impl<T: CacheValue, C: ConnectionLike> ListCache<T, C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(ListCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
            _item: PhantomData,
        })
    }

    /// Prepends one item.  Returns the list length afterwards.
    pub fn push_front(&mut self, item: &T, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.push("LPUSH", std::slice::from_ref(item), args)
    }

    /// Prepends a batch of items, first-to-last, so the last element of
    /// `items` ends up at the head.  Returns the list length afterwards.
    pub fn push_front_many(&mut self, items: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.push("LPUSH", items, args)
    }

    /// Appends one item.  Returns the list length afterwards.
    pub fn push_back(&mut self, item: &T, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.push("RPUSH", std::slice::from_ref(item), args)
    }

    /// Appends a batch of items in order.  Returns the list length
    /// afterwards.
    pub fn push_back_many(&mut self, items: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.push("RPUSH", items, args)
    }

    fn push(&mut self, command: &str, items: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let encoded = self.binding.encode_all(items)?;
        let key = self.binding.route(&mut self.con, args)?;
        if encoded.is_empty() {
            return Ok(cmd("LLEN").arg(&key).query(&mut self.con)?);
        }
        let mut push = cmd(command);
        push.arg(&key);
        for item in &encoded {
            push.arg(item);
        }
        Ok(push.query(&mut self.con)?)
    }

    /// The item at `index`, counted from the head.
    pub fn get(&mut self, index: i64, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        Self::check_index(index)?;
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("LINDEX").arg(&key).arg(index).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// The items between two indexes, inclusive.
    pub fn range(&mut self, start: i64, stop: i64, args: &[&dyn KeyPart]) -> CacheResult<Vec<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("LRANGE")
            .arg(&key)
            .arg(start)
            .arg(stop)
            .query(&mut self.con)?;
        let mut out = Vec::with_capacity(raw.len());
        for bytes in raw {
            if let Some(item) = self.binding.decode(Some(bytes))? {
                out.push(item);
            }
        }
        Ok(out)
    }

    /// Inserts `item` before the first occurrence of `pivot`.  Returns the
    /// new length, or `-1` when the pivot is absent.
    pub fn insert_before(
        &mut self,
        pivot: &T,
        item: &T,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        self.insert("BEFORE", pivot, item, args)
    }

    /// Inserts `item` after the first occurrence of `pivot`.  Returns the
    /// new length, or `-1` when the pivot is absent.
    pub fn insert_after(&mut self, pivot: &T, item: &T, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        self.insert("AFTER", pivot, item, args)
    }

    fn insert(
        &mut self,
        placement: &str,
        pivot: &T,
        item: &T,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        let pivot = self.binding.encode(pivot)?;
        let item = self.binding.encode(item)?;
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("LINSERT")
            .arg(&key)
            .arg(placement)
            .arg(pivot)
            .arg(item)
            .query(&mut self.con)?)
    }

    /// Removes and returns the head item.
    pub fn pop_front(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("LPOP").arg(&key).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Removes and returns the tail item.
    pub fn pop_back(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("RPOP").arg(&key).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Overwrites the item at `index`; the server rejects an index past
    /// the end.
    pub fn set(&mut self, index: i64, item: &T, args: &[&dyn KeyPart]) -> CacheResult<()> {
        Self::check_index(index)?;
        let item = self.binding.encode(item)?;
        let key = self.binding.route(&mut self.con, args)?;
        cmd("LSET")
            .arg(&key)
            .arg(index)
            .arg(item)
            .query::<()>(&mut self.con)?;
        Ok(())
    }

    /// Removes occurrences of `item`: `count > 0` from the head, `< 0`
    /// from the tail, `0` all of them.  Returns how many were removed.
    pub fn remove_value(&mut self, item: &T, count: i64, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let item = self.binding.encode(item)?;
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("LREM")
            .arg(&key)
            .arg(count)
            .arg(item)
            .query(&mut self.con)?)
    }

    /// Trims the list to the items between two indexes, inclusive.
    pub fn trim(&mut self, start: i64, stop: i64, args: &[&dyn KeyPart]) -> CacheResult<()> {
        let key = self.binding.route(&mut self.con, args)?;
        cmd("LTRIM")
            .arg(&key)
            .arg(start)
            .arg(stop)
            .query::<()>(&mut self.con)?;
        Ok(())
    }

    /// The list length.
    pub fn len(&mut self, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("LLEN").arg(&key).query(&mut self.con)?)
    }

    fn check_index(index: i64) -> CacheResult<()> {
        if index < 0 {
            return Err(CacheError::validation(format!("index {index} is negative")));
        }
        Ok(())
    }
}
