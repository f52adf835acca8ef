//! The set façade: an unordered collection of typed members.

use std::marker::PhantomData;

use redis::{cmd, ConnectionLike};

use crate::codec::CacheValue;
use crate::errors::{CacheError, CacheResult};
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::iter::{RawScan, ScanCursor};
use crate::key::KeyPart;
use crate::types::SetOperation;

/// Typed access to set keys (`SADD`/`SMEMBERS`/`SSCAN`, plus the union,
/// intersection and difference combinators).
pub struct SetCache<T, C> {
    binding: CacheBinding,
    con: C,
    _member: PhantomData<fn() -> T>,
}

implement_redis_cache!(SetCache<T>);

impl<T: CacheValue, C: ConnectionLike> SetCache<T, C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(SetCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
            _member: PhantomData,
        })
    }

    /// Adds one member.  Returns whether it was not already present.
    pub fn add(&mut self, member: &T, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        let added: i64 = cmd("SADD").arg(&key).arg(member).query(&mut self.con)?;
        Ok(added > 0)
    }

    /// Adds a batch of members; the whole batch is encoded before the
    /// first command is sent.  Returns how many were newly added.
    pub fn add_many(&mut self, members: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        let encoded = self.binding.encode_all(members)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut add = cmd("SADD");
        add.arg(&key);
        for member in &encoded {
            add.arg(member);
        }
        Ok(add.query(&mut self.con)?)
    }

    /// All members of the set.
    pub fn members(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Vec<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("SMEMBERS").arg(&key).query(&mut self.con)?;
        self.decode_members(raw)
    }

    /// Combines the sets at two composed keys and returns the result.
    ///
    /// Both keys are composed from this façade's record; the command runs
    /// on the shard of the first key, so the configuration must keep sets
    /// meant to be combined on a common shard.
    pub fn join(
        &mut self,
        first_args: &[&dyn KeyPart],
        second_args: &[&dyn KeyPart],
        op: SetOperation,
    ) -> CacheResult<Vec<T>> {
        let first = self.binding.cache_key(first_args)?;
        let second = self.binding.cache_key(second_args)?;
        self.binding.route_key(&mut self.con, &first)?;
        let command = match op {
            SetOperation::Union => "SUNION",
            SetOperation::Intersect => "SINTER",
            SetOperation::Difference => "SDIFF",
        };
        let raw: Vec<Vec<u8>> = cmd(command).arg(&first).arg(&second).query(&mut self.con)?;
        self.decode_members(raw)
    }

    /// Combines two sets and stores the result at a third composed key.
    /// Returns the stored cardinality.
    pub fn join_store(
        &mut self,
        dest_args: &[&dyn KeyPart],
        first_args: &[&dyn KeyPart],
        second_args: &[&dyn KeyPart],
        op: SetOperation,
    ) -> CacheResult<i64> {
        let dest = self.binding.cache_key(dest_args)?;
        let first = self.binding.cache_key(first_args)?;
        let second = self.binding.cache_key(second_args)?;
        self.binding.route_key(&mut self.con, &first)?;
        let command = match op {
            SetOperation::Union => "SUNIONSTORE",
            SetOperation::Intersect => "SINTERSTORE",
            SetOperation::Difference => "SDIFFSTORE",
        };
        Ok(cmd(command)
            .arg(&dest)
            .arg(&first)
            .arg(&second)
            .query(&mut self.con)?)
    }

    /// Whether the member is in the set.
    pub fn contains_member(&mut self, member: &T, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        let found: i64 = cmd("SISMEMBER").arg(&key).arg(member).query(&mut self.con)?;
        Ok(found > 0)
    }

    /// Cardinality of the set.
    pub fn len(&mut self, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("SCARD").arg(&key).query(&mut self.con)?)
    }

    /// Moves a member between two composed keys.  Runs on the shard of the
    /// source key.
    pub fn move_member(
        &mut self,
        source_args: &[&dyn KeyPart],
        dest_args: &[&dyn KeyPart],
        member: &T,
    ) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let source = self.binding.cache_key(source_args)?;
        let dest = self.binding.cache_key(dest_args)?;
        self.binding.route_key(&mut self.con, &source)?;
        let moved: i64 = cmd("SMOVE")
            .arg(&source)
            .arg(&dest)
            .arg(member)
            .query(&mut self.con)?;
        Ok(moved > 0)
    }

    /// Removes and returns one arbitrary member.
    pub fn pop(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("SPOP").arg(&key).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Removes and returns up to `count` members.
    pub fn pop_many(&mut self, count: i64, args: &[&dyn KeyPart]) -> CacheResult<Vec<T>> {
        if count <= 0 {
            return Err(CacheError::validation(format!("count {count} is not positive")));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("SPOP").arg(&key).arg(count).query(&mut self.con)?;
        self.decode_members(raw)
    }

    /// Returns one random member without removing it.
    pub fn random(&mut self, args: &[&dyn KeyPart]) -> CacheResult<Option<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Option<Vec<u8>> = cmd("SRANDMEMBER").arg(&key).query(&mut self.con)?;
        self.binding.decode(raw)
    }

    /// Returns up to `count` random members without removing them.
    pub fn random_many(&mut self, count: i64, args: &[&dyn KeyPart]) -> CacheResult<Vec<T>> {
        if count <= 0 {
            return Err(CacheError::validation(format!("count {count} is not positive")));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd("SRANDMEMBER")
            .arg(&key)
            .arg(count)
            .query(&mut self.con)?;
        self.decode_members(raw)
    }

    /// Removes one member.  Returns whether it existed.
    pub fn remove_member(&mut self, member: &T, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        let removed: i64 = cmd("SREM").arg(&key).arg(member).query(&mut self.con)?;
        Ok(removed > 0)
    }

    /// Removes a batch of members; returns how many existed.
    pub fn remove_members(&mut self, members: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        let encoded = self.binding.encode_all(members)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut rem = cmd("SREM");
        rem.arg(&key);
        for member in &encoded {
            rem.arg(member);
        }
        Ok(rem.query(&mut self.con)?)
    }

    /// Scans the set incrementally, yielding decoded members.
    pub fn scan(
        &mut self,
        pattern: &str,
        page_size: usize,
        args: &[&dyn KeyPart],
    ) -> CacheResult<ScanCursor<'_, T, C>> {
        if pattern.is_empty() {
            return Err(CacheError::validation("scan pattern is empty"));
        }
        if page_size == 0 {
            return Err(CacheError::validation("scan page size is zero"));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mapper = self.binding.mapper_arc();
        let raw = RawScan::open(&mut self.con, "SSCAN", key, pattern.to_string(), page_size)?;
        Ok(ScanCursor::new(raw, mapper))
    }

    fn decode_members(&self, raw: Vec<Vec<u8>>) -> CacheResult<Vec<T>> {
        let mut out = Vec::with_capacity(raw.len());
        for bytes in raw {
            if let Some(member) = self.binding.decode(Some(bytes))? {
                out.push(member);
            }
        }
        Ok(out)
    }
}
