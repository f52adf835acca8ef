//! The sorted-set façade: typed members ranked by a float score.

use std::marker::PhantomData;

use redis::{cmd, Cmd, ConnectionLike};

use crate::codec::CacheValue;
use crate::errors::{CacheError, CacheResult};
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::iter::{RawScan, ScoredScanCursor};
use crate::key::KeyPart;
use crate::types::{score_bound, Exclude, Order, ScoredValue, SetWhen};

/// Typed access to sorted-set keys (`ZADD`/`ZRANGE`/`ZSCAN` and friends).
pub struct SortedSetCache<T, C> {
    binding: CacheBinding,
    con: C,
    _member: PhantomData<fn() -> T>,
}

implement_redis_cache!(SortedSetCache<T>);

impl<T: CacheValue, C: ConnectionLike> SortedSetCache<T, C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(SortedSetCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
            _member: PhantomData,
        })
    }

    /// Adds or updates one member.  Returns whether a new member was
    /// created (an `IfExists` update of an existing member returns
    /// `false`).
    pub fn add(
        &mut self,
        member: &T,
        score: f64,
        when: SetWhen,
        args: &[&dyn KeyPart],
    ) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut add = cmd("ZADD");
        add.arg(&key);
        if let Some(condition) = when.condition_arg() {
            add.arg(condition);
        }
        let added: i64 = add.arg(score).arg(member).query(&mut self.con)?;
        Ok(added > 0)
    }

    /// [`add`](Self::add) for an already-paired entry.
    pub fn add_entry(
        &mut self,
        entry: &ScoredValue<T>,
        when: SetWhen,
        args: &[&dyn KeyPart],
    ) -> CacheResult<bool> {
        self.add(&entry.value, entry.score, when, args)
    }

    /// Adds or updates a batch of entries in one command; everything is
    /// encoded before the command is sent.  Returns how many members were
    /// newly created.
    pub fn add_many(
        &mut self,
        entries: &[ScoredValue<T>],
        when: SetWhen,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut encoded = Vec::with_capacity(entries.len());
        for entry in entries {
            encoded.push((entry.score, self.binding.encode(&entry.value)?));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mut add = cmd("ZADD");
        add.arg(&key);
        if let Some(condition) = when.condition_arg() {
            add.arg(condition);
        }
        for (score, member) in &encoded {
            add.arg(*score).arg(member);
        }
        Ok(add.query(&mut self.con)?)
    }

    /// Atomically adds `delta` to the member's score and returns the new
    /// score.
    pub fn increment(&mut self, member: &T, delta: f64, args: &[&dyn KeyPart]) -> CacheResult<f64> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("ZINCRBY")
            .arg(&key)
            .arg(delta)
            .arg(member)
            .query(&mut self.con)?)
    }

    /// Atomically subtracts `delta` from the member's score.
    pub fn decrement(&mut self, member: &T, delta: f64, args: &[&dyn KeyPart]) -> CacheResult<f64> {
        self.increment(member, -delta, args)
    }

    /// Counts the members whose score lies in the given range.
    pub fn count_by_score(
        &mut self,
        min: f64,
        max: f64,
        exclude: Exclude,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("ZCOUNT")
            .arg(&key)
            .arg(score_bound(min, exclude.excludes_start()))
            .arg(score_bound(max, exclude.excludes_stop()))
            .query(&mut self.con)?)
    }

    /// Removes and returns one extremum.  `Order::Asc` pops the highest
    /// score and `Order::Desc` the lowest; deployments depend on this
    /// historical mapping.
    pub fn pop(&mut self, order: Order, args: &[&dyn KeyPart]) -> CacheResult<Option<ScoredValue<T>>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd(Self::pop_command(order))
            .arg(&key)
            .query(&mut self.con)?;
        Ok(self.decode_scored(raw)?.pop())
    }

    /// Removes and returns up to `count` extrema.
    pub fn pop_many(
        &mut self,
        count: i64,
        order: Order,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<ScoredValue<T>>> {
        if count <= 0 {
            return Err(CacheError::validation(format!("count {count} is not positive")));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = cmd(Self::pop_command(order))
            .arg(&key)
            .arg(count)
            .query(&mut self.con)?;
        self.decode_scored(raw)
    }

    /// Members between two ranks, inclusive.
    pub fn range(
        &mut self,
        start: i64,
        stop: i64,
        order: Order,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let command = match order {
            Order::Asc => "ZRANGE",
            Order::Desc => "ZREVRANGE",
        };
        let raw: Vec<Vec<u8>> = cmd(command)
            .arg(&key)
            .arg(start)
            .arg(stop)
            .query(&mut self.con)?;
        self.decode_plain(raw)
    }

    /// Members between two ranks, with their scores.
    pub fn range_with_scores(
        &mut self,
        start: i64,
        stop: i64,
        order: Order,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<ScoredValue<T>>> {
        let key = self.binding.route(&mut self.con, args)?;
        let command = match order {
            Order::Asc => "ZRANGE",
            Order::Desc => "ZREVRANGE",
        };
        let raw: Vec<Vec<u8>> = cmd(command)
            .arg(&key)
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES")
            .query(&mut self.con)?;
        self.decode_scored(raw)
    }

    /// Members whose score lies in the given range, skipping `offset`
    /// matches and returning at most `count` (zero or negative returns
    /// all remaining).
    pub fn range_by_score(
        &mut self,
        min: f64,
        max: f64,
        exclude: Exclude,
        order: Order,
        offset: i64,
        count: i64,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<T>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = self
            .score_range_cmd(&key, min, max, exclude, order, offset, count, false)
            .query(&mut self.con)?;
        self.decode_plain(raw)
    }

    /// [`range_by_score`](Self::range_by_score), with scores.
    #[allow(clippy::too_many_arguments)]
    pub fn range_by_score_with_scores(
        &mut self,
        min: f64,
        max: f64,
        exclude: Exclude,
        order: Order,
        offset: i64,
        count: i64,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<ScoredValue<T>>> {
        let key = self.binding.route(&mut self.con, args)?;
        let raw: Vec<Vec<u8>> = self
            .score_range_cmd(&key, min, max, exclude, order, offset, count, true)
            .query(&mut self.con)?;
        self.decode_scored(raw)
    }

    /// Removes one member.  Returns whether it existed.
    pub fn remove_member(&mut self, member: &T, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        let member = self.binding.encode(member)?;
        let key = self.binding.route(&mut self.con, args)?;
        let removed: i64 = cmd("ZREM").arg(&key).arg(member).query(&mut self.con)?;
        Ok(removed > 0)
    }

    /// Removes a batch of members; returns how many existed.
    pub fn remove_members(&mut self, members: &[T], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        let encoded = self.binding.encode_all(members)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut rem = cmd("ZREM");
        rem.arg(&key);
        for member in &encoded {
            rem.arg(member);
        }
        Ok(rem.query(&mut self.con)?)
    }

    /// Removes the members between two ranks, inclusive.
    pub fn remove_range(
        &mut self,
        start: i64,
        stop: i64,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("ZREMRANGEBYRANK")
            .arg(&key)
            .arg(start)
            .arg(stop)
            .query(&mut self.con)?)
    }

    /// Removes the members whose score lies in the given range.
    pub fn remove_range_by_score(
        &mut self,
        min: f64,
        max: f64,
        exclude: Exclude,
        args: &[&dyn KeyPart],
    ) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("ZREMRANGEBYSCORE")
            .arg(&key)
            .arg(score_bound(min, exclude.excludes_start()))
            .arg(score_bound(max, exclude.excludes_stop()))
            .query(&mut self.con)?)
    }

    /// Scans the sorted set incrementally, yielding decoded entries.
    pub fn scan(
        &mut self,
        pattern: &str,
        page_size: usize,
        args: &[&dyn KeyPart],
    ) -> CacheResult<ScoredScanCursor<'_, T, C>> {
        if pattern.is_empty() {
            return Err(CacheError::validation("scan pattern is empty"));
        }
        if page_size == 0 {
            return Err(CacheError::validation("scan page size is zero"));
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mapper = self.binding.mapper_arc();
        let raw = RawScan::open(&mut self.con, "ZSCAN", key, pattern.to_string(), page_size)?;
        Ok(ScoredScanCursor::new(raw, mapper))
    }

    fn pop_command(order: Order) -> &'static str {
        match order {
            Order::Asc => "ZPOPMAX",
            Order::Desc => "ZPOPMIN",
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn score_range_cmd(
        &self,
        key: &str,
        min: f64,
        max: f64,
        exclude: Exclude,
        order: Order,
        offset: i64,
        count: i64,
        with_scores: bool,
    ) -> Cmd {
        let min = score_bound(min, exclude.excludes_start());
        let max = score_bound(max, exclude.excludes_stop());
        // A non-positive count means "all remaining"; LIMIT uses -1 for
        // that.
        let count = if count > 0 { count } else { -1 };
        let mut range = match order {
            Order::Asc => {
                let mut c = cmd("ZRANGEBYSCORE");
                c.arg(key).arg(min).arg(max);
                c
            }
            Order::Desc => {
                let mut c = cmd("ZREVRANGEBYSCORE");
                c.arg(key).arg(max).arg(min);
                c
            }
        };
        if with_scores {
            range.arg("WITHSCORES");
        }
        range.arg("LIMIT").arg(offset).arg(count);
        range
    }

    fn decode_plain(&self, raw: Vec<Vec<u8>>) -> CacheResult<Vec<T>> {
        let mut out = Vec::with_capacity(raw.len());
        for bytes in raw {
            if let Some(member) = self.binding.decode(Some(bytes))? {
                out.push(member);
            }
        }
        Ok(out)
    }

    /// Decodes a flat member/score reply into entries.
    fn decode_scored(&self, raw: Vec<Vec<u8>>) -> CacheResult<Vec<ScoredValue<T>>> {
        let mut out = Vec::with_capacity(raw.len() / 2);
        let mut chunks = raw.chunks_exact(2);
        for pair in &mut chunks {
            let member = self.binding.decode::<T>(Some(pair[0].clone()))?;
            let score = std::str::from_utf8(&pair[1])
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| CacheError::codec("sorted-set score is not a float"))?;
            if let Some(member) = member {
                out.push(ScoredValue::new(member, score));
            }
        }
        Ok(out)
    }
}
