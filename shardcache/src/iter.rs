//! Pull-based cursors over the server's incremental scan commands.
//!
//! One paging engine drives `SSCAN`, `HSCAN` and `ZSCAN`; the typed fronts
//! decode elements, field/value pairs, or member/score pairs out of each
//! page.  Cursors are finite and non-restartable: once the server reports
//! cursor 0 and the local batch drains, iteration ends for good.

use std::marker::PhantomData;
use std::sync::Arc;

use redis::{cmd, ConnectionLike, Value};

use crate::codec::{CacheValue, PayloadMapper};
use crate::errors::CacheResult;
use crate::types::ScoredValue;

/// Shared paging state: the scan command, its fixed arguments, the current
/// server cursor, and the locally buffered page.
pub(crate) struct RawScan<'a, C: ConnectionLike> {
    con: &'a mut C,
    command: &'static str,
    key: String,
    pattern: String,
    page_size: usize,
    cursor: u64,
    batch: std::vec::IntoIter<Value>,
    closed: bool,
}

impl<'a, C: ConnectionLike> RawScan<'a, C> {
    /// Issues the first page and returns the cursor.  The caller has
    /// already routed `con` to the key's shard.
    pub(crate) fn open(
        con: &'a mut C,
        command: &'static str,
        key: String,
        pattern: String,
        page_size: usize,
    ) -> CacheResult<RawScan<'a, C>> {
        let mut scan = RawScan {
            con,
            command,
            key,
            pattern,
            page_size,
            cursor: 0,
            batch: Vec::new().into_iter(),
            closed: false,
        };
        scan.fetch_page()?;
        Ok(scan)
    }

    fn fetch_page(&mut self) -> CacheResult<()> {
        let (cursor, items): (u64, Vec<Value>) = cmd(self.command)
            .arg(&self.key)
            .arg(self.cursor)
            .arg("MATCH")
            .arg(&self.pattern)
            .arg("COUNT")
            .arg(self.page_size)
            .query(self.con)?;
        self.cursor = cursor;
        self.batch = items.into_iter();
        Ok(())
    }

    /// Next raw value, refetching when the local page drains.  Errors on a
    /// refetch end the iteration, matching the underlying client's
    /// iterator behavior.
    pub(crate) fn next_value(&mut self) -> Option<Value> {
        loop {
            if self.closed {
                return None;
            }
            if let Some(v) = self.batch.next() {
                return Some(v);
            }
            if self.cursor == 0 {
                self.close();
                return None;
            }
            if self.fetch_page().is_err() {
                self.close();
                return None;
            }
        }
    }

    /// Releases the buffered page.  Safe to call any number of times; the
    /// release happens once.
    pub(crate) fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.batch = Vec::new().into_iter();
        }
    }
}

fn value_bytes(v: Value) -> Option<Vec<u8>> {
    match v {
        Value::BulkString(b) => Some(b),
        Value::SimpleString(s) => Some(s.into_bytes()),
        _ => None,
    }
}

/// Cursor over the members of a scanned set.
pub struct ScanCursor<'a, T, C: ConnectionLike> {
    raw: RawScan<'a, C>,
    mapper: Arc<dyn PayloadMapper>,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: CacheValue, C: ConnectionLike> ScanCursor<'a, T, C> {
    pub(crate) fn new(raw: RawScan<'a, C>, mapper: Arc<dyn PayloadMapper>) -> Self {
        ScanCursor {
            raw,
            mapper,
            _item: PhantomData,
        }
    }

    /// Ends the iteration and releases buffered state; idempotent.
    pub fn close(&mut self) {
        self.raw.close();
    }
}

impl<T: CacheValue, C: ConnectionLike> Iterator for ScanCursor<'_, T, C> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        // Entries that fail to decode are skipped, like the client's own
        // scan iterator.
        loop {
            let bytes = value_bytes(self.raw.next_value()?)?;
            if let Ok(Some(item)) = T::decode(Some(&bytes), &*self.mapper) {
                return Some(item);
            }
        }
    }
}

/// Cursor over the `(field, value)` pairs of a scanned hash.
pub struct HashScanCursor<'a, F, V, C: ConnectionLike> {
    raw: RawScan<'a, C>,
    mapper: Arc<dyn PayloadMapper>,
    _item: PhantomData<fn() -> (F, V)>,
}

impl<'a, F: CacheValue, V: CacheValue, C: ConnectionLike> HashScanCursor<'a, F, V, C> {
    pub(crate) fn new(raw: RawScan<'a, C>, mapper: Arc<dyn PayloadMapper>) -> Self {
        HashScanCursor {
            raw,
            mapper,
            _item: PhantomData,
        }
    }

    /// Ends the iteration and releases buffered state; idempotent.
    pub fn close(&mut self) {
        self.raw.close();
    }
}

impl<F: CacheValue, V: CacheValue, C: ConnectionLike> Iterator for HashScanCursor<'_, F, V, C> {
    type Item = (F, V);

    fn next(&mut self) -> Option<(F, V)> {
        // Pages interleave fields and values.
        loop {
            let field = value_bytes(self.raw.next_value()?)?;
            let value = value_bytes(self.raw.next_value()?)?;
            let field = F::decode(Some(&field), &*self.mapper);
            let value = V::decode(Some(&value), &*self.mapper);
            if let (Ok(Some(field)), Ok(Some(value))) = (field, value) {
                return Some((field, value));
            }
        }
    }
}

/// Cursor over the `(member, score)` pairs of a scanned sorted set.
pub struct ScoredScanCursor<'a, T, C: ConnectionLike> {
    raw: RawScan<'a, C>,
    mapper: Arc<dyn PayloadMapper>,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T: CacheValue, C: ConnectionLike> ScoredScanCursor<'a, T, C> {
    pub(crate) fn new(raw: RawScan<'a, C>, mapper: Arc<dyn PayloadMapper>) -> Self {
        ScoredScanCursor {
            raw,
            mapper,
            _item: PhantomData,
        }
    }

    /// Ends the iteration and releases buffered state; idempotent.
    pub fn close(&mut self) {
        self.raw.close();
    }
}

impl<T: CacheValue, C: ConnectionLike> Iterator for ScoredScanCursor<'_, T, C> {
    type Item = ScoredValue<T>;

    fn next(&mut self) -> Option<ScoredValue<T>> {
        loop {
            let member = value_bytes(self.raw.next_value()?)?;
            let score = value_bytes(self.raw.next_value()?)?;
            let member = T::decode(Some(&member), &*self.mapper);
            let score = std::str::from_utf8(&score)
                .ok()
                .and_then(|s| s.parse::<f64>().ok());
            if let (Ok(Some(member)), Some(score)) = (member, score) {
                return Some(ScoredValue::new(member, score));
            }
        }
    }
}
