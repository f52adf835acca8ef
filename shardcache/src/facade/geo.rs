//! The geospatial façade: named positions with radius queries.

use redis::{cmd, Cmd, ConnectionLike};

use crate::errors::{CacheError, CacheResult};
use crate::facade::{implement_redis_cache, CacheBinding, CacheContext};
use crate::geo::{GeoMember, GeoPos, GeoRadiusResult, RadiusReply, Unit};
use crate::key::KeyPart;
use crate::types::Order;

/// Typed access to geospatial keys (`GEOADD`/`GEOPOS`/`GEORADIUS`).
///
/// Member names are plain strings; the payload mapper is not involved.
pub struct GeoCache<C> {
    binding: CacheBinding,
    con: C,
}

implement_redis_cache!(GeoCache<>);

impl<C: ConnectionLike> GeoCache<C> {
    /// Binds the façade to `(node, item)` over `con`.
    pub fn new(node: &str, item: &str, con: C, context: &CacheContext) -> CacheResult<Self> {
        Ok(GeoCache {
            binding: CacheBinding::bind(node, item, context)?,
            con,
        })
    }

    /// Adds or moves one named position.  Returns whether the member was
    /// newly created (moving an existing member returns `false`).
    pub fn add(&mut self, name: &str, pos: GeoPos, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        Self::check_name(name)?;
        let key = self.binding.route(&mut self.con, args)?;
        let added: i64 = cmd("GEOADD")
            .arg(&key)
            .arg(pos)
            .arg(name)
            .query(&mut self.con)?;
        Ok(added > 0)
    }

    /// Adds or moves a batch of members in one command; returns how many
    /// were newly created.
    pub fn add_many(&mut self, members: &[GeoMember], args: &[&dyn KeyPart]) -> CacheResult<i64> {
        if members.is_empty() {
            return Ok(0);
        }
        for member in members {
            Self::check_name(&member.name)?;
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mut add = cmd("GEOADD");
        add.arg(&key);
        for member in members {
            add.arg(member.pos).arg(&member.name);
        }
        Ok(add.query(&mut self.con)?)
    }

    /// The stored position of one member, or `None` when it is absent.
    pub fn position(&mut self, name: &str, args: &[&dyn KeyPart]) -> CacheResult<Option<GeoPos>> {
        Self::check_name(name)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut positions: Vec<Option<GeoPos>> = cmd("GEOPOS")
            .arg(&key)
            .arg(name)
            .query(&mut self.con)?;
        Ok(positions.pop().flatten())
    }

    /// The stored positions of several members, in call order; absent
    /// members answer `None`.
    pub fn positions(
        &mut self,
        names: &[&str],
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<Option<GeoPos>>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        for name in names {
            Self::check_name(name)?;
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mut pos = cmd("GEOPOS");
        pos.arg(&key);
        for name in names {
            pos.arg(name);
        }
        Ok(pos.query(&mut self.con)?)
    }

    /// The distance between two members in `unit`, or `None` when either
    /// is absent.
    pub fn distance(
        &mut self,
        first: &str,
        second: &str,
        unit: Unit,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Option<f64>> {
        Self::check_name(first)?;
        Self::check_name(second)?;
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("GEODIST")
            .arg(&key)
            .arg(first)
            .arg(second)
            .arg(unit)
            .query(&mut self.con)?)
    }

    /// The geohash string of one member.
    pub fn hash(&mut self, name: &str, args: &[&dyn KeyPart]) -> CacheResult<Option<String>> {
        Self::check_name(name)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut hashes: Vec<Option<String>> = cmd("GEOHASH")
            .arg(&key)
            .arg(name)
            .query(&mut self.con)?;
        Ok(hashes.pop().flatten())
    }

    /// The geohash strings of several members, in call order.
    pub fn hashes(
        &mut self,
        names: &[&str],
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<Option<String>>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        for name in names {
            Self::check_name(name)?;
        }
        let key = self.binding.route(&mut self.con, args)?;
        let mut hash = cmd("GEOHASH");
        hash.arg(&key);
        for name in names {
            hash.arg(name);
        }
        Ok(hash.query(&mut self.con)?)
    }

    /// Removes one member.  Returns whether it existed.
    pub fn remove_member(&mut self, name: &str, args: &[&dyn KeyPart]) -> CacheResult<bool> {
        Self::check_name(name)?;
        let key = self.binding.route(&mut self.con, args)?;
        let removed: i64 = cmd("ZREM").arg(&key).arg(name).query(&mut self.con)?;
        Ok(removed > 0)
    }

    /// Number of stored members.
    pub fn len(&mut self, args: &[&dyn KeyPart]) -> CacheResult<i64> {
        let key = self.binding.route(&mut self.con, args)?;
        Ok(cmd("ZCARD").arg(&key).query(&mut self.con)?)
    }

    /// Members within `radius` of a stored member, closest-first or
    /// farthest-first per `order`.  `count` caps the result when positive.
    #[allow(clippy::too_many_arguments)]
    pub fn radius_of_member(
        &mut self,
        name: &str,
        radius: f64,
        unit: Unit,
        count: i64,
        order: Order,
        reply: RadiusReply,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<GeoRadiusResult>> {
        Self::check_name(name)?;
        Self::check_radius(radius)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut query = cmd("GEORADIUSBYMEMBER");
        query.arg(&key).arg(name);
        Self::finish_radius(&mut query, radius, unit, count, order, reply);
        Ok(query.query(&mut self.con)?)
    }

    /// Members within `radius` of an arbitrary point.
    #[allow(clippy::too_many_arguments)]
    pub fn radius_of_point(
        &mut self,
        center: GeoPos,
        radius: f64,
        unit: Unit,
        count: i64,
        order: Order,
        reply: RadiusReply,
        args: &[&dyn KeyPart],
    ) -> CacheResult<Vec<GeoRadiusResult>> {
        Self::check_radius(radius)?;
        let key = self.binding.route(&mut self.con, args)?;
        let mut query = cmd("GEORADIUS");
        query.arg(&key).arg(center);
        Self::finish_radius(&mut query, radius, unit, count, order, reply);
        Ok(query.query(&mut self.con)?)
    }

    fn finish_radius(
        query: &mut Cmd,
        radius: f64,
        unit: Unit,
        count: i64,
        order: Order,
        reply: RadiusReply,
    ) {
        query.arg(radius).arg(unit);
        if reply.wants_coordinates() {
            query.arg("WITHCOORD");
        }
        if reply.wants_distance() {
            query.arg("WITHDIST");
        }
        if count > 0 {
            query.arg("COUNT").arg(count);
        }
        query.arg(match order {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        });
    }

    fn check_name(name: &str) -> CacheResult<()> {
        if name.is_empty() {
            return Err(CacheError::validation("member name is empty"));
        }
        Ok(())
    }

    fn check_radius(radius: f64) -> CacheResult<()> {
        if radius < 0.0 {
            return Err(CacheError::validation(format!("radius {radius} is negative")));
        }
        Ok(())
    }
}
