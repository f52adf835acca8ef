//! Types used with the geospatial façade.

use redis::{ErrorKind, FromRedisValue, RedisError, RedisResult, RedisWrite, ToRedisArgs, Value};

use crate::errors::{CacheError, CacheResult};

/// Units accepted by distance and radius queries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    /// Meters.
    #[default]
    Meters,
    /// Kilometers.
    Kilometers,
    /// Miles.
    Miles,
    /// Feet.
    Feet,
}

impl ToRedisArgs for Unit {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        let unit = match *self {
            Unit::Meters => "m",
            Unit::Kilometers => "km",
            Unit::Miles => "mi",
            Unit::Feet => "ft",
        };
        out.write_arg(unit.as_bytes());
    }
}

/// A validated GPS position.
///
/// Construction fails immediately when the coordinates are outside the
/// WGS84 ranges; nothing out of range ever reaches the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPos {
    longitude: f64,
    latitude: f64,
}

impl GeoPos {
    /// Creates a position from `(longitude, latitude)`.
    pub fn lon_lat(longitude: f64, latitude: f64) -> CacheResult<GeoPos> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CacheError::validation(format!(
                "latitude {latitude} is out of range [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CacheError::validation(format!(
                "longitude {longitude} is out of range [-180, 180]"
            )));
        }
        Ok(GeoPos {
            longitude,
            latitude,
        })
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }
}

impl FromRedisValue for GeoPos {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let values: Vec<f64> = FromRedisValue::from_redis_value(v)?;
        match values[..] {
            [longitude, latitude] => GeoPos::lon_lat(longitude, latitude).map_err(|e| {
                RedisError::from((
                    ErrorKind::TypeError,
                    "Response contained an invalid coordinate",
                    e.to_string(),
                ))
            }),
            _ => Err(RedisError::from((
                ErrorKind::TypeError,
                "Response was of incompatible type",
                format!("Expected a coordinate pair (response was {v:?})"),
            ))),
        }
    }
}

impl ToRedisArgs for GeoPos {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        self.longitude.write_redis_args(out);
        self.latitude.write_redis_args(out);
    }

    fn num_of_args(&self) -> usize {
        2
    }
}

/// A named geospatial member.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMember {
    /// Member name.
    pub name: String,
    /// Member position.
    pub pos: GeoPos,
}

impl GeoMember {
    /// Pairs a name with a position.
    pub fn new(name: impl Into<String>, pos: GeoPos) -> GeoMember {
        GeoMember {
            name: name.into(),
            pos,
        }
    }
}

/// Selects which extras a radius query returns alongside member names.
///
/// This is a plain bitmask; the empty mask requests both coordinates and
/// distances, mirroring the behavior deployments already depend on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RadiusReply(u8);

impl RadiusReply {
    /// Names plus both extras (the historical meaning of "no flags").
    pub const NONE: RadiusReply = RadiusReply(0);
    /// Include each match's coordinates.
    pub const COORDINATES: RadiusReply = RadiusReply(1);
    /// Include each match's distance from the query center.
    pub const DISTANCE: RadiusReply = RadiusReply(2);

    /// Combines two masks.
    pub const fn with(self, other: RadiusReply) -> RadiusReply {
        RadiusReply(self.0 | other.0)
    }

    pub(crate) fn wants_coordinates(self) -> bool {
        self.0 == 0 || self.0 & Self::COORDINATES.0 != 0
    }

    pub(crate) fn wants_distance(self) -> bool {
        self.0 == 0 || self.0 & Self::DISTANCE.0 != 0
    }
}

/// One match of a radius query.
///
/// `dist` and `pos` are filled according to the [`RadiusReply`] mask the
/// query was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRadiusResult {
    /// The member name that matched.
    pub name: String,
    /// Distance from the query center, in the query's unit.
    pub dist: Option<f64>,
    /// The member's coordinates.
    pub pos: Option<GeoPos>,
}

impl FromRedisValue for GeoRadiusResult {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        // With no WITH* extras each match is a plain member name.
        if let Ok(name) = String::from_redis_value(v) {
            return Ok(GeoRadiusResult {
                name,
                dist: None,
                pos: None,
            });
        }

        if let Value::Array(ref items) = *v {
            if let Some(result) = GeoRadiusResult::parse_parts(items) {
                return Ok(result);
            }
        }

        Err(RedisError::from((
            ErrorKind::TypeError,
            "Response was of incompatible type",
            format!("Not a radius result (response was {v:?})"),
        )))
    }
}

impl GeoRadiusResult {
    fn parse_parts(items: &[Value]) -> Option<Self> {
        let mut iter = items.iter();

        // The member name always comes first.
        let name: String = match iter.next().map(FromRedisValue::from_redis_value) {
            Some(Ok(n)) => n,
            _ => return None,
        };

        let mut next = iter.next();

        // The distance, when requested, precedes the coordinates.
        let dist = match next.map(FromRedisValue::from_redis_value) {
            Some(Ok(d)) => {
                next = iter.next();
                Some(d)
            }
            _ => None,
        };

        let pos = match next.map(FromRedisValue::from_redis_value) {
            Some(Ok(p)) => Some(p),
            _ => None,
        };

        Some(GeoRadiusResult { name, dist, pos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    #[test]
    fn positions_validate_ranges() {
        assert!(GeoPos::lon_lat(13.361389, 38.115556).is_ok());
        assert!(GeoPos::lon_lat(0.0, 90.0).is_ok());
        assert!(GeoPos::lon_lat(0.0, 90.5).is_err());
        assert!(GeoPos::lon_lat(-180.5, 0.0).is_err());
    }

    #[test]
    fn position_parses_from_a_coordinate_pair() {
        let v = Value::Array(vec![bulk("13.361389"), bulk("38.115556")]);
        let pos = GeoPos::from_redis_value(&v).unwrap();
        assert!((pos.longitude() - 13.361389).abs() < 1e-9);
        assert!((pos.latitude() - 38.115556).abs() < 1e-9);
    }

    #[test]
    fn radius_result_parses_every_shape() {
        let bare = GeoRadiusResult::from_redis_value(&bulk("palermo")).unwrap();
        assert_eq!(bare.name, "palermo");
        assert_eq!(bare.dist, None);
        assert_eq!(bare.pos, None);

        let full = Value::Array(vec![
            bulk("palermo"),
            bulk("190.4424"),
            Value::Array(vec![bulk("13.361389"), bulk("38.115556")]),
        ]);
        let full = GeoRadiusResult::from_redis_value(&full).unwrap();
        assert_eq!(full.name, "palermo");
        assert!(full.dist.unwrap() > 190.0);
        assert!(full.pos.is_some());

        let coord_only = Value::Array(vec![
            bulk("palermo"),
            Value::Array(vec![bulk("13.361389"), bulk("38.115556")]),
        ]);
        let coord_only = GeoRadiusResult::from_redis_value(&coord_only).unwrap();
        assert_eq!(coord_only.dist, None);
        assert!(coord_only.pos.is_some());
    }

    #[test]
    fn empty_reply_mask_requests_both_extras() {
        assert!(RadiusReply::NONE.wants_coordinates());
        assert!(RadiusReply::NONE.wants_distance());
        assert!(RadiusReply::COORDINATES.wants_coordinates());
        assert!(!RadiusReply::COORDINATES.wants_distance());
        let both = RadiusReply::COORDINATES.with(RadiusReply::DISTANCE);
        assert!(both.wants_coordinates() && both.wants_distance());
    }
}
