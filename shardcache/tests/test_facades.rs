use std::sync::Arc;

use redis::{cmd, Value};
use redis_test::{MockCmd, MockRedisConnection};

use shardcache::{
    select_shard, CacheContext, CacheErrorKind, CacheResult, GeoCache, HashCache, JsonMapper,
    KeySpace, ListCache, Order, PayloadMapper, RadiusReply, RedisCache, ScoredValue, SetCache,
    SetWhen, SortedSetCache, StringCache, Unit,
};

fn context() -> CacheContext {
    let keyspace = KeySpace::from_json(
        r#"{"groups": [
            {
                "name": "UserDb",
                "db": "0-3",
                "expire": "0:30",
                "items": [
                    {"name": "Session", "key": "sess"},
                    {"name": "Tags", "key": "tags"}
                ]
            },
            {
                "name": "GeoDb",
                "db": "2",
                "items": [{"name": "VehGps", "key": "veh"}]
            }
        ]}"#,
    )
    .unwrap();
    CacheContext::new(Arc::new(keyspace), "test:", Arc::new(JsonMapper))
}

fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

/// `SELECT` for the shard the key lands on, as every operation issues it.
fn select_for(key: &str) -> MockCmd {
    let shard = select_shard(&[0, 1, 2, 3], key);
    MockCmd::new(cmd("SELECT").arg(shard), Ok(Value::Okay))
}

#[test]
fn string_get_routes_and_decodes() {
    let key = "test:user_db:sess:42";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(cmd("GET").arg(key), Ok(bulk("alice"))),
    ]);

    let mut sessions: StringCache<String, _> =
        StringCache::new("UserDb", "Session", con, &context()).unwrap();
    assert_eq!(sessions.get(&[&42i64]).unwrap(), Some("alice".to_string()));
}

#[test]
fn string_conditional_set_reports_skipped_writes() {
    let key = "test:user_db:sess:42";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("SET").arg(key).arg("alice").arg("NX"),
            Ok(Value::Nil),
        ),
        select_for(key),
        MockCmd::new(
            cmd("SET").arg(key).arg("alice").arg("EX").arg(60),
            Ok(Value::Okay),
        ),
    ]);

    let mut sessions: StringCache<String, _> =
        StringCache::new("UserDb", "Session", con, &context()).unwrap();
    let alice = "alice".to_string();
    assert!(!sessions
        .set(&alice, SetWhen::IfNotExists, &[&42i64])
        .unwrap());
    assert!(sessions
        .set_for(&alice, 60, SetWhen::Always, &[&42i64])
        .unwrap());
}

#[test]
fn key_management_uses_the_configured_expiration() {
    let key = "test:user_db:sess:7";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(cmd("EXPIRE").arg(key).arg(1800), Ok(Value::Int(1))),
        select_for(key),
        MockCmd::new(cmd("DEL").arg(key), Ok(Value::Int(1))),
        select_for(key),
        MockCmd::new(cmd("EXISTS").arg(key), Ok(Value::Int(0))),
    ]);

    let mut sessions: StringCache<String, _> =
        StringCache::new("UserDb", "Session", con, &context()).unwrap();
    assert!(sessions.expire(&[&7i64]).unwrap());
    assert!(sessions.remove(&[&7i64]).unwrap());
    assert!(!sessions.contains(&[&7i64]).unwrap());
}

struct RefusingMapper;

impl PayloadMapper for RefusingMapper {
    fn to_text(&self, _value: &serde_json::Value) -> CacheResult<String> {
        Err(serde_json::from_str::<serde_json::Value>("")
            .unwrap_err()
            .into())
    }

    fn from_text(&self, _text: &str) -> CacheResult<serde_json::Value> {
        Err(serde_json::from_str::<serde_json::Value>("")
            .unwrap_err()
            .into())
    }
}

#[test]
fn bulk_writes_reject_before_any_command() {
    let keyspace = KeySpace::from_json(
        r#"{"groups": [{"name": "UserDb", "db": "0", "items": [{"name": "Tags", "key": "tags"}]}]}"#,
    )
    .unwrap();
    let context = CacheContext::new(Arc::new(keyspace), "test:", Arc::new(RefusingMapper));

    // An empty script: any command reaching the connection fails the test.
    let con = MockRedisConnection::new(vec![]);
    let mut tags: HashCache<String, i64, _> =
        HashCache::new("UserDb", "Tags", con, &context).unwrap();

    let err = tags
        .set_many(&[("color".to_string(), Some(1))], &[])
        .unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Codec);
}

#[test]
fn hash_reads_fill_absent_fields_with_defaults() {
    let key = "test:user_db:tags:9";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("HMGET").arg(key).arg("a").arg("b"),
            Ok(Value::Array(vec![bulk("5"), Value::Nil])),
        ),
    ]);

    let mut tags: HashCache<String, i64, _> =
        HashCache::new("UserDb", "Tags", con, &context()).unwrap();
    let values = tags
        .get_many(&["a".to_string(), "b".to_string()], &[&9i64])
        .unwrap();
    // An absent numeric field decodes to zero, not to an error.
    assert_eq!(values, vec![Some(5), Some(0)]);
}

#[test]
fn set_scan_pages_through_the_cursor() {
    let key = "test:user_db:tags:1";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("SSCAN")
                .arg(key)
                .arg(0)
                .arg("MATCH")
                .arg("*")
                .arg("COUNT")
                .arg(10),
            Ok(Value::Array(vec![
                bulk("17"),
                Value::Array(vec![bulk("1"), bulk("2")]),
            ])),
        ),
        MockCmd::new(
            cmd("SSCAN")
                .arg(key)
                .arg(17)
                .arg("MATCH")
                .arg("*")
                .arg("COUNT")
                .arg(10),
            Ok(Value::Array(vec![
                bulk("0"),
                Value::Array(vec![bulk("3")]),
            ])),
        ),
    ]);

    let mut tags: SetCache<i64, _> = SetCache::new("UserDb", "Tags", con, &context()).unwrap();
    let items: Vec<i64> = tags.scan("*", 10, &[&1i64]).unwrap().collect();
    assert_eq!(items, vec![1, 2, 3]);
}

#[test]
fn closed_cursor_stays_closed() {
    let key = "test:user_db:tags:1";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("SSCAN")
                .arg(key)
                .arg(0)
                .arg("MATCH")
                .arg("*")
                .arg("COUNT")
                .arg(10),
            Ok(Value::Array(vec![
                bulk("17"),
                Value::Array(vec![bulk("1")]),
            ])),
        ),
    ]);

    let mut tags: SetCache<i64, _> = SetCache::new("UserDb", "Tags", con, &context()).unwrap();
    let mut cursor = tags.scan("*", 10, &[&1i64]).unwrap();
    cursor.close();
    cursor.close();
    // A closed cursor never refetches, even with a nonzero server cursor.
    assert_eq!(cursor.next(), None);
}

#[test]
fn sorted_set_pop_keeps_the_historical_order_mapping() {
    let key = "test:user_db:tags:3";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("ZPOPMAX").arg(key),
            Ok(Value::Array(vec![bulk("9"), bulk("3.5")])),
        ),
        select_for(key),
        MockCmd::new(cmd("ZPOPMIN").arg(key).arg(2), Ok(Value::Array(vec![]))),
    ]);

    let mut ranks: SortedSetCache<i64, _> =
        SortedSetCache::new("UserDb", "Tags", con, &context()).unwrap();
    assert_eq!(
        ranks.pop(Order::Asc, &[&3i64]).unwrap(),
        Some(ScoredValue::new(9, 3.5))
    );
    assert!(ranks.pop_many(2, Order::Desc, &[&3i64]).unwrap().is_empty());
}

#[test]
fn sorted_set_score_ranges_use_open_bounds() {
    let key = "test:user_db:tags:3";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("ZCOUNT").arg(key).arg("(1").arg("5"),
            Ok(Value::Int(2)),
        ),
    ]);

    let mut ranks: SortedSetCache<i64, _> =
        SortedSetCache::new("UserDb", "Tags", con, &context()).unwrap();
    let count = ranks
        .count_by_score(1.0, 5.0, shardcache::Exclude::Start, &[&3i64])
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn geo_radius_requests_both_extras_by_default() {
    // A singleton shard list always routes to that shard.
    let key = "test:geo_db:veh";
    let con = MockRedisConnection::new(vec![
        MockCmd::new(cmd("SELECT").arg(2), Ok(Value::Okay)),
        MockCmd::new(
            cmd("GEORADIUSBYMEMBER")
                .arg(key)
                .arg("veh1")
                .arg(100.0)
                .arg(Unit::Meters)
                .arg("WITHCOORD")
                .arg("WITHDIST")
                .arg("ASC"),
            Ok(Value::Array(vec![Value::Array(vec![
                bulk("veh2"),
                bulk("190.4424"),
                Value::Array(vec![bulk("13.361389"), bulk("38.115556")]),
            ])])),
        ),
    ]);

    let mut fleet = GeoCache::new("GeoDb", "VehGps", con, &context()).unwrap();
    let matches = fleet
        .radius_of_member("veh1", 100.0, Unit::Meters, 0, Order::Asc, RadiusReply::NONE, &[])
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "veh2");
    assert!(matches[0].dist.is_some());
    assert!(matches[0].pos.is_some());
}

#[test]
fn geo_validation_rejects_bad_input_locally() {
    let con = MockRedisConnection::new(vec![]);
    let mut fleet = GeoCache::new("GeoDb", "VehGps", con, &context()).unwrap();
    let err = fleet.position("", &[]).unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Validation);
    let err = fleet
        .radius_of_member("veh1", -1.0, Unit::Meters, 0, Order::Asc, RadiusReply::NONE, &[])
        .unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Validation);
}

#[test]
fn list_pushes_and_pops_typed_items() {
    let key = "test:user_db:tags:4";
    let con = MockRedisConnection::new(vec![
        select_for(key),
        MockCmd::new(
            cmd("RPUSH").arg(key).arg("1").arg("2"),
            Ok(Value::Int(2)),
        ),
        select_for(key),
        MockCmd::new(cmd("RPOP").arg(key), Ok(bulk("2"))),
    ]);

    let mut queue: ListCache<i64, _> = ListCache::new("UserDb", "Tags", con, &context()).unwrap();
    assert_eq!(queue.push_back_many(&[1, 2], &[&4i64]).unwrap(), 2);
    assert_eq!(queue.pop_back(&[&4i64]).unwrap(), Some(2));
}

#[test]
fn negative_list_indexes_are_rejected_locally() {
    // An empty script: any command reaching the connection fails the test.
    let con = MockRedisConnection::new(vec![]);
    let mut queue: ListCache<i64, _> = ListCache::new("UserDb", "Tags", con, &context()).unwrap();

    let err = queue.get(-1, &[&4i64]).unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Validation);
    let err = queue.set(-1, &9, &[&4i64]).unwrap_err();
    assert_eq!(err.kind(), CacheErrorKind::Validation);
}
