//! Deterministic shard selection.
//!
//! The hash folds the running sum modulo 255 while streaming over the key,
//! not once at the end.  Deployed data was placed with exactly this fold,
//! so it must be replicated bit-for-bit; do not replace it with a final
//! `sum % 255`.
//!
//! This is not consistent hashing: growing or shrinking the shard list
//! reshuffles most key-to-shard assignments.  That is a documented
//! limitation of the scheme, inherited by every deployment that already
//! holds data.

/// Selects the shard for `key` out of `shards`.
///
/// An empty list selects shard 0 and a single-element list selects that
/// element, without hashing.
pub fn select_shard(shards: &[i64], key: &str) -> i64 {
    match shards {
        [] => 0,
        [only] => *only,
        _ => {
            let mut hash: u32 = 0;
            for c in key.chars() {
                hash += c as u32;
                if hash > 255 {
                    hash %= 255;
                }
            }
            shards[hash as usize % shards.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_lists() {
        assert_eq!(select_shard(&[], "anything"), 0);
        assert_eq!(select_shard(&[7], "anything"), 7);
        assert_eq!(select_shard(&[7], ""), 7);
    }

    #[test]
    fn selection_is_deterministic() {
        let shards = [0, 1, 2, 3];
        let first = select_shard(&shards, "test:geo_db:veh:42");
        for _ in 0..16 {
            assert_eq!(select_shard(&shards, "test:geo_db:veh:42"), first);
        }
    }

    #[test]
    fn selection_stays_in_list() {
        let shards = [0, 1, 2];
        for key in ["test:geo_db:veh", "a", "zzzzzzzzzzzzzzzzzzzzzz", ""] {
            assert!(shards.contains(&select_shard(&shards, key)));
        }
    }

    #[test]
    fn streaming_fold_matches_reference() {
        // Reference walk of the incremental reduction for a key whose
        // running sum crosses 255 several times.
        let key = "test:user_db:sess:99";
        let mut hash: u32 = 0;
        for c in key.chars() {
            hash += c as u32;
            if hash > 255 {
                hash %= 255;
            }
        }
        let shards = [3, 5, 9, 11, 13];
        assert_eq!(
            select_shard(&shards, key),
            shards[hash as usize % shards.len()]
        );
    }
}
