//! Shared option and entry types used across the façade family.

/// Write condition for set-style operations (`SET`, `ZADD`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SetWhen {
    /// Write whether or not a value already exists.
    #[default]
    Always,
    /// Only write when a value already exists (`XX`).
    IfExists,
    /// Only write when no value exists yet (`NX`).
    IfNotExists,
}

impl SetWhen {
    pub(crate) fn condition_arg(self) -> Option<&'static str> {
        match self {
            SetWhen::Always => None,
            SetWhen::IfExists => Some("XX"),
            SetWhen::IfNotExists => Some("NX"),
        }
    }
}

/// Combining operation for two sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    /// Members present in either set.
    Union,
    /// Members present in both sets.
    Intersect,
    /// Members of the first set absent from the second.
    Difference,
}

/// Which bounds of a score range are exclusive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Exclude {
    /// `start <= value <= stop`
    #[default]
    None,
    /// `start < value <= stop`
    Start,
    /// `start <= value < stop`
    Stop,
    /// `start < value < stop`
    Both,
}

impl Exclude {
    pub(crate) fn excludes_start(self) -> bool {
        matches!(self, Exclude::Start | Exclude::Both)
    }

    pub(crate) fn excludes_stop(self) -> bool {
        matches!(self, Exclude::Stop | Exclude::Both)
    }
}

/// Result ordering for ranked queries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Lowest score / nearest first.
    #[default]
    Asc,
    /// Highest score / farthest first.
    Desc,
}

/// A sorted-set entry: a value with its ranking score.
///
/// The score is a 64-bit float; NaN and infinities are the server's
/// business, not validated here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredValue<T> {
    /// The stored value.
    pub value: T,
    /// The ranking score.
    pub score: f64,
}

impl<T> ScoredValue<T> {
    /// Pairs a value with its score.
    pub fn new(value: T, score: f64) -> ScoredValue<T> {
        ScoredValue { value, score }
    }
}

/// Renders a `ZCOUNT`/`ZRANGEBYSCORE` bound, prefixing `(` when exclusive.
pub(crate) fn score_bound(score: f64, exclusive: bool) -> String {
    if exclusive {
        format!("({score}")
    } else {
        score.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bounds_render_exclusivity() {
        assert_eq!(score_bound(1.5, false), "1.5");
        assert_eq!(score_bound(1.5, true), "(1.5");
        assert_eq!(score_bound(3.0, false), "3");
    }

    #[test]
    fn exclude_maps_to_bound_flags() {
        assert!(!Exclude::None.excludes_start());
        assert!(Exclude::Start.excludes_start());
        assert!(!Exclude::Start.excludes_stop());
        assert!(Exclude::Both.excludes_start() && Exclude::Both.excludes_stop());
    }
}
