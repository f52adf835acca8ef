//! Composition of physical cache keys.
//!
//! A physical key is `prefix + normalized_node + template` with every
//! runtime argument appended as `:part`.  Node names are normalized from
//! camel case to snake case (`"GeoDb"` becomes `"geo_db:"`), so the keys a
//! deployment writes stay stable regardless of how the node is spelled in
//! code.

use crate::config::KeyConfig;
use crate::errors::{CacheError, CacheResult};

/// A positional cache-key argument.
///
/// Values render as their canonical string form folded to lower case;
/// `Option::None` renders as the literal `null`.  Enum-like types should
/// implement this by writing their ordinal:
///
/// ```
/// use shardcache::KeyPart;
///
/// enum Channel { Web, Mobile }
///
/// impl KeyPart for Channel {
///     fn write_part(&self, out: &mut String) {
///         let ordinal = match self {
///             Channel::Web => 0,
///             Channel::Mobile => 1,
///         };
///         ordinal.write_part(out);
///     }
/// }
/// ```
pub trait KeyPart {
    /// Appends the rendered form of the value to `out`.
    fn write_part(&self, out: &mut String);
}

macro_rules! itoa_key_part {
    ($($t:ty),*) => {
        $(
            impl KeyPart for $t {
                fn write_part(&self, out: &mut String) {
                    use std::fmt::Write;
                    let _ = write!(out, "{self}");
                }
            }
        )*
    };
}

itoa_key_part!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool);

impl KeyPart for str {
    fn write_part(&self, out: &mut String) {
        for c in self.chars() {
            out.extend(c.to_lowercase());
        }
    }
}

impl KeyPart for String {
    fn write_part(&self, out: &mut String) {
        self.as_str().write_part(out)
    }
}

impl KeyPart for char {
    fn write_part(&self, out: &mut String) {
        out.extend(self.to_lowercase());
    }
}

impl<T: KeyPart + ?Sized> KeyPart for &T {
    fn write_part(&self, out: &mut String) {
        (*self).write_part(out)
    }
}

impl<T: KeyPart> KeyPart for Option<T> {
    fn write_part(&self, out: &mut String) {
        match self {
            Some(v) => v.write_part(out),
            None => out.push_str("null"),
        }
    }
}

/// Normalizes a node name for use as a key segment: each ASCII uppercase
/// letter is lowered and, unless it starts the name, prefixed with `_`.
/// The result always ends with `:`.
pub fn normalize_node(node: &str) -> String {
    let mut out = String::with_capacity(node.len() + 4);
    for c in node.chars() {
        if c.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out.push(':');
    out
}

/// Composes the physical key for `config` under `prefix`, with
/// `node_prefix` being the pre-normalized node segment.
///
/// Fails when the record has no key template; that pair is configured but
/// not usable as a key root.
pub fn compose_key(
    config: &KeyConfig,
    prefix: &str,
    node_prefix: &str,
    args: &[&dyn KeyPart],
) -> CacheResult<String> {
    if config.key.is_empty() {
        return Err(CacheError::config(format!(
            "cache key (node={}, item={}) has no key template",
            config.node, config.item
        )));
    }
    let mut key = String::with_capacity(
        prefix.len() + node_prefix.len() + config.key.len() + args.len() * 8,
    );
    key.push_str(prefix);
    key.push_str(node_prefix);
    key.push_str(&config.key);
    for arg in args {
        key.push(':');
        arg.write_part(&mut key);
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str) -> KeyConfig {
        KeyConfig {
            node: "GeoDb".into(),
            item: "VehGps".into(),
            key: key.into(),
            expire: None,
            shards: vec![0, 1, 2],
        }
    }

    enum Kind {
        Alpha,
        #[allow(dead_code)]
        Beta,
    }

    impl KeyPart for Kind {
        fn write_part(&self, out: &mut String) {
            let ordinal = match self {
                Kind::Alpha => 0,
                Kind::Beta => 1,
            };
            ordinal.write_part(out);
        }
    }

    #[test]
    fn node_names_normalize_to_snake_case() {
        assert_eq!(normalize_node("GeoDb"), "geo_db:");
        assert_eq!(normalize_node("plain"), "plain:");
        assert_eq!(normalize_node("ABC"), "a_b_c:");
    }

    #[test]
    fn bare_key_is_prefix_node_template() {
        let cfg = config("veh");
        let key = compose_key(&cfg, "test:", "geo_db:", &[]).unwrap();
        assert_eq!(key, "test:geo_db:veh");
    }

    #[test]
    fn args_append_in_order() {
        let cfg = config("veh");
        let none: Option<i64> = None;
        let key = compose_key(&cfg, "", "geo_db:", &[&Kind::Alpha, &3i64, &none]).unwrap();
        assert_eq!(key, "geo_db:veh:0:3:null");
    }

    #[test]
    fn string_args_are_lowercased() {
        let cfg = config("veh");
        let key = compose_key(&cfg, "", "geo_db:", &[&"AbC", &true]).unwrap();
        assert_eq!(key, "geo_db:veh:abc:true");
    }

    #[test]
    fn empty_template_is_rejected() {
        let cfg = config("");
        let err = compose_key(&cfg, "test:", "geo_db:", &[]).unwrap_err();
        assert_eq!(err.kind(), crate::CacheErrorKind::Config);
    }
}
