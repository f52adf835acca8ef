//! Construction of façades from a shared client and context.
//!
//! The factory is a closed, compile-time registry: one monomorphic
//! constructor per data-structure family, no runtime discovery.  Façades
//! can also be built directly over any [`ConnectionLike`] connection (see
//! each façade's `new`), which is how the mock-backed tests drive them.
//!
//! [`ConnectionLike`]: redis::ConnectionLike

use redis::{Client, Connection};

use crate::codec::CacheValue;
use crate::errors::{CacheError, CacheResult};
use crate::facade::{
    CacheContext, GeoCache, HashCache, ListCache, SetCache, SortedSetCache, StringCache,
};

/// The closed set of data-structure families a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFamily {
    /// One value per key.
    String,
    /// Field/value pairs under one key.
    Hash,
    /// An unordered member set.
    Set,
    /// Members ranked by a float score.
    SortedSet,
    /// Named geospatial positions.
    Geo,
    /// A double-ended list.
    List,
}

impl CacheFamily {
    /// Every family, in declaration order.
    pub const ALL: [CacheFamily; 6] = [
        CacheFamily::String,
        CacheFamily::Hash,
        CacheFamily::Set,
        CacheFamily::SortedSet,
        CacheFamily::Geo,
        CacheFamily::List,
    ];
}

/// A cache name of the form `"node:item"`, or a bare `"item"` that defers
/// the node to the factory's default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheName {
    /// The node, when the name spelled one.
    pub node: Option<String>,
    /// The item.
    pub item: String,
}

impl CacheName {
    /// Parses a name.  Anything with more than one `:` is rejected.
    pub fn parse(name: &str) -> CacheResult<CacheName> {
        if name.is_empty() {
            return Err(CacheError::validation("cache name is empty"));
        }
        let mut parts = name.split(':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => Ok(CacheName {
                node: None,
                item: first.to_string(),
            }),
            (Some(item), None) => {
                if first.is_empty() || item.is_empty() {
                    return Err(CacheError::validation(format!(
                        "cache name {name:?} has an empty part"
                    )));
                }
                Ok(CacheName {
                    node: Some(first.to_string()),
                    item: item.to_string(),
                })
            }
            (Some(_), Some(_)) => Err(CacheError::validation(format!(
                "cache name {name:?} has more than two parts"
            ))),
        }
    }
}

/// Builds façades over fresh connections from one shared client and
/// context.
pub struct CacheFactory {
    client: Client,
    context: CacheContext,
    default_node: Option<String>,
}

impl CacheFactory {
    /// Pairs a client with the shared context.
    pub fn new(client: Client, context: CacheContext) -> CacheFactory {
        CacheFactory {
            client,
            context,
            default_node: None,
        }
    }

    /// Sets the node that bare item names resolve against.
    pub fn with_default_node(mut self, node: impl Into<String>) -> CacheFactory {
        self.default_node = Some(node.into());
        self
    }

    /// The shared context.
    pub fn context(&self) -> &CacheContext {
        &self.context
    }

    /// Opens a string façade for `name`.
    pub fn string_cache<T: CacheValue>(
        &self,
        name: &str,
    ) -> CacheResult<StringCache<T, Connection>> {
        let (node, item) = self.resolve_name(name)?;
        StringCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    /// Opens a hash façade for `name`.
    pub fn hash_cache<F: CacheValue, V: CacheValue>(
        &self,
        name: &str,
    ) -> CacheResult<HashCache<F, V, Connection>> {
        let (node, item) = self.resolve_name(name)?;
        HashCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    /// Opens a set façade for `name`.
    pub fn set_cache<T: CacheValue>(&self, name: &str) -> CacheResult<SetCache<T, Connection>> {
        let (node, item) = self.resolve_name(name)?;
        SetCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    /// Opens a sorted-set façade for `name`.
    pub fn sorted_set_cache<T: CacheValue>(
        &self,
        name: &str,
    ) -> CacheResult<SortedSetCache<T, Connection>> {
        let (node, item) = self.resolve_name(name)?;
        SortedSetCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    /// Opens a geospatial façade for `name`.
    pub fn geo_cache(&self, name: &str) -> CacheResult<GeoCache<Connection>> {
        let (node, item) = self.resolve_name(name)?;
        GeoCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    /// Opens a list façade for `name`.
    pub fn list_cache<T: CacheValue>(&self, name: &str) -> CacheResult<ListCache<T, Connection>> {
        let (node, item) = self.resolve_name(name)?;
        ListCache::new(&node, &item, self.client.get_connection()?, &self.context)
    }

    fn resolve_name(&self, name: &str) -> CacheResult<(String, String)> {
        let name = CacheName::parse(name)?;
        let node = match name.node.or_else(|| self.default_node.clone()) {
            Some(node) => node,
            None => {
                return Err(CacheError::validation(format!(
                    "cache name {:?} names no node and the factory has no default",
                    name.item
                )))
            }
        };
        Ok((node, name.item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parses_node_and_item() {
        let name = CacheName::parse("GeoDb:VehGps").unwrap();
        assert_eq!(name.node.as_deref(), Some("GeoDb"));
        assert_eq!(name.item, "VehGps");
    }

    #[test]
    fn bare_name_defers_the_node() {
        let name = CacheName::parse("VehGps").unwrap();
        assert_eq!(name.node, None);
        assert_eq!(name.item, "VehGps");
    }

    #[test]
    fn malformed_names_are_rejected() {
        assert!(CacheName::parse("").is_err());
        assert!(CacheName::parse("a:b:c").is_err());
        assert!(CacheName::parse(":item").is_err());
        assert!(CacheName::parse("node:").is_err());
    }
}
