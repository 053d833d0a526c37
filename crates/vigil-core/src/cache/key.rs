// Canonical cache keys.
//
// A key is the resource type plus a string of the form
// `resource:operation?k1=v1&k2=v2` with parameter names sorted, so
// equivalent requests hash identically however they were built.

use std::collections::BTreeMap;
use std::fmt;

use strum::{AsRefStr, Display, EnumString};
use url::form_urlencoded;

/// Resource domain a query belongs to. Invalidation is per domain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum ResourceType {
    Threat,
    Alert,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    resource: ResourceType,
    canonical: String,
}

impl CacheKey {
    pub fn builder(resource: ResourceType, operation: &'static str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            resource,
            operation,
            params: BTreeMap::new(),
        }
    }

    /// Key for a parameterless operation.
    pub fn of(resource: ResourceType, operation: &'static str) -> Self {
        Self::builder(resource, operation).build()
    }

    pub fn resource(&self) -> ResourceType {
        self.resource
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    resource: ResourceType,
    operation: &'static str,
    params: BTreeMap<&'static str, String>,
}

impl CacheKeyBuilder {
    /// Add a parameter. Setting the same name twice keeps the last value.
    pub fn param(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        self.params.insert(name, value.to_string());
        self
    }

    pub fn build(self) -> CacheKey {
        let mut canonical = format!("{}:{}", self.resource, self.operation);
        if !self.params.is_empty() {
            let query = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.params)
                .finish();
            canonical.push('?');
            canonical.push_str(&query);
        }
        CacheKey {
            resource: self.resource,
            canonical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_sorted_regardless_of_order() {
        let a = CacheKey::builder(ResourceType::Threat, "list")
            .param("skip", 20)
            .param("limit", 10)
            .build();
        let b = CacheKey::builder(ResourceType::Threat, "list")
            .param("limit", 10)
            .param("skip", 20)
            .build();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "threat:list?limit=10&skip=20");
    }

    #[test]
    fn parameterless_key_has_no_query() {
        let key = CacheKey::of(ResourceType::Alert, "statistics");
        assert_eq!(key.to_string(), "alert:statistics");
        assert_eq!(key.resource(), ResourceType::Alert);
    }

    #[test]
    fn values_are_escaped() {
        let key = CacheKey::builder(ResourceType::Model, "get")
            .param("name", "a&b=c")
            .build();
        assert_eq!(key.as_str(), "model:get?name=a%26b%3Dc");
    }

    #[test]
    fn resource_type_round_trips_through_strings() {
        assert_eq!(ResourceType::Model.as_ref(), "model");
        assert_eq!("alert".parse::<ResourceType>().ok(), Some(ResourceType::Alert));
    }
}
