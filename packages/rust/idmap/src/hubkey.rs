//! Hub keys: canonical, resolvable identifiers for hub entities.
//!
//! Format (schema `s1`):
//!
//! ```text
//! <resolver>/s1/<hub_id>/<repository_id>/<entity_type>/<entity_id>
//! ```

use std::fmt;
use std::str::FromStr;

use onboarding_shared::HubIdentity;

/// Schema version segment of every hub key minted here.
pub const SCHEMA_VERSION: &str = "s1";

/// Scheme assumed for resolvers configured without one.
const DEFAULT_SCHEME: &str = "https://";

/// Error returned when a string is not a valid `s1` hub key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hub key '{input}': {reason}")]
pub struct HubKeyError {
    input: String,
    reason: &'static str,
}

/// A parsed or freshly derived hub key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HubKey {
    resolver: String,
    hub_id: String,
    repository_id: String,
    entity_type: String,
    entity_id: String,
}

impl HubKey {
    /// Derive the hub key for an entity. Pure and deterministic.
    pub fn new(
        identity: &HubIdentity,
        repository_id: &str,
        entity_type: &str,
        entity_id: &str,
    ) -> Self {
        Self {
            resolver: normalize_resolver(&identity.resolver_id),
            hub_id: identity.hub_id.clone(),
            repository_id: repository_id.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        }
    }

    pub fn resolver(&self) -> &str {
        &self.resolver
    }

    pub fn hub_id(&self) -> &str {
        &self.hub_id
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl fmt::Display for HubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{SCHEMA_VERSION}/{}/{}/{}/{}",
            self.resolver, self.hub_id, self.repository_id, self.entity_type, self.entity_id
        )
    }
}

impl FromStr for HubKey {
    type Err = HubKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| HubKeyError {
            input: s.to_string(),
            reason,
        };

        let mut parts = s.rsplitn(6, '/');
        let entity_id = parts.next().filter(|p| !p.is_empty());
        let entity_type = parts.next().filter(|p| !p.is_empty());
        let repository_id = parts.next().filter(|p| !p.is_empty());
        let hub_id = parts.next().filter(|p| !p.is_empty());
        let schema = parts.next();
        let resolver = parts.next().filter(|p| p.contains("://"));

        let (Some(entity_id), Some(entity_type), Some(repository_id), Some(hub_id)) =
            (entity_id, entity_type, repository_id, hub_id)
        else {
            return Err(err("expected five path segments after the resolver"));
        };
        if schema != Some(SCHEMA_VERSION) {
            return Err(err("unsupported schema version"));
        }
        let Some(resolver) = resolver else {
            return Err(err("resolver must be an absolute URL"));
        };

        Ok(Self {
            resolver: resolver.to_string(),
            hub_id: hub_id.to_string(),
            repository_id: repository_id.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
        })
    }
}

fn normalize_resolver(resolver_id: &str) -> String {
    let trimmed = resolver_id.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(resolver: &str) -> HubIdentity {
        HubIdentity {
            resolver_id: resolver.into(),
            hub_id: "hub1".into(),
        }
    }

    #[test]
    fn formats_s1_key() {
        let key = HubKey::new(
            &identity("https://openpermissions.org"),
            "2e9ce79cfa710e80878920c98e076aa9",
            "asset",
            "a1b2c3",
        );
        assert_eq!(
            key.to_string(),
            "https://openpermissions.org/s1/hub1/2e9ce79cfa710e80878920c98e076aa9/asset/a1b2c3"
        );
    }

    #[test]
    fn bare_resolver_gets_https_scheme() {
        let key = HubKey::new(&identity("copyrighthub.org/"), "repo", "asset", "x");
        assert_eq!(key.resolver(), "https://copyrighthub.org");
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = HubKey::new(&identity("copyrighthub.org"), "repo", "asset", "x").to_string();
        let b = HubKey::new(&identity("copyrighthub.org"), "repo", "asset", "x").to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_back_into_parts() {
        let key: HubKey = "https://openpermissions.org/s1/hub1/repo/asset/abc"
            .parse()
            .expect("parse hub key");
        assert_eq!(key.resolver(), "https://openpermissions.org");
        assert_eq!(key.hub_id(), "hub1");
        assert_eq!(key.repository_id(), "repo");
        assert_eq!(key.entity_type(), "asset");
        assert_eq!(key.entity_id(), "abc");
    }

    #[test]
    fn rejects_unknown_schema() {
        let err = "https://openpermissions.org/s0/hub1/repo/asset/abc"
            .parse::<HubKey>()
            .unwrap_err();
        assert!(err.to_string().contains("schema"));
    }

    #[test]
    fn rejects_truncated_key() {
        assert!("https://openpermissions.org/s1/hub1/repo".parse::<HubKey>().is_err());
    }
}
