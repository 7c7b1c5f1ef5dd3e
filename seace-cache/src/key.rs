//! Cache keys.
//!
//! A key is the backend action name plus its string parameters. Parameters
//! are held in a sorted map so two keys built with the same parameters in a
//! different order encode identically.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Separates the action tag from the serialized parameters.
const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    action: String,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    /// Key for an action with no parameters.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter. Empty values are kept; callers that treat empty as
    /// absent should skip the call.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a parameter only when `value` is present.
    pub fn with_opt_param(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_param(name, value),
            None => self,
        }
    }

    /// Owning action tag, used for bulk invalidation.
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Stable string form: `action:` followed by the parameters as a JSON
    /// object with sorted keys, or nothing when there are no parameters.
    pub fn encode(&self) -> String {
        let mut encoded = String::with_capacity(self.action.len() + 1);
        encoded.push_str(&self.action);
        encoded.push(SEPARATOR);
        if !self.params.is_empty() {
            // A map of strings always serializes.
            encoded.push_str(&serde_json::to_string(&self.params).unwrap_or_default());
        }
        encoded
    }

    /// Action tag of an encoded key.
    pub fn action_of(encoded: &str) -> &str {
        encoded.split(SEPARATOR).next().unwrap_or(encoded)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_without_params() {
        assert_eq!(CacheKey::new("getProcesos").encode(), "getProcesos:");
    }

    #[test]
    fn test_encode_sorts_params() {
        let a = CacheKey::new("getProcesos")
            .with_param("region", "AREQUIPA")
            .with_param("entidad", "SEAL");
        let b = CacheKey::new("getProcesos")
            .with_param("entidad", "SEAL")
            .with_param("region", "AREQUIPA");
        assert_eq!(a.encode(), b.encode());
        assert_eq!(a.encode(), r#"getProcesos:{"entidad":"SEAL","region":"AREQUIPA"}"#);
    }

    #[test]
    fn test_opt_param() {
        let key = CacheKey::new("getDocumentos").with_opt_param("nomenclatura", None::<String>);
        assert!(key.params().is_empty());
        let key = CacheKey::new("getDocumentos").with_opt_param("nomenclatura", Some("X"));
        assert_eq!(key.params().get("nomenclatura").map(String::as_str), Some("X"));
    }

    #[test]
    fn test_action_of() {
        let key = CacheKey::new("getCronograma").with_param("nomenclatura", "AS-SM-1-2024-X-1");
        assert_eq!(CacheKey::action_of(&key.encode()), "getCronograma");
        assert_eq!(key.action(), "getCronograma");
    }

    #[test]
    fn test_distinct_actions_never_collide() {
        let seguimiento = CacheKey::new("getSeguimiento").encode();
        let detalle = CacheKey::new("getSeguimientoDetalle").encode();
        assert!(!detalle.starts_with(&seguimiento));
    }
}
