//! # Token Payload
//!
//! The verified claim set of a token. Only [`crate::TokenVerifier`] produces
//! one, after the signature and structural checks have passed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the claim listing granted scopes.
pub const PERMISSIONS_CLAIM: &str = "permissions";

/// Verified JWT claims, kept exactly as issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenPayload(Map<String, Value>);

impl TokenPayload {
    /// All claims.
    pub fn claims(&self) -> &Map<String, Value> {
        &self.0
    }

    /// A single claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The `sub` claim, when it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    /// The raw `permissions` claim.
    pub fn permissions(&self) -> Option<&Value> {
        self.0.get(PERMISSIONS_CLAIM)
    }

    /// Whether `permissions` is an array containing `scope` exactly.
    pub fn grants(&self, scope: &str) -> bool {
        self.permissions()
            .and_then(Value::as_array)
            .is_some_and(|granted| granted.iter().any(|p| p.as_str() == Some(scope)))
    }

    /// Consume the payload, returning the claim map.
    pub fn into_claims(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for TokenPayload {
    fn from(claims: Map<String, Value>) -> Self {
        Self(claims)
    }
}
