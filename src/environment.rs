//! Postman environment files.
//!
//! An environment carries the `baseUrl` value so the same collection can be pointed at
//! different servers without editing it.

use crate::collection_builder::BASE_URL_VARIABLE;
use serde::{Deserialize, Serialize};

/// Tool name written to `_postman_exported_using`.
pub const EXPORTED_USING: &str = "postman-from-source";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    pub id: String,
    pub name: String,
    pub values: Vec<EnvironmentValue>,
    #[serde(rename = "_postman_variable_scope")]
    pub variable_scope: String,
    /// RFC 3339 export timestamp
    #[serde(rename = "_postman_exported_at")]
    pub exported_at: String,
    #[serde(rename = "_postman_exported_using")]
    pub exported_using: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentValue {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub enabled: bool,
}

/// Builds an environment named `name` whose only variable is `baseUrl`.
pub fn build_environment(name: &str, base_url: &str) -> Environment {
    Environment {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        values: vec![EnvironmentValue {
            key: BASE_URL_VARIABLE.to_string(),
            value: base_url.to_string(),
            kind: "text".to_string(),
            enabled: true,
        }],
        variable_scope: "environment".to_string(),
        exported_at: chrono::Utc::now().to_rfc3339(),
        exported_using: EXPORTED_USING.to_string(),
    }
}
