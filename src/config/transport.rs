//! Collaborator endpoint configuration
//!
//! Collaborators supply catalog, quota and telemetry inputs. Each one is
//! reached either over the network or by spawning a local command; the
//! variant is chosen explicitly with `type`.
//!
//! ```toml
//! [[collaborators]]
//! name = "catalog"
//! type = "remote"
//! url = "https://models.example.com/api.json"
//!
//! [[collaborators]]
//! name = "quota"
//! type = "local"
//! command = "quota-probe"
//! args = ["--json"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a collaborator is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Local {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
}

impl Transport {
    pub fn kind(&self) -> &'static str {
        match self {
            Transport::Remote { .. } => "remote",
            Transport::Local { .. } => "local",
        }
    }
}

/// A named collaborator endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    pub name: String,
    #[serde(flatten)]
    pub transport: Transport,
}

impl CollaboratorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("name cannot be empty".to_string());
        }
        match &self.transport {
            Transport::Remote { url, .. } if url.is_empty() => Err("url cannot be empty".to_string()),
            Transport::Local { command, .. } if command.is_empty() => {
                Err("command cannot be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_transport_parse() {
        let config: CollaboratorConfig = toml::from_str(
            r#"
            name = "catalog"
            type = "remote"
            url = "https://models.example.com/api.json"
            headers = { authorization = "Bearer x" }
            "#,
        )
        .unwrap();
        assert_eq!(config.transport.kind(), "remote");
        match config.transport {
            Transport::Remote { url, headers } => {
                assert_eq!(url, "https://models.example.com/api.json");
                assert_eq!(headers.get("authorization").map(String::as_str), Some("Bearer x"));
            }
            other => panic!("unexpected transport {:?}", other),
        }
    }

    #[test]
    fn test_local_transport_parse() {
        let config: CollaboratorConfig = toml::from_str(
            r#"
            name = "quota"
            type = "local"
            command = "quota-probe"
            args = ["--json"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.transport,
            Transport::Local {
                command: "quota-probe".to_string(),
                args: vec!["--json".to_string()],
                env: BTreeMap::new(),
            }
        );
    }

    #[test]
    fn test_transport_requires_explicit_type() {
        let result: Result<CollaboratorConfig, _> = toml::from_str(
            r#"
            name = "catalog"
            url = "https://models.example.com/api.json"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_collaborator_validation() {
        let config = CollaboratorConfig {
            name: "quota".to_string(),
            transport: Transport::Local {
                command: String::new(),
                args: vec![],
                env: BTreeMap::new(),
            },
        };
        assert_eq!(config.validate().unwrap_err(), "command cannot be empty");
    }
}
