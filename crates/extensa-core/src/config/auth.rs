//! Principal resolution configuration.
//!
//! Credential verification happens upstream; the server only decides
//! whether to trust the principal headers an authenticating proxy sets.

use serde::{Deserialize, Serialize};

/// Principal resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether principal headers from the upstream proxy are trusted.
    #[serde(default = "default_true")]
    pub trust_principal_headers: bool,
    /// Header carrying the principal's UUID.
    #[serde(default = "default_id_header")]
    pub id_header: String,
    /// Header carrying the principal's display name.
    #[serde(default = "default_name_header")]
    pub name_header: String,
    /// Header carrying the comma-separated role list.
    #[serde(default = "default_roles_header")]
    pub roles_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            trust_principal_headers: true,
            id_header: default_id_header(),
            name_header: default_name_header(),
            roles_header: default_roles_header(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_id_header() -> String {
    "x-principal-id".to_string()
}

fn default_name_header() -> String {
    "x-principal-name".to_string()
}

fn default_roles_header() -> String {
    "x-principal-roles".to_string()
}
