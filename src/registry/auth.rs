//! Registry credential context sent to the daemon

use crate::config::AuthConfig;
use base64::Engine;
use serde::Serialize;

/// Header carrying the registry credentials on pull and push requests
pub const REGISTRY_AUTH_HEADER: &str = "X-Registry-Auth";

/// Body of `POST /auth` and payload of [`REGISTRY_AUTH_HEADER`]
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegistryAuth {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serveraddress: Option<String>,
}

impl RegistryAuth {
    pub fn new(credentials: &AuthConfig, server: Option<&str>) -> Self {
        Self {
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            serveraddress: server.map(str::to_string),
        }
    }

    /// URL-safe base64 of the JSON document, as the daemon expects
    pub fn header_value(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        base64::engine::general_purpose::URL_SAFE.encode(json)
    }

    /// Header value sent when no login happened yet
    pub fn anonymous_header_value() -> String {
        base64::engine::general_purpose::URL_SAFE.encode(b"{}")
    }
}

impl std::fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("serveraddress", &self.serveraddress)
            .finish_non_exhaustive()
    }
}
