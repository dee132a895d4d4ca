//! Configuration module for the daemon connection and the transfer request

use crate::error::{MoverError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_TAG: &str = "latest";

const PLAIN_PORT: u16 = 2375;
const TLS_PORT: u16 = 2376;

/// Registry credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self, side: &str) -> Result<()> {
        if self.username.is_empty() {
            return Err(MoverError::Configuration(format!(
                "{} username cannot be empty",
                side
            )));
        }
        if self.password.is_empty() {
            return Err(MoverError::Configuration(format!(
                "{} password cannot be empty",
                side
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Mutual TLS material location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
        }
    }

    pub fn client_cert(&self) -> PathBuf {
        self.cert_path.join("cert.pem")
    }

    pub fn client_key(&self) -> PathBuf {
        self.cert_path.join("key.pem")
    }

    pub fn ca_cert(&self) -> PathBuf {
        self.cert_path.join("ca.pem")
    }

    /// Read the three PEM files. Called once per run, at client construction.
    pub fn load(&self) -> Result<TlsMaterial> {
        let cert = read_pem(&self.client_cert())?;
        let key = read_pem(&self.client_key())?;
        let ca = read_pem(&self.ca_cert())?;

        let mut identity = cert;
        if !identity.ends_with(b"\n") {
            identity.push(b'\n');
        }
        identity.extend_from_slice(&key);

        Ok(TlsMaterial { identity, ca })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        MoverError::Configuration(format!("Cannot read {}: {}", path.display(), e))
    })
}

/// PEM bytes loaded from a [`TlsConfig`] directory
pub struct TlsMaterial {
    /// Client certificate followed by the client key
    pub identity: Vec<u8>,
    pub ca: Vec<u8>,
}

/// Docker daemon connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub host: String,
    pub tls: Option<TlsConfig>,
    pub api_version: Option<String>,
}

impl DaemonConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            tls: None,
            api_version: None,
        }
    }

    pub fn with_tls(mut self, tls: Option<TlsConfig>) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_api_version(mut self, api_version: Option<String>) -> Self {
        self.api_version = api_version;
        self
    }

    /// Create config from `DOCKER_HOST`, `DOCKER_TLS_VERIFY`,
    /// `DOCKER_CERT_PATH` and `DOCKER_API_VERSION`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("DOCKER_HOST")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| MoverError::Configuration("DOCKER_HOST not set".to_string()))?;

        let tls = if lookup("DOCKER_TLS_VERIFY").as_deref() == Some("1") {
            let cert_path = lookup("DOCKER_CERT_PATH")
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    MoverError::Configuration(
                        "DOCKER_CERT_PATH must be set when DOCKER_TLS_VERIFY=1".to_string(),
                    )
                })?;
            Some(TlsConfig::new(cert_path))
        } else {
            None
        };

        let api_version = lookup("DOCKER_API_VERSION").filter(|v| !v.trim().is_empty());

        let config = DaemonConfig {
            host,
            tls,
            api_version,
        };
        config.base_url()?;
        Ok(config)
    }

    pub fn uses_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// HTTP base URL of the daemon, without a trailing slash
    pub fn base_url(&self) -> Result<String> {
        let host = self.host.trim();
        let (scheme, rest) = host.split_once("://").ok_or_else(|| {
            MoverError::Configuration(format!(
                "Invalid DOCKER_HOST: {}. Expected tcp://host:port",
                host
            ))
        })?;

        let http_scheme = match scheme {
            "tcp" if self.uses_tls() => "https",
            "tcp" => "http",
            "http" if self.uses_tls() => {
                return Err(MoverError::Configuration(format!(
                    "DOCKER_TLS_VERIFY=1 requires a tcp:// or https:// DOCKER_HOST, got {}",
                    host
                )));
            }
            "http" | "https" => scheme,
            "unix" | "npipe" | "ssh" => {
                return Err(MoverError::Configuration(format!(
                    "Unsupported DOCKER_HOST scheme '{}': only tcp, http and https endpoints are supported",
                    scheme
                )));
            }
            other => {
                return Err(MoverError::Configuration(format!(
                    "Unknown DOCKER_HOST scheme '{}'",
                    other
                )));
            }
        };

        let mut url = Url::parse(&format!("{}://{}", http_scheme, rest))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(MoverError::Configuration(format!(
                "DOCKER_HOST has no host: {}",
                host
            )));
        }
        if url.port().is_none() && scheme == "tcp" {
            let port = if self.uses_tls() { TLS_PORT } else { PLAIN_PORT };
            url.set_port(Some(port)).map_err(|_| {
                MoverError::Configuration(format!("Cannot set port on DOCKER_HOST: {}", host))
            })?;
        }

        let mut base = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
        if let Some(port) = url.port() {
            base.push_str(&format!(":{}", port));
        }
        if let Some(version) = &self.api_version {
            base.push_str(&format!("/v{}", version.trim_start_matches('v')));
        }
        Ok(base)
    }
}

/// One side (source or destination) of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSide {
    credentials: AuthConfig,
    repository: String,
    tag: String,
    registry: Option<String>,
}

impl TransferSide {
    /// An empty tag becomes `latest`
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        let tag = tag.into();
        Self {
            credentials: AuthConfig::new(username, password),
            repository: repository.into(),
            tag: if tag.trim().is_empty() {
                DEFAULT_TAG.to_string()
            } else {
                tag
            },
            registry: None,
        }
    }

    /// Registry server used for login and as image reference prefix
    pub fn with_registry(mut self, registry: Option<String>) -> Self {
        self.registry = registry
            .map(|r| r.trim().trim_end_matches('/').to_string())
            .filter(|r| !r.is_empty());
        self
    }

    pub fn credentials(&self) -> &AuthConfig {
        &self.credentials
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// `{username}/{repository}`, prefixed with the registry when one is set
    pub fn image_reference(&self) -> String {
        match &self.registry {
            Some(registry) => format!(
                "{}/{}/{}",
                registry, self.credentials.username, self.repository
            ),
            None => format!("{}/{}", self.credentials.username, self.repository),
        }
    }

    pub fn tagged_reference(&self) -> String {
        format!("{}:{}", self.image_reference(), self.tag)
    }

    fn validate(&self, side: &str) -> Result<()> {
        self.credentials.validate(side)?;
        if self.repository.trim().is_empty() {
            return Err(MoverError::Configuration(format!(
                "{} repository cannot be empty",
                side
            )));
        }
        if self.repository.contains(':') || self.tag.contains(['/', ':']) {
            return Err(MoverError::Configuration(format!(
                "{} repository and tag must be given separately: {}:{}",
                side, self.repository, self.tag
            )));
        }
        Ok(())
    }
}

/// Immutable description of one pull, tag and push cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    source: TransferSide,
    destination: TransferSide,
}

impl TransferRequest {
    pub fn new(source: TransferSide, destination: TransferSide) -> Result<Self> {
        source.validate("Source")?;
        destination.validate("Destination")?;
        Ok(Self {
            source,
            destination,
        })
    }

    pub fn source(&self) -> &TransferSide {
        &self.source
    }

    pub fn destination(&self) -> &TransferSide {
        &self.destination
    }
}
