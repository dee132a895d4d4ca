//! Docker Engine API client
//!
//! Implements [`ImageEngine`] over HTTP(S) against a Docker daemon. The daemon
//! performs the registry protocol itself; this client only issues `/auth`,
//! `/images/create`, `/images/{name}/tag` and `/images/{name}/push`.

use crate::config::{AuthConfig, DaemonConfig};
use crate::error::handlers::HttpErrorHandler;
use crate::error::{MoverError, Result};
use crate::logging::Logger;
use crate::registry::auth::{REGISTRY_AUTH_HEADER, RegistryAuth};
use crate::registry::progress::{ProgressStream, decode_records};
use crate::registry::{ImageEngine, LoginStatus, TagStatus};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Certificate, Client, Identity, Response};
use serde::Deserialize;
use std::time::Duration;

/// Successful `POST /auth` body
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "Status", default)]
    status: String,
}

pub struct DockerClientBuilder {
    config: DaemonConfig,
    connect_timeout: Option<Duration>,
    logger: Logger,
}

impl DockerClientBuilder {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            connect_timeout: None,
            logger: Logger::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Resolve the endpoint and load TLS material. Nothing is sent to the
    /// daemon here; an unreachable daemon surfaces on the first call.
    pub fn build(self) -> Result<DockerClient> {
        let base_url = self.config.base_url()?;
        let mut builder = Client::builder();

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        if let Some(tls) = &self.config.tls {
            let material = tls.load()?;
            let identity = Identity::from_pem(&material.identity).map_err(|e| {
                MoverError::Configuration(format!(
                    "Invalid client certificate or key in {}: {}",
                    tls.cert_path.display(),
                    e
                ))
            })?;
            let ca = Certificate::from_pem(&material.ca).map_err(|e| {
                MoverError::Configuration(format!(
                    "Invalid CA certificate {}: {}",
                    tls.ca_cert().display(),
                    e
                ))
            })?;

            self.logger.detail(&format!(
                "Using mutual TLS material from {}",
                tls.cert_path.display()
            ));
            builder = builder
                .use_rustls_tls()
                .identity(identity)
                .add_root_certificate(ca)
                .tls_built_in_root_certs(false);
        }

        let http = builder
            .build()
            .map_err(|e| MoverError::Configuration(format!("Failed to create daemon client: {}", e)))?;

        self.logger.detail(&format!("Docker daemon endpoint: {}", base_url));

        Ok(DockerClient {
            http,
            base_url,
            auth: None,
            logger: self.logger,
        })
    }
}

pub struct DockerClient {
    http: Client,
    base_url: String,
    auth: Option<RegistryAuth>,
    logger: Logger,
}

impl DockerClient {
    pub fn builder(config: DaemonConfig) -> DockerClientBuilder {
        DockerClientBuilder::new(config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Credentials most recently established by [`ImageEngine::login`]
    pub fn current_auth(&self) -> Option<&RegistryAuth> {
        self.auth.as_ref()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_header(&self) -> String {
        match &self.auth {
            Some(auth) => auth.header_value(),
            None => RegistryAuth::anonymous_header_value(),
        }
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.text().await {
            Ok(body) if !body.trim().is_empty() => HttpErrorHandler::extract_message(&body),
            _ => status.to_string(),
        }
    }

    fn stream_body(response: Response) -> ProgressStream {
        decode_records(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(MoverError::from)),
        )
    }
}

#[async_trait]
impl ImageEngine for DockerClient {
    async fn login(&mut self, credentials: &AuthConfig, server: Option<&str>) -> Result<LoginStatus> {
        let auth = RegistryAuth::new(credentials, server);
        self.logger.detail(&format!(
            "POST /auth for {} at {}",
            credentials.username,
            server.unwrap_or("default registry")
        ));

        let response = self.http.post(self.endpoint("/auth")).json(&auth).send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(login) = serde_json::from_str::<LoginResponse>(&body) {
                self.logger.detail(&format!("Daemon login status: {}", login.status));
            }
            self.auth = Some(auth);
            return Ok(LoginStatus::Succeeded);
        }

        let message = Self::error_message(response).await;
        match status.as_u16() {
            401 | 403 => Ok(LoginStatus::Rejected(message)),
            _ if HttpErrorHandler::is_credential_rejection(&message) => {
                Ok(LoginStatus::Rejected(message))
            }
            _ => Err(HttpErrorHandler::handle_daemon_error(status, &message, "login")),
        }
    }

    async fn pull(&mut self, image: &str, tag: &str) -> Result<ProgressStream> {
        self.logger.detail(&format!("POST /images/create fromImage={} tag={}", image, tag));

        let response = self
            .http
            .post(self.endpoint("/images/create"))
            .query(&[("fromImage", image), ("tag", tag)])
            .header(REGISTRY_AUTH_HEADER, self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            return Err(HttpErrorHandler::handle_pull_error(
                status,
                &message,
                &format!("{}:{}", image, tag),
            ));
        }

        Ok(Self::stream_body(response))
    }

    async fn tag(&mut self, source: &str, repository: &str, tag: &str) -> Result<TagStatus> {
        self.logger.detail(&format!(
            "POST /images/{}/tag repo={} tag={}",
            source, repository, tag
        ));

        let response = self
            .http
            .post(self.endpoint(&format!("/images/{}/tag", source)))
            .query(&[("repo", repository), ("tag", tag)])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(TagStatus::Tagged);
        }

        let message = Self::error_message(response).await;
        match status.as_u16() {
            400 | 404 | 409 => Ok(TagStatus::Rejected(message)),
            _ => Err(HttpErrorHandler::handle_daemon_error(
                status,
                &message,
                &format!("tag of {}", source),
            )),
        }
    }

    async fn push(&mut self, image: &str, tag: &str) -> Result<ProgressStream> {
        self.logger.detail(&format!("POST /images/{}/push tag={}", image, tag));

        let response = self
            .http
            .post(self.endpoint(&format!("/images/{}/push", image)))
            .query(&[("tag", tag)])
            .header(REGISTRY_AUTH_HEADER, self.auth_header())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = Self::error_message(response).await;
            return Err(HttpErrorHandler::handle_push_error(
                status,
                &message,
                &format!("{}:{}", image, tag),
            ));
        }

        Ok(Self::stream_body(response))
    }
}
