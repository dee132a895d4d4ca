//! Registry operations performed through a Docker daemon
//!
//! [`ImageEngine`] is the capability seam the mover drives: login, pull, tag
//! and push. [`DockerClient`] implements it over the Docker Engine HTTP API;
//! tests substitute their own engines.

pub mod auth;
pub mod client;
pub mod progress;

use crate::config::AuthConfig;
use crate::error::Result;
use async_trait::async_trait;

pub use auth::RegistryAuth;
pub use client::{DockerClient, DockerClientBuilder};
pub use progress::{ProgressRecord, ProgressStream, TransferKind, TransferSummary};

/// Outcome of a registry login as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStatus {
    Succeeded,
    Rejected(String),
}

/// Outcome of a local tag operation as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagStatus {
    Tagged,
    Rejected(String),
}

/// Container engine operations needed to move an image
///
/// The engine holds a single credential context: `login` replaces it, and
/// `pull`/`push` use whichever credentials were set last.
#[async_trait]
pub trait ImageEngine: Send {
    /// Establish credentials for the registry at `server` (Docker Hub when `None`)
    async fn login(&mut self, credentials: &AuthConfig, server: Option<&str>) -> Result<LoginStatus>;

    /// Start pulling `image:tag` into local storage
    async fn pull(&mut self, image: &str, tag: &str) -> Result<ProgressStream>;

    /// Label the local image `source` as `repository:tag`
    async fn tag(&mut self, source: &str, repository: &str, tag: &str) -> Result<TagStatus>;

    /// Start pushing `image:tag` to its registry
    async fn push(&mut self, image: &str, tag: &str) -> Result<ProgressStream>;
}
