//! Command-line argument parsing

use crate::config::{TransferRequest, TransferSide};
use crate::error::{MoverError, Result};
use clap::Parser;

const ENV_PREFIX: &str = "IMAGE_MOVER";

#[derive(Parser, Debug, Clone)]
#[command(name = "docker-image-mover")]
#[command(about = "Copy a Docker image from one registry to another through a Docker daemon")]
#[command(version, author)]
pub struct Args {
    /// Source registry username (also the source namespace)
    #[arg(long = "src-username", help = "Username for the source registry")]
    pub src_username: Option<String>,

    /// Source registry password
    #[arg(long = "src-password", help = "Password for the source registry")]
    pub src_password: Option<String>,

    /// Source repository name
    #[arg(long = "src-repository", help = "Repository to pull, without namespace or tag")]
    pub src_repository: Option<String>,

    /// Source tag
    #[arg(long = "src-tag", help = "Tag to pull (default: latest)")]
    pub src_tag: Option<String>,

    /// Source registry server
    #[arg(long = "src-registry", help = "Source registry server (default: Docker Hub)")]
    pub src_registry: Option<String>,

    /// Destination registry username (also the destination namespace)
    #[arg(long = "dst-username", help = "Username for the destination registry")]
    pub dst_username: Option<String>,

    /// Destination registry password
    #[arg(long = "dst-password", help = "Password for the destination registry")]
    pub dst_password: Option<String>,

    /// Destination repository name
    #[arg(long = "dst-repository", help = "Repository to push, without namespace or tag")]
    pub dst_repository: Option<String>,

    /// Destination tag
    #[arg(long = "dst-tag", help = "Tag to push (default: latest)")]
    pub dst_tag: Option<String>,

    /// Destination registry server
    #[arg(long = "dst-registry", help = "Destination registry server (default: Docker Hub)")]
    pub dst_registry: Option<String>,

    /// Connect timeout in seconds
    #[arg(
        long = "timeout",
        short = 't',
        default_value = "30",
        help = "Timeout for connecting to the Docker daemon in seconds"
    )]
    pub timeout: u64,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        conflicts_with = "verbose",
        help = "Suppress progress records and informational output"
    )]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Fill unset transfer fields from `IMAGE_MOVER_*` environment variables
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&mut Option<String>, &str); 10] = [
            (&mut self.src_username, "SRC_USERNAME"),
            (&mut self.src_password, "SRC_PASSWORD"),
            (&mut self.src_repository, "SRC_REPOSITORY"),
            (&mut self.src_tag, "SRC_TAG"),
            (&mut self.src_registry, "SRC_REGISTRY"),
            (&mut self.dst_username, "DST_USERNAME"),
            (&mut self.dst_password, "DST_PASSWORD"),
            (&mut self.dst_repository, "DST_REPOSITORY"),
            (&mut self.dst_tag, "DST_TAG"),
            (&mut self.dst_registry, "DST_REGISTRY"),
        ];

        for (field, suffix) in fields {
            if field.is_none() {
                *field = lookup(&format!("{}_{}", ENV_PREFIX, suffix));
            }
        }

        self
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<()> {
        if self.timeout == 0 {
            return Err(MoverError::Configuration(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the immutable transfer request from the collected fields
    pub fn transfer_request(&self) -> Result<TransferRequest> {
        let source = TransferSide::new(
            required(&self.src_username, "--src-username", "SRC_USERNAME")?,
            required(&self.src_password, "--src-password", "SRC_PASSWORD")?,
            required(&self.src_repository, "--src-repository", "SRC_REPOSITORY")?,
            self.src_tag.clone().unwrap_or_default(),
        )
        .with_registry(self.src_registry.clone());

        let destination = TransferSide::new(
            required(&self.dst_username, "--dst-username", "DST_USERNAME")?,
            required(&self.dst_password, "--dst-password", "DST_PASSWORD")?,
            required(&self.dst_repository, "--dst-repository", "DST_REPOSITORY")?,
            self.dst_tag.clone().unwrap_or_default(),
        )
        .with_registry(self.dst_registry.clone());

        TransferRequest::new(source, destination)
    }
}

fn required(value: &Option<String>, flag: &str, suffix: &str) -> Result<String> {
    value.clone().ok_or_else(|| {
        MoverError::Configuration(format!(
            "{} is required (or set {}_{})",
            flag, ENV_PREFIX, suffix
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_args() -> Args {
        Args::parse_from([
            "docker-image-mover",
            "--src-username",
            "alice",
            "--src-password",
            "a-pass",
            "--src-repository",
            "app",
            "--src-tag",
            "1.0",
            "--dst-username",
            "bob",
            "--dst-password",
            "b-pass",
            "--dst-repository",
            "app",
            "--dst-tag",
            "prod",
        ])
    }

    #[test]
    fn test_transfer_request_from_flags() {
        let request = full_args().transfer_request().unwrap();
        assert_eq!(request.source().tagged_reference(), "alice/app:1.0");
        assert_eq!(request.destination().tagged_reference(), "bob/app:prod");
        assert_eq!(request.destination().credentials().password, "b-pass");
    }

    #[test]
    fn test_environment_fills_missing_fields_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("IMAGE_MOVER_SRC_TAG", "2.0"),
            ("IMAGE_MOVER_DST_REGISTRY", "registry.example.com"),
            ("IMAGE_MOVER_SRC_USERNAME", "mallory"),
        ]);

        let mut args = full_args();
        args.src_tag = None;
        let args = args.from_lookup(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(args.src_tag.as_deref(), Some("2.0"));
        assert_eq!(args.src_username.as_deref(), Some("alice"));
        assert_eq!(args.dst_registry.as_deref(), Some("registry.example.com"));
    }

    #[test]
    fn test_missing_field_is_configuration_error() {
        let mut args = full_args();
        args.dst_password = None;

        let err = args.transfer_request().unwrap_err();
        assert!(matches!(err, MoverError::Configuration(ref m) if m.contains("--dst-password")));
    }

    #[test]
    fn test_absent_tags_default_to_latest() {
        let mut args = full_args();
        args.src_tag = None;
        args.dst_tag = Some(String::new());

        let request = args.transfer_request().unwrap();
        assert_eq!(request.source().tag(), "latest");
        assert_eq!(request.destination().tag(), "latest");
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut args = full_args();
        args.timeout = 0;
        assert!(args.validate().is_err());
    }
}
