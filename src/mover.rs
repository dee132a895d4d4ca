//! Image mover: authenticate, pull, tag, authenticate, push
//!
//! Each stage is a public method so it can be driven on its own; [`ImageMover::run`]
//! chains them in the only valid order and stops at the first failure.

use crate::config::{AuthConfig, TransferRequest, TransferSide};
use crate::error::{MoverError, Result};
use crate::logging::Logger;
use crate::registry::progress::drain_progress;
use crate::registry::{ImageEngine, LoginStatus, TagStatus, TransferKind, TransferSummary};
use std::time::{Duration, Instant};

/// Result of one completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub source: String,
    pub destination: String,
    pub pull: TransferSummary,
    pub push: TransferSummary,
    pub elapsed: Duration,
}

pub struct ImageMover<E: ImageEngine> {
    engine: E,
    logger: Logger,
}

impl<E: ImageEngine> ImageMover<E> {
    pub fn new(engine: E, logger: Logger) -> Self {
        Self { engine, logger }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Replace the engine's credential context; a rejected login is an error
    pub async fn authenticate(&mut self, credentials: &AuthConfig, server: Option<&str>) -> Result<()> {
        self.logger.step(&format!(
            "Authenticating {} against {}",
            credentials.username,
            server.unwrap_or("default registry")
        ));

        match self.engine.login(credentials, server).await? {
            LoginStatus::Succeeded => {
                self.logger.success(&format!("Logged in as {}", credentials.username));
                Ok(())
            }
            LoginStatus::Rejected(message) => Err(MoverError::Authentication(format!(
                "{} was rejected by {}: {}",
                credentials.username,
                server.unwrap_or("default registry"),
                message
            ))),
        }
    }

    /// Log in with the source credentials and pull the source image
    pub async fn download_image(&mut self, source: &TransferSide) -> Result<TransferSummary> {
        self.logger.subsection("Pulling source image");
        self.authenticate(source.credentials(), source.registry()).await?;
        self.pull(source).await
    }

    pub async fn pull(&mut self, source: &TransferSide) -> Result<TransferSummary> {
        let reference = source.tagged_reference();
        self.logger.step(&format!("Pulling {}", reference));

        let stream = self.engine.pull(&source.image_reference(), source.tag()).await?;
        let summary = drain_progress(stream, TransferKind::Pull, &reference, &self.logger).await?;

        self.logger.success(&format!("Pulled {} ({} progress records)", reference, summary.records));
        Ok(summary)
    }

    /// Label the pulled source image with the destination reference
    pub async fn tag_downloaded_image(&mut self, request: &TransferRequest) -> Result<()> {
        self.logger.subsection("Tagging image");
        let source = request.source().tagged_reference();
        let destination = request.destination();
        self.logger.step(&format!("Tagging {} as {}", source, destination.tagged_reference()));

        let status = self
            .engine
            .tag(&source, &destination.image_reference(), destination.tag())
            .await?;

        match status {
            TagStatus::Tagged => {
                self.logger.success(&format!("Tagged {}", destination.tagged_reference()));
                Ok(())
            }
            TagStatus::Rejected(message) => Err(MoverError::Tag(format!(
                "Could not tag {} as {}: {}",
                source,
                destination.tagged_reference(),
                message
            ))),
        }
    }

    /// Log in with the destination credentials and push the relabeled image
    pub async fn upload_image(&mut self, destination: &TransferSide) -> Result<TransferSummary> {
        self.logger.subsection("Pushing destination image");
        self.authenticate(destination.credentials(), destination.registry()).await?;
        self.push(destination).await
    }

    pub async fn push(&mut self, destination: &TransferSide) -> Result<TransferSummary> {
        let reference = destination.tagged_reference();
        self.logger.step(&format!("Pushing {}", reference));

        let stream = self
            .engine
            .push(&destination.image_reference(), destination.tag())
            .await?;
        let summary = drain_progress(stream, TransferKind::Push, &reference, &self.logger).await?;

        self.logger.success(&format!("Pushed {} ({} progress records)", reference, summary.records));
        Ok(summary)
    }

    /// Pull, tag and push. Nothing is skipped on repeated runs.
    pub async fn run(&mut self, request: &TransferRequest) -> Result<MoveReport> {
        let started = Instant::now();
        self.logger.section(&format!(
            "Copying {} to {}",
            request.source().tagged_reference(),
            request.destination().tagged_reference()
        ));

        let pull = self.download_image(request.source()).await?;
        self.tag_downloaded_image(request).await?;
        let push = self.upload_image(request.destination()).await?;

        if let (Some(pulled), Some(pushed)) = (&pull.digest, &push.digest) {
            if pulled != pushed {
                self.logger.verbose(&format!(
                    "Destination manifest digest {} differs from source digest {}",
                    pushed, pulled
                ));
            }
        }

        Ok(MoveReport {
            source: request.source().tagged_reference(),
            destination: request.destination().tagged_reference(),
            pull,
            push,
            elapsed: started.elapsed(),
        })
    }
}
