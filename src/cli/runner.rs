//! Runner: configuration, client construction and the move itself

use crate::cli::args::Args;
use crate::config::DaemonConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::mover::{ImageMover, MoveReport};
use crate::registry::DockerClient;
use std::time::Duration;

pub struct Runner {
    args: Args,
    logger: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let logger = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self { args, logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub async fn run(&self) -> Result<MoveReport> {
        self.logger.section("Docker Image Mover");

        self.args.validate()?;
        let request = self.args.transfer_request()?;
        let daemon = DaemonConfig::from_env()?;

        self.logger.info(&format!("Source: {}", request.source().tagged_reference()));
        self.logger.info(&format!("Destination: {}", request.destination().tagged_reference()));
        self.logger.info(&format!(
            "Docker daemon: {}{}",
            daemon.host,
            if daemon.uses_tls() { " (mutual TLS)" } else { "" }
        ));

        let client = self.create_client(daemon)?;
        let mut mover = ImageMover::new(client, self.logger.clone());
        let report = mover.run(&request).await?;

        self.logger.summary_kv(
            "Summary",
            &[
                ("Source", report.source.clone()),
                ("Destination", report.destination.clone()),
                (
                    "Source digest",
                    report.pull.digest.clone().unwrap_or_else(|| "unknown".to_string()),
                ),
                (
                    "Pushed digest",
                    report.push.digest.clone().unwrap_or_else(|| "unknown".to_string()),
                ),
                ("Elapsed", self.logger.format_duration(report.elapsed)),
            ],
        );
        self.logger.success(&format!(
            "Copied {} to {}",
            report.source, report.destination
        ));

        Ok(report)
    }

    fn create_client(&self, daemon: DaemonConfig) -> Result<DockerClient> {
        self.logger.subsection("Setting up Docker client");

        DockerClient::builder(daemon)
            .with_connect_timeout(Some(Duration::from_secs(self.args.timeout)))
            .with_logger(self.logger.clone())
            .build()
    }
}
