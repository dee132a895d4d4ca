//! Docker Image Mover Library
//!
//! Copies an image from a source registry to a destination registry through a
//! Docker daemon: log in to the source, pull, retag, log in to the destination,
//! push.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod mover;
pub mod registry;

pub use config::{AuthConfig, DaemonConfig, TransferRequest, TransferSide};
pub use error::{MoverError, Result};
pub use logging::Logger;
pub use mover::{ImageMover, MoveReport};
pub use registry::{DockerClient, ImageEngine};
