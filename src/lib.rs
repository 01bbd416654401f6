//! # dockhand
//!
//! A client-side convenience layer for driving a Docker/Podman daemon over its
//! remote management API via the bollard crate. It covers pinging availability,
//! checking and pulling images, building images from a context directory,
//! starting containers from a declarative configuration, listing running
//! containers with their configuration reconstructed from inspect data,
//! streaming container logs, and stopping containers.
//!
//! ## Architecture
//!
//! The crate is organized into a small set of collaborating components, all
//! stateless beyond the shared connection handle:
//!
//! - [`client`]: connection establishment (mutual TLS or local socket) and
//!   the daemon liveness check
//! - [`config`]: declarative container configuration and its translation
//!   into the daemon's creation payload
//! - [`encoding`]: the daemon's composite `key:value` string encodings for
//!   ports, binds, links, extra hosts, and environment variables
//! - [`lifecycle`]: container create/start, running-container queries, log
//!   streaming, and kill/remove
//! - [`image`]: image listing and pulls with streamed progress frames
//! - [`build`]: the image build pipeline (context isolation, ignore-file
//!   filtering, tar packaging, streamed build)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dockhand::{ContainerConfig, ContainerManager, DockClient};
//!
//! #[tokio::main]
//! async fn main() -> dockhand::Result<()> {
//!     // Connect to a local daemon and verify it answers.
//!     let client = DockClient::open_local()?;
//!     client.ping().await?;
//!
//!     let containers = ContainerManager::new(client);
//!
//!     let config = ContainerConfig::builder()
//!         .image("alpine:latest")
//!         .name("dockhand-demo")
//!         .env("foo", "bar")
//!         .build()?;
//!
//!     let id = containers.start_container(&config).await?;
//!     println!("started {id}");
//!
//!     containers.stop_container("dockhand-demo").await?;
//!     Ok(())
//! }
//! ```

pub mod build;
pub mod client;
pub mod config;
mod context;
pub mod encoding;
pub mod image;
pub mod lifecycle;
mod progress;

pub use build::{BuildRequest, BuildRequestBuilder, ImageBuilder};
pub use client::{DockClient, EndpointConfig, TlsPaths, connect};
pub use config::{
    ContainerConfig, ContainerConfigBuilder, HostEntry, Link, NetworkConfig, PortBinding,
    VolumeMount,
};
pub use image::{ImageManager, ImageMatcher};
pub use lifecycle::{ContainerManager, LogStreams, RunningContainer};

/// Errors produced by daemon operations.
///
/// Configuration errors are raised before any I/O is issued; everything else
/// reports a failed round-trip with the daemon and carries the underlying
/// cause. No operation retries internally.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The daemon could not be reached or refused the TLS handshake.
    #[error("daemon unreachable: {0}")]
    Unreachable(#[source] bollard::errors::Error),

    /// A mandatory parameter is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Listing the daemon's image or container inventory failed.
    #[error("inventory query failed: {0}")]
    Query(#[source] bollard::errors::Error),

    /// An image pull was rejected, carrying the daemon's first error message.
    #[error("image pull failed: {0}")]
    Pull(String),

    /// Container creation was rejected.
    #[error("container creation failed: {0}")]
    Create(#[source] bollard::errors::Error),

    /// Container start was rejected after creation succeeded.
    #[error("container start failed: {0}")]
    Start(#[source] bollard::errors::Error),

    /// Inspecting a listed container failed.
    #[error("container inspection failed: {0}")]
    Inspect(#[source] bollard::errors::Error),

    /// Attaching to a container's output failed.
    #[error("attach to container '{name}' failed: {source}")]
    Attach {
        /// Name of the container that could not be attached to.
        name: String,
        /// Underlying daemon error.
        #[source]
        source: bollard::errors::Error,
    },

    /// Killing or removing a container failed.
    #[error("stopping container '{name}' failed: {source}")]
    Stop {
        /// Name of the container that could not be stopped.
        name: String,
        /// Underlying daemon error.
        #[source]
        source: bollard::errors::Error,
    },

    /// Copying the build context into a private working copy failed.
    #[error("build context isolation failed: {0}")]
    Isolation(#[source] std::io::Error),

    /// Installing the dockerfile into the working copy failed.
    #[error("copying dockerfile failed: {0}")]
    CopyDockerfile(#[source] std::io::Error),

    /// The ignore file could not be read or a pattern in it is invalid.
    #[error("ignore file error: {0}")]
    IgnoreFile(String),

    /// Deleting ignored paths from the working copy failed.
    #[error("filtering build context failed: {0}")]
    Filter(#[source] std::io::Error),

    /// Packaging or streaming the build context to the daemon failed.
    #[error("streaming build context failed: {0}")]
    Stream(String),

    /// The daemon reported a build failure, carrying its first error message.
    #[error("image build failed: {0}")]
    Build(String),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, Error>;
