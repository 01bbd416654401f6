//! Image building from a context directory.
//!
//! Runs the build pipeline end to end: isolate the context directory into a
//! private working copy, install the dockerfile at its root, apply
//! ignore-file exclusions, package the filtered tree into a gzipped tar
//! archive, stream it to the daemon's build endpoint, and aggregate the
//! streamed status frames into a single terminal result.

use crate::client::DockClient;
use crate::context;
use crate::progress::FrameAggregator;
use crate::{Error, Result};
use bollard::query_parameters::BuildImageOptionsBuilder;
use futures::stream::StreamExt;
use std::path::PathBuf;
use tracing::{debug, info};

/// A request to build an image from a context directory.
///
/// The context directory, the dockerfile, and the target image name are
/// mandatory; the ignore file is optional. Construct through
/// [`BuildRequest::builder`].
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Build context directory; never mutated by the build.
    pub directory: PathBuf,
    /// Dockerfile to install at the context root before packaging.
    pub dockerfile: PathBuf,
    /// Optional ignore file with newline-separated exclusion patterns.
    pub dockerignore: Option<PathBuf>,
    /// Name to tag the built image with.
    pub name: String,
}

impl BuildRequest {
    /// Create a new build-request builder.
    pub fn builder() -> BuildRequestBuilder {
        BuildRequestBuilder::default()
    }
}

/// Fluent builder for [`BuildRequest`].
#[derive(Debug, Default)]
pub struct BuildRequestBuilder {
    directory: Option<PathBuf>,
    dockerfile: Option<PathBuf>,
    dockerignore: Option<PathBuf>,
    name: Option<String>,
}

impl BuildRequestBuilder {
    /// Set the build context directory.
    pub fn directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.directory = Some(directory.into());
        self
    }

    /// Set the dockerfile to build with.
    pub fn dockerfile<P: Into<PathBuf>>(mut self, dockerfile: P) -> Self {
        self.dockerfile = Some(dockerfile.into());
        self
    }

    /// Set the ignore file to filter the context with.
    pub fn dockerignore<P: Into<PathBuf>>(mut self, dockerignore: P) -> Self {
        self.dockerignore = Some(dockerignore.into());
        self
    }

    /// Set the name to tag the built image with.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the directory, dockerfile, or name is
    /// missing.
    pub fn build(self) -> Result<BuildRequest> {
        let directory = self
            .directory
            .ok_or_else(|| Error::Config("directory is missing".to_string()))?;
        let dockerfile = self
            .dockerfile
            .ok_or_else(|| Error::Config("dockerfile is missing".to_string()))?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Config("name is missing".to_string()))?;

        Ok(BuildRequest {
            directory,
            dockerfile,
            dockerignore: self.dockerignore,
            name,
        })
    }
}

/// Image build operations on a daemon connection.
#[derive(Clone)]
pub struct ImageBuilder {
    client: DockClient,
}

impl ImageBuilder {
    /// Create a new image builder on a shared connection handle.
    pub fn new(client: DockClient) -> Self {
        Self { client }
    }

    /// Build an image from the given request.
    ///
    /// The daemon's status frames are drained to completion even after an
    /// error frame has decided the outcome, so the shared connection is
    /// never left with unread frames. Exactly one terminal outcome is
    /// reported per invocation regardless of how many error frames appear.
    ///
    /// # Errors
    ///
    /// Each pipeline step fails distinctly: [`Error::Isolation`],
    /// [`Error::CopyDockerfile`], [`Error::IgnoreFile`], [`Error::Filter`],
    /// [`Error::Stream`], or [`Error::Build`] carrying the daemon's first
    /// error message.
    pub async fn build_image(&self, request: &BuildRequest) -> Result<()> {
        info!(
            "Building image {} from {}",
            request.name,
            request.directory.display()
        );

        let workdir = context::isolate(&request.directory)?;
        context::install_dockerfile(workdir.path(), &request.dockerfile)?;
        if let Some(ref dockerignore) = request.dockerignore {
            context::apply_ignore_file(workdir.path(), dockerignore)?;
        }
        let tarball = context::archive(workdir.path())?;

        let options = BuildImageOptionsBuilder::default()
            .dockerfile("Dockerfile")
            .t(&request.name)
            .rm(true)
            .build();
        let mut stream = self.client.docker().build_image(
            options,
            None,
            Some(bollard::body_full(tarball.into())),
        );

        let mut aggregator = FrameAggregator::new();

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(status) => {
                    if let Some(error) = status.error {
                        aggregator.record_error(error);
                    } else if let Some(output) = status.stream {
                        debug!("Build output: {}", output.trim_end());
                    }
                }
                // A broken transport ends the stream; an earlier daemon
                // error frame still wins over the transport failure.
                Err(e) => {
                    if !aggregator.errored() {
                        return Err(Error::Stream(e.to_string()));
                    }
                    break;
                }
            }
        }

        aggregator.finish().map_err(Error::Build)?;
        info!("Successfully built image: {}", request.name);
        Ok(())
    }
}
