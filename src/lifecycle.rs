//! Container lifecycle management.
//!
//! Translates a declarative [`ContainerConfig`] into the daemon's creation
//! payload and starts the container, reconstructs running-container
//! configuration from inspect data, streams demultiplexed logs, and kills
//! and removes containers.
//!
//! A container moves through `absent → created → running → removed` as seen
//! from this manager. No transition is retried: a start failure after a
//! successful create leaves the created container in the daemon's inventory
//! for the caller to remediate, matching the daemon's own semantics.

use crate::client::DockClient;
use crate::config::{ContainerConfig, Link, NetworkConfig, PortBinding, VolumeMount};
use crate::encoding;
use crate::image::ImageMatcher;
use crate::{Error, Result};
use bollard::container::LogOutput;
use bollard::models::{ContainerInspectResponse, RestartPolicyNameEnum};
use bollard::query_parameters::{
    CreateContainerOptionsBuilder, InspectContainerOptions, KillContainerOptions,
    ListContainersOptions, LogsOptionsBuilder, RemoveContainerOptionsBuilder,
    StartContainerOptions,
};
use bytes::Bytes;
use futures::future::try_join_all;
use futures::stream::StreamExt;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A running container's configuration, reconstructed from inspect data.
///
/// Mirrors the shape of [`ContainerConfig`] with the daemon's composite
/// encodings decomposed: environment as a map, links and host entries split
/// and stripped of namespace prefixes, port and bind strings decoded into
/// typed pairs, and the leading `/` removed from the name. Produced fresh on
/// every query and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    /// Container name, without the daemon's leading `/`.
    pub name: String,
    /// Image reference the container was created from.
    pub image: String,
    /// Environment variables, including daemon-injected ones such as `PATH`.
    pub env: BTreeMap<String, String>,
    /// Port forwardings, sorted by container port.
    pub ports: Vec<PortBinding>,
    /// Bind mounts.
    pub volumes: Vec<VolumeMount>,
    /// Links to other containers.
    pub links: Vec<Link>,
    /// Network configuration.
    pub network: NetworkConfig,
    /// Whether the daemon restarts the container automatically.
    pub restart: bool,
}

impl RunningContainer {
    /// Decode a container's inspect data.
    ///
    /// Decoding is lenient: entries that do not fit the composite formats
    /// are skipped rather than failing the whole container.
    fn from_inspection(data: &ContainerInspectResponse) -> Self {
        let config = data.config.as_ref();
        let host_config = data.host_config.as_ref();

        let env = config
            .and_then(|c| c.env.as_ref())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| encoding::decode_env(entry))
                    .collect()
            })
            .unwrap_or_default();

        let mut ports: Vec<PortBinding> = host_config
            .and_then(|h| h.port_bindings.as_ref())
            .map(|bindings| {
                bindings
                    .iter()
                    .filter_map(|(key, value)| {
                        let container = encoding::decode_port_key(key)?;
                        let host = value.as_ref()?.first()?.host_port.as_ref()?.parse().ok()?;
                        Some(PortBinding { container, host })
                    })
                    .collect()
            })
            .unwrap_or_default();
        // The wire representation is an unordered map; sort for determinism.
        ports.sort();

        let volumes = host_config
            .and_then(|h| h.binds.as_ref())
            .map(|binds| binds.iter().filter_map(|b| encoding::decode_bind(b)).collect())
            .unwrap_or_default();

        let links = host_config
            .and_then(|h| h.links.as_ref())
            .map(|links| links.iter().filter_map(|l| encoding::decode_link(l)).collect())
            .unwrap_or_default();

        let hosts = host_config
            .and_then(|h| h.extra_hosts.as_ref())
            .map(|hosts| {
                hosts
                    .iter()
                    .filter_map(|h| encoding::decode_host_entry(h))
                    .collect()
            })
            .unwrap_or_default();

        let restart = host_config
            .and_then(|h| h.restart_policy.as_ref())
            .and_then(|p| p.name)
            == Some(RestartPolicyNameEnum::ALWAYS);

        Self {
            name: data
                .name
                .as_deref()
                .map(encoding::strip_name)
                .unwrap_or_default()
                .to_string(),
            image: config
                .and_then(|c| c.image.clone())
                .unwrap_or_default(),
            env,
            ports,
            volumes,
            links,
            network: NetworkConfig { hosts },
            restart,
        }
    }
}

/// Live log streams of a container, demultiplexed by the daemon's framing.
///
/// Both streams are unbounded and push-driven: the underlying connection is
/// drained regardless of how fast (or whether) the receivers are consumed,
/// so an idle caller never stalls the shared connection. Each stream ends
/// when the container stops or the receiver is dropped.
pub struct LogStreams {
    /// The container's standard output.
    pub stdout: mpsc::UnboundedReceiver<Bytes>,
    /// The container's standard error.
    pub stderr: mpsc::UnboundedReceiver<Bytes>,
}

/// Container operations on a daemon connection.
#[derive(Clone)]
pub struct ContainerManager {
    client: DockClient,
}

impl ContainerManager {
    /// Create a new container manager on a shared connection handle.
    pub fn new(client: DockClient) -> Self {
        Self { client }
    }

    /// Create and start a container from its declarative configuration.
    ///
    /// Each optional section of the configuration is translated
    /// independently; absent sections leave the corresponding wire fields
    /// unset. Returns the daemon-assigned container ID.
    ///
    /// If the start fails after creation succeeded, the created container
    /// stays in the daemon's inventory; callers must be prepared to see it
    /// and remediate externally.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a missing image or name (before any
    /// network call), [`Error::Create`] or [`Error::Start`] wrapping the
    /// daemon's rejection.
    pub async fn start_container(&self, config: &ContainerConfig) -> Result<String> {
        if config.image.is_empty() {
            return Err(Error::Config("image is missing".to_string()));
        }
        if config.name.is_empty() {
            return Err(Error::Config("name is missing".to_string()));
        }

        debug!("Creating container: {}", config.name);

        let options = CreateContainerOptionsBuilder::default()
            .name(&config.name)
            .build();
        let response = self
            .client
            .docker()
            .create_container(Some(options), config.creation_body())
            .await
            .map_err(Error::Create)?;

        self.client
            .docker()
            .start_container(&response.id, None::<StartContainerOptions>)
            .await
            .map_err(Error::Start)?;

        info!("Started container: {} ({})", config.name, response.id);
        Ok(response.id)
    }

    /// List running containers whose image matches, with their
    /// configuration reconstructed from inspect data.
    ///
    /// Fans out one inspection per listed container concurrently and joins
    /// all of them: if any inspection fails the whole call fails, with no
    /// partial result. The result follows the daemon's listing order. Zero
    /// running containers yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the listing fails or [`Error::Inspect`]
    /// if any inspection fails.
    pub async fn running_containers_for(
        &self,
        matcher: &ImageMatcher,
    ) -> Result<Vec<RunningContainer>> {
        let summaries = self
            .client
            .docker()
            .list_containers(None::<ListContainersOptions>)
            .await
            .map_err(Error::Query)?;

        let inspections = try_join_all(summaries.iter().filter_map(|s| s.id.as_deref()).map(
            |id| async move {
                self.client
                    .docker()
                    .inspect_container(id, None::<InspectContainerOptions>)
                    .await
            },
        ))
        .await
        .map_err(Error::Inspect)?;

        Ok(inspections
            .iter()
            .filter(|inspection| {
                inspection
                    .config
                    .as_ref()
                    .and_then(|c| c.image.as_deref())
                    .is_some_and(|image| matcher.matches(image))
            })
            .map(RunningContainer::from_inspection)
            .collect())
    }

    /// Attach to a container's output, demultiplexed into stdout and
    /// stderr byte streams.
    ///
    /// The streams are live and unbounded until the container stops or the
    /// receivers are dropped; the daemon connection keeps being drained
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty name or [`Error::Attach`] if
    /// the container does not exist or the attach is refused.
    pub async fn logs(&self, name: &str) -> Result<LogStreams> {
        if name.is_empty() {
            return Err(Error::Config("name is missing".to_string()));
        }

        // Fail fast with an attach error if the container is unknown; the
        // log stream itself would only surface this on first poll.
        let _ = self
            .client
            .docker()
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|source| Error::Attach {
                name: name.to_string(),
                source,
            })?;

        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();

        let client = self.client.clone();
        let container = name.to_string();
        drop(tokio::spawn(async move {
            let options = LogsOptionsBuilder::default()
                .follow(true)
                .stdout(true)
                .stderr(true)
                .build();
            let mut stream = client.docker().logs(&container, Some(options));

            while let Some(frame) = stream.next().await {
                match frame {
                    // Send failures mean the receiver was dropped; keep
                    // draining so the connection is not stalled.
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                        let _ = stdout_tx.send(message);
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        let _ = stderr_tx.send(message);
                    }
                    Ok(LogOutput::StdIn { .. }) => {}
                    Err(e) => {
                        debug!("Log stream for {} ended: {}", container, e);
                        break;
                    }
                }
            }
        }));

        Ok(LogStreams {
            stdout: stdout_rx,
            stderr: stderr_rx,
        })
    }

    /// Kill the named container, then remove it along with its anonymous
    /// volumes.
    ///
    /// Kill and remove are sequential: if the kill succeeds but the removal
    /// fails, the container is left stopped but present and the error is
    /// still surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty name or [`Error::Stop`] if
    /// the container does not exist or the daemon rejects kill or remove.
    pub async fn stop_container(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Config("name is missing".to_string()));
        }

        debug!("Killing container: {}", name);
        self.client
            .docker()
            .kill_container(name, None::<KillContainerOptions>)
            .await
            .map_err(|source| Error::Stop {
                name: name.to_string(),
                source,
            })?;

        self.client
            .docker()
            .remove_container(
                name,
                Some(RemoveContainerOptionsBuilder::default().v(true).build()),
            )
            .await
            .map_err(|source| Error::Stop {
                name: name.to_string(),
                source,
            })?;

        info!("Removed container: {}", name);
        Ok(())
    }
}
