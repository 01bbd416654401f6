//! Declarative container configuration.
//!
//! Provides a fluent builder for the simplified configuration model (ports,
//! volumes, links, environment, extra hosts, restart flag) and its
//! translation into the daemon's creation payload. Each optional section is
//! translated independently: an absent section leaves the corresponding wire
//! fields unset rather than defaulting them to empty containers.

use crate::encoding;
use crate::{Error, Result};
use bollard::models::{
    ContainerCreateBody, HostConfig, PortBinding as WirePortBinding, RestartPolicy,
    RestartPolicyNameEnum,
};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::PathBuf;

/// A container-to-host port forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PortBinding {
    /// Port inside the container.
    pub container: u16,
    /// Port on the host.
    pub host: u16,
}

/// A host-directory-to-container bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Path on the host.
    pub host: PathBuf,
    /// Path inside the container.
    pub container: PathBuf,
}

/// A link to another container under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Name of the linked container.
    pub name: String,
    /// Alias the link is reachable under.
    pub alias: String,
}

/// An `/etc/hosts` entry injected into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEntry {
    /// Hostname.
    pub name: String,
    /// Address the hostname resolves to.
    pub ip: IpAddr,
}

/// Network configuration for a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetworkConfig {
    /// Extra host entries, in declaration order.
    pub hosts: Vec<HostEntry>,
}

/// Declarative configuration for starting a container.
///
/// `image` and `name` are mandatory; every other section is optional and
/// independently composable. Construct through [`ContainerConfig::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Image reference to run.
    pub image: String,
    /// Container name; the unique key for later lookups.
    pub name: String,
    /// Environment variables; names are upper-cased on the wire.
    pub env: Option<BTreeMap<String, String>>,
    /// Port forwardings, in declaration order.
    pub ports: Option<Vec<PortBinding>>,
    /// Bind mounts, in declaration order.
    pub volumes: Option<Vec<VolumeMount>>,
    /// Links to other containers, in declaration order.
    pub links: Option<Vec<Link>>,
    /// Network configuration.
    pub network: Option<NetworkConfig>,
    /// Whether the daemon should always restart the container. Unset means
    /// a never-restart policy.
    pub restart: bool,
}

impl ContainerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ContainerConfigBuilder {
        ContainerConfigBuilder::new()
    }

    /// Translate this configuration into the daemon's creation payload.
    ///
    /// Only present sections contribute wire fields; the restart policy is
    /// always emitted (never-restart unless [`restart`](Self::restart) is
    /// set).
    pub fn creation_body(&self) -> ContainerCreateBody {
        let mut host_config = HostConfig {
            restart_policy: Some(RestartPolicy {
                name: Some(if self.restart {
                    RestartPolicyNameEnum::ALWAYS
                } else {
                    RestartPolicyNameEnum::NO
                }),
                maximum_retry_count: None,
            }),
            ..Default::default()
        };

        let mut body = ContainerCreateBody {
            image: Some(self.image.clone()),
            ..Default::default()
        };

        if let Some(ref env) = self.env {
            body.env = Some(
                env.iter()
                    .map(|(name, value)| encoding::encode_env(name, value))
                    .collect(),
            );
        }

        if let Some(ref volumes) = self.volumes {
            body.volumes = Some(
                volumes
                    .iter()
                    .map(|v| (v.container.display().to_string(), HashMap::new()))
                    .collect(),
            );
            host_config.binds = Some(volumes.iter().map(encoding::encode_bind).collect());
        }

        if let Some(ref ports) = self.ports {
            body.exposed_ports = Some(
                ports
                    .iter()
                    .map(|p| (encoding::encode_port_key(p.container), HashMap::new()))
                    .collect(),
            );
            host_config.port_bindings = Some(
                ports
                    .iter()
                    .map(|p| {
                        (
                            encoding::encode_port_key(p.container),
                            Some(vec![WirePortBinding {
                                host_ip: None,
                                host_port: Some(encoding::encode_host_port(p)),
                            }]),
                        )
                    })
                    .collect(),
            );
        }

        if let Some(ref links) = self.links {
            host_config.links = Some(links.iter().map(encoding::encode_link).collect());
        }

        if let Some(ref network) = self.network {
            host_config.extra_hosts = Some(
                network
                    .hosts
                    .iter()
                    .map(encoding::encode_host_entry)
                    .collect(),
            );
        }

        body.host_config = Some(host_config);
        body
    }
}

/// Fluent builder for [`ContainerConfig`].
#[derive(Debug, Default)]
pub struct ContainerConfigBuilder {
    image: Option<String>,
    name: Option<String>,
    env: BTreeMap<String, String>,
    ports: Vec<PortBinding>,
    volumes: Vec<VolumeMount>,
    links: Vec<Link>,
    hosts: Vec<HostEntry>,
    restart: bool,
}

impl ContainerConfigBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the image reference to run.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the container name.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        let _ = self.env.insert(name.into(), value.into());
        self
    }

    /// Add a container-to-host port forwarding.
    pub fn port(mut self, container: u16, host: u16) -> Self {
        self.ports.push(PortBinding { container, host });
        self
    }

    /// Add a bind mount.
    pub fn volume<H: Into<PathBuf>, C: Into<PathBuf>>(mut self, host: H, container: C) -> Self {
        self.volumes.push(VolumeMount {
            host: host.into(),
            container: container.into(),
        });
        self
    }

    /// Add a link to another container.
    pub fn link<N: Into<String>, A: Into<String>>(mut self, name: N, alias: A) -> Self {
        self.links.push(Link {
            name: name.into(),
            alias: alias.into(),
        });
        self
    }

    /// Add an extra host entry.
    pub fn host_entry<N: Into<String>>(mut self, name: N, ip: IpAddr) -> Self {
        self.hosts.push(HostEntry {
            name: name.into(),
            ip,
        });
        self
    }

    /// Ask the daemon to always restart the container.
    pub fn restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the image or name is missing.
    pub fn build(self) -> Result<ContainerConfig> {
        let image = self
            .image
            .filter(|i| !i.is_empty())
            .ok_or_else(|| Error::Config("image is missing".to_string()))?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Config("name is missing".to_string()))?;

        Ok(ContainerConfig {
            image,
            name,
            env: (!self.env.is_empty()).then_some(self.env),
            ports: (!self.ports.is_empty()).then_some(self.ports),
            volumes: (!self.volumes.is_empty()).then_some(self.volumes),
            links: (!self.links.is_empty()).then_some(self.links),
            network: (!self.hosts.is_empty()).then_some(NetworkConfig { hosts: self.hosts }),
            restart: self.restart,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ContainerConfig {
        ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .build()
            .unwrap()
    }

    #[test]
    fn minimal_config_omits_all_optional_sections() {
        let body = minimal().creation_body();

        assert_eq!(body.image.as_deref(), Some("thenativeweb/test"));
        assert!(body.env.is_none());
        assert!(body.exposed_ports.is_none());
        assert!(body.volumes.is_none());

        let host_config = body.host_config.unwrap();
        assert!(host_config.binds.is_none());
        assert!(host_config.links.is_none());
        assert!(host_config.extra_hosts.is_none());
        assert!(host_config.port_bindings.is_none());
    }

    #[test]
    fn restart_defaults_to_never() {
        let body = minimal().creation_body();
        let policy = body.host_config.unwrap().restart_policy.unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::NO));
    }

    #[test]
    fn restart_flag_maps_to_always() {
        let config = ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .restart(true)
            .build()
            .unwrap();
        let policy = config
            .creation_body()
            .host_config
            .unwrap()
            .restart_policy
            .unwrap();
        assert_eq!(policy.name, Some(RestartPolicyNameEnum::ALWAYS));
    }

    #[test]
    fn env_section_is_uppercased_on_the_wire() {
        let config = ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .env("port", "3000")
            .build()
            .unwrap();

        let env = config.creation_body().env.unwrap();
        assert_eq!(env, vec!["PORT=3000".to_string()]);
    }

    #[test]
    fn port_section_populates_exposure_and_bindings() {
        let config = ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .port(3000, 3000)
            .port(4000, 14000)
            .build()
            .unwrap();

        let body = config.creation_body();
        let exposed = body.exposed_ports.unwrap();
        assert!(exposed.contains_key("3000/tcp"));
        assert!(exposed.contains_key("4000/tcp"));

        let bindings = body.host_config.unwrap().port_bindings.unwrap();
        let forwarded = bindings.get("4000/tcp").unwrap().as_ref().unwrap();
        assert_eq!(forwarded[0].host_port.as_deref(), Some("14000"));
    }

    #[test]
    fn volume_section_populates_volumes_and_binds() {
        let config = ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .volume("/srv/data", "/data")
            .build()
            .unwrap();

        let body = config.creation_body();
        assert!(body.volumes.unwrap().contains_key("/data"));
        assert_eq!(
            body.host_config.unwrap().binds.unwrap(),
            vec!["/srv/data:/data".to_string()]
        );
    }

    #[test]
    fn link_and_host_sections_translate_independently() {
        let config = ContainerConfig::builder()
            .image("thenativeweb/test")
            .name("web")
            .link("postgres", "db")
            .host_entry("registry", "192.168.0.10".parse().unwrap())
            .build()
            .unwrap();

        let host_config = config.creation_body().host_config.unwrap();
        assert_eq!(host_config.links.unwrap(), vec!["postgres:db".to_string()]);
        assert_eq!(
            host_config.extra_hosts.unwrap(),
            vec!["registry:192.168.0.10".to_string()]
        );
        assert!(host_config.binds.is_none());
    }

    #[test]
    fn missing_image_is_rejected() {
        let result = ContainerConfig::builder().name("web").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_name_is_rejected() {
        let result = ContainerConfig::builder().image("thenativeweb/test").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
