//! Daemon connection handling.
//!
//! Provides the connection gate to a Docker/Podman daemon: opening a mutually
//! authenticated TLS channel from an endpoint configuration, or a local-socket
//! connection for development, plus the liveness check. Opening a connection
//! does not verify reachability; callers are expected to [`ping`] once before
//! trusting other operations.
//!
//! [`ping`]: DockClient::ping

use crate::{Error, Result};
use bollard::{API_DEFAULT_VERSION, Docker};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Connection timeout in seconds applied to the underlying transport.
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Client-side key material for a mutually authenticated connection.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    /// Path to the client's private key (PEM).
    pub private_key: PathBuf,
    /// Path to the client's certificate (PEM).
    pub certificate: PathBuf,
    /// Path to the CA certificate used to verify the daemon (PEM).
    pub ca_certificate: PathBuf,
}

/// Endpoint configuration for reaching a remote daemon.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Daemon hostname or address.
    pub host: String,
    /// Daemon port.
    pub port: u16,
    /// Key material for mutual TLS.
    pub tls: TlsPaths,
}

/// Handle to a daemon connection.
///
/// Cheap to clone; all managers share one handle and the underlying
/// transport tolerates concurrent in-flight requests. The handle holds no
/// other state.
#[derive(Clone)]
pub struct DockClient {
    docker: Arc<Docker>,
}

impl DockClient {
    /// Open a mutually authenticated channel to a remote daemon.
    ///
    /// Establishes the connection lazily; reachability and certificate
    /// acceptance are only verified by [`ping`](Self::ping).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty, or
    /// [`Error::Unreachable`] if the transport cannot be set up.
    pub fn open(config: &EndpointConfig) -> Result<Self> {
        if config.host.is_empty() {
            return Err(Error::Config("host is missing".to_string()));
        }

        let addr = format!("https://{}:{}", config.host, config.port);
        debug!("Opening TLS connection to {}", addr);

        let docker = Docker::connect_with_ssl(
            &addr,
            &config.tls.private_key,
            &config.tls.certificate,
            &config.tls.ca_certificate,
            CONNECT_TIMEOUT_SECS,
            API_DEFAULT_VERSION,
        )
        .map_err(Error::Unreachable)?;

        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Open a connection to a local daemon via the platform defaults
    /// (Unix socket or named pipe).
    ///
    /// Intended for development and integration tests; production callers
    /// go through [`open`](Self::open).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] if no local daemon socket is usable.
    pub fn open_local() -> Result<Self> {
        debug!("Opening local daemon connection");

        let docker = Docker::connect_with_local_defaults().map_err(Error::Unreachable)?;

        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Ping the daemon to verify it is reachable and the certificates are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unreachable`] on any transport or TLS failure; never
    /// retried internally.
    pub async fn ping(&self) -> Result<()> {
        let _ = self.docker.ping().await.map_err(Error::Unreachable)?;
        info!("Daemon ping successful");
        Ok(())
    }

    /// The underlying bollard client.
    pub(crate) fn docker(&self) -> &Docker {
        &self.docker
    }
}

/// Open a connection and verify the daemon answers, in one step.
///
/// Convenience for composing callers that want a handle they can already
/// trust: equivalent to [`DockClient::open`] followed by
/// [`DockClient::ping`].
///
/// # Errors
///
/// Returns [`Error::Config`] for missing parameters or
/// [`Error::Unreachable`] if the daemon does not answer.
pub async fn connect(config: &EndpointConfig) -> Result<DockClient> {
    let client = DockClient::open(config)?;
    client.ping().await?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(host: &str) -> EndpointConfig {
        EndpointConfig {
            host: host.to_string(),
            port: 2376,
            tls: TlsPaths {
                private_key: PathBuf::from("key.pem"),
                certificate: PathBuf::from("cert.pem"),
                ca_certificate: PathBuf::from("ca.pem"),
            },
        }
    }

    #[test]
    fn open_rejects_empty_host() {
        let result = DockClient::open(&endpoint(""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    #[ignore] // Requires a local Docker/Podman daemon
    async fn local_connection_pings() {
        let client = DockClient::open_local().unwrap();
        client.ping().await.unwrap();
    }
}
