//! Composite string encodings used on the daemon's wire representation.
//!
//! The daemon packs several semantic values into single `key:value` strings:
//! volume binds (`host:container`), links (`name:alias`), extra hosts
//! (`name:ip`), environment variables (`NAME=value`), and exposed-port keys
//! (`port/tcp`). This module owns the encode/decode pair for each field kind
//! so the splitting rules live in one place. None of the encodings support
//! separator characters inside a component; decoding is lenient and returns
//! `None` for entries that do not fit the format.

use crate::config::{HostEntry, Link, PortBinding, VolumeMount};
use std::path::PathBuf;

/// Encode an environment variable for the creation payload.
///
/// Variable names are upper-cased on the wire.
pub fn encode_env(name: &str, value: &str) -> String {
    format!("{}={}", name.to_uppercase(), value)
}

/// Decode a `NAME=value` environment entry, splitting on the first `=`.
pub fn decode_env(entry: &str) -> Option<(String, String)> {
    entry
        .split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
}

/// Encode a volume mount as a `host:container` bind string.
pub fn encode_bind(volume: &VolumeMount) -> String {
    format!("{}:{}", volume.host.display(), volume.container.display())
}

/// Decode a `host:container[:mode]` bind string; a trailing mode is ignored.
pub fn decode_bind(bind: &str) -> Option<VolumeMount> {
    let mut parts = bind.splitn(3, ':');
    let host = parts.next()?;
    let container = parts.next()?;
    Some(VolumeMount {
        host: PathBuf::from(host),
        container: PathBuf::from(container),
    })
}

/// Encode a container link as a `name:alias` string.
pub fn encode_link(link: &Link) -> String {
    format!("{}:{}", link.name, link.alias)
}

/// Decode a link string as reported by inspect data.
///
/// The daemon namespaces both sides (`/linked:/container/alias`); the
/// namespace prefix up to the last `/` is stripped from each part.
pub fn decode_link(link: &str) -> Option<Link> {
    let (name, alias) = link.split_once(':')?;
    Some(Link {
        name: strip_namespace(name).to_string(),
        alias: strip_namespace(alias).to_string(),
    })
}

/// Encode an extra-host entry as a `name:ip` string.
pub fn encode_host_entry(host: &HostEntry) -> String {
    format!("{}:{}", host.name, host.ip)
}

/// Decode a `name:ip` extra-host entry.
pub fn decode_host_entry(entry: &str) -> Option<HostEntry> {
    let (name, ip) = entry.split_once(':')?;
    Some(HostEntry {
        name: name.to_string(),
        ip: ip.parse().ok()?,
    })
}

/// Encode a container port as an exposed-port key (`8080/tcp`).
pub fn encode_port_key(port: u16) -> String {
    format!("{port}/tcp")
}

/// Decode an exposed-port key back into the container port number.
pub fn decode_port_key(key: &str) -> Option<u16> {
    key.split('/').next()?.parse().ok()
}

/// Encode a host port for a port-binding value.
pub fn encode_host_port(binding: &PortBinding) -> String {
    binding.host.to_string()
}

/// Strip the leading `/` the daemon prefixes onto container names.
pub fn strip_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}

fn strip_namespace(part: &str) -> &str {
    part.rsplit('/').next().unwrap_or(part)
}
