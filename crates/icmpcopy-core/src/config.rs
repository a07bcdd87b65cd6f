//! Tunable settings for icmpcopy.
//!
//! Resolution order: command-line flags → explicit `--config` file → defaults.
//!
//! No configuration file is read unless one is named on the command line.
//! A file only needs the keys it overrides:
//!
//! ```toml
//! [transfer]
//! chunk_size = 512
//!
//! [socket]
//! recv_timeout_ms = 250
//! ```

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wire::{DEFAULT_CHUNK_SIZE, HEADER_LEN, IPV4_HEADER_LEN, MAX_PAYLOAD, RECV_BUFFER_LEN};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcmpcopyConfig {
    pub transfer: TransferConfig,
    pub socket: SocketConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes of file content per data packet. 1..=1492.
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Local address for the raw socket. 0.0.0.0 = all interfaces.
    pub bind_addr: Ipv4Addr,
    /// Sender write timeout. Must be non-zero; the OS reads a zero
    /// SO_SNDTIMEO as "block forever".
    pub send_timeout_ms: u64,
    /// Receiver poll interval. Expiry is not an error, the loop retries.
    pub recv_timeout_ms: u64,
    /// Largest datagram read from the raw socket, IP header included.
    /// Must fit a full data packet: ip_header_len + 8 + 1492.
    pub recv_buffer_len: usize,
    /// Bytes of IPv4 header in front of each received ICMP message.
    /// 0 on platforms whose raw sockets already strip it.
    pub ip_header_len: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            bind_addr: Ipv4Addr::UNSPECIFIED,
            send_timeout_ms: 10_000,
            recv_timeout_ms: 1_000,
            recv_buffer_len: RECV_BUFFER_LEN,
            ip_header_len: IPV4_HEADER_LEN,
        }
    }
}

impl SocketConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl IcmpcopyConfig {
    /// Load a TOML file. Missing keys keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reject settings the protocol or the socket layer cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chunk_size = self.transfer.chunk_size;
        if chunk_size == 0 || chunk_size > MAX_PAYLOAD {
            return Err(ConfigError::Invalid(format!(
                "chunk_size {chunk_size} must be between 1 and {MAX_PAYLOAD}"
            )));
        }
        if self.socket.recv_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "recv_timeout_ms must be non-zero".to_string(),
            ));
        }
        if self.socket.send_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "send_timeout_ms must be non-zero".to_string(),
            ));
        }
        let min_buffer = self.socket.ip_header_len + HEADER_LEN + MAX_PAYLOAD;
        if self.socket.recv_buffer_len < min_buffer {
            return Err(ConfigError::Invalid(format!(
                "recv_buffer_len {} cannot hold a full packet (ip_header_len + {HEADER_LEN} + {MAX_PAYLOAD} = {min_buffer})",
                self.socket.recv_buffer_len
            )));
        }
        Ok(())
    }
}
