//! Flow identification and hashing
//!
//! The selector only needs a well-dispersed integer per flow. This module
//! provides the usual source: a [`FlowKey`] built from connection endpoints,
//! hashed by a swappable [`FlowHasher`].

use crate::error::{AppError, AppResult};
use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Seed used when configuration does not provide one
pub const DEFAULT_SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

/// Transport protocol of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Connection-identifying fields of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FlowKey {
    pub protocol: Protocol,
    pub source: SocketAddr,
    pub destination: SocketAddr,
}

impl FlowKey {
    pub fn new(protocol: Protocol, source: SocketAddr, destination: SocketAddr) -> Self {
        Self {
            protocol,
            source,
            destination,
        }
    }

    /// TCP flow between two endpoints
    pub fn tcp(source: SocketAddr, destination: SocketAddr) -> Self {
        Self::new(Protocol::Tcp, source, destination)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.protocol.as_str(),
            self.source,
            self.destination
        )
    }
}

impl FromStr for FlowKey {
    type Err = AppError;

    /// Parse `[tcp:|udp:]<source>-><destination>`
    ///
    /// IPv6 addresses use the bracketed form, e.g. `[::1]:5000->[::1]:80`.
    fn from_str(s: &str) -> AppResult<Self> {
        let s = s.trim();
        let (protocol, rest) = if let Some(rest) = s.strip_prefix("tcp:") {
            (Protocol::Tcp, rest)
        } else if let Some(rest) = s.strip_prefix("udp:") {
            (Protocol::Udp, rest)
        } else {
            (Protocol::Tcp, s)
        };

        let (source, destination) = rest.split_once("->").ok_or_else(|| {
            AppError::InvalidFlow(format!(
                "'{}' is not of the form <source>-><destination>",
                s
            ))
        })?;

        let parse_addr = |addr: &str| {
            addr.trim().parse::<SocketAddr>().map_err(|e| {
                AppError::InvalidFlow(format!("'{}' is not a socket address: {}", addr.trim(), e))
            })
        };

        Ok(Self::new(
            protocol,
            parse_addr(source)?,
            parse_addr(destination)?,
        ))
    }
}

/// Maps a flow to the integer fed into selection
///
/// Implementations must be deterministic for the lifetime of a selector,
/// otherwise flows stop being sticky. Any `Fn(&FlowKey) -> u64` works.
pub trait FlowHasher: Send + Sync {
    fn hash_flow(&self, flow: &FlowKey) -> u64;
}

impl<F> FlowHasher for F
where
    F: Fn(&FlowKey) -> u64 + Send + Sync,
{
    fn hash_flow(&self, flow: &FlowKey) -> u64 {
        self(flow)
    }
}

/// `ahash` with fixed seeds
///
/// Fixed seeds keep a flow's hash stable across restarts of the same build
/// on the same platform. Different seeds reshuffle which flows land where.
#[derive(Clone)]
pub struct SeededFlowHasher {
    seed: u64,
    state: RandomState,
}

impl SeededFlowHasher {
    pub fn new(seed: u64) -> Self {
        let state = RandomState::with_seeds(
            seed,
            seed ^ 0x243f_6a88_85a3_08d3,
            seed.rotate_left(32) ^ 0x1319_8a2e_0370_7344,
            !seed,
        );
        Self { seed, state }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SeededFlowHasher {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl fmt::Debug for SeededFlowHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededFlowHasher")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl FlowHasher for SeededFlowHasher {
    fn hash_flow(&self, flow: &FlowKey) -> u64 {
        self.state.hash_one(flow)
    }
}
