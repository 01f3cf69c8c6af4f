use std::fmt;
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs};
use std::str::FromStr;

use thiserror::Error;

use crate::error::TransactionError;

/// Public servers that answer plain RFC 5389 binding requests.
pub const DEFAULT_SERVERS: &[(&str, u16)] = &[
    ("stun.l.google.com", 19302),
    ("stun.l.google.com", 19305),
    ("stun1.l.google.com", 19302),
    ("stun1.l.google.com", 19305),
    ("stun2.l.google.com", 19302),
    ("stun2.l.google.com", 19305),
    ("stun3.l.google.com", 19302),
    ("stun3.l.google.com", 19305),
    ("stun4.l.google.com", 19302),
    ("stun4.l.google.com", 19305),
    ("stun.wtfismyip.com", 3478),
    ("stun.bcs2005.net", 3478),
    ("numb.viagenie.ca", 3478),
    ("173.194.202.127", 19302),
];

/// A STUN server given as hostname or IPv4 literal plus port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StunServer {
    pub address: String,
    pub port: u16,
}

impl StunServer {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    pub fn defaults() -> Vec<Self> {
        DEFAULT_SERVERS
            .iter()
            .map(|(address, port)| Self::new(*address, *port))
            .collect()
    }

    /// Resolves to the first IPv4 address. Blocks on the system resolver.
    pub fn resolve(&self) -> Result<SocketAddrV4, TransactionError> {
        let addrs = (self.address.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| self.resolver_error(Some(e)))?;

        self.first_ipv4(addrs)
    }

    pub async fn resolve_async(&self) -> Result<SocketAddrV4, TransactionError> {
        let addrs = tokio::net::lookup_host((self.address.as_str(), self.port))
            .await
            .map_err(|e| self.resolver_error(Some(e)))?;

        self.first_ipv4(addrs)
    }

    fn first_ipv4(
        &self,
        mut addrs: impl Iterator<Item = SocketAddr>,
    ) -> Result<SocketAddrV4, TransactionError> {
        let addr = addrs
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(v4),
                SocketAddr::V6(_) => None,
            })
            .ok_or_else(|| self.resolver_error(None))?;

        tracing::debug!(server = %self, %addr, "Resolved STUN server");

        Ok(addr)
    }

    fn resolver_error(&self, source: Option<std::io::Error>) -> TransactionError {
        TransactionError::Resolver {
            host: self.address.clone(),
            source,
        }
    }
}

impl fmt::Display for StunServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseServerError {
    #[error("expected `host:port`, got `{0}`")]
    MissingPort(String),
    #[error("invalid port in `{0}`")]
    InvalidPort(String),
}

impl FromStr for StunServer {
    type Err = ParseServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .filter(|(host, _)| !host.is_empty())
            .ok_or_else(|| ParseServerError::MissingPort(s.to_owned()))?;
        let port = port
            .parse()
            .map_err(|_| ParseServerError::InvalidPort(s.to_owned()))?;

        Ok(Self::new(host, port))
    }
}
