//! Shared command-line surface of the `stun_std` and `stun_tokio` binaries.

use std::time::Duration;

use clap::Parser;

use crate::codec::ExternalAddress;
use crate::error::TransactionError;
use crate::server::StunServer;

#[derive(Parser, Debug)]
#[command(about = "Ask STUN servers for this host's public IPv4 address")]
pub struct Args {
    /// Seconds to wait for each server's response.
    #[arg(long, default_value_t = 5)]
    pub timeout: u32,

    /// Servers to query as `host:port`. Defaults to a list of public servers.
    pub servers: Vec<StunServer>,
}

impl Args {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout))
    }

    pub fn servers(&self) -> Vec<StunServer> {
        if self.servers.is_empty() {
            return StunServer::defaults();
        }

        self.servers.clone()
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// One output line per server.
pub fn report(server: &StunServer, result: &Result<ExternalAddress, TransactionError>) -> String {
    match result {
        Ok(address) => format!("{}: Public IP: {}", server.address, address),
        Err(e) => format!("{}: Failed. Error: {} ({e})", server.address, e.code()),
    }
}
