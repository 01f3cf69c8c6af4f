//! Drives one [`StunBinding`] over a real UDP socket.
//!
//! Each call owns a fresh socket bound to `0.0.0.0:0`, sends one request,
//! performs one bounded receive and drops the socket on every exit path.

use std::io;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use crate::binding::{StunBinding, Transmit};
use crate::codec::{ExternalAddress, TransactionId};
use crate::error::{ReceiveError, SendError, TransactionError};
use crate::server::StunServer;

/// Large enough for any binding response a public server sends us.
const RECV_BUF_LEN: usize = 576;

/// Discovers our reflexive IPv4 transport address via `server`, blocking the calling thread.
///
/// `timeout` bounds the wait for the response; resolution is bounded only by
/// the system resolver.
pub fn perform_binding_transaction(
    server: &StunServer,
    timeout: Duration,
) -> Result<ExternalAddress, TransactionError> {
    perform_binding_transaction_with_id(server, timeout, TransactionId::random())
}

pub fn perform_binding_transaction_with_id(
    server: &StunServer,
    timeout: Duration,
    transaction_id: TransactionId,
) -> Result<ExternalAddress, TransactionError> {
    let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .map_err(TransactionError::Socket)?;
    socket
        .set_read_timeout(Some(timeout))
        .map_err(TransactionError::Socket)?;
    tracing::debug!(local = ?socket.local_addr().ok(), "Bound UDP socket");

    let server_addr = server.resolve()?;
    let mut binding = StunBinding::new(server_addr, transaction_id, timeout);
    let mut buf = [0u8; RECV_BUF_LEN];

    loop {
        if let Some(transmit) = binding.poll_transmit(Instant::now()) {
            let sent = socket
                .send_to(&transmit.payload, transmit.dst)
                .map_err(SendError::Io)?;
            check_sent(&transmit, sent, binding.transaction_id())?;
            continue;
        }

        if let Some(outcome) = binding.poll_outcome() {
            return Ok(outcome?);
        }

        let (num_read, from) = socket.recv_from(&mut buf).map_err(ReceiveError::from_io)?;
        tracing::debug!(%from, num_read, "Received datagram");

        binding.handle_input(&buf[..num_read]);
    }
}

/// Same as [`perform_binding_transaction`], but suspends instead of blocking.
pub async fn perform_binding_transaction_async(
    server: &StunServer,
    timeout: Duration,
) -> Result<ExternalAddress, TransactionError> {
    perform_binding_transaction_async_with_id(server, timeout, TransactionId::random()).await
}

pub async fn perform_binding_transaction_async_with_id(
    server: &StunServer,
    timeout: Duration,
    transaction_id: TransactionId,
) -> Result<ExternalAddress, TransactionError> {
    // Same contract as `set_read_timeout` on the blocking path.
    if timeout.is_zero() {
        return Err(TransactionError::Socket(io::Error::new(
            io::ErrorKind::InvalidInput,
            "receive timeout must be non-zero",
        )));
    }

    let socket = tokio::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .await
        .map_err(TransactionError::Socket)?;
    tracing::debug!(local = ?socket.local_addr().ok(), "Bound UDP socket");

    let server_addr = server.resolve_async().await?;
    let mut binding = StunBinding::new(server_addr, transaction_id, timeout);
    let mut buf = [0u8; RECV_BUF_LEN];

    loop {
        let now = tokio::time::Instant::now().into_std();

        if let Some(transmit) = binding.poll_transmit(now) {
            let sent = socket
                .send_to(&transmit.payload, transmit.dst)
                .await
                .map_err(SendError::Io)?;
            check_sent(&transmit, sent, binding.transaction_id())?;
            continue;
        }

        if let Some(outcome) = binding.poll_outcome() {
            return Ok(outcome?);
        }

        tokio::select! {
            deadline = sleep_until(binding.poll_timeout()) => {
                binding.handle_timeout(deadline);
            },
            res = socket.recv_from(&mut buf) => {
                let (num_read, from) = res.map_err(ReceiveError::from_io)?;
                tracing::debug!(%from, num_read, "Received datagram");

                binding.handle_input(&buf[..num_read]);
            }
        }
    }
}

/// Resolves at `deadline`, or never if there is none.
async fn sleep_until(deadline: Option<Instant>) -> Instant {
    match deadline {
        Some(deadline) => {
            tokio::time::sleep_until(deadline.into()).await;
            deadline
        }
        None => std::future::pending().await,
    }
}

fn check_sent(
    transmit: &Transmit,
    sent: usize,
    transaction_id: &TransactionId,
) -> Result<(), SendError> {
    if sent != transmit.payload.len() {
        return Err(SendError::Incomplete {
            sent,
            expected: transmit.payload.len(),
        });
    }

    tracing::debug!(dst = %transmit.dst, id = %transaction_id, "Sent binding request");

    Ok(())
}
