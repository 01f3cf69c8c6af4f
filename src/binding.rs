//! Sans-IO state of a single binding transaction.
//!
//! [`StunBinding`] never touches a socket or a clock. The caller pulls the
//! datagram to send via [`StunBinding::poll_transmit`], pushes the reply in via
//! [`StunBinding::handle_input`] and reports the passage of time via
//! [`StunBinding::handle_timeout`].

use std::collections::VecDeque;
use std::mem;
use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use crate::codec::{self, ExternalAddress, TransactionId};
use crate::error::ReceiveError;

pub struct StunBinding {
    transaction_id: TransactionId,
    timeout: Duration,
    state: State,
    buffered_transmits: VecDeque<Transmit>,
}

impl StunBinding {
    pub fn new(server: SocketAddrV4, transaction_id: TransactionId, timeout: Duration) -> Self {
        Self {
            transaction_id,
            timeout,
            state: State::Idle,
            buffered_transmits: VecDeque::from([Transmit {
                dst: server,
                payload: codec::encode_binding_request(&transaction_id),
            }]),
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Hands out the request. The response deadline starts counting at `now`.
    ///
    /// A timeout too large to represent as an [`Instant`] means no deadline.
    pub fn poll_transmit(&mut self, now: Instant) -> Option<Transmit> {
        let transmit = self.buffered_transmits.pop_front()?;

        if matches!(self.state, State::Idle) {
            self.state = State::Sent {
                deadline: now.checked_add(self.timeout),
            };
        }

        Some(transmit)
    }

    /// Consumes the one datagram this transaction waits for.
    ///
    /// Anything that is not a valid response to our request ends the
    /// transaction with an error; there is exactly one receive per binding.
    pub fn handle_input(&mut self, packet: &[u8]) {
        if !matches!(self.state, State::Sent { .. }) {
            tracing::debug!(len = packet.len(), "Ignoring datagram, no request in flight");
            return;
        }

        self.state = match codec::decode_binding_response(packet, &self.transaction_id) {
            Ok(address) => {
                tracing::debug!(%address, id = %self.transaction_id, "Received binding response");
                State::Received { address }
            }
            Err(e) => {
                tracing::warn!(id = %self.transaction_id, "Rejected binding response: {e}");
                State::Failed(e)
            }
        };
    }

    /// Notifies `StunBinding` that time has advanced to `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        let State::Sent {
            deadline: Some(deadline),
        } = self.state
        else {
            return;
        };

        if now < deadline {
            return;
        }

        tracing::debug!(id = %self.transaction_id, "Binding request timed out");
        self.state = State::Failed(ReceiveError::Timeout);
    }

    /// Returns the timestamp when we next expect `handle_timeout` to be called.
    pub fn poll_timeout(&self) -> Option<Instant> {
        match self.state {
            State::Sent { deadline } => deadline,
            _ => None,
        }
    }

    pub fn public_address(&self) -> Option<ExternalAddress> {
        match self.state {
            State::Received { address } => Some(address),
            _ => None,
        }
    }

    /// Takes the result once the transaction is over.
    pub fn poll_outcome(&mut self) -> Option<Result<ExternalAddress, ReceiveError>> {
        match mem::replace(&mut self.state, State::Done) {
            State::Received { address } => Some(Ok(address)),
            State::Failed(e) => Some(Err(e)),
            pending @ (State::Idle | State::Sent { .. }) => {
                self.state = pending;
                None
            }
            State::Done => None,
        }
    }
}

enum State {
    Idle,
    Sent { deadline: Option<Instant> },
    Received { address: ExternalAddress },
    Failed(ReceiveError),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmit {
    pub dst: SocketAddrV4,
    pub payload: Vec<u8>,
}
