//! Discover the public IPv4 address and port of this host with a single STUN
//! binding transaction (RFC 5389).

pub mod binding;
pub mod cli;
pub mod codec;
pub mod error;
pub mod server;
pub mod transaction;

pub use binding::{StunBinding, Transmit};
pub use codec::{ExternalAddress, TransactionId};
pub use error::{CodecError, ReceiveError, SendError, TransactionError};
pub use server::StunServer;
pub use transaction::{perform_binding_transaction, perform_binding_transaction_async};
