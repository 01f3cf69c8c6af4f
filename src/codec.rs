//! Wire format of the STUN messages used by a binding transaction (RFC 5389 §6, §15).
//!
//! Everything here is pure: bytes in, values out. Every read from a received
//! buffer is bounds-checked, so a hostile or corrupt response surfaces as a
//! [`CodecError`] instead of a panic.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use rand::RngCore;

use crate::error::{CodecError, ReceiveError};

pub const MAGIC_COOKIE: u32 = 0x2112_A442;
pub const BINDING_REQUEST: u16 = 0x0001;
pub const BINDING_RESPONSE: u16 = 0x0101;
pub const ATTR_XOR_MAPPED_ADDRESS: u16 = 0x0020;
pub const HEADER_LEN: usize = 20;

const ATTRIBUTE_HEADER_LEN: usize = 4;
const FAMILY_IPV4: u8 = 0x01;
const XOR_MAPPED_IPV4_LEN: usize = 8;

/// 96-bit id correlating a request with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId([u8; 12]);

impl TransactionId {
    pub const fn new(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Draws a fresh id from the thread-local generator, which is seeded once per thread.
    pub fn random() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    pub fn from_rng<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut id = [0u8; 12];
        rng.fill_bytes(&mut id);
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub message_type: u16,
    /// Number of body bytes following the 20-byte header.
    pub length: u16,
    pub cookie: u32,
    pub transaction_id: TransactionId,
}

/// A TLV attribute borrowed from a received buffer. `value` excludes padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub attribute_type: u16,
    pub value: &'a [u8],
}

/// Our reflexive transport address as reported by the server, in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalAddress {
    pub address: u32,
    pub port: u16,
}

impl ExternalAddress {
    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip(), self.port)
    }
}

impl fmt::Display for ExternalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.socket_addr().fmt(f)
    }
}

pub fn encode_binding_request(transaction_id: &TransactionId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(HEADER_LEN);
    msg.extend_from_slice(&BINDING_REQUEST.to_be_bytes());
    // No attributes.
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg.extend_from_slice(transaction_id.as_bytes());
    msg
}

pub fn decode_header(buf: &[u8]) -> Result<Header, CodecError> {
    let Some(header) = buf.get(..HEADER_LEN) else {
        return Err(CodecError::MalformedMessage { len: buf.len() });
    };

    let cookie = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if cookie != MAGIC_COOKIE {
        return Err(CodecError::InvalidCookie(cookie));
    }

    let mut id = [0u8; 12];
    id.copy_from_slice(&header[8..HEADER_LEN]);

    Ok(Header {
        message_type: u16::from_be_bytes([header[0], header[1]]),
        length: u16::from_be_bytes([header[2], header[3]]),
        cookie,
        transaction_id: TransactionId(id),
    })
}

pub fn matches_transaction(header: &Header, expected: &TransactionId) -> bool {
    header.transaction_id == *expected
}

/// Decodes the attribute starting at `offset` within a message body.
///
/// Returns the attribute together with the number of bytes it occupies,
/// including padding up to the next 4-byte boundary. Padding is clamped to
/// the end of `body` so a server that omits it on the last attribute is
/// still accepted.
pub fn decode_attribute(body: &[u8], offset: usize) -> Result<(Attribute<'_>, usize), CodecError> {
    let truncated = CodecError::TruncatedAttribute { offset };

    let rest = body.get(offset..).ok_or(truncated)?;
    let tlv = rest.get(..ATTRIBUTE_HEADER_LEN).ok_or(truncated)?;
    let attribute_type = u16::from_be_bytes([tlv[0], tlv[1]]);
    let len = usize::from(u16::from_be_bytes([tlv[2], tlv[3]]));

    let value = rest
        .get(ATTRIBUTE_HEADER_LEN..ATTRIBUTE_HEADER_LEN + len)
        .ok_or(truncated)?;

    let padded = (ATTRIBUTE_HEADER_LEN + len + 3) & !3;

    Ok((
        Attribute {
            attribute_type,
            value,
        },
        padded.min(rest.len()),
    ))
}

/// Lazily walks the attributes of a message.
///
/// Only the first `message_length` bytes after the header are visited, and
/// never more than `buf` actually holds.
pub fn parse_attributes(buf: &[u8], message_length: u16) -> Attributes<'_> {
    let end = (HEADER_LEN + usize::from(message_length)).min(buf.len());

    Attributes {
        body: buf.get(HEADER_LEN..end).unwrap_or_default(),
        offset: 0,
        failed: false,
    }
}

pub struct Attributes<'a> {
    body: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Result<Attribute<'a>, CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.body.len() {
            return None;
        }

        match decode_attribute(self.body, self.offset) {
            Ok((attribute, consumed)) => {
                self.offset += consumed;
                Some(Ok(attribute))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Undoes the XOR obfuscation of an IPv4 XOR-MAPPED-ADDRESS value.
///
/// Returns `(address, port)` in host order.
pub fn extract_xor_mapped_ipv4(value: &[u8]) -> Result<(u32, u16), CodecError> {
    let Some(value) = value.get(..XOR_MAPPED_IPV4_LEN) else {
        return Err(CodecError::AttributeTooShort { len: value.len() });
    };

    // value[0] is reserved.
    let family = value[1];
    if family != FAMILY_IPV4 {
        return Err(CodecError::UnsupportedFamily(family));
    }

    let xor_port = u16::from_be_bytes([value[2], value[3]]);
    let xor_address = u32::from_be_bytes([value[4], value[5], value[6], value[7]]);

    Ok((
        xor_address ^ MAGIC_COOKIE,
        xor_port ^ (MAGIC_COOKIE >> 16) as u16,
    ))
}

/// Validates a binding response to the request `expected` and pulls out the mapped address.
pub fn decode_binding_response(
    buf: &[u8],
    expected: &TransactionId,
) -> Result<ExternalAddress, ReceiveError> {
    let header = decode_header(buf)?;

    if header.message_type != BINDING_RESPONSE {
        return Err(ReceiveError::UnexpectedMessageType(header.message_type));
    }
    if !matches_transaction(&header, expected) {
        return Err(ReceiveError::TransactionMismatch);
    }

    for attribute in parse_attributes(buf, header.length) {
        let attribute = attribute?;
        if attribute.attribute_type != ATTR_XOR_MAPPED_ADDRESS {
            continue;
        }

        let (address, port) = extract_xor_mapped_ipv4(attribute.value)?;
        return Ok(ExternalAddress { address, port });
    }

    Err(ReceiveError::AttributeNotFound)
}
