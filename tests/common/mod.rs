#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::thread::{self, JoinHandle};

use stun_external_ip::codec::{ATTR_XOR_MAPPED_ADDRESS, BINDING_RESPONSE, MAGIC_COOKIE};
use stun_external_ip::StunServer;

/// Address the fake server claims to have seen us at.
pub const MAPPED: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 77), 47001);

pub fn message(message_type: u16, id: &[u8; 12], body: &[u8]) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&message_type.to_be_bytes());
    msg.extend_from_slice(&(body.len() as u16).to_be_bytes());
    msg.extend_from_slice(&MAGIC_COOKIE.to_be_bytes());
    msg.extend_from_slice(id);
    msg.extend_from_slice(body);
    msg
}

pub fn xor_mapped_attribute(addr: SocketAddrV4) -> Vec<u8> {
    let mut attr = Vec::new();
    attr.extend_from_slice(&ATTR_XOR_MAPPED_ADDRESS.to_be_bytes());
    attr.extend_from_slice(&8u16.to_be_bytes());
    attr.extend_from_slice(&[0, 0x01]);
    attr.extend_from_slice(&(addr.port() ^ 0x2112).to_be_bytes());
    attr.extend_from_slice(&(u32::from(*addr.ip()) ^ MAGIC_COOKIE).to_be_bytes());
    attr
}

pub fn binding_response(id: &[u8; 12], addr: SocketAddrV4) -> Vec<u8> {
    message(BINDING_RESPONSE, id, &xor_mapped_attribute(addr))
}

/// Transaction id of a request received by a fake server.
pub fn request_id(request: &[u8]) -> [u8; 12] {
    let mut id = [0u8; 12];
    id.copy_from_slice(&request[8..20]);
    id
}

/// Spawns a one-shot UDP server on loopback.
///
/// It reads a single request and, if `respond` returns a datagram, sends it
/// back. The join handle yields the raw request and the client address it came from.
pub fn fake_server<F>(respond: F) -> (StunServer, JoinHandle<(Vec<u8>, SocketAddr)>)
where
    F: FnOnce(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = socket.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let mut buf = [0u8; 1500];
        let (len, from): (usize, SocketAddr) = socket.recv_from(&mut buf).unwrap();
        let request = buf[..len].to_vec();

        if let Some(reply) = respond(&request) {
            socket.send_to(&reply, from).unwrap();
        }

        (request, from)
    });

    (StunServer::new("127.0.0.1", port), handle)
}
