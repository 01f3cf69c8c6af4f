mod common;

use std::net::Ipv4Addr;
use std::time::Duration;

use common::{binding_response, message, request_id, xor_mapped_attribute, MAPPED};
use stun_external_ip::codec::BINDING_RESPONSE;
use stun_external_ip::{
    perform_binding_transaction_async, CodecError, ReceiveError, StunServer, TransactionError,
};
use tokio::net::UdpSocket;

/// Loopback server task answering a single request with `respond`.
async fn fake_server<F>(respond: F) -> (StunServer, tokio::task::JoinHandle<()>)
where
    F: FnOnce(&[u8]) -> Option<Vec<u8>> + Send + 'static,
{
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = socket.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        let (len, from) = socket.recv_from(&mut buf).await.unwrap();

        if let Some(reply) = respond(&buf[..len]) {
            socket.send_to(&reply, from).await.unwrap();
        }
    });

    (StunServer::new("127.0.0.1", port), handle)
}

#[tokio::test]
async fn returns_mapped_address() {
    let (server, handle) =
        fake_server(|request| Some(binding_response(&request_id(request), MAPPED))).await;

    let external = perform_binding_transaction_async(&server, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(external.socket_addr(), MAPPED);
    handle.await.unwrap();
}

#[tokio::test]
async fn mismatched_transaction_is_a_receive_error() {
    let (server, handle) =
        fake_server(|_| Some(binding_response(&[0x5a; 12], MAPPED))).await;

    let err = perform_binding_transaction_async(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Receive(ReceiveError::TransactionMismatch)
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn silence_times_out() {
    let (server, handle) = fake_server(|_| None).await;

    let err = perform_binding_transaction_async(&server, Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TransactionError::Receive(ReceiveError::Timeout)));
    handle.await.unwrap();
}

#[tokio::test]
async fn zero_timeout_is_a_socket_error() {
    let server = StunServer::new("127.0.0.1", 3478);

    let err = perform_binding_transaction_async(&server, Duration::ZERO)
        .await
        .unwrap_err();

    assert!(matches!(err, TransactionError::Socket(_)));
}

#[tokio::test]
async fn unbounded_timeout_still_completes() {
    let (server, handle) =
        fake_server(|request| Some(binding_response(&request_id(request), MAPPED))).await;

    let external = perform_binding_transaction_async(&server, Duration::MAX)
        .await
        .unwrap();

    assert_eq!(external.socket_addr(), MAPPED);
    handle.await.unwrap();
}

#[tokio::test]
async fn error_response_is_rejected() {
    let (server, handle) =
        fake_server(|request| Some(message(0x0111, &request_id(request), &[]))).await;

    let err = perform_binding_transaction_async(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Receive(ReceiveError::UnexpectedMessageType(0x0111))
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn truncated_attribute_is_rejected() {
    let (server, handle) = fake_server(|request| {
        let mut body = xor_mapped_attribute(MAPPED);
        body[2..4].copy_from_slice(&64u16.to_be_bytes());
        Some(message(BINDING_RESPONSE, &request_id(request), &body))
    })
    .await;

    let err = perform_binding_transaction_async(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Receive(ReceiveError::Malformed(CodecError::TruncatedAttribute {
            offset: 0
        }))
    ));
    handle.await.unwrap();
}

#[tokio::test]
async fn runt_datagram_is_malformed() {
    let (server, handle) = fake_server(|_| Some(vec![0x01, 0x01, 0x00, 0x0c])).await;

    let err = perform_binding_transaction_async(&server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransactionError::Receive(ReceiveError::Malformed(CodecError::MalformedMessage {
            len: 4
        }))
    ));
    handle.await.unwrap();
}
