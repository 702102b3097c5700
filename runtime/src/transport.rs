//! Datagram transport abstraction.
//!
//! The store only needs two primitives from the network: receive one datagram
//! together with its sender, and send one datagram to an address. Production
//! code uses [`UdpTransport`]; tests plug in an in-memory implementation.

use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;

/// Size of the receive buffer handed to [`Transport::recv_from`].
///
/// Larger than the biggest IPv4 UDP payload (65507 bytes) so oversized
/// requests are seen at their real length instead of being truncated.
pub const RECV_BUFFER_SIZE: usize = 65_536;

/// One received datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    /// Sender address; replies go back here
    pub from: SocketAddr,
    /// Raw payload
    pub payload: Vec<u8>,
}

/// Errors raised by a transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Could not bind the listening socket
    #[error("Failed to bind datagram socket on {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The receive primitive failed
    #[error("Failed to receive datagram: {0}")]
    Receive(#[source] io::Error),

    /// The send primitive failed
    #[error("Failed to send datagram to {to}: {source}")]
    Send {
        /// Destination
        to: SocketAddr,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The datagram was only partially sent
    #[error("Short send to {to}: {sent} of {expected} bytes")]
    ShortSend {
        /// Destination
        to: SocketAddr,
        /// Bytes actually sent
        sent: usize,
        /// Bytes that should have been sent
        expected: usize,
    },
}

/// Connectionless transport used by the store's serve loop.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait for the next datagram, writing it into `buffer`.
    ///
    /// Returns the payload length and the sender address.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying receive fails.
    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send one datagram to `to`, returning the number of bytes sent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the underlying send fails.
    async fn send_to(&self, datagram: &[u8], to: SocketAddr) -> io::Result<usize>;
}

/// UDP transport backed by a tokio socket.
///
/// The socket is closed when the transport is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a UDP socket on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Bind`] if the socket cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        Ok(Self { socket })
    }

    /// Address the socket is actually bound to (resolves port 0).
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the OS cannot report the local address.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buffer).await
    }

    async fn send_to(&self, datagram: &[u8], to: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(datagram, to).await
    }
}
