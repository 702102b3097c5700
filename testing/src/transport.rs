//! In-memory datagram transport.
//!
//! [`channel_transport`] returns a [`ChannelTransport`] to hand to
//! `Store::serve` and a [`ChannelPeer`] the test uses to inject datagrams and
//! collect replies. Dropping the peer's sender half (via
//! [`ChannelPeer::close_inbound`]) makes the next receive fail, which ends the
//! serve loop the same way a dead socket would.

use async_trait::async_trait;
use boxoffice_runtime::transport::{Datagram, Transport};
use std::io;
use std::net::SocketAddr;
use tokio::sync::{Mutex, mpsc};

/// Server side of the in-memory transport
#[derive(Debug)]
pub struct ChannelTransport {
    inbound: Mutex<mpsc::UnboundedReceiver<Datagram>>,
    outbound: mpsc::UnboundedSender<(SocketAddr, Vec<u8>)>,
}

/// Test side of the in-memory transport
#[derive(Debug)]
pub struct ChannelPeer {
    inbound: Option<mpsc::UnboundedSender<Datagram>>,
    outbound: mpsc::UnboundedReceiver<(SocketAddr, Vec<u8>)>,
}

/// Create a connected transport/peer pair
#[must_use]
pub fn channel_transport() -> (ChannelTransport, ChannelPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    (
        ChannelTransport {
            inbound: Mutex::new(inbound_rx),
            outbound: outbound_tx,
        },
        ChannelPeer {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        },
    )
}

impl ChannelPeer {
    /// Deliver a datagram to the server as if it came from `from`
    ///
    /// Returns `false` if the transport side is gone or the inbound half was closed.
    pub fn send_from(&self, from: SocketAddr, payload: impl Into<Vec<u8>>) -> bool {
        self.inbound.as_ref().is_some_and(|tx| {
            tx.send(Datagram {
                from,
                payload: payload.into(),
            })
            .is_ok()
        })
    }

    /// Wait for the next reply the server sent
    pub async fn recv(&mut self) -> Option<(SocketAddr, Vec<u8>)> {
        self.outbound.recv().await
    }

    /// Take a reply if one is already queued
    pub fn try_recv(&mut self) -> Option<(SocketAddr, Vec<u8>)> {
        self.outbound.try_recv().ok()
    }

    /// Stop delivering datagrams; the server's next receive fails
    pub fn close_inbound(&mut self) {
        self.inbound = None;
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn recv_from(&self, buffer: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut inbound = self.inbound.lock().await;
        let Some(datagram) = inbound.recv().await else {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "channel peer closed",
            ));
        };

        // Mirror recvfrom: excess bytes are silently truncated
        let len = datagram.payload.len().min(buffer.len());
        buffer[..len].copy_from_slice(&datagram.payload[..len]);
        Ok((len, datagram.from))
    }

    async fn send_to(&self, datagram: &[u8], to: SocketAddr) -> io::Result<usize> {
        self.outbound
            .send((to, datagram.to_vec()))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "channel peer dropped"))?;
        Ok(datagram.len())
    }
}
