//! Datagram transport for the push session.
//!
//! The boot ROM broadcasts its BOOTME announcement to a well-known port, then
//! answers from whatever ephemeral port it picked for the transfer. The
//! transport therefore remembers the address of the most recent sender and
//! directs every send at it; the protocol engine only ever sees opaque byte
//! buffers.

use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::wire::MAX_DATAGRAM;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Blocking send/receive of opaque datagrams, one peer at a time.
///
/// The protocol engine consumes the session socket through this trait so the
/// same exchanges can be exercised against a scripted transport in tests.
/// There is no queuing, no multiplexing and no timeout; `receive` blocks
/// until a datagram arrives.
pub(crate) trait Transport: fmt::Debug {
    /// Transmit one datagram to the current peer.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Block until one datagram arrives from any sender. The sender becomes
    /// the current peer for every subsequent `send`.
    fn receive(&mut self) -> Result<Vec<u8>>;
}

/// The real transport used against a device: a bound UDP socket.
#[derive(Debug)]
pub(crate) struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// Bind the given port on all interfaces.
    pub(crate) fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .map_err(|e| Error::transport("binding the discovery port", e))?;
        let transport = UdpTransport { socket, peer: None };
        if let Ok(addr) = transport.local_addr() {
            debug!("discovery socket bound on {}", addr);
        }
        Ok(transport)
    }

    /// The locally bound address. Mainly useful after binding port 0.
    pub(crate) fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::transport("querying the local address", e))
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        let peer = self.peer.ok_or_else(|| {
            Error::transport(
                "sending",
                io::Error::new(io::ErrorKind::NotConnected, "no current peer"),
            )
        })?;
        let written = self
            .socket
            .send_to(data, peer)
            .map_err(|e| Error::transport("sending", e))?;
        trace!("{} bytes sent to {}", written, peer);
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        let mut buffer = [0u8; MAX_DATAGRAM];
        let (received, sender) = self
            .socket
            .recv_from(&mut buffer)
            .map_err(|e| Error::transport("receiving", e))?;
        if received == 0 {
            return Err(Error::transport(
                "receiving",
                io::Error::new(io::ErrorKind::UnexpectedEof, "empty datagram"),
            ));
        }
        trace!("{} bytes received from {}", received, sender);
        self.peer = Some(sender);
        Ok(buffer[..received].to_vec())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn send_without_a_peer_is_refused() {
    let mut transport = UdpTransport::bind(0).unwrap();
    assert!(transport.send(b"hello").is_err());
}

#[test]
fn receive_learns_the_sender_as_peer() {
    let mut transport = UdpTransport::bind(0).unwrap();
    let port = transport.local_addr().unwrap().port();

    let device = UdpSocket::bind("127.0.0.1:0").unwrap();
    device.send_to(b"EDBG", ("127.0.0.1", port)).unwrap();
    assert_eq!(transport.receive().unwrap(), b"EDBG");

    // Subsequent sends go back to whoever spoke last.
    transport.send(b"reply").unwrap();
    let mut buffer = [0u8; 16];
    let (received, _) = device.recv_from(&mut buffer).unwrap();
    assert_eq!(&buffer[..received], b"reply");
}

#[test]
fn a_newer_sender_replaces_the_peer() {
    let mut transport = UdpTransport::bind(0).unwrap();
    let port = transport.local_addr().unwrap().port();

    let first = UdpSocket::bind("127.0.0.1:0").unwrap();
    let second = UdpSocket::bind("127.0.0.1:0").unwrap();
    first.send_to(b"one", ("127.0.0.1", port)).unwrap();
    transport.receive().unwrap();
    second.send_to(b"two", ("127.0.0.1", port)).unwrap();
    transport.receive().unwrap();

    transport.send(b"reply").unwrap();
    let mut buffer = [0u8; 16];
    let (received, _) = second.recv_from(&mut buffer).unwrap();
    assert_eq!(&buffer[..received], b"reply");
}
