//! The lockstep exchanges of the push protocol.
//!
//! Everything here is strictly synchronous: one packet goes out, one reply
//! comes back, and at most one packet is outstanding at any instant. The
//! boot ROM performs a single synchronous exchange, so there is no retry and
//! no timeout; a device that stops answering leaves the session blocked
//! until the user interrupts the process. The wait-for-acknowledge policy is
//! concentrated in `expect_ack`, which is the one place a bounded-retry
//! variant would have to replace.

use std::io::Read;

use hexplay::HexViewBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, log_enabled, Level::Debug};

use super::image::ImageStream;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::wire;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Blocks until the device announces itself, then validates the
/// announcement. Whoever sent it is the session peer from here on.
///
/// A single attempt is made; anything that does not open with the BOOTME
/// magic tag ends the session before we have sent a single byte.
pub(crate) fn await_discovery(transport: &mut dyn Transport) -> Result<()> {
    let datagram = transport.receive()?;

    info!("{} byte announcement received", datagram.len());
    if log_enabled!(Debug) {
        let view = HexViewBuilder::new(&datagram)
            .address_offset(0)
            .row_width(16)
            .finish();
        println!("{}", view);
    }

    if !wire::is_bootme(&datagram) {
        return Err(Error::Protocol("no BOOTME announcement"));
    }
    Ok(())
}

/// Session one: announce the transfer and push the fixed manifest.
///
/// The session opens with a write request at block 0; the manifest is its
/// single DATA packet, at block 1.
pub(crate) fn push_manifest(transport: &mut dyn Transport) -> Result<()> {
    let mut block: u16 = 0;

    debug!("write request `{}`, block {}", wire::HEADER_NAME, block);
    send_acknowledged(transport, &wire::write_request(wire::HEADER_NAME, block))?;
    block = block.wrapping_add(1);

    debug!("manifest, block {}", block);
    send_acknowledged(transport, &wire::manifest(block))?;
    Ok(())
}

/// Session two: announce the image by name and push its content in
/// payload-sized chunks, each one acknowledged before the next is sent.
///
/// The block counter restarts at 0 with the write request, so the chunks
/// carry blocks 1, 2, 3, … wrapping modulo 65536 for images larger than the
/// 16-bit block space.
///
/// Returns the number of bytes pushed.
pub(crate) fn push_image(
    transport: &mut dyn Transport,
    source: impl Read,
    size: u64,
    name: &str,
) -> Result<u64> {
    let mut block: u16 = 0;

    debug!("write request `{}`, block {}", name, block);
    send_acknowledged(transport, &wire::write_request(name, block))?;
    block = block.wrapping_add(1);

    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "[BP] ⏩ Pushing [{elapsed_precise}] [{bar:40.cyan/blue}] \
                 {bytes}/{total_bytes} ({eta})",
            )
            .progress_chars("=>-"),
    );

    let mut stream = ImageStream::new(source);
    let mut pushed: u64 = 0;
    while let Some(chunk) = stream
        .next_chunk()
        .map_err(|e| Error::image(name, e))?
    {
        send_acknowledged(transport, &wire::data_packet(block, chunk))?;
        pushed += chunk.len() as u64;
        block = block.wrapping_add(1);
        // One progress marker per 1024 blocks.
        if block % 1024 == 0 {
            pb.set_position(pushed);
        }
    }
    pb.finish_with_message("done");

    info!("{} bytes pushed", pushed);
    Ok(pushed)
}

// =============================================================================
// Private stuff
// =============================================================================

/// One blocking wait for the acknowledgment of the packet just sent.
fn expect_ack(transport: &mut dyn Transport) -> Result<()> {
    let reply = transport.receive()?;
    if !wire::is_ack(&reply) {
        return Err(Error::Protocol("no ACK"));
    }
    Ok(())
}

/// Send one packet and hold until the device acknowledges it.
fn send_acknowledged(transport: &mut dyn Transport, packet: &[u8]) -> Result<()> {
    transport.send(packet)?;
    expect_ack(transport)
}

// =============================================================================
// Unit Tests
// =============================================================================

/// A transport that answers from a canned script and records every send.
#[cfg(test)]
#[derive(Debug, Default)]
struct ScriptedTransport {
    replies: std::collections::VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
}

#[cfg(test)]
impl ScriptedTransport {
    fn replying(replies: &[&[u8]]) -> Self {
        ScriptedTransport {
            replies: replies.iter().map(|r| r.to_vec()).collect(),
            sent: Vec::new(),
        }
    }

    /// A device that dutifully ACKs `count` packets.
    fn acking(count: usize) -> Self {
        let mut transport = ScriptedTransport::default();
        for block in 0..count as u16 {
            let block = block.to_be_bytes();
            transport
                .replies
                .push_back(vec![0, wire::OP_ACK, block[0], block[1]]);
        }
        transport
    }
}

#[cfg(test)]
impl Transport for ScriptedTransport {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> Result<Vec<u8>> {
        self.replies
            .pop_front()
            .ok_or(Error::Protocol("script exhausted"))
    }
}

#[test]
fn discovery_accepts_a_bootme_announcement() {
    let replies: &[&[u8]] = &[b"EDBG device-42"];
    let mut transport = ScriptedTransport::replying(replies);
    await_discovery(&mut transport).unwrap();
    assert!(transport.sent.is_empty());
}

#[test]
fn discovery_rejects_a_foreign_announcement() {
    let replies: &[&[u8]] = &[b"HELO device-42"];
    let mut transport = ScriptedTransport::replying(replies);
    let err = await_discovery(&mut transport).unwrap_err();
    assert!(matches!(err, Error::Protocol("no BOOTME announcement")));
    // Nothing was sent before the abort.
    assert!(transport.sent.is_empty());
}

#[test]
fn manifest_session_is_two_acknowledged_packets() {
    let mut transport = ScriptedTransport::acking(2);
    push_manifest(&mut transport).unwrap();

    assert_eq!(transport.sent.len(), 2);
    let wrq = &transport.sent[0];
    assert_eq!(wrq[1], wire::OP_WRQ);
    assert_eq!(&wrq[2..4], &[0, 0]); // a session always opens at block 0
    let manifest = &transport.sent[1];
    assert_eq!(manifest.len(), wire::MANIFEST_LEN);
    assert_eq!(&manifest[..4], &[0, wire::OP_DATA, 0, 1]);
}

#[test]
fn image_chunks_are_sized_and_numbered_in_lockstep() {
    let image = vec![0x5a; 1025];
    let mut transport = ScriptedTransport::acking(4);
    let pushed = push_image(
        &mut transport,
        std::io::Cursor::new(image),
        1025,
        "nk.nb0",
    )
    .unwrap();

    assert_eq!(pushed, 1025);
    // One WRQ plus ceil(1025 / 512) DATA packets.
    assert_eq!(transport.sent.len(), 4);
    assert_eq!(transport.sent[0][1], wire::OP_WRQ);
    let payload_lengths: Vec<usize> = transport.sent[1..]
        .iter()
        .map(|p| p.len() - wire::HEADER_LEN)
        .collect();
    assert_eq!(payload_lengths, [512, 512, 1]);
    let blocks: Vec<u16> = transport
        .sent
        .iter()
        .map(|p| u16::from_be_bytes([p[2], p[3]]))
        .collect();
    assert_eq!(blocks, [0, 1, 2, 3]);
}

#[test]
fn a_missing_ack_stops_the_transfer() {
    // ACK the write request and the first chunk, then answer with a stray
    // DATA packet.
    let replies: &[&[u8]] = &[
        &[0, wire::OP_ACK, 0, 0],
        &[0, wire::OP_ACK, 0, 1],
        &[0, wire::OP_DATA, 0, 2],
    ];
    let mut transport = ScriptedTransport::replying(replies);
    let image = vec![0; 2048];
    let err = push_image(
        &mut transport,
        std::io::Cursor::new(image),
        2048,
        "nk.nb0",
    )
    .unwrap_err();

    assert!(matches!(err, Error::Protocol("no ACK")));
    // Nothing goes out after the bad reply.
    assert_eq!(transport.sent.len(), 3);
}

#[test]
fn a_short_reply_is_not_an_ack() {
    let replies: &[&[u8]] = &[&[0, wire::OP_ACK, 0]];
    let mut transport = ScriptedTransport::replying(replies);
    let err = push_manifest(&mut transport).unwrap_err();
    assert!(matches!(err, Error::Protocol("no ACK")));
    assert_eq!(transport.sent.len(), 1);
}

#[test]
fn end_to_end_against_a_simulated_device() {
    use crate::transport::UdpTransport;
    use std::net::UdpSocket;
    use std::thread;

    let mut transport = UdpTransport::bind(0).unwrap();
    let port = transport.local_addr().unwrap().port();

    // The device side: broadcast BOOTME, ACK every WRQ/DATA packet with its
    // own block number, stop once the boot-jump datagram arrives.
    let device = thread::spawn(move || {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket.send_to(b"EDBG device-42", ("127.0.0.1", port)).unwrap();

        let mut log: Vec<(u8, usize)> = Vec::new();
        let mut buffer = [0u8; 1024];
        loop {
            let (received, pusher) = socket.recv_from(&mut buffer).unwrap();
            let packet = &buffer[..received];
            if packet.len() == wire::BOOT_JUMP_LEN && wire::is_bootme(packet) {
                break;
            }
            log.push((packet[1], received));
            let ack = [0, wire::OP_ACK, packet[2], packet[3]];
            socket.send_to(&ack, pusher).unwrap();
        }
        log
    });

    await_discovery(&mut transport).unwrap();
    push_manifest(&mut transport).unwrap();
    let image = vec![0x42; 1025];
    let pushed = push_image(
        &mut transport,
        std::io::Cursor::new(image),
        1025,
        "nk.nb0",
    )
    .unwrap();
    assert_eq!(pushed, 1025);
    transport.send(&wire::boot_jump()).unwrap();

    // 2 write requests, the manifest, then 3 image chunks.
    let log = device.join().unwrap();
    let opcodes: Vec<u8> = log.iter().map(|(opcode, _)| *opcode).collect();
    assert_eq!(
        opcodes,
        [
            wire::OP_WRQ,
            wire::OP_DATA,
            wire::OP_WRQ,
            wire::OP_DATA,
            wire::OP_DATA,
            wire::OP_DATA,
        ]
    );
    assert_eq!(log[1].1, wire::MANIFEST_LEN);
    assert_eq!(log[5].1, wire::HEADER_LEN + 1);
}
