//! On-wire packets of the boot push protocol.
//!
//! The exchange is built on the TFTP opcodes of
//! [RFC 1350](https://tools.ietf.org/html/rfc1350): a write request opens a
//! session, DATA packets carry the payload, and the boot ROM answers each of
//! them with an ACK. Every packet the pusher emits starts with the same fixed
//! header `[0x00, opcode, block-hi, block-lo]`.
//!
//! Each builder returns a freshly allocated packet; nothing in this module
//! touches the network.

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// UDP port on which the boot ROM broadcasts its BOOTME announcement.
pub(crate) const BOOTME_PORT: u16 = 980;

/// Magic tag opening every BOOTME announcement and our boot-jump datagram.
pub(crate) const BOOTME_MAGIC: &[u8; 4] = b"EDBG";

/// Maximum DATA payload per packet (RFC 1350).
pub(crate) const MAX_PAYLOAD: usize = 512;

/// One reserved byte, one opcode byte, big-endian block number.
pub(crate) const HEADER_LEN: usize = 4;

/// Largest datagram the protocol ever produces or accepts.
pub(crate) const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;

/// Total size of the fixed-layout manifest packet.
pub(crate) const MANIFEST_LEN: usize = 287;

/// Total size of the boot-jump (end of transmission) datagram.
pub(crate) const BOOT_JUMP_LEN: usize = 28;

// TFTP opcodes (RFC 1350).
pub(crate) const OP_WRQ: u8 = 2;
pub(crate) const OP_DATA: u8 = 3;
pub(crate) const OP_ACK: u8 = 4;

/// Filename announced by the manifest session's write request.
pub(crate) const HEADER_NAME: &str = "boot.bin";

/// TFTP transfer mode; the boot ROM only speaks raw octets.
pub(crate) const TRANSFER_MODE: &str = "octet";

/// Image pushed when no path is given on the command line.
pub(crate) const DEFAULT_IMAGE: &str = "nk.nb0";

/// Build a write request announcing `filename`, opening a new session.
pub(crate) fn write_request(filename: &str, block: u16) -> Vec<u8> {
    let mut packet =
        Vec::with_capacity(HEADER_LEN + filename.len() + TRANSFER_MODE.len() + 2);
    packet.extend_from_slice(&header(OP_WRQ, block));
    packet.extend_from_slice(filename.as_bytes());
    packet.push(0);
    packet.extend_from_slice(TRANSFER_MODE.as_bytes());
    packet.push(0);
    packet
}

/// Build a DATA packet carrying one chunk of the image.
pub(crate) fn data_packet(block: u16, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD);
    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len());
    packet.extend_from_slice(&header(OP_DATA, block));
    packet.extend_from_slice(payload);
    packet
}

/// Build the fixed 287-byte manifest describing the image to follow.
///
/// The image-type tag and the flag bytes below are what the boot ROM expects,
/// byte for byte. Their meaning is undocumented; they are carried verbatim
/// and never reinterpreted.
pub(crate) fn manifest(block: u16) -> Vec<u8> {
    let mut packet = vec![0u8; MANIFEST_LEN];
    packet[..HEADER_LEN].copy_from_slice(&header(OP_DATA, block));
    packet[4..10].copy_from_slice(b"N000FF"); // image type tag
    packet[10] = 0x0a;
    packet[11] = 0x0a;
    packet[12] = 0x02;
    packet[15] = 0x01;
    packet[26] = 0x03;
    packet[27..33].copy_from_slice(b"nk.nb0");
    packet
}

/// Build the 28-byte datagram telling the device that the transfer is over
/// and it should jump into the freshly received image.
pub(crate) fn boot_jump() -> Vec<u8> {
    let mut packet = vec![0u8; BOOT_JUMP_LEN];
    packet[..BOOTME_MAGIC.len()].copy_from_slice(BOOTME_MAGIC);
    packet[4] = 0xff;
    packet[7] = 0x02;
    packet[9] = 0x01;
    packet
}

/// A BOOTME announcement opens with the magic tag.
pub(crate) fn is_bootme(datagram: &[u8]) -> bool {
    datagram.len() >= BOOTME_MAGIC.len() && &datagram[..BOOTME_MAGIC.len()] == BOOTME_MAGIC
}

/// The boot ROM acknowledges every WRQ and DATA packet with an ACK.
pub(crate) fn is_ack(reply: &[u8]) -> bool {
    reply.len() >= HEADER_LEN && reply[1] == OP_ACK
}

// =============================================================================
// Private stuff
// =============================================================================

fn header(opcode: u8, block: u16) -> [u8; HEADER_LEN] {
    let block = block.to_be_bytes();
    [0x00, opcode, block[0], block[1]]
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn write_request_layout() {
    let packet = write_request("boot.bin", 0);
    assert_eq!(packet.len(), 19);
    assert_eq!(&packet[..4], &[0, OP_WRQ, 0, 0]);
    assert_eq!(&packet[4..13], b"boot.bin\0");
    assert_eq!(&packet[13..], b"octet\0");
}

#[test]
fn block_numbers_are_big_endian() {
    let packet = data_packet(0x0102, b"x");
    assert_eq!(&packet[..4], &[0, OP_DATA, 0x01, 0x02]);
}

#[test]
fn data_packet_carries_the_payload_verbatim() {
    let payload = [0xde, 0xad, 0xbe, 0xef];
    let packet = data_packet(7, &payload);
    assert_eq!(packet.len(), HEADER_LEN + payload.len());
    assert_eq!(&packet[..4], &[0, OP_DATA, 0, 7]);
    assert_eq!(&packet[4..], &payload);
}

#[test]
fn manifest_is_exactly_287_bytes() {
    let packet = manifest(1);
    assert_eq!(packet.len(), MANIFEST_LEN);
    assert_eq!(&packet[..4], &[0, OP_DATA, 0, 1]);
    assert_eq!(&packet[4..10], b"N000FF");
    assert_eq!(packet[10], 0x0a);
    assert_eq!(packet[11], 0x0a);
    assert_eq!(packet[12], 0x02);
    assert_eq!(packet[15], 0x01);
    assert_eq!(packet[26], 0x03);
    assert_eq!(&packet[27..33], b"nk.nb0");
    assert!(packet[33..].iter().all(|b| *b == 0));
}

#[test]
fn boot_jump_layout() {
    let packet = boot_jump();
    assert_eq!(packet.len(), BOOT_JUMP_LEN);
    assert_eq!(&packet[..4], b"EDBG");
    assert_eq!(packet[4], 0xff);
    assert_eq!(packet[7], 0x02);
    assert_eq!(packet[9], 0x01);
    assert!(packet[10..].iter().all(|b| *b == 0));
}

#[test]
fn bootme_recognition() {
    assert!(is_bootme(b"EDBG device-42"));
    assert!(!is_bootme(b"EDB"));
    assert!(!is_bootme(b"BOOT me"));
}

#[test]
fn ack_recognition() {
    assert!(is_ack(&[0, OP_ACK, 0, 0]));
    assert!(is_ack(&[0, OP_ACK, 0, 1, 9, 9]));
    assert!(!is_ack(&[0, OP_ACK, 0]));
    assert!(!is_ack(&[0, OP_DATA, 0, 0]));
}
