//! Chunked reading of the image file.

use std::io::{ErrorKind, Read, Result};

use crate::wire::MAX_PAYLOAD;

/// Streams the image as a sequence of payload-sized chunks, in file order.
///
/// Every chunk is exactly [`MAX_PAYLOAD`] bytes except possibly the last
/// one; the stream is exhausted once the underlying reader runs out of
/// bytes.
pub(crate) struct ImageStream<R: Read> {
    source: R,
    chunk: [u8; MAX_PAYLOAD],
}

impl<R: Read> ImageStream<R> {
    pub(crate) fn new(source: R) -> Self {
        ImageStream {
            source,
            chunk: [0u8; MAX_PAYLOAD],
        }
    }

    /// The next chunk of the image, or `None` at end of file.
    ///
    /// Short reads are re-issued, so only the final chunk of the image can
    /// be shorter than [`MAX_PAYLOAD`].
    pub(crate) fn next_chunk(&mut self) -> Result<Option<&[u8]>> {
        let mut filled = 0;
        while filled < self.chunk.len() {
            match self.source.read(&mut self.chunk[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            Ok(None)
        } else {
            Ok(Some(&self.chunk[..filled]))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn a_1025_byte_image_yields_three_chunks() {
    let mut stream = ImageStream::new(std::io::Cursor::new(vec![0xaa; 1025]));
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 512);
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 512);
    assert_eq!(stream.next_chunk().unwrap().unwrap(), &[0xaa]);
    assert!(stream.next_chunk().unwrap().is_none());
}

#[test]
fn an_exact_multiple_has_no_empty_tail() {
    let mut stream = ImageStream::new(std::io::Cursor::new(vec![0x55; 1024]));
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 512);
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 512);
    assert!(stream.next_chunk().unwrap().is_none());
}

#[test]
fn an_empty_image_yields_no_chunks() {
    let mut stream = ImageStream::new(std::io::Cursor::new(Vec::new()));
    assert!(stream.next_chunk().unwrap().is_none());
}

#[test]
fn short_reads_are_coalesced_into_full_chunks() {
    // A reader that hands out at most 100 bytes per call.
    struct Dribble(std::io::Cursor<Vec<u8>>);
    impl Read for Dribble {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let take = buf.len().min(100);
            self.0.read(&mut buf[..take])
        }
    }

    let mut stream = ImageStream::new(Dribble(std::io::Cursor::new(vec![0x11; 600])));
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 512);
    assert_eq!(stream.next_chunk().unwrap().unwrap().len(), 88);
    assert!(stream.next_chunk().unwrap().is_none());
}
