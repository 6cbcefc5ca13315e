//! Frame encoding and decoding for the ZNP UART protocol.
//!
//! The wire format is the Z-Stack monitor-and-test framing:
//! ```text
//! ┌──────────┬─────────┬─────────┬─────────┬─────────────┬─────────┐
//! │   0xFE   │ LEN (1) │ CMD0(1) │ CMD1(1) │ DATA (LEN)  │ FCS (1) │
//! └──────────┴─────────┴─────────┴─────────┴─────────────┴─────────┘
//! ```
//! `CMD0` packs the command type into the high nibble and the subsystem
//! into the low nibble; `CMD1` is the command id. `FCS` is the XOR of all
//! bytes between SOF and FCS.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;
use crate::protocol::command::{Command, CommandType, Subsystem};

/// Start-of-frame byte.
pub const SOF: u8 = 0xFE;

/// Maximum frame payload size.
pub const MAX_PAYLOAD: usize = 250;

/// Frame overhead: SOF, length, CMD0, CMD1 and FCS.
pub const FRAME_OVERHEAD: usize = 5;

/// A decoded ZNP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame kind (SREQ/SRSP/AREQ).
    pub kind: CommandType,
    /// Command pair.
    pub command: Command,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a new frame.
    pub fn new(kind: CommandType, command: impl Into<Command>, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            command: command.into(),
            payload: payload.into(),
        }
    }
}

/// XOR frame check sequence over LEN, CMD0, CMD1 and DATA.
fn fcs(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Encodes a frame into its wire representation.
///
/// # Panics
///
/// Panics if the payload exceeds [`MAX_PAYLOAD`].
#[must_use]
pub fn encode(frame: &Frame) -> Bytes {
    assert!(
        frame.payload.len() <= MAX_PAYLOAD,
        "payload exceeds maximum frame size"
    );

    let mut buf = BytesMut::with_capacity(FRAME_OVERHEAD + frame.payload.len());
    buf.put_u8(SOF);
    buf.put_u8(u8::try_from(frame.payload.len()).expect("length checked above"));
    buf.put_u8(((frame.kind as u8) << 4) | frame.command.subsystem as u8);
    buf.put_u8(frame.command.id);
    buf.put_slice(&frame.payload);
    buf.put_u8(fcs(&buf[1..]));
    buf.freeze()
}

/// Incremental frame decoder that handles partial reads.
///
/// Garbage before the start-of-frame byte is discarded; after a checksum
/// failure the decoder drops the offending SOF and rescans, so a corrupted
/// byte costs at most one frame.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates a new frame decoder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feeds data into the decoder.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next complete frame.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded and
    /// `Ok(None)` if more data is needed.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the buffered frame is invalid. The
    /// decoder resynchronizes internally, so callers may keep calling
    /// `decode` after an error.
    pub fn decode(&mut self) -> Result<Option<Frame>, FrameError> {
        // Hunt for the start-of-frame byte.
        let mut skipped = 0usize;
        while !self.buffer.is_empty() && self.buffer[0] != SOF {
            self.buffer.advance(1);
            skipped += 1;
        }
        if skipped > 0 {
            tracing::trace!("skipped {} bytes before SOF", skipped);
        }

        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let length = self.buffer[1] as usize;
        if length > MAX_PAYLOAD {
            // Not a real frame start; drop the SOF and rescan.
            self.buffer.advance(1);
            return Err(FrameError::TooLarge {
                size: length,
                max: MAX_PAYLOAD,
            });
        }

        let total = FRAME_OVERHEAD + length;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let expected = self.buffer[total - 1];
        let computed = fcs(&self.buffer[1..total - 1]);
        if expected != computed {
            self.buffer.advance(1);
            return Err(FrameError::Checksum { expected, computed });
        }

        let raw = self.buffer.split_to(total);
        let cmd0 = raw[2];
        let kind =
            CommandType::from_nibble(cmd0 >> 4).ok_or(FrameError::UnknownType(cmd0))?;
        let subsystem =
            Subsystem::from_nibble(cmd0 & 0x0F).ok_or(FrameError::UnknownSubsystem(cmd0))?;

        Ok(Some(Frame {
            kind,
            command: Command::new(subsystem, raw[3]),
            payload: Bytes::copy_from_slice(&raw[4..4 + length]),
        }))
    }

    /// Returns the number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::SysCommand;

    #[test]
    fn test_encode_layout() {
        let frame = Frame::new(CommandType::Sreq, SysCommand::Ping, Bytes::new());
        let wire = encode(&frame);

        assert_eq!(&wire[..], &[0xFE, 0x00, 0x21, 0x01, 0x20]);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let frame = Frame::new(
            CommandType::Srsp,
            SysCommand::Ping,
            Bytes::from_static(&[0x79, 0x00]),
        );
        let wire = encode(&frame);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&wire);
        let decoded = decoder.decode().unwrap().unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_partial_frame() {
        let frame = Frame::new(
            CommandType::Areq,
            SysCommand::ResetInd,
            Bytes::from_static(&[0, 1, 2, 3, 4, 5]),
        );
        let wire = encode(&frame);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&wire[..4]);
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.feed(&wire[4..]);
        assert_eq!(decoder.decode().unwrap(), Some(frame));
    }

    #[test]
    fn test_decode_skips_garbage_before_sof() {
        let frame = Frame::new(CommandType::Sreq, SysCommand::Version, Bytes::new());
        let wire = encode(&frame);

        let mut decoder = FrameDecoder::new();
        decoder.feed(&[0x00, 0x12, 0xAB]);
        decoder.feed(&wire);
        assert_eq!(decoder.decode().unwrap(), Some(frame));
    }

    #[test]
    fn test_decode_bad_checksum_resyncs() {
        let frame = Frame::new(
            CommandType::Srsp,
            SysCommand::Ping,
            Bytes::from_static(&[0x79, 0x00]),
        );
        let mut corrupted = encode(&frame).to_vec();
        *corrupted.last_mut().unwrap() ^= 0xFF;

        let mut decoder = FrameDecoder::new();
        decoder.feed(&corrupted);
        decoder.feed(&encode(&frame));

        assert!(matches!(
            decoder.decode(),
            Err(FrameError::Checksum { .. })
        ));
        // The good frame behind the corrupted one still decodes.
        loop {
            match decoder.decode() {
                Ok(Some(decoded)) => {
                    assert_eq!(decoded, frame);
                    break;
                }
                Ok(None) => panic!("frame lost during resync"),
                Err(_) => {}
            }
        }
    }

    #[test]
    fn test_decode_multiple_frames() {
        let first = Frame::new(CommandType::Sreq, SysCommand::Ping, Bytes::new());
        let second = Frame::new(
            CommandType::Srsp,
            SysCommand::Ping,
            Bytes::from_static(&[0x79, 0x00]),
        );

        let mut decoder = FrameDecoder::new();
        decoder.feed(&encode(&first));
        decoder.feed(&encode(&second));

        assert_eq!(decoder.decode().unwrap(), Some(first));
        assert_eq!(decoder.decode().unwrap(), Some(second));
        assert_eq!(decoder.decode().unwrap(), None);
    }
}
