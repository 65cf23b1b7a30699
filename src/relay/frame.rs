//! VISCA-over-IP framing and controller quirks
//!
//! Every datagram starts with a fixed 8-byte big-endian header:
//!
//! ```text
//!  0       2       4               8
//!  +-------+-------+---------------+----------------
//!  | type  |  len  |   sequence    | payload ...
//!  +-------+-------+---------------+----------------
//! ```
//!
//! # Known Quirks
//!
//! ## AVKANS controllers
//! - Send status inquiries (`81 09 ...`) wrapped in a *command* frame
//!   (type `0x0100`) instead of an *inquiry* frame (type `0x0110`). Cameras
//!   reject or ignore these. [`fix_inquiry`] rewrites the type in place.

use bytes::{Buf, BufMut};

/// Size of the VISCA-over-IP header
pub const HEADER_LEN: usize = 8;

/// Payload type: VISCA command
pub const TYPE_COMMAND: u16 = 0x0100;

/// Payload type: VISCA inquiry
pub const TYPE_INQUIRY: u16 = 0x0110;

/// First two payload bytes of an inquiry request (`81 09`)
pub const INQUIRY_REQUEST: u16 = 0x8109;

/// Frames this long or shorter are never patched
const MIN_PATCH_LEN: usize = 10;

/// Decoded VISCA-over-IP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViscaHeader {
    /// Payload type
    pub payload_type: u16,
    /// Declared payload length
    pub payload_len: u16,
    /// Sequence number
    pub sequence: u32,
}

impl ViscaHeader {
    /// Decode the header at the start of `frame`
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < HEADER_LEN {
            return None;
        }

        let mut buf = frame;
        Some(Self {
            payload_type: buf.get_u16(),
            payload_len: buf.get_u16(),
            sequence: buf.get_u32(),
        })
    }

    /// Encode the header
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u16(self.payload_type);
        buf.put_u16(self.payload_len);
        buf.put_u32(self.sequence);
    }
}

/// Rewrite an inquiry mis-sent as a command
///
/// Applies to frames longer than 10 bytes whose type is [`TYPE_COMMAND`] and
/// whose payload starts with [`INQUIRY_REQUEST`]. Only the type field changes;
/// length, sequence and payload are left untouched. Returns `true` if the
/// frame was rewritten.
pub fn fix_inquiry(frame: &mut [u8]) -> bool {
    if frame.len() <= MIN_PATCH_LEN {
        return false;
    }

    let Some(header) = ViscaHeader::parse(frame) else {
        return false;
    };
    let request = (&frame[HEADER_LEN..]).get_u16();

    if header.payload_type != TYPE_COMMAND || request != INQUIRY_REQUEST {
        return false;
    }

    (&mut frame[..2]).put_u16(TYPE_INQUIRY);
    true
}
