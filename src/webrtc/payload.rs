//! Data-channel cursor frame codec
//!
//! Binary frames sent to viewers over the peer data channel. All integers
//! are big-endian. Every frame starts with a 3-byte header:
//! - Byte 0: opcode
//! - Bytes 1-2: payload length (bytes after the header), u16
//!
//! Cursor position (opcode 0x01, length 7):
//! - Bytes 3-5: reserved, zero (legacy client struct header)
//! - Bytes 6-7: X coordinate, u16
//! - Bytes 8-9: Y coordinate, u16
//!
//! Cursor image (opcode 0x02, length 11 + image size):
//! - Bytes 3-5: reserved, zero (legacy client struct header)
//! - Bytes 6-13: width, height, xhot, yhot, u16 each
//! - Bytes 14..: raw image bytes
//!
//! Deployed viewers parse exactly this layout and silently drop anything
//! else, so the reserved bytes must stay.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Cursor position frame opcode
pub const OP_CURSOR_POSITION: u8 = 0x01;
/// Cursor image frame opcode
pub const OP_CURSOR_IMAGE: u8 = 0x02;

/// Frame header size in bytes
const HEADER_SIZE: usize = 3;
/// Reserved zero bytes at the start of every payload, kept for the legacy
/// client struct layout
const RESERVED_SIZE: usize = 3;

/// Payload length of a cursor position frame
const CURSOR_POSITION_LENGTH: usize = 7;
/// Payload length of a cursor image frame before the image bytes
const CURSOR_IMAGE_BASE_LENGTH: usize = 11;

/// Largest image that still fits the 16-bit length field
pub const MAX_CURSOR_IMAGE_SIZE: usize = u16::MAX as usize - CURSOR_IMAGE_BASE_LENGTH;

/// Cursor image metadata, dimensions and hotspot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorImage {
    pub width: u16,
    pub height: u16,
    pub xhot: u16,
    pub yhot: u16,
}

fn put_header(buf: &mut BytesMut, event: u8, length: u16) {
    buf.put_u8(event);
    buf.put_u16(length);
    buf.put_bytes(0, RESERVED_SIZE);
}

/// Encode a cursor position frame
pub fn encode_cursor_position(x: u16, y: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + CURSOR_POSITION_LENGTH);
    put_header(&mut buf, OP_CURSOR_POSITION, CURSOR_POSITION_LENGTH as u16);
    buf.put_u16(x);
    buf.put_u16(y);
    buf.freeze()
}

/// Encode a cursor image frame
///
/// Fails with [`AppError::PayloadTooLarge`] when the image does not fit the
/// 16-bit length field.
pub fn encode_cursor_image(cursor: &CursorImage, img: &[u8]) -> Result<Bytes> {
    if img.len() > MAX_CURSOR_IMAGE_SIZE {
        return Err(AppError::PayloadTooLarge(img.len()));
    }

    let length = CURSOR_IMAGE_BASE_LENGTH + img.len();
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + length);
    put_header(&mut buf, OP_CURSOR_IMAGE, length as u16);
    buf.put_u16(cursor.width);
    buf.put_u16(cursor.height);
    buf.put_u16(cursor.xhot);
    buf.put_u16(cursor.yhot);
    buf.put_slice(img);
    Ok(buf.freeze())
}

fn split_payload(data: &[u8], opcode: u8) -> Option<&[u8]> {
    if data.len() < HEADER_SIZE + RESERVED_SIZE || data[0] != opcode {
        return None;
    }

    let length = u16::from_be_bytes([data[1], data[2]]) as usize;
    let payload = &data[HEADER_SIZE..];
    if payload.len() != length {
        return None;
    }

    Some(&payload[RESERVED_SIZE..])
}

/// Parse a cursor position frame, `None` on any layout mismatch
pub fn parse_cursor_position(data: &[u8]) -> Option<(u16, u16)> {
    let body = split_payload(data, OP_CURSOR_POSITION)?;
    if body.len() != CURSOR_POSITION_LENGTH - RESERVED_SIZE {
        return None;
    }

    let x = u16::from_be_bytes([body[0], body[1]]);
    let y = u16::from_be_bytes([body[2], body[3]]);
    Some((x, y))
}

/// Parse a cursor image frame, `None` on any layout mismatch
pub fn parse_cursor_image(data: &[u8]) -> Option<(CursorImage, Vec<u8>)> {
    let body = split_payload(data, OP_CURSOR_IMAGE)?;
    if body.len() < CURSOR_IMAGE_BASE_LENGTH - RESERVED_SIZE {
        return None;
    }

    let cursor = CursorImage {
        width: u16::from_be_bytes([body[0], body[1]]),
        height: u16::from_be_bytes([body[2], body[3]]),
        xhot: u16::from_be_bytes([body[4], body[5]]),
        yhot: u16::from_be_bytes([body[6], body[7]]),
    };
    Some((cursor, body[8..].to_vec()))
}
