//! Wire codec for the reliable-UDP segment format.
//!
//! Every datagram carries a fixed 20-octet header: a big-endian u32 offset
//! in octets 0..3 followed by 16 reserved zero octets. A segment's payload
//! (0..=DATA_SIZE octets) determines whether it is a data segment, an ACK,
//! or the EOF marker. There is no magic number and no checksum -- UDP
//! already drops corrupted datagrams before they reach us.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TideError};

/// Largest datagram this protocol ever sends or accepts.
pub const MAX_PAYLOAD: usize = 1200;
/// Fixed header size: 4-octet offset + 16 reserved octets.
pub const HEADER_SIZE: usize = 20;
/// Largest payload a single data segment may carry.
pub const DATA_SIZE: usize = MAX_PAYLOAD - HEADER_SIZE;
/// The literal end-of-stream marker payload.
pub const EOF_MARKER: &[u8] = b"EOF";
/// The single-octet request datagram sent by the receiver.
pub const REQUEST_BYTE: u8 = b'G';

/// A decoded segment, distinguished by payload shape rather than a type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Data segment carrying `payload` starting at byte `offset`.
    Data { offset: u32, payload: Bytes },
    /// EOF marker segment at byte `offset`.
    Eof { offset: u32 },
    /// Cumulative acknowledgment: bytes `[0, next_expected)` were delivered.
    Ack { next_expected: u32 },
}

/// Encode a data segment at `offset` carrying `payload`.
///
/// `payload.len()` must not exceed [`DATA_SIZE`]; callers are expected to
/// chunk the source stream themselves (the sender's fill step does this).
pub fn encode_data(offset: u32, payload: &[u8]) -> Result<Bytes> {
    if payload.len() > DATA_SIZE {
        return Err(TideError::PayloadTooLarge {
            size: payload.len(),
            max: DATA_SIZE,
        });
    }
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, offset);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Encode the EOF marker segment at `offset`.
pub fn encode_eof(offset: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + EOF_MARKER.len());
    write_header(&mut buf, offset);
    buf.put_slice(EOF_MARKER);
    buf.freeze()
}

/// Encode a cumulative ACK for `next_expected`.
pub fn encode_ack(next_expected: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE);
    write_header(&mut buf, next_expected);
    buf.freeze()
}

/// Encode the single-octet request datagram.
pub fn encode_request() -> Bytes {
    Bytes::from_static(&[REQUEST_BYTE])
}

fn write_header(buf: &mut BytesMut, offset: u32) {
    buf.put_u32(offset);
    buf.put_bytes(0, HEADER_SIZE - 4);
}

/// Decode the offset out of a segment's header, ignoring the reserved
/// octets. Returns `None` if the segment is shorter than [`HEADER_SIZE`]
/// (undecodable; callers must silently drop such datagrams).
pub fn decode_header(segment: &[u8]) -> Option<u32> {
    if segment.len() < HEADER_SIZE {
        return None;
    }
    let mut buf = &segment[..4];
    Some(buf.get_u32())
}

/// Decode a full segment into its semantic shape. Returns `None` for
/// anything shorter than the fixed header (undecodable).
pub fn decode(segment: &[u8]) -> Option<Decoded> {
    let offset = decode_header(segment)?;
    let payload = &segment[HEADER_SIZE..];
    if payload.is_empty() {
        Some(Decoded::Ack {
            next_expected: offset,
        })
    } else if payload == EOF_MARKER {
        Some(Decoded::Eof { offset })
    } else {
        Some(Decoded::Data {
            offset,
            payload: Bytes::copy_from_slice(payload),
        })
    }
}

/// Whether `segment` is the single-octet request datagram.
pub fn is_request(segment: &[u8]) -> bool {
    segment.len() == 1 && segment[0] == REQUEST_BYTE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_round_trips() {
        let seg = encode_ack(4096);
        match decode(&seg).unwrap() {
            Decoded::Ack { next_expected } => assert_eq!(next_expected, 4096),
            other => panic!("expected Ack, got {other:?}"),
        }
    }

    #[test]
    fn data_round_trips() {
        let seg = encode_data(1180, b"hello").unwrap();
        match decode(&seg).unwrap() {
            Decoded::Data { offset, payload } => {
                assert_eq!(offset, 1180);
                assert_eq!(&payload[..], b"hello");
            }
            other => panic!("expected Data, got {other:?}"),
        }
    }

    #[test]
    fn eof_marker_is_recognized() {
        let seg = encode_eof(3600);
        match decode(&seg).unwrap() {
            Decoded::Eof { offset } => assert_eq!(offset, 3600),
            other => panic!("expected Eof, got {other:?}"),
        }
    }

    #[test]
    fn oversized_payload_rejected() {
        let oversized = vec![0u8; DATA_SIZE + 1];
        assert!(encode_data(0, &oversized).is_err());
    }

    #[test]
    fn undecodable_segment_is_none() {
        assert!(decode_header(&[0u8; 3]).is_none());
        assert!(decode(&[1, 2, 3]).is_none());
    }

    #[test]
    fn reserved_octets_are_zero_and_ignored() {
        let seg = encode_ack(7);
        assert_eq!(&seg[4..HEADER_SIZE], &[0u8; 16][..]);
        // Corrupt the reserved region; decode must still succeed identically.
        let mut corrupted = BytesMut::from(&seg[..]);
        corrupted[10] = 0xAB;
        assert_eq!(decode_header(&corrupted), decode_header(&seg));
    }

    #[test]
    fn request_datagram_is_recognized() {
        let req = encode_request();
        assert!(is_request(&req));
        assert!(!is_request(&encode_ack(0)));
    }
}
