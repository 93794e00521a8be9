//! Length-prefixed frame codec for the camlink transform stream.
//!
//! Wire format:
//! ```text
//! [payload_len:4][payload:N]
//! ```
//! `payload_len` is an unsigned 32-bit big-endian integer.  The payload is
//! UTF-8 JSON text.  There is no magic number, version byte, or checksum.
//!
//! Two decoding entry points are provided:
//!
//! - [`decode_frame`] works on a byte slice and reports
//!   [`FrameError::InsufficientData`] when more bytes are needed.
//! - [`FrameReader`] wraps any [`AsyncRead`] and yields one complete payload
//!   per call, buffering partial reads internally.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the big-endian length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default upper bound on a single payload (1 MiB).
///
/// A prefix declaring more than the limit is rejected before any payload
/// bytes are buffered.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Size of the scratch buffer used for each `read()` call.
const READ_CHUNK_SIZE: usize = 4096;

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The byte slice does not yet hold a complete frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The peer closed the stream after the prefix but before the full payload.
    #[error("stream ended mid-frame: header declared {declared} bytes, received {received}")]
    Truncated { declared: usize, received: usize },

    /// The length prefix exceeds the configured maximum.
    #[error("frame of {declared} bytes exceeds the {max}-byte limit")]
    FrameTooLarge { declared: usize, max: usize },

    /// A payload passed to the encoder does not fit in a 32-bit length prefix.
    #[error("payload of {0} bytes cannot be framed")]
    PayloadTooLarge(usize),

    /// The underlying stream failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Wraps `payload` in a frame: a 4-byte big-endian length followed by the bytes.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] if `payload` is longer than
/// `u32::MAX` bytes.
///
/// # Examples
///
/// ```rust
/// use camlink_core::protocol::codec::{decode_frame, encode_frame, DEFAULT_MAX_FRAME_LEN};
///
/// let bytes = encode_frame(br#"{"X":1}"#).unwrap();
/// assert_eq!(&bytes[..4], &[0, 0, 0, 7]);
/// let (payload, consumed) = decode_frame(&bytes, DEFAULT_MAX_FRAME_LEN).unwrap();
/// assert_eq!(payload, br#"{"X":1}"#);
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge(payload.len()))?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Decodes one frame from the beginning of `bytes`.
///
/// Returns the payload slice and the total number of bytes consumed
/// (prefix + payload), so the caller can advance its read cursor.
///
/// The size limit is checked as soon as the prefix is available, before any
/// payload bytes are required.
///
/// # Errors
///
/// - [`FrameError::InsufficientData`] if the prefix or payload is incomplete.
/// - [`FrameError::FrameTooLarge`] if the prefix declares more than `max_len` bytes.
pub fn decode_frame(bytes: &[u8], max_len: usize) -> Result<(&[u8], usize), FrameError> {
    let declared = peek_length(bytes)?;

    if declared > max_len {
        return Err(FrameError::FrameTooLarge {
            declared,
            max: max_len,
        });
    }

    let total = LENGTH_PREFIX_SIZE + declared;
    if bytes.len() < total {
        return Err(FrameError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    Ok((&bytes[LENGTH_PREFIX_SIZE..total], total))
}

/// Writes `payload` as one frame to `writer`.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] or [`FrameError::Io`].
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(payload)?;
    writer.write_all(&frame).await?;
    Ok(())
}

fn peek_length(bytes: &[u8]) -> Result<usize, FrameError> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(FrameError::InsufficientData {
            needed: LENGTH_PREFIX_SIZE,
            available: bytes.len(),
        });
    }
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

// ── Streaming reader ──────────────────────────────────────────────────────────

/// Pulls complete frames out of a byte stream, one at a time.
///
/// TCP may deliver a frame split across many reads, or several frames in one
/// read.  `FrameReader` keeps the leftover bytes between calls, so each
/// connection owns exactly one reader and frames never leak across
/// connections.
///
/// [`FrameReader::next_frame`] is cancel-safe: if its future is dropped (for
/// example inside `tokio::select!`), no buffered bytes are lost.
pub struct FrameReader<R> {
    reader: R,
    recv_buf: Vec<u8>,
    read_tmp: Box<[u8]>,
    max_frame_len: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader that rejects payloads larger than `max_frame_len`.
    pub fn new(reader: R, max_frame_len: usize) -> Self {
        Self {
            reader,
            recv_buf: Vec::with_capacity(READ_CHUNK_SIZE),
            read_tmp: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            max_frame_len,
        }
    }

    /// Returns the next complete payload.
    ///
    /// - `Ok(Some(payload))` – one frame was read.
    /// - `Ok(None)` – the peer closed the stream with fewer than four bytes
    ///   of a new frame buffered (clean end of stream).
    ///
    /// # Errors
    ///
    /// - [`FrameError::Truncated`] if the stream closed after a complete
    ///   prefix but before the full payload.
    /// - [`FrameError::FrameTooLarge`] if a prefix exceeds the limit.
    /// - [`FrameError::Io`] on read failure.
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        loop {
            match decode_frame(&self.recv_buf, self.max_frame_len) {
                Ok((payload, consumed)) => {
                    let frame = payload.to_vec();
                    self.recv_buf.drain(..consumed);
                    return Ok(Some(frame));
                }
                Err(FrameError::InsufficientData { .. }) => {}
                Err(e) => return Err(e),
            }

            let n = self.reader.read(&mut self.read_tmp).await?;
            if n == 0 {
                return match peek_length(&self.recv_buf) {
                    Err(_) => Ok(None),
                    Ok(declared) => Err(FrameError::Truncated {
                        declared,
                        received: self.recv_buf.len() - LENGTH_PREFIX_SIZE,
                    }),
                };
            }
            self.recv_buf.extend_from_slice(&self.read_tmp[..n]);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
