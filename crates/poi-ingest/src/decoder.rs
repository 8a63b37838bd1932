//! Length-delimited record decoding
//!
//! A peer file is a sequence of frames: a base-128 varint giving the payload
//! length, followed by that many bytes of protobuf-encoded [`Record`]. The
//! stream ends cleanly only when the input runs out exactly at a frame
//! boundary.

use bytes::{Buf, BytesMut};
use futures::StreamExt;
use prost::Message;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};

use crate::error::DecodeError;
use crate::record::Record;

/// Default ceiling on a single frame's declared payload length (4 MiB)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// A varint never needs more than ten bytes to encode a u64
const MAX_VARINT_LEN: usize = 10;

enum Prefix {
    /// Declared payload length and the number of bytes the prefix occupied
    Complete { len: u64, width: usize },
    Incomplete,
    Malformed,
}

fn read_prefix(buf: &[u8]) -> Prefix {
    let mut value: u64 = 0;

    for (i, byte) in buf.iter().take(MAX_VARINT_LEN).enumerate() {
        let bits = u64::from(byte & 0x7f);
        // the tenth byte may only contribute the top bit of a u64
        if i == MAX_VARINT_LEN - 1 && bits > 1 {
            return Prefix::Malformed;
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Prefix::Complete {
                len: value,
                width: i + 1,
            };
        }
    }

    if buf.len() >= MAX_VARINT_LEN {
        Prefix::Malformed
    } else {
        Prefix::Incomplete
    }
}

/// Codec splitting a byte stream into [`Record`]s.
///
/// Tracks the absolute offset of the next unread frame so every error can
/// point at the frame that failed.
#[derive(Debug, Clone)]
pub struct RecordCodec {
    offset: u64,
    max_frame_length: usize,
}

impl RecordCodec {
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            offset: 0,
            max_frame_length,
        }
    }

    /// Byte offset of the first frame not yet decoded
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl Decoder for RecordCodec {
    type Item = Record;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Record>, DecodeError> {
        let offset = self.offset;

        let (declared, width) = match read_prefix(&src[..]) {
            Prefix::Complete { len, width } => (len, width),
            Prefix::Incomplete => return Ok(None),
            Prefix::Malformed => return Err(DecodeError::MalformedPrefix { offset }),
        };

        let payload_len = usize::try_from(declared)
            .ok()
            .filter(|&len| len <= self.max_frame_length)
            .ok_or(DecodeError::FrameTooLarge {
                offset,
                declared,
                limit: self.max_frame_length,
            })?;
        let frame_len = width.checked_add(payload_len).ok_or(DecodeError::FrameTooLarge {
            offset,
            declared,
            limit: self.max_frame_length,
        })?;

        // the buffer grows with the bytes actually read, never with the
        // declared length
        if src.len() < frame_len {
            return Ok(None);
        }

        src.advance(width);
        let payload = src.split_to(payload_len).freeze();
        let record =
            Record::decode(payload).map_err(|source| DecodeError::Payload { offset, source })?;

        self.offset += frame_len as u64;
        Ok(Some(record))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Record>, DecodeError> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let offset = self.offset;
        Err(match read_prefix(&src[..]) {
            Prefix::Complete { len, width } => DecodeError::TruncatedPayload {
                offset,
                declared: len,
                available: (src.len() - width) as u64,
            },
            Prefix::Incomplete => DecodeError::TruncatedPrefix { offset },
            Prefix::Malformed => DecodeError::MalformedPrefix { offset },
        })
    }
}

/// Pull-based reader producing one [`Record`] per call.
///
/// Finite and not restartable: once it reports end-of-stream or an error,
/// every later pull returns `Ok(None)`. Dropping it closes the reader.
pub struct RecordDecoder<R> {
    frames: FramedRead<R, RecordCodec>,
    finished: bool,
}

impl<R: AsyncRead + Unpin> RecordDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_length(reader, DEFAULT_MAX_FRAME_LENGTH)
    }

    pub fn with_max_frame_length(reader: R, max_frame_length: usize) -> Self {
        Self {
            frames: FramedRead::new(reader, RecordCodec::new(max_frame_length)),
            finished: false,
        }
    }

    /// Decode the next record, `Ok(None)` at a clean end of stream
    pub async fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.finished {
            return Ok(None);
        }

        match self.frames.next().await {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(err)) => {
                self.finished = true;
                Err(err)
            },
            None => {
                self.finished = true;
                Ok(None)
            },
        }
    }

    /// Byte offset of the first frame not yet handed out
    pub fn offset(&self) -> u64 {
        self.frames.decoder().offset()
    }

}

/// Encode records into the length-delimited wire format.
///
/// This is the peer-side writer; the ingestion path never calls it.
pub fn encode_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<u8> {
    let mut out = Vec::new();
    for record in records {
        out.extend_from_slice(&record.encode_length_delimited_to_vec());
    }
    out
}
