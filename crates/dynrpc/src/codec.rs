//! # Codec
//!
//! Moves envelopes over a byte stream. Each envelope is one compact JSON object
//! followed by a newline; the reader accepts any whitespace between records.
//!
//! ## Invariants
//! - **One At A Time**: each decode yields exactly one envelope and leaves whatever
//!   follows it buffered for the next decode.
//! - **Clean Boundaries**: end-of-stream between records is `Ok(None)`; inside a
//!   record it is `CodecError::Truncated`.
//! - **Bounded Memory**: an unfinished record may not grow past the reader's limit.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::error::CodecError;
use crate::frame::Call;
use crate::frame::Reply;

/// Default cap on a single buffered envelope: 16 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

pub type Result<T> = std::result::Result<T, CodecError>;

// ============================================================================
//  ENCODING
// ============================================================================

/// Writes one `Call` envelope and flushes.
pub async fn encode_call<W>(writer: &mut W, call: &Call) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, call).await
}

/// Writes one `Reply` envelope and flushes.
pub async fn encode_reply<W>(writer: &mut W, reply: &Reply) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, reply).await
}

/// Serializes any envelope as a single newline-terminated record.
pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(frame).map_err(|e| CodecError::Malformed(e.to_string()))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

// ============================================================================
//  DECODING
// ============================================================================

/// Buffered envelope reader over any async byte stream.
pub struct FrameReader<R> {
    reader: R,
    data: Vec<u8>,
    /// Bytes before this offset belong to envelopes already handed out.
    valid_start: usize,
    /// Bytes before this offset have been searched for a record terminator.
    scanned: usize,
    limit: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_limit(reader: R, limit: usize) -> Self {
        Self { reader, data: Vec::with_capacity(READ_CHUNK), valid_start: 0, scanned: 0, limit }
    }

    /// Reads the next `Call`, or `None` if the peer finished cleanly.
    pub async fn decode_call(&mut self) -> Result<Option<Call>> {
        self.next_frame().await
    }

    /// Reads the next `Reply`, or `None` if the peer finished cleanly.
    pub async fn decode_reply(&mut self) -> Result<Option<Reply>> {
        self.next_frame().await
    }

    /// Reads the next record and deserializes it as `T`.
    ///
    /// Records are only parsed once a newline has arrived after them, or at
    /// end-of-stream, so a slowly delivered envelope is scanned once.
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            self.skip_whitespace();

            if !self.is_empty() {
                let from = self.scanned.max(self.valid_start);
                match self.data[from..].iter().position(|&b| b == b'\n') {
                    Some(offset) => {
                        self.scanned = from + offset + 1;
                        if let Some(frame) = self.try_parse()? {
                            return Ok(Some(frame));
                        }
                    }
                    None => self.scanned = self.data.len(),
                }

                if self.len() > self.limit {
                    return Err(CodecError::FrameTooLarge { limit: self.limit });
                }

                // another newline may already be buffered
                if self.data[self.scanned..].contains(&b'\n') {
                    continue;
                }
            }

            self.compact();
            self.data.reserve(READ_CHUNK);
            let n = self.reader.read_buf(&mut self.data).await?;
            if n == 0 {
                self.skip_whitespace();
                if self.is_empty() {
                    return Ok(None);
                }
                if let Some(frame) = self.try_parse()? {
                    return Ok(Some(frame));
                }
                return Err(CodecError::Truncated { buffered: self.len() });
            }
        }
    }

    /// Parses one record from the front of the pending bytes. `None` means the
    /// record is still incomplete.
    fn try_parse<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        let (parsed, used) = {
            let pending = &self.data[self.valid_start..];
            let mut stream = serde_json::Deserializer::from_slice(pending).into_iter::<T>();
            let parsed = stream.next();
            (parsed, stream.byte_offset())
        };

        match parsed {
            Some(Ok(frame)) => {
                self.mark_consumed(used);
                Ok(Some(frame))
            }
            Some(Err(e)) if !e.is_eof() => Err(CodecError::Malformed(e.to_string())),
            _ => Ok(None),
        }
    }

    /// Bytes received but not yet handed out as an envelope.
    pub fn buffered(&self) -> usize {
        self.len()
    }

    /// Gives back the underlying stream, dropping anything still buffered.
    pub fn into_inner(self) -> R {
        self.reader
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    fn len(&self) -> usize {
        self.data.len() - self.valid_start
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mark_consumed(&mut self, bytes: usize) {
        self.valid_start += bytes;
    }

    fn skip_whitespace(&mut self) {
        let skip = self.data[self.valid_start..]
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.mark_consumed(skip);
    }

    fn compact(&mut self) {
        if self.valid_start > 0 {
            self.data.drain(..self.valid_start);
            self.scanned = self.scanned.saturating_sub(self.valid_start);
            self.valid_start = 0;
        }
    }
}
