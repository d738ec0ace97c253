//! Length-prefixed frame codec for the native messaging channel.
//!
//! Each frame is a 4-byte unsigned little-endian length followed by exactly
//! that many bytes of UTF-8 JSON. The same layout is used in both directions.

use std::io::{ErrorKind, Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FramingError;

/// Largest frame accepted from the extension (64 MiB).
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Largest frame the browser accepts from a native host (1 MiB).
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Reads one frame.
///
/// Returns `Ok(None)` when the stream ends before any header byte is read,
/// which is how a looping reader learns the peer hung up. A partial header or
/// a short body is a [`FramingError`].
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FramingError> {
    let mut header = [0u8; 4];
    let read = read_fully(reader, &mut header)?;
    if read == 0 {
        return Ok(None);
    }
    if read < header.len() {
        return Err(FramingError::TruncatedHeader { read });
    }

    let len = u32::from_le_bytes(header) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(FramingError::FrameTooLarge {
            len,
            max: MAX_INBOUND_FRAME,
        });
    }

    let mut body = vec![0u8; len];
    let read = read_fully(reader, &mut body)?;
    if read < len {
        return Err(FramingError::TruncatedBody {
            expected: len,
            read,
        });
    }

    Ok(Some(body))
}

/// Writes one frame and flushes the writer.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError> {
    let len = u32::try_from(payload.len()).map_err(|_| FramingError::FrameTooLarge {
        len: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = Vec::with_capacity(4 + payload.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Serializes `value` as JSON and writes it as one frame.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), FramingError> {
    let payload = serde_json::to_vec(value).map_err(std::io::Error::other)?;
    write_frame(writer, &payload)
}

/// Reads one frame and decodes it as JSON. `Ok(None)` on clean end of stream.
pub fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, FramingError> {
    match read_frame(reader)? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Fills `buf` as far as the stream allows and reports how many bytes landed.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
