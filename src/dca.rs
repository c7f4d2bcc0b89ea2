//! DCA framing.
//!
//! Clips on disk are headerless DCA0: a run of `[u16 LE length][payload]`
//! records with no footer or checksum. The end of a clip is implied by the
//! input running out at a length prefix.

use std::io::{self, Read};

use bytes::Bytes;
use serde_json::json;
use thiserror::Error;

/// One pre-encoded Opus packet.
pub type Frame = Bytes;

const LEN_PREFIX: usize = 2;
const DCA1_MAGIC: &[u8; 4] = b"DCA1";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("couldn't read length of frame {index}: {source}")]
    Length { index: usize, source: io::Error },

    #[error("frame {index} declares {declared} bytes but the payload is cut short: {source}")]
    TruncatedPayload {
        index: usize,
        declared: usize,
        source: io::Error,
    },

    #[error("frame of {0} bytes doesn't fit a DCA length prefix")]
    Oversized(usize),
}

/// Result of reading one record.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(Frame),
    /// Input ended at a length prefix, cleanly or with a dangling byte.
    /// Both count as the end of the clip.
    EndOfStream,
}

/// Reads the next record. `index` only feeds error messages.
pub fn read_frame<R: Read>(reader: &mut R, index: usize) -> Result<ReadOutcome, FrameError> {
    let mut len_buf = [0u8; LEN_PREFIX];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(ReadOutcome::EndOfStream),
        Err(source) => return Err(FrameError::Length { index, source }),
    }

    let declared = u16::from_le_bytes(len_buf) as usize;
    let mut payload = vec![0u8; declared];
    reader
        .read_exact(&mut payload)
        .map_err(|source| FrameError::TruncatedPayload {
            index,
            declared,
            source,
        })?;

    Ok(ReadOutcome::Frame(Bytes::from(payload)))
}

/// Decodes a whole clip. Fails without returning any frames if a payload is
/// shorter than its declared length.
pub fn read_frames<R: Read>(mut reader: R) -> Result<Vec<Frame>, FrameError> {
    let mut frames = Vec::new();
    loop {
        match read_frame(&mut reader, frames.len())? {
            ReadOutcome::Frame(frame) => frames.push(frame),
            ReadOutcome::EndOfStream => return Ok(frames),
        }
    }
}

/// Appends one DCA0 record to `out`.
pub fn write_frame(out: &mut Vec<u8>, frame: &[u8]) -> Result<(), FrameError> {
    let len = u16::try_from(frame.len()).map_err(|_| FrameError::Oversized(frame.len()))?;
    out.reserve(LEN_PREFIX + frame.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(frame);
    Ok(())
}

/// DCA1 header: magic, `i32` LE metadata size, JSON metadata.
///
/// Songbird only demuxes DCA when it sees this header, so live streams are
/// prefixed with it. The metadata describes what the `dca` tool emits:
/// 48kHz stereo Opus in 20ms frames.
pub fn dca1_header() -> Vec<u8> {
    let metadata = json!({
        "dca": {
            "version": 1,
            "tool": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "url": null,
                "author": null
            }
        },
        "opus": {
            "mode": "voip",
            "sample_rate": 48_000,
            "frame_size": 960,
            "abr": null,
            "vbr": true,
            "channels": 2
        },
        "info": null,
        "origin": null,
        "extra": null
    })
    .to_string()
    .into_bytes();

    let mut header = Vec::with_capacity(DCA1_MAGIC.len() + 4 + metadata.len());
    header.extend_from_slice(DCA1_MAGIC);
    header.extend_from_slice(&(metadata.len() as i32).to_le_bytes());
    header.extend_from_slice(&metadata);
    header
}
