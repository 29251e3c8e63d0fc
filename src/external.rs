//! Contracts for everything this crate treats as an external collaborator:
//! frame encoding, media capture, segment/playlist push, M3U8 text parsing,
//! encryption, CMAF/TS box writing, and recording storage.
//!
//! None of these are implemented here — the core only depends on the trait,
//! the same way `ingestion.rs`'s capture loop depends on a GStreamer pipeline
//! it doesn't own the internals of. A host links a concrete implementation for
//! each trait it needs.

use std::pin::Pin;

use bytes::Bytes;

use crate::model::{CodecTag, EncodedFrame};

pub type BoxStream<'a, T> = Pin<Box<dyn tokio_stream::Stream<Item = T> + Send + 'a>>;

/// Raw, undecoded media buffer pulled from a media source.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    pub payload: Bytes,
    pub pts_ns: i64,
}

/// Static description of a source's audio/video format.
#[derive(Debug, Clone)]
pub struct FormatDescription {
    pub codec: CodecTag,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

/// Configuration handed to a frame encoder before encoding starts.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub codec: CodecTag,
    pub bitrate: u32,
}

/// Turns raw buffers into `EncodedFrame`s. Implemented by a transcoder the
/// core does not embed.
pub trait FrameEncoder: Send {
    fn configure(&mut self, config: &EncoderConfig) -> crate::error::Result<()>;
    fn encode(&mut self, raw: &RawBuffer) -> crate::error::Result<Option<EncodedFrame>>;
    fn flush(&mut self) -> crate::error::Result<Vec<EncodedFrame>>;
}

/// Supplies raw buffers from wherever media actually originates (camera,
/// file, SRT listener, ...).
pub trait MediaSource: Send {
    fn start(&mut self) -> crate::error::Result<()>;
    fn stop(&mut self) -> crate::error::Result<()>;
    fn format_description(&self) -> FormatDescription;
    fn buffers(&mut self) -> BoxStream<'_, RawBuffer>;
}

/// Current readiness of a push destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PusherState {
    Idle,
    Connecting,
    Active,
    Degraded,
    Closed,
}

/// Cumulative counters for a push destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct PusherStats {
    pub bytes_sent: u64,
    pub segments_sent: u64,
    pub failures: u64,
}

/// Delivers segment and playlist bytes to wherever clients fetch them
/// (HTTP origin, local disk, RTMP/SRT/Icecast relay).
pub trait SegmentPusher: Send {
    fn push(&mut self, bytes: &Bytes, path: &str) -> crate::error::Result<()>;
    fn push_playlist(&mut self, text: &str, path: &str) -> crate::error::Result<()>;
    fn state(&self) -> PusherState;
    fn stats(&self) -> PusherStats;
}

/// Errors surfaced by an `M3u8Parser` implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum M3u8ParseError {
    #[error("manifest is empty")]
    EmptyManifest,
    #[error("manifest is missing the #EXTM3U header")]
    MissingHeader,
    #[error("malformed tag at line {0}: {1}")]
    MalformedTag(u32, String),
}

/// Opaque, parsed representation of an M3U8 document. The parser producing
/// this and the tree it produces live entirely outside the core.
pub trait M3u8Parser {
    type Playlist;

    fn parse(&self, text: &str) -> Result<Self::Playlist, M3u8ParseError>;
}

/// AES-128 / SAMPLE-AES segment and sample encryption.
pub trait EncryptionPrimitives {
    fn encrypt_segment(
        &self,
        data: &[u8],
        key: &[u8; 16],
        iv: &[u8; 16],
    ) -> crate::error::Result<Bytes>;

    fn encrypt_sample(
        &self,
        sample: &[u8],
        key: &[u8; 16],
        iv: &[u8; 16],
    ) -> crate::error::Result<Bytes>;
}

/// Derives a 16-byte IV from a media sequence number: big-endian `n` in the
/// last 8 bytes, zeros elsewhere. This is pure arithmetic, not a secret
/// primitive, so it lives in the core rather than behind a trait.
pub fn derive_iv_from_media_sequence(n: u64) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[8..].copy_from_slice(&n.to_be_bytes());
    iv
}

/// Packages a group of encoded frames (and, for video, an init segment) into
/// the byte blobs the playlist references. A real implementation writes
/// CMAF/fMP4 or MPEG-TS boxes; this core only forwards whatever bytes come
/// back.
pub trait SegmentWriter: Send {
    fn write_init(&mut self, format: &FormatDescription) -> crate::error::Result<Bytes>;
    fn write_segment(&mut self, frames: &[EncodedFrame]) -> crate::error::Result<Bytes>;
}

/// Persists finalized segments and playlists for recording/VOD export.
pub trait RecordingStorage: Send {
    fn write_segment(&mut self, data: &[u8], filename: &str, directory: &str)
        -> crate::error::Result<()>;
    fn write_playlist(&mut self, text: &str, filename: &str, directory: &str)
        -> crate::error::Result<()>;
    fn list_files(&self, directory: &str) -> crate::error::Result<Vec<String>>;
    fn file_exists(&self, filename: &str, directory: &str) -> bool;
    fn total_bytes_written(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iv_derivation_places_n_in_last_eight_bytes() {
        let iv = derive_iv_from_media_sequence(42);
        assert_eq!(&iv[..8], &[0u8; 8]);
        assert_eq!(&iv[8..], &42u64.to_be_bytes());
    }

    #[test]
    fn iv_derivation_zero() {
        let iv = derive_iv_from_media_sequence(0);
        assert_eq!(iv, [0u8; 16]);
    }
}
