//! Value types shared across the live segmenter, playlist managers, and
//! renderer: encoded frames, completed segments, partial segments, and the
//! small metadata types attached to a rendered playlist.

use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A presentation timestamp or duration expressed as a rational number,
/// matching how encoders report time without committing to a fixed
/// timescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: i64,
    pub timescale: u32,
}

impl Rational {
    pub fn new(num: i64, timescale: u32) -> Self {
        Self { num, timescale }
    }

    pub fn as_seconds(&self) -> f64 {
        if self.timescale == 0 {
            0.0
        } else {
            self.num as f64 / self.timescale as f64
        }
    }
}

/// Codec identifier carried on frames and rolled up onto segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CodecTag {
    Aac,
    H264,
    Hevc,
    Opus,
    Other(String),
}

/// One encoded access unit handed to the segmenter by an external encoder.
///
/// Invariant: timestamps within one codec track are monotonically
/// non-decreasing — the segmenter assumes this and does not re-sort frames.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub payload: Bytes,
    pub codec: CodecTag,
    pub pts: Rational,
    pub duration: Rational,
    pub is_keyframe: bool,
    /// For audio this always equals `is_keyframe`.
    pub is_independent: bool,
}

/// A byte range within a segment's resource, as emitted by `EXT-X-BYTERANGE`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByteRange {
    pub length: u64,
    pub offset: Option<u64>,
}

/// `EXT-X-KEY` attributes. The crate only carries the wire-level identity of
/// a key (URI, IV, format); the encryption itself is an external
/// collaborator (§6.3) applied before a segment reaches this model.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentKey {
    pub method: String,
    pub uri: String,
    pub iv: Option<[u8; 16]>,
    pub keyformat: Option<String>,
    pub keyformatversions: Option<String>,
}

/// A completed, immutable media segment.
#[derive(Debug, Clone)]
pub struct LiveSegment {
    pub index: u64,
    pub payload: Bytes,
    pub duration: f64,
    pub program_date_time: Option<DateTime<Utc>>,
    pub is_independent: bool,
    pub discontinuity: bool,
    pub is_gap: bool,
    pub filename: String,
    pub frame_count: u32,
    pub codecs: BTreeSet<CodecTag>,
    pub byte_range: Option<ByteRange>,
    pub bitrate: Option<u64>,
    pub key: Option<SegmentKey>,
    pub map_uri: Option<String>,
}

/// Composite identifier `(segment_index, partial_index)` for a partial
/// segment. The `"S.P"` string form used by `PartialSegment::id` is a
/// display convenience only — callers should key on the tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialId {
    pub segment_index: u64,
    pub partial_index: u32,
}

impl std::fmt::Display for PartialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.segment_index, self.partial_index)
    }
}

/// A sub-second chunk of an in-progress or completed segment, exposed for
/// LL-HLS.
///
/// Invariant: for every segment, the partial with `partial_index == 0` must
/// be independent.
#[derive(Debug, Clone)]
pub struct PartialSegment {
    pub id: PartialId,
    pub duration: f64,
    pub uri: String,
    pub is_independent: bool,
    pub is_gap: bool,
    pub byte_range: Option<ByteRange>,
}

impl PartialSegment {
    pub fn segment_index(&self) -> u64 {
        self.id.segment_index
    }

    pub fn partial_index(&self) -> u32 {
        self.id.partial_index
    }
}

/// An `EXT-X-DATERANGE` tracked only for its identity and end time, which is
/// all the delta-update bookkeeping in `RECENTLY-REMOVED-DATERANGES` needs.
#[derive(Debug, Clone)]
pub struct DateRange {
    pub id: String,
    pub end_date: Option<DateTime<Utc>>,
}

/// `EXT-X-RENDITION-REPORT` entry pointing at a sibling rendition's state.
#[derive(Debug, Clone)]
pub struct RenditionReport {
    pub uri: String,
    pub last_media_sequence: Option<u64>,
    pub last_part_index: Option<u32>,
}

/// `EXT-X-SERVER-CONTROL` attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerControl {
    pub can_block_reload: bool,
    pub hold_back: Option<f64>,
    pub part_hold_back: Option<f64>,
    pub can_skip_until: Option<f64>,
    pub can_skip_dateranges: bool,
}

impl ServerControl {
    /// Resolve `hold_back`, defaulting to `3 * target_duration` per §3.
    pub fn hold_back_or_default(&self, target_duration: f64) -> f64 {
        self.hold_back.unwrap_or(3.0 * target_duration)
    }

    /// Resolve `part_hold_back`, defaulting to `3 * part_target_duration`.
    pub fn part_hold_back_or_default(&self, part_target_duration: f64) -> f64 {
        self.part_hold_back.unwrap_or(3.0 * part_target_duration)
    }
}

/// `EXT-X-PRELOAD-HINT:TYPE=PART` — the only hint type this crate emits.
#[derive(Debug, Clone)]
pub struct PreloadHint {
    pub uri: String,
    pub byte_range: Option<ByteRange>,
}

/// `EXT-X-SKIP` parameters for a rendered delta update.
#[derive(Debug, Clone)]
pub struct SkipInfo {
    pub skipped_segments: u64,
    pub recently_removed_dateranges: Vec<String>,
}

/// Playlist type tag, `EXT-X-PLAYLIST-TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistType {
    None,
    Vod,
    Event,
}

/// Host-settable metadata applied to a playlist's header.
#[derive(Debug, Clone, Default)]
pub struct LivePlaylistMetadata {
    pub independent_segments: bool,
    pub start_offset: Option<f64>,
    pub custom_tags: Vec<String>,
}
