//! Live segmenter (C5): turns a stream of `EncodedFrame`s into
//! duration/keyframe-aligned segments and sub-second partials.
//!
//! Grounded on `CameraWorker`'s cut loop in `ingestion.rs`
//! (accumulate-then-cut-on-deadline-or-keyframe), generalized from one fixed
//! wall-clock deadline into independent audio/video cut policies plus partial
//! boundaries.

use std::collections::{BTreeSet, VecDeque};

use chrono::Utc;

use crate::error::{CoreError, Result};
use crate::external::{FormatDescription, SegmentWriter};
use crate::model::{CodecTag, EncodedFrame, LiveSegment, PartialId, PartialSegment};
use crate::partial::UriTemplate;

/// Which cut policy governs this segmenter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// One unit of output from `ingest`/`finish`/`force_segment_boundary`.
/// Partials for a segment are always emitted before that segment itself.
#[derive(Debug, Clone)]
pub enum SegmenterOutput {
    Partial(PartialSegment),
    Segment(LiveSegment),
}

struct PartialAccumulator {
    frames: Vec<EncodedFrame>,
    duration: f64,
    is_independent: bool,
}

impl PartialAccumulator {
    fn new() -> Self {
        Self {
            frames: Vec::new(),
            duration: 0.0,
            is_independent: false,
        }
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Consumes encoded frames for one track and produces segments/partials.
pub struct LiveSegmenter<W: SegmentWriter> {
    kind: TrackKind,
    target_duration: f64,
    part_target: f64,
    ring_buffer_size: Option<usize>,
    writer: W,
    format: FormatDescription,
    uri_template: UriTemplate,
    enable_program_date_time: bool,

    next_segment_index: u64,
    next_partial_index: u32,
    segment_frames: Vec<EncodedFrame>,
    segment_duration: f64,
    segment_codecs: BTreeSet<CodecTag>,
    segment_is_independent: bool,
    pending_discontinuity: bool,
    duration_since_keyframe: f64,

    partial: PartialAccumulator,
    retained: VecDeque<LiveSegment>,
    ended: bool,
    init_segment: Option<bytes::Bytes>,
}

impl<W: SegmentWriter> LiveSegmenter<W> {
    pub fn new(
        kind: TrackKind,
        target_duration: f64,
        part_target: f64,
        ring_buffer_size: Option<usize>,
        writer: W,
        format: FormatDescription,
    ) -> Self {
        Self {
            kind,
            target_duration,
            part_target,
            ring_buffer_size,
            writer,
            format,
            uri_template: UriTemplate::default(),
            enable_program_date_time: false,
            next_segment_index: 0,
            next_partial_index: 0,
            segment_frames: Vec::new(),
            segment_duration: 0.0,
            segment_codecs: BTreeSet::new(),
            segment_is_independent: false,
            pending_discontinuity: false,
            duration_since_keyframe: 0.0,
            partial: PartialAccumulator::new(),
            retained: VecDeque::new(),
            ended: false,
            init_segment: None,
        }
    }

    /// The CMAF/TS init blob for this track, written lazily on first use and
    /// cached for the lifetime of the segmenter.
    pub fn init_segment(&mut self) -> Result<bytes::Bytes> {
        if let Some(init) = &self.init_segment {
            return Ok(init.clone());
        }
        let init = self.writer.write_init(&self.format)?;
        self.init_segment = Some(init.clone());
        Ok(init)
    }

    pub fn with_program_date_time(mut self, enabled: bool) -> Self {
        self.enable_program_date_time = enabled;
        self
    }

    pub fn with_uri_template(mut self, template: UriTemplate) -> Self {
        self.uri_template = template;
        self
    }

    /// Flags the next emitted segment as starting a discontinuity.
    pub fn insert_discontinuity(&mut self) {
        self.pending_discontinuity = true;
    }

    /// Append a frame to the in-progress segment, cutting partials/segments
    /// as the policy for this track's kind requires.
    pub fn ingest(&mut self, frame: EncodedFrame) -> Result<Vec<SegmenterOutput>> {
        if self.ended {
            return Err(CoreError::StreamAlreadyEnded);
        }

        let mut out = Vec::new();

        let should_cut_segment = match self.kind {
            TrackKind::Audio => self.segment_duration >= self.target_duration,
            TrackKind::Video => {
                frame.is_keyframe && self.segment_duration >= self.target_duration
            }
        };

        if should_cut_segment && !self.segment_frames.is_empty() {
            out.extend(self.cut_segment()?);
        }

        if self.partial.is_empty() {
            self.partial.is_independent = frame.is_independent;
        } else if frame.is_independent || self.partial.duration >= self.part_target {
            out.push(SegmenterOutput::Partial(self.cut_partial()));
            self.partial.is_independent = frame.is_independent;
        }

        if self.segment_frames.is_empty() {
            self.segment_is_independent = frame.is_keyframe || self.kind == TrackKind::Audio;
        }
        if frame.is_keyframe {
            self.duration_since_keyframe = 0.0;
        } else {
            self.duration_since_keyframe += frame.duration.as_seconds();
        }
        if self.duration_since_keyframe > self.target_duration * 2.0 {
            tracing::warn!(
                track = ?self.kind,
                "no keyframe within 2x target duration; will force-cut on next keyframe"
            );
        }

        self.segment_codecs.insert(frame.codec.clone());
        let frame_duration = frame.duration.as_seconds();
        self.segment_duration += frame_duration;
        self.partial.duration += frame_duration;
        self.segment_frames.push(frame.clone());
        self.partial.frames.push(frame);

        Ok(out)
    }

    fn cut_partial(&mut self) -> PartialSegment {
        let finished = std::mem::replace(&mut self.partial, PartialAccumulator::new());
        let id = PartialId {
            segment_index: self.next_segment_index,
            partial_index: self.next_partial_index,
        };
        self.next_partial_index += 1;
        let uri = self
            .uri_template
            .render(id.segment_index, id.partial_index);
        PartialSegment {
            id,
            duration: finished.duration,
            uri,
            is_independent: finished.is_independent,
            is_gap: false,
            byte_range: None,
        }
    }

    fn cut_segment(&mut self) -> Result<Vec<SegmenterOutput>> {
        let mut out = Vec::new();
        if !self.partial.is_empty() {
            out.push(SegmenterOutput::Partial(self.cut_partial()));
        }

        let frames = std::mem::take(&mut self.segment_frames);
        let duration = self.segment_duration;
        let codecs = std::mem::take(&mut self.segment_codecs);
        let payload = self.writer.write_segment(&frames)?;
        let index = self.next_segment_index;
        let pdt = if self.enable_program_date_time {
            Some(Utc::now())
        } else {
            None
        };
        let filename = format!("seg{index}.mp4");

        let segment = LiveSegment {
            index,
            payload,
            duration,
            program_date_time: pdt,
            is_independent: self.segment_is_independent,
            discontinuity: self.pending_discontinuity,
            is_gap: false,
            filename,
            frame_count: frames.len() as u32,
            codecs,
            byte_range: None,
            bitrate: None,
            key: None,
            map_uri: None,
        };
        self.pending_discontinuity = false;
        self.next_segment_index += 1;
        self.segment_duration = 0.0;
        self.duration_since_keyframe = 0.0;
        self.next_partial_index = 0;

        self.retain(segment.clone());
        out.push(SegmenterOutput::Segment(segment));
        Ok(out)
    }

    fn retain(&mut self, segment: LiveSegment) {
        self.retained.push_back(segment);
        if let Some(max) = self.ring_buffer_size {
            while self.retained.len() > max {
                self.retained.pop_front();
            }
        }
    }

    /// Segments still held in the segmenter's own ring buffer, oldest first.
    pub fn retained_segments(&self) -> impl Iterator<Item = &LiveSegment> {
        self.retained.iter()
    }

    /// Flush whatever is in progress, even if below target duration, and
    /// mark the segmenter ended. Idempotent: calling `finish` again returns
    /// `Ok(None)`.
    pub fn finish(&mut self) -> Result<Vec<SegmenterOutput>> {
        if self.ended {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        if !self.segment_frames.is_empty() {
            out.extend(self.cut_segment()?);
        }
        self.ended = true;
        Ok(out)
    }

    /// Emit the current segment now regardless of duration/keyframe policy,
    /// and begin a new one on the next frame. Used for ad insertion or
    /// content switches.
    pub fn force_segment_boundary(&mut self) -> Result<Vec<SegmenterOutput>> {
        if self.ended {
            return Err(CoreError::StreamAlreadyEnded);
        }
        if self.segment_frames.is_empty() {
            return Ok(Vec::new());
        }
        self.cut_segment()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn next_segment_index(&self) -> u64 {
        self.next_segment_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::model::Rational;

    struct ConcatWriter;

    impl SegmentWriter for ConcatWriter {
        fn write_init(&mut self, _format: &FormatDescription) -> Result<Bytes> {
            Ok(Bytes::from_static(b"init"))
        }

        fn write_segment(&mut self, frames: &[EncodedFrame]) -> Result<Bytes> {
            let mut buf = Vec::new();
            for f in frames {
                buf.extend_from_slice(&f.payload);
            }
            Ok(Bytes::from(buf))
        }
    }

    fn audio_frame(seconds: f64) -> EncodedFrame {
        EncodedFrame {
            payload: Bytes::from_static(b"x"),
            codec: CodecTag::Aac,
            pts: Rational::new(0, 1),
            duration: Rational::new((seconds * 1000.0) as i64, 1000),
            is_keyframe: true,
            is_independent: true,
        }
    }

    fn video_frame(seconds: f64, keyframe: bool) -> EncodedFrame {
        EncodedFrame {
            payload: Bytes::from_static(b"x"),
            codec: CodecTag::H264,
            pts: Rational::new(0, 1),
            duration: Rational::new((seconds * 1000.0) as i64, 1000),
            is_keyframe: keyframe,
            is_independent: keyframe,
        }
    }

    fn fmt() -> FormatDescription {
        FormatDescription {
            codec: CodecTag::Aac,
            width: None,
            height: None,
            sample_rate: Some(48_000),
            channels: Some(2),
        }
    }

    #[test]
    fn finish_on_empty_segmenter_returns_nothing() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 2.0, 0.5, None, ConcatWriter, fmt());
        let out = seg.finish().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn audio_cuts_at_target_duration() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 1.0, 0.5, None, ConcatWriter, fmt());
        let mut outs = Vec::new();
        for _ in 0..3 {
            outs.extend(seg.ingest(audio_frame(0.5)).unwrap());
        }
        let segments: Vec<_> = outs
            .iter()
            .filter(|o| matches!(o, SegmenterOutput::Segment(_)))
            .collect();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn video_only_cuts_on_keyframe() {
        let mut seg = LiveSegmenter::new(TrackKind::Video, 1.0, 0.5, None, ConcatWriter, fmt());
        seg.ingest(video_frame(0.6, true)).unwrap();
        let out = seg.ingest(video_frame(0.6, false)).unwrap();
        assert!(!out.iter().any(|o| matches!(o, SegmenterOutput::Segment(_))));
        let out = seg.ingest(video_frame(0.1, true)).unwrap();
        assert!(out.iter().any(|o| matches!(o, SegmenterOutput::Segment(_))));
    }

    #[test]
    fn first_partial_of_segment_is_independent() {
        let mut seg = LiveSegmenter::new(TrackKind::Video, 2.0, 0.3, None, ConcatWriter, fmt());
        seg.ingest(video_frame(0.3, true)).unwrap();
        let out = seg.ingest(video_frame(0.3, false)).unwrap();
        let partial = out
            .iter()
            .find_map(|o| match o {
                SegmenterOutput::Partial(p) if p.partial_index() == 0 => Some(p),
                _ => None,
            })
            .expect("first partial should have been cut");
        assert!(partial.is_independent);
    }

    #[test]
    fn force_segment_boundary_cuts_immediately() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 10.0, 0.5, None, ConcatWriter, fmt());
        seg.ingest(audio_frame(0.5)).unwrap();
        let out = seg.force_segment_boundary().unwrap();
        assert!(out.iter().any(|o| matches!(o, SegmenterOutput::Segment(_))));
    }

    #[test]
    fn ring_buffer_evicts_oldest_retained_segment() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 0.5, 0.25, Some(1), ConcatWriter, fmt());
        for _ in 0..2 {
            seg.ingest(audio_frame(0.5)).unwrap();
        }
        assert_eq!(seg.retained_segments().count(), 1);
        assert_eq!(seg.retained_segments().next().unwrap().index, 1);
    }

    #[test]
    fn finish_is_idempotent() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 1.0, 0.5, None, ConcatWriter, fmt());
        seg.ingest(audio_frame(0.3)).unwrap();
        let first = seg.finish().unwrap();
        assert_eq!(first.len(), 1);
        let second = seg.finish().unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn segment_indices_increase_monotonically() {
        let mut seg = LiveSegmenter::new(TrackKind::Audio, 0.5, 0.25, None, ConcatWriter, fmt());
        for _ in 0..3 {
            seg.ingest(audio_frame(0.5)).unwrap();
        }
        assert_eq!(seg.next_segment_index(), 3);
    }
}
