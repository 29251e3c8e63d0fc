//! Live playlist managers (C6): sliding-window, DVR, and event strategies
//! sharing one contract and differing only in retention.
//!
//! Grounded on the live-playlist generator in `hls.rs` for the render step,
//! and on `storage/index.rs`'s `SegmentIndex` for the
//! add-then-evict-then-account bookkeeping pattern, generalized from one
//! fixed-count policy into three retention strategies behind a shared
//! contract.

use std::collections::VecDeque;

use tokio::sync::broadcast;

use crate::model::{LivePlaylistMetadata, LiveSegment, PlaylistType};
use crate::playlist::render::{self, PlaylistSnapshot};

/// Broadcast event emitted by a live playlist manager.
#[derive(Debug, Clone)]
pub enum LivePlaylistEvent {
    SegmentAdded(u64),
    SegmentEvicted(u64),
    Rendered,
    Ended,
}

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Operations shared by every retention strategy.
///
/// A manager is a single-owner state machine: all mutation happens through
/// `&mut self`, so callers serialize access (typically by running one
/// manager per task, as the rest of the core does).
pub trait LivePlaylist {
    fn add_segment(&mut self, segment: LiveSegment);
    fn render(&self) -> String;
    fn update_metadata(&mut self, metadata: LivePlaylistMetadata);
    fn subscribe(&self) -> broadcast::Receiver<LivePlaylistEvent>;
    fn end(&mut self);
    fn media_sequence(&self) -> u64;
    fn discontinuity_sequence(&self) -> u64;
    fn target_duration(&self) -> u64;
    fn has_end_list(&self) -> bool;
    fn segments(&self) -> &VecDeque<LiveSegment>;
}

struct Core {
    segments: VecDeque<LiveSegment>,
    media_sequence: u64,
    discontinuity_sequence: u64,
    metadata: LivePlaylistMetadata,
    has_end_list: bool,
    events: broadcast::Sender<LivePlaylistEvent>,
}

impl Core {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            segments: VecDeque::new(),
            media_sequence: 0,
            discontinuity_sequence: 0,
            metadata: LivePlaylistMetadata::default(),
            has_end_list: false,
            events,
        }
    }

    fn target_duration(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| s.duration)
            .fold(0.0_f64, f64::max)
            .ceil() as u64
    }

    fn notify(&self, event: LivePlaylistEvent) {
        let _ = self.events.send(event);
    }

    fn render(&self, playlist_type: Option<PlaylistType>) -> String {
        let snapshot = PlaylistSnapshot {
            target_duration: self.target_duration(),
            media_sequence: self.media_sequence,
            discontinuity_sequence: self.discontinuity_sequence,
            playlist_type,
            segments: self.segments.iter().cloned().collect(),
            part_target_duration: None,
            completed_partial_groups: Vec::new(),
            in_progress_partials: None,
            preload_hint: None,
            server_control: None,
            rendition_reports: Vec::new(),
            skip: None,
            metadata: self.metadata.clone(),
            has_end_list: self.has_end_list,
        };
        self.notify(LivePlaylistEvent::Rendered);
        render::generate(&snapshot)
    }
}

/// Holds at most `max_segment_count` most-recent segments.
pub struct SlidingWindowPlaylist {
    core: Core,
    max_segment_count: usize,
}

impl SlidingWindowPlaylist {
    pub fn new(max_segment_count: usize) -> Self {
        Self {
            core: Core::new(),
            max_segment_count,
        }
    }
}

impl LivePlaylist for SlidingWindowPlaylist {
    fn add_segment(&mut self, segment: LiveSegment) {
        let index = segment.index;
        self.core.segments.push_back(segment);
        self.core.notify(LivePlaylistEvent::SegmentAdded(index));
        while self.core.segments.len() > self.max_segment_count {
            if let Some(evicted) = self.core.segments.pop_front() {
                self.core.media_sequence += 1;
                if evicted.discontinuity {
                    self.core.discontinuity_sequence += 1;
                }
                self.core
                    .notify(LivePlaylistEvent::SegmentEvicted(evicted.index));
            }
        }
    }

    fn render(&self) -> String {
        self.core.render(None)
    }

    fn update_metadata(&mut self, metadata: LivePlaylistMetadata) {
        self.core.metadata = metadata;
    }

    fn subscribe(&self) -> broadcast::Receiver<LivePlaylistEvent> {
        self.core.events.subscribe()
    }

    fn end(&mut self) {
        self.core.has_end_list = true;
        self.core.notify(LivePlaylistEvent::Ended);
    }

    fn media_sequence(&self) -> u64 {
        self.core.media_sequence
    }

    fn discontinuity_sequence(&self) -> u64 {
        self.core.discontinuity_sequence
    }

    fn target_duration(&self) -> u64 {
        self.core.target_duration()
    }

    fn has_end_list(&self) -> bool {
        self.core.has_end_list
    }

    fn segments(&self) -> &VecDeque<LiveSegment> {
        &self.core.segments
    }
}

/// Holds segments whose combined duration is at most `dvr_window_duration`.
pub struct DVRPlaylist {
    core: Core,
    dvr_window_duration: f64,
}

impl DVRPlaylist {
    pub fn new(dvr_window_duration: f64) -> Self {
        Self {
            core: Core::new(),
            dvr_window_duration,
        }
    }

    fn windowed_duration(&self) -> f64 {
        self.core.segments.iter().map(|s| s.duration).sum()
    }
}

impl LivePlaylist for DVRPlaylist {
    fn add_segment(&mut self, segment: LiveSegment) {
        let index = segment.index;
        self.core.segments.push_back(segment);
        self.core.notify(LivePlaylistEvent::SegmentAdded(index));
        while self.windowed_duration() > self.dvr_window_duration && self.core.segments.len() > 1
        {
            if let Some(evicted) = self.core.segments.pop_front() {
                self.core.media_sequence += 1;
                if evicted.discontinuity {
                    self.core.discontinuity_sequence += 1;
                }
                self.core
                    .notify(LivePlaylistEvent::SegmentEvicted(evicted.index));
            }
        }
    }

    fn render(&self) -> String {
        self.core.render(None)
    }

    fn update_metadata(&mut self, metadata: LivePlaylistMetadata) {
        self.core.metadata = metadata;
    }

    fn subscribe(&self) -> broadcast::Receiver<LivePlaylistEvent> {
        self.core.events.subscribe()
    }

    fn end(&mut self) {
        self.core.has_end_list = true;
        self.core.notify(LivePlaylistEvent::Ended);
    }

    fn media_sequence(&self) -> u64 {
        self.core.media_sequence
    }

    fn discontinuity_sequence(&self) -> u64 {
        self.core.discontinuity_sequence
    }

    fn target_duration(&self) -> u64 {
        self.core.target_duration()
    }

    fn has_end_list(&self) -> bool {
        self.core.has_end_list
    }

    fn segments(&self) -> &VecDeque<LiveSegment> {
        &self.core.segments
    }
}

/// Never evicts; emits `EXT-X-PLAYLIST-TYPE:EVENT`.
pub struct EventPlaylist {
    core: Core,
}

impl EventPlaylist {
    pub fn new() -> Self {
        Self { core: Core::new() }
    }
}

impl Default for EventPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

impl LivePlaylist for EventPlaylist {
    fn add_segment(&mut self, segment: LiveSegment) {
        let index = segment.index;
        self.core.segments.push_back(segment);
        self.core.notify(LivePlaylistEvent::SegmentAdded(index));
    }

    fn render(&self) -> String {
        self.core.render(Some(PlaylistType::Event))
    }

    fn update_metadata(&mut self, metadata: LivePlaylistMetadata) {
        self.core.metadata = metadata;
    }

    fn subscribe(&self) -> broadcast::Receiver<LivePlaylistEvent> {
        self.core.events.subscribe()
    }

    fn end(&mut self) {
        self.core.has_end_list = true;
        self.core.notify(LivePlaylistEvent::Ended);
    }

    fn media_sequence(&self) -> u64 {
        self.core.media_sequence
    }

    fn discontinuity_sequence(&self) -> u64 {
        self.core.discontinuity_sequence
    }

    fn target_duration(&self) -> u64 {
        self.core.target_duration()
    }

    fn has_end_list(&self) -> bool {
        self.core.has_end_list
    }

    fn segments(&self) -> &VecDeque<LiveSegment> {
        &self.core.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::BTreeSet;

    fn segment(index: u64, duration: f64, discontinuity: bool) -> LiveSegment {
        LiveSegment {
            index,
            payload: Bytes::new(),
            duration,
            program_date_time: None,
            is_independent: true,
            discontinuity,
            is_gap: false,
            filename: format!("seg{index}.mp4"),
            frame_count: 1,
            codecs: BTreeSet::new(),
            byte_range: None,
            bitrate: None,
            key: None,
            map_uri: None,
        }
    }

    #[test]
    fn sliding_window_basic_scenario() {
        let mut pl = SlidingWindowPlaylist::new(3);
        for (i, d) in [5.5, 6.0, 5.9, 6.0, 5.8].into_iter().enumerate() {
            pl.add_segment(segment(i as u64, d, false));
        }
        let rendered = pl.render();
        assert!(rendered.contains("#EXT-X-TARGETDURATION:6"));
        assert!(rendered.contains("#EXT-X-MEDIA-SEQUENCE:2"));
        assert_eq!(rendered.matches("#EXTINF").count(), 3);
        assert!(!rendered.contains("#EXT-X-ENDLIST"));
        assert_eq!(pl.media_sequence(), 2);
    }

    #[test]
    fn discontinuity_sequence_accounting() {
        let mut pl = SlidingWindowPlaylist::new(3);
        pl.add_segment(segment(0, 1.0, false));
        pl.add_segment(segment(1, 1.0, true));
        pl.add_segment(segment(2, 1.0, false));
        pl.add_segment(segment(3, 1.0, false));
        pl.add_segment(segment(4, 1.0, true));
        pl.add_segment(segment(5, 1.0, false));
        assert_eq!(pl.media_sequence(), 3);
        assert_eq!(pl.discontinuity_sequence(), 1);
    }

    #[test]
    fn dvr_playlist_evicts_by_duration_budget() {
        let mut pl = DVRPlaylist::new(10.0);
        for i in 0..5 {
            pl.add_segment(segment(i, 3.0, false));
        }
        let total: f64 = pl.segments().iter().map(|s| s.duration).sum();
        assert!(total <= 10.0);
        assert!(pl.media_sequence() > 0);
    }

    #[test]
    fn event_playlist_never_evicts_and_ends() {
        let mut pl = EventPlaylist::new();
        for i in 0..20 {
            pl.add_segment(segment(i, 6.0, false));
        }
        assert_eq!(pl.segments().len(), 20);
        assert!(pl.render().contains("#EXT-X-PLAYLIST-TYPE:EVENT"));
        pl.end();
        assert!(pl.render().contains("#EXT-X-ENDLIST"));
        assert!(pl.has_end_list());
    }

    #[test]
    fn subscribers_observe_segment_added_events() {
        let mut pl = SlidingWindowPlaylist::new(3);
        let mut rx = pl.subscribe();
        pl.add_segment(segment(0, 1.0, false));
        let event = rx.try_recv().unwrap();
        assert!(matches!(event, LivePlaylistEvent::SegmentAdded(0)));
    }
}
