//! LL-HLS manager (C7): aggregates a sliding-window playlist, the
//! partial-segment manager, server-control configuration, rendition
//! reports, and delta-update rendering, and keeps the blocking-request
//! coordinator (C8) informed as partials and segments land.

use std::sync::Arc;
use std::time::Duration;

use crate::blocking::{BlockingCoordinator, BlockingRequest, SkipRequest};
use crate::error::Result;
use crate::model::{
    ByteRange, DateRange, LiveSegment, RenditionReport, ServerControl, SkipInfo,
};
use crate::partial::PartialSegmentManager;
use crate::playlist::manager::{LivePlaylist, LivePlaylistEvent, SlidingWindowPlaylist};
use crate::playlist::render::{self, PlaylistSnapshot};

/// Configuration fixed at construction time.
#[derive(Debug, Clone)]
pub struct LlHlsConfig {
    pub part_target_duration: f64,
    pub max_segment_count: usize,
    pub max_retained_partial_segments: usize,
    pub server_control: ServerControl,
}

pub struct LlHlsManager {
    playlist: SlidingWindowPlaylist,
    partials: PartialSegmentManager,
    server_control: ServerControl,
    part_target_duration: f64,
    rendition_reports: Vec<RenditionReport>,
    dateranges: Vec<DateRange>,
    /// Shared via `Arc` rather than owned outright: per the concurrency
    /// model this is the one rendezvous point a reader task may need to
    /// reach independently of whatever task owns the rest of this manager.
    coordinator: Arc<BlockingCoordinator>,
    ended: bool,
}

impl LlHlsManager {
    pub fn new(config: LlHlsConfig) -> Self {
        Self {
            playlist: SlidingWindowPlaylist::new(config.max_segment_count),
            partials: PartialSegmentManager::new(
                config.part_target_duration,
                config.max_retained_partial_segments,
            ),
            server_control: config.server_control,
            part_target_duration: config.part_target_duration,
            rendition_reports: Vec::new(),
            dateranges: Vec::new(),
            coordinator: Arc::new(BlockingCoordinator::new()),
            ended: false,
        }
    }

    /// A cheap handle to the blocking coordinator, usable from a task that
    /// does not otherwise own this manager.
    pub fn blocking_coordinator(&self) -> Arc<BlockingCoordinator> {
        self.coordinator.clone()
    }

    /// Add a partial to the segment in progress, notifying any blocking
    /// reload requests waiting on it.
    pub fn add_partial(
        &mut self,
        duration: f64,
        uri: Option<String>,
        is_independent: bool,
        is_gap: bool,
        byte_range: Option<ByteRange>,
    ) -> Result<crate::model::PartialSegment> {
        let partial = self
            .partials
            .add_partial(duration, uri, is_independent, is_gap, byte_range)?;
        self.coordinator
            .notify(partial.segment_index(), partial.partial_index());
        Ok(partial)
    }

    /// Form a `LiveSegment` from the partials accumulated on the current
    /// segment, append it to the playlist, and notify waiters. `duration`
    /// and `filename` are supplied by the caller (typically the live
    /// segmenter) rather than re-derived from the partial group.
    pub fn complete_segment(
        &mut self,
        payload: bytes::Bytes,
        duration: f64,
        filename: impl Into<String>,
        has_discontinuity: bool,
    ) -> LiveSegment {
        let segment_index = self.playlist_next_index();
        let partials = self.partials.complete_segment();
        let is_independent = partials.first().map(|p| p.is_independent).unwrap_or(true);

        let segment = LiveSegment {
            index: segment_index,
            payload,
            duration,
            program_date_time: None,
            is_independent,
            discontinuity: has_discontinuity,
            is_gap: false,
            filename: filename.into(),
            frame_count: 0,
            codecs: Default::default(),
            byte_range: None,
            bitrate: None,
            key: None,
            map_uri: None,
        };
        self.playlist.add_segment(segment.clone());
        self.coordinator.notify_segment(segment_index);
        segment
    }

    fn playlist_next_index(&self) -> u64 {
        self.playlist
            .segments()
            .back()
            .map(|s| s.index + 1)
            .unwrap_or(0)
    }

    pub fn render_playlist(&self) -> String {
        render::generate(&self.snapshot(None))
    }

    /// Returns `None` if delta updates aren't configured or no segments are
    /// skippable; otherwise an `EXT-X-SKIP` playlist.
    pub fn render_delta_playlist(&self, skip_request: SkipRequest) -> Option<String> {
        let can_skip_until = self.server_control.can_skip_until?;
        let segments = self.playlist.segments();
        let total = segments.len();
        if total == 0 {
            return None;
        }

        let mut retained_suffix_len = 0usize;
        let mut accumulated = 0.0_f64;
        for seg in segments.iter().rev() {
            if accumulated >= can_skip_until {
                break;
            }
            accumulated += seg.duration;
            retained_suffix_len += 1;
        }
        let k = total as i64 - retained_suffix_len as i64;
        if k <= 0 {
            return None;
        }
        let k = k as u64;

        // Date ranges that ended before the first retained (post-skip)
        // segment's anchor are the ones "falling within the skipped
        // window". Attribute is only populated for `skip=v2`.
        let recently_removed_dateranges = if matches!(skip_request, SkipRequest::V2) {
            let cutoff = segments
                .get(k as usize)
                .and_then(|s| s.program_date_time);
            match cutoff {
                Some(cutoff) => self
                    .dateranges
                    .iter()
                    .filter(|dr| dr.end_date.map(|end| end <= cutoff).unwrap_or(false))
                    .map(|dr| dr.id.clone())
                    .collect(),
                None => Vec::new(),
            }
        } else {
            Vec::new()
        };

        let skip = SkipInfo {
            skipped_segments: k,
            recently_removed_dateranges,
        };
        Some(render::generate(&self.snapshot(Some(skip))))
    }

    fn snapshot(&self, skip: Option<SkipInfo>) -> PlaylistSnapshot {
        let (completed_partial_groups, in_progress_partials) = self.partials.partials_for_rendering();
        PlaylistSnapshot {
            target_duration: self.playlist.target_duration(),
            media_sequence: self.playlist.media_sequence(),
            discontinuity_sequence: self.playlist.discontinuity_sequence(),
            playlist_type: None,
            segments: self.playlist.segments().iter().cloned().collect(),
            part_target_duration: Some(self.part_target_duration),
            completed_partial_groups,
            in_progress_partials,
            preload_hint: self.partials.current_preload_hint(),
            server_control: Some(self.server_control),
            rendition_reports: self.rendition_reports.clone(),
            skip,
            metadata: Default::default(),
            has_end_list: self.ended,
        }
    }

    pub fn set_rendition_reports(&mut self, reports: Vec<RenditionReport>) {
        self.rendition_reports = reports;
    }

    /// Date ranges tracked for `RECENTLY-REMOVED-DATERANGES` bookkeeping on
    /// `skip=v2` delta updates.
    pub fn set_dateranges(&mut self, dateranges: Vec<DateRange>) {
        self.dateranges = dateranges;
    }

    pub fn server_control(&self) -> &ServerControl {
        &self.server_control
    }

    pub fn end_stream(&mut self) {
        self.ended = true;
        self.playlist.end();
        self.partials.end();
        self.coordinator.notify_stream_ended();
    }

    pub fn pending_request_count(&self) -> usize {
        self.coordinator.pending_request_count()
    }

    /// Render immediately if `req` is already satisfied, else park until it
    /// is, the stream ends, or `timeout` elapses.
    pub async fn await_playlist(&self, req: BlockingRequest, timeout: Duration) -> Result<String> {
        self.coordinator.await_playlist(req, timeout).await?;
        Ok(self.render_playlist())
    }

    pub fn subscribe_playlist_events(&self) -> tokio::sync::broadcast::Receiver<LivePlaylistEvent> {
        self.playlist.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlHlsConfig {
        LlHlsConfig {
            part_target_duration: 0.33334,
            max_segment_count: 10,
            max_retained_partial_segments: 10,
            server_control: ServerControl {
                can_block_reload: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn partials_then_full_segment_render() {
        let mut mgr = LlHlsManager::new(config());
        mgr.add_partial(0.33, None, true, false, None).unwrap();
        mgr.add_partial(0.33, None, false, false, None).unwrap();
        mgr.complete_segment(bytes::Bytes::new(), 2.0, "seg0.m4s", false);

        let rendered = mgr.render_playlist();
        assert!(rendered.contains("#EXT-X-PART-INF:PART-TARGET=0.33334"));
        assert_eq!(rendered.matches("#EXT-X-PART:").count(), 2);
        assert!(rendered.contains("#EXTINF:2.00000,"));
        assert!(rendered.contains("seg0.m4s"));
        assert_eq!(
            rendered.matches("#EXT-X-PRELOAD-HINT:TYPE=PART").count(),
            1
        );
        assert!(rendered.contains("URI=\"seg1.0.mp4\""));
    }

    #[tokio::test]
    async fn blocking_reload_resolves_on_notify() {
        let mut mgr = LlHlsManager::new(config());
        let coordinator = mgr.blocking_coordinator();

        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move {
            waiter
                .await_playlist(
                    BlockingRequest {
                        media_sequence_number: 0,
                        part_index: None,
                        skip_request: None,
                    },
                    Duration::from_secs(5),
                )
                .await
        });

        tokio::task::yield_now().await;
        assert_eq!(coordinator.pending_request_count(), 1);

        mgr.add_partial(0.33, None, true, false, None).unwrap();
        mgr.complete_segment(bytes::Bytes::new(), 0.33, "seg0.m4s", false);

        handle.await.unwrap().unwrap();
        assert!(mgr.render_playlist().contains("#EXTM3U"));
    }

    #[test]
    fn delta_skip_exact_boundary() {
        let mut mgr = LlHlsManager::new(LlHlsConfig {
            server_control: ServerControl {
                can_block_reload: true,
                can_skip_until: Some(6.0),
                ..Default::default()
            },
            ..config()
        });
        for i in 0..10u64 {
            mgr.add_partial(0.33, None, true, false, None).unwrap();
            mgr.complete_segment(bytes::Bytes::new(), 2.0, format!("seg{i}.m4s"), false);
        }
        let delta = mgr.render_delta_playlist(SkipRequest::Yes).unwrap();
        assert!(delta.contains("#EXT-X-SKIP:SKIPPED-SEGMENTS=7"));
        assert!(!delta.contains("RECENTLY-REMOVED-DATERANGES"));
    }
}
