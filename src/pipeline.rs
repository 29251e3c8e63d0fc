//! Pipeline facade (C9): the supervised state machine a host actually
//! drives. Owns one playlist backend (standard retention or LL-HLS),
//! accounts statistics, and fans runtime operations out to whichever
//! external components a host has registered.
//!
//! Grounded on `RecordingManager` in `manager.rs`: one struct that owns the
//! moving parts (there, per-camera workers and the global writer; here, the
//! playlist backend and registered push/recording/segment-writer
//! components), with `tracing` call sites at the same points `manager.rs`
//! logs camera registration and worker shutdown.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::blocking::BlockingRequest;
use crate::config::PipelineConfig;
use crate::error::{CoreError, Result};
use crate::external::{RecordingStorage, SegmentPusher, SegmentWriter};
use crate::ll_hls::{LlHlsConfig, LlHlsManager};
use crate::model::{LivePlaylistMetadata, LiveSegment, PlaylistType};
use crate::playlist::manager::{DVRPlaylist, EventPlaylist, LivePlaylist, SlidingWindowPlaylist};
use crate::playlist::render::{self, PlaylistSnapshot};

const EVENT_CHANNEL_CAPACITY: usize = 512;

/// A scheduled ad/content break, `EXT-X-DATERANGE`-backed at the wire level
/// but opaque to this facade: it only forwards the identity and timing a
/// host supplies.
#[derive(Debug, Clone)]
pub struct Interstitial {
    pub id: String,
    pub start_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub uri: Option<String>,
}

/// An opaque SCTE-35 cue, forwarded as-is; encoding/decoding the cue itself
/// is outside this crate's scope.
#[derive(Debug, Clone)]
pub struct Scte35Marker {
    pub id: String,
    pub cue: Bytes,
}

/// Why a running pipeline stopped.
#[derive(Debug, Clone)]
pub enum StopReason {
    UserRequested,
    SourceEnded,
    Error(String),
}

/// Returned by `stop()`.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub duration: Duration,
    pub segments_produced: u64,
    pub total_bytes: u64,
    pub start_date: Option<DateTime<Utc>>,
    pub stop_date: DateTime<Utc>,
    pub reason: StopReason,
}

/// Push-model events a host subscribes to instead of polling.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StateChanged(PipelineState),
    SegmentProduced { index: u64, duration: f64, byte_size: u64 },
    PushCompleted { destination: String, segment_index: u64, latency: Duration },
    PushFailed { destination: String, error_message: String },
    MetadataInserted { type_name: String },
    MetadataInjected,
    InterstitialScheduled { id: String },
    Scte35Inserted,
    DiscontinuityInserted,
    RecordingSegmentSaved { filename: String },
    RecordingFinalized,
    SilenceDetected { duration: f64 },
    LoudnessUpdate { lufs: f64 },
    Warning(String),
    ComponentWarning(String),
}

/// Coarse state reported on `StateChanged`; carries only what's cheap to
/// clone into an event, not the full internal backend.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
}

enum Backend {
    Standard(Box<dyn LivePlaylist + Send>),
    LowLatency(LlHlsManager),
}

impl Backend {
    fn add_segment(&mut self, segment: LiveSegment) {
        match self {
            Backend::Standard(pl) => pl.add_segment(segment),
            Backend::LowLatency(mgr) => {
                let _ = mgr.complete_segment(
                    segment.payload,
                    segment.duration,
                    segment.filename,
                    segment.discontinuity,
                );
            }
        }
    }

    fn render(&self) -> String {
        match self {
            Backend::Standard(pl) => pl.render(),
            Backend::LowLatency(mgr) => mgr.render_playlist(),
        }
    }

    fn update_metadata(&mut self, metadata: LivePlaylistMetadata) {
        match self {
            Backend::Standard(pl) => pl.update_metadata(metadata),
            Backend::LowLatency(_) => {}
        }
    }

    fn end(&mut self) {
        match self {
            Backend::Standard(pl) => pl.end(),
            Backend::LowLatency(mgr) => mgr.end_stream(),
        }
    }

}

/// Running statistics snapshot, cheap to clone and forward to a host's
/// status surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStats {
    pub uptime: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub segments_produced: u64,
    pub average_segment_duration: f64,
    pub last_segment_duration: f64,
    pub last_segment_bytes: u64,
    pub total_bytes: u64,
    pub estimated_bitrate: f64,
    pub bytes_sent: u64,
    pub push_errors: u64,
    pub active_destinations: usize,
    pub audio_peak_db: Option<f64>,
    pub loudness_lufs: Option<f64>,
    pub partials_produced: u64,
    pub recording_active: bool,
    pub recorded_segments: u64,
    pub discontinuities: u64,
    pub dropped_segments: u64,
    pub average_bytes_per_segment: f64,
}

/// The supervised pipeline state machine.
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
    backend: Option<Backend>,
    started_at: Option<Instant>,
    start_date: Option<DateTime<Utc>>,
    discontinuity_pending: bool,
    active_destinations: HashSet<String>,
    recorded_segments: Vec<LiveSegment>,
    recording_finalized: bool,

    pusher: Option<Box<dyn SegmentPusher + Send>>,
    recording_storage: Option<Box<dyn RecordingStorage + Send>>,
    segment_writer: Option<Box<dyn SegmentWriter + Send>>,

    events: broadcast::Sender<PipelineEvent>,

    segments_produced: u64,
    total_bytes: u64,
    total_duration: f64,
    last_segment_duration: f64,
    last_segment_bytes: u64,
    bytes_sent: u64,
    push_errors: u64,
    partials_produced: u64,
    discontinuities: u64,
    dropped_segments: u64,
    audio_peak_db: Option<f64>,
    loudness_lufs: Option<f64>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            state: PipelineState::Idle,
            backend: None,
            started_at: None,
            start_date: None,
            discontinuity_pending: false,
            active_destinations: HashSet::new(),
            recorded_segments: Vec::new(),
            recording_finalized: false,
            pusher: None,
            recording_storage: None,
            segment_writer: None,
            events,
            segments_produced: 0,
            total_bytes: 0,
            total_duration: 0.0,
            last_segment_duration: 0.0,
            last_segment_bytes: 0,
            bytes_sent: 0,
            push_errors: 0,
            partials_produced: 0,
            discontinuities: 0,
            dropped_segments: 0,
            audio_peak_db: None,
            loudness_lufs: None,
        }
    }

    pub fn set_pusher(&mut self, pusher: Box<dyn SegmentPusher + Send>) {
        self.pusher = Some(pusher);
    }

    pub fn set_recording_storage(&mut self, storage: Box<dyn RecordingStorage + Send>) {
        self.recording_storage = Some(storage);
    }

    pub fn set_segment_writer(&mut self, writer: Box<dyn SegmentWriter + Send>) {
        self.segment_writer = Some(writer);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.events.send(event);
    }

    fn set_state(&mut self, state: PipelineState) {
        self.state = state.clone();
        self.emit(PipelineEvent::StateChanged(state));
    }

    /// Validate configuration, build the playlist backend, and transition
    /// `idle → starting → running`. Fails with `AlreadyRunning` if called
    /// while non-idle, `InvalidConfiguration` if the config doesn't
    /// validate; state remains `idle` in both failure cases.
    pub fn start(&mut self) -> Result<()> {
        if self.state != PipelineState::Idle {
            return Err(CoreError::AlreadyRunning);
        }
        self.config.validate()?;

        self.set_state(PipelineState::Starting);

        self.backend = Some(self.build_backend());
        self.started_at = Some(Instant::now());
        self.start_date = Some(Utc::now());
        self.segments_produced = 0;
        self.total_bytes = 0;
        self.total_duration = 0.0;
        self.recorded_segments.clear();
        self.recording_finalized = false;

        self.emit_compatibility_warnings();

        info!(
            segment_duration = self.config.segmentation.segment_duration,
            low_latency = self.config.low_latency.is_some(),
            "pipeline started"
        );
        self.set_state(PipelineState::Running);
        Ok(())
    }

    fn build_backend(&self) -> Backend {
        if let Some(ll) = &self.config.low_latency {
            let window_size = match &self.config.playlist.playlist_type {
                crate::config::PlaylistTypeConfig::SlidingWindow { window_size } => *window_size,
                crate::config::PlaylistTypeConfig::Event => 6,
            };
            Backend::LowLatency(LlHlsManager::new(LlHlsConfig {
                part_target_duration: ll.part_target_duration,
                max_segment_count: window_size,
                max_retained_partial_segments: window_size * 4,
                server_control: crate::model::ServerControl {
                    can_block_reload: ll.enable_blocking_reload,
                    can_skip_until: ll.enable_delta_updates.then_some(
                        2.0 * self.config.segmentation.segment_duration,
                    ),
                    ..Default::default()
                },
            }))
        } else {
            match &self.config.playlist.playlist_type {
                crate::config::PlaylistTypeConfig::SlidingWindow { window_size } => {
                    if self.config.playlist.enable_dvr {
                        Backend::Standard(Box::new(DVRPlaylist::new(
                            self.config.playlist.dvr_window_duration,
                        )))
                    } else {
                        Backend::Standard(Box::new(SlidingWindowPlaylist::new(*window_size)))
                    }
                }
                crate::config::PlaylistTypeConfig::Event => {
                    Backend::Standard(Box::new(EventPlaylist::new()))
                }
            }
        }
    }

    fn emit_compatibility_warnings(&self) {
        if self.config.recording.enable_recording && self.recording_storage.is_none() {
            self.emit(PipelineEvent::ComponentWarning(
                "recording enabled but no recording storage component registered".into(),
            ));
        }
        if !self.config.destinations.is_empty() && self.pusher.is_none() {
            self.emit(PipelineEvent::ComponentWarning(
                "push destinations configured but no pusher component registered".into(),
            ));
        }
        if self.config.low_latency.is_some() && self.segment_writer.is_none() {
            self.emit(PipelineEvent::ComponentWarning(
                "low-latency configured but no segment writer component registered".into(),
            ));
        }
    }

    fn is_running(&self) -> bool {
        self.state == PipelineState::Running
    }

    /// Produce a `PipelineSummary`, transition through `stopping` to
    /// `stopped`, then reset to `idle` for reuse. Fails with `NotRunning`
    /// unless currently running.
    pub fn stop(&mut self, reason: StopReason) -> Result<PipelineSummary> {
        if !self.is_running() {
            return Err(CoreError::NotRunning);
        }
        self.set_state(PipelineState::Stopping);

        if let Some(Backend::LowLatency(mgr)) = &mut self.backend {
            mgr.end_stream();
        } else if let Some(Backend::Standard(pl)) = &mut self.backend {
            pl.end();
        }

        let duration = self
            .started_at
            .map(|s| s.elapsed())
            .unwrap_or_default();
        let summary = PipelineSummary {
            duration,
            segments_produced: self.segments_produced,
            total_bytes: self.total_bytes,
            start_date: self.start_date,
            stop_date: Utc::now(),
            reason,
        };

        info!(
            segments_produced = summary.segments_produced,
            total_bytes = summary.total_bytes,
            "pipeline stopped"
        );
        self.set_state(PipelineState::Stopped);
        self.backend = None;
        self.set_state(PipelineState::Idle);
        Ok(summary)
    }

    /// Account statistics and emit `SegmentProduced`; forwards to the
    /// playlist backend and any registered pusher. No-op unless running.
    pub fn process_segment(&mut self, data: Bytes, duration: f64, filename: impl Into<String>) {
        if !self.is_running() {
            return;
        }
        let filename = filename.into();
        let byte_size = data.len() as u64;
        let index = self.segments_produced;
        let discontinuity = std::mem::take(&mut self.discontinuity_pending);

        let segment = LiveSegment {
            index,
            payload: data.clone(),
            duration,
            program_date_time: self
                .config
                .metadata
                .enable_program_date_time
                .then(Utc::now),
            is_independent: true,
            discontinuity,
            is_gap: false,
            filename: filename.clone(),
            frame_count: 0,
            codecs: Default::default(),
            byte_range: None,
            bitrate: None,
            key: None,
            map_uri: None,
        };

        if discontinuity {
            self.discontinuities += 1;
        }

        if let Some(backend) = &mut self.backend {
            backend.add_segment(segment.clone());
        }

        self.segments_produced += 1;
        self.total_bytes += byte_size;
        self.total_duration += duration;
        self.last_segment_duration = duration;
        self.last_segment_bytes = byte_size;

        if self.config.recording.enable_recording {
            self.recorded_segments.push(segment);
            if let Some(storage) = &mut self.recording_storage {
                let directory = self
                    .config
                    .recording
                    .recording_directory
                    .clone()
                    .unwrap_or_default();
                match storage.write_segment(&data, &filename, &directory) {
                    Ok(()) => self.emit(PipelineEvent::RecordingSegmentSaved { filename: filename.clone() }),
                    Err(e) => warn!(error = %e, "recording write failed"),
                }
            }
        }

        self.push_to_destinations(&data, &filename, index);

        self.emit(PipelineEvent::SegmentProduced {
            index,
            duration,
            byte_size,
        });
    }

    fn push_to_destinations(&mut self, data: &Bytes, filename: &str, index: u64) {
        if self.active_destinations.is_empty() {
            return;
        }
        let Some(pusher) = &mut self.pusher else { return };
        let destinations: Vec<String> = self.active_destinations.iter().cloned().collect();
        for destination in destinations {
            let started = Instant::now();
            match pusher.push(data, filename) {
                Ok(()) => {
                    self.bytes_sent += data.len() as u64;
                    self.emit(PipelineEvent::PushCompleted {
                        destination,
                        segment_index: index,
                        latency: started.elapsed(),
                    });
                }
                Err(e) => {
                    self.push_errors += 1;
                    self.emit(PipelineEvent::PushFailed {
                        destination,
                        error_message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Flag the next emitted segment as a discontinuity. No-op unless
    /// running.
    pub fn insert_discontinuity(&mut self) {
        if !self.is_running() {
            return;
        }
        self.discontinuity_pending = true;
        self.emit(PipelineEvent::DiscontinuityInserted);
    }

    /// Idempotent. No-op unless running.
    pub fn add_destination(&mut self, id: impl Into<String>) {
        if !self.is_running() {
            return;
        }
        self.active_destinations.insert(id.into());
    }

    /// Idempotent. No-op unless running.
    pub fn remove_destination(&mut self, id: &str) {
        if !self.is_running() {
            return;
        }
        self.active_destinations.remove(id);
    }

    pub fn inject_metadata(&mut self, metadata: LivePlaylistMetadata) {
        if !self.is_running() {
            return;
        }
        if let Some(Backend::Standard(pl)) = &mut self.backend {
            pl.update_metadata(metadata);
        }
        self.emit(PipelineEvent::MetadataInjected);
    }

    pub fn insert_interstitial(&mut self, interstitial: Interstitial) {
        if !self.is_running() {
            return;
        }
        self.emit(PipelineEvent::InterstitialScheduled { id: interstitial.id });
    }

    pub fn insert_scte35(&mut self, marker: Scte35Marker) {
        if !self.is_running() {
            return;
        }
        let _ = marker.cue;
        self.emit(PipelineEvent::Scte35Inserted);
    }

    /// `None` unless running.
    pub fn render_playlist(&self) -> Option<String> {
        if !self.is_running() {
            return None;
        }
        self.backend.as_ref().map(Backend::render)
    }

    /// `None` unless running and on a low-latency backend with delta
    /// updates available.
    pub fn render_delta_playlist(&self, skip: crate::blocking::SkipRequest) -> Option<String> {
        if !self.is_running() {
            return None;
        }
        match &self.backend {
            Some(Backend::LowLatency(mgr)) => mgr.render_delta_playlist(skip),
            _ => None,
        }
    }

    /// Parks on the LL-HLS blocking coordinator. Fails with `NotRunning` if
    /// not on a low-latency backend, or whatever `await_playlist` itself
    /// surfaces (`RequestTimeout`, `StreamAlreadyEnded`).
    pub async fn await_blocking_playlist(
        &self,
        req: BlockingRequest,
        timeout: Duration,
    ) -> Result<String> {
        match &self.backend {
            Some(Backend::LowLatency(mgr)) if self.is_running() => {
                mgr.await_playlist(req, timeout).await
            }
            _ => Err(CoreError::NotRunning),
        }
    }

    /// Render the accumulated recorded segments as a VOD playlist. Fails
    /// with `AlreadyFinalized` if already called once for this run.
    pub fn finalize_recording(&mut self) -> Result<String> {
        if self.recording_finalized {
            return Err(CoreError::AlreadyFinalized);
        }
        let target_duration = self
            .recorded_segments
            .iter()
            .map(|s| s.duration)
            .fold(0.0_f64, f64::max)
            .ceil() as u64;

        let snapshot = PlaylistSnapshot {
            target_duration,
            media_sequence: 0,
            discontinuity_sequence: 0,
            playlist_type: Some(PlaylistType::Vod),
            segments: self.recorded_segments.clone(),
            part_target_duration: None,
            completed_partial_groups: Vec::new(),
            in_progress_partials: None,
            preload_hint: None,
            server_control: None,
            rendition_reports: Vec::new(),
            skip: None,
            metadata: Default::default(),
            has_end_list: true,
        };
        let playlist = render::generate(&snapshot);
        self.recording_finalized = true;

        if let Some(storage) = &mut self.recording_storage {
            let directory = self
                .config
                .recording
                .recording_directory
                .clone()
                .unwrap_or_default();
            let _ = storage.write_playlist(&playlist, "index.m3u8", &directory);
        }
        self.emit(PipelineEvent::RecordingFinalized);
        Ok(playlist)
    }

    pub fn stats(&self) -> PipelineStats {
        let uptime = self.started_at.map(|s| s.elapsed().as_secs_f64()).unwrap_or(0.0);
        let average_segment_duration = if self.segments_produced == 0 {
            0.0
        } else {
            self.total_duration / self.segments_produced as f64
        };
        let average_bytes_per_segment = if self.segments_produced == 0 {
            0.0
        } else {
            self.total_bytes as f64 / self.segments_produced as f64
        };
        let estimated_bitrate = if uptime > 0.0 {
            8.0 * self.total_bytes as f64 / uptime
        } else {
            0.0
        };

        PipelineStats {
            uptime,
            start_date: self.start_date,
            segments_produced: self.segments_produced,
            average_segment_duration,
            last_segment_duration: self.last_segment_duration,
            last_segment_bytes: self.last_segment_bytes,
            total_bytes: self.total_bytes,
            estimated_bitrate,
            bytes_sent: self.bytes_sent,
            push_errors: self.push_errors,
            active_destinations: self.active_destinations.len(),
            audio_peak_db: self.audio_peak_db,
            loudness_lufs: self.loudness_lufs,
            partials_produced: self.partials_produced,
            recording_active: self.config.recording.enable_recording && self.is_running(),
            recorded_segments: self.recorded_segments.len() as u64,
            discontinuities: self.discontinuities,
            dropped_segments: self.dropped_segments,
            average_bytes_per_segment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AudioConfig, ContainerFormat, PlaylistConfig, PlaylistTypeConfig, SegmentationConfig};

    fn config() -> PipelineConfig {
        PipelineConfig {
            audio: AudioConfig {
                bitrate: 128_000,
                sample_rate: 48_000,
                channels: 2,
            },
            video: Default::default(),
            segmentation: SegmentationConfig {
                segment_duration: 2.0,
                container_format: ContainerFormat::Fmp4,
            },
            playlist: PlaylistConfig {
                playlist_type: PlaylistTypeConfig::SlidingWindow { window_size: 3 },
                enable_dvr: false,
                dvr_window_duration: 0.0,
            },
            low_latency: None,
            destinations: Vec::new(),
            recording: Default::default(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn start_stop_lifecycle_produces_summary() {
        let mut pipeline = Pipeline::new(config());
        pipeline.start().unwrap();
        assert_eq!(pipeline.state(), &PipelineState::Running);

        pipeline.process_segment(Bytes::from_static(b"a"), 2.0, "seg0.mp4");
        pipeline.process_segment(Bytes::from_static(b"bb"), 2.0, "seg1.mp4");

        let summary = pipeline.stop(StopReason::UserRequested).unwrap();
        assert_eq!(summary.segments_produced, 2);
        assert_eq!(summary.total_bytes, 3);
        assert_eq!(pipeline.state(), &PipelineState::Idle);
    }

    #[test]
    fn start_twice_fails_already_running() {
        let mut pipeline = Pipeline::new(config());
        pipeline.start().unwrap();
        assert!(matches!(pipeline.start(), Err(CoreError::AlreadyRunning)));
    }

    #[test]
    fn stop_without_start_fails_not_running() {
        let mut pipeline = Pipeline::new(config());
        assert!(matches!(
            pipeline.stop(StopReason::UserRequested),
            Err(CoreError::NotRunning)
        ));
    }

    #[test]
    fn invalid_configuration_keeps_state_idle() {
        let mut bad = config();
        bad.segmentation.segment_duration = 0.0;
        let mut pipeline = Pipeline::new(bad);
        assert!(matches!(pipeline.start(), Err(CoreError::InvalidConfiguration(_))));
        assert_eq!(pipeline.state(), &PipelineState::Idle);
    }

    #[test]
    fn process_segment_is_a_no_op_when_not_running() {
        let mut pipeline = Pipeline::new(config());
        pipeline.process_segment(Bytes::from_static(b"x"), 1.0, "seg0.mp4");
        assert_eq!(pipeline.stats().segments_produced, 0);
    }

    #[test]
    fn recording_without_storage_warns_but_does_not_fail_start() {
        let mut cfg = config();
        cfg.recording.enable_recording = true;
        cfg.recording.recording_directory = Some("/tmp/rec".into());
        let mut pipeline = Pipeline::new(cfg);
        let mut events = pipeline.subscribe();
        pipeline.start().unwrap();

        let mut saw_warning = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, PipelineEvent::ComponentWarning(_)) {
                saw_warning = true;
            }
        }
        assert!(saw_warning);
    }

    #[test]
    fn finalize_recording_twice_fails() {
        let mut cfg = config();
        cfg.recording.enable_recording = true;
        cfg.recording.recording_directory = Some("/tmp/rec".into());
        let mut pipeline = Pipeline::new(cfg);
        pipeline.start().unwrap();
        pipeline.process_segment(Bytes::from_static(b"a"), 2.0, "seg0.mp4");

        let playlist = pipeline.finalize_recording().unwrap();
        assert!(playlist.contains("#EXT-X-PLAYLIST-TYPE:VOD"));
        assert!(matches!(
            pipeline.finalize_recording(),
            Err(CoreError::AlreadyFinalized)
        ));
    }

    #[test]
    fn stats_are_serializable_for_a_host_status_endpoint() {
        let mut pipeline = Pipeline::new(config());
        pipeline.start().unwrap();
        pipeline.process_segment(Bytes::from_static(b"abcd"), 2.0, "seg0.mp4");

        let json = serde_json::to_string(&pipeline.stats()).unwrap();
        assert!(json.contains("\"segments_produced\":1"));
        assert!(json.contains("\"total_bytes\":4"));
    }

    #[test]
    fn low_latency_backend_renders_partinf() {
        let mut cfg = config();
        cfg.low_latency = Some(crate::config::LowLatencyConfig {
            part_target_duration: 0.5,
            enable_preload_hints: true,
            enable_delta_updates: true,
            enable_blocking_reload: true,
        });
        let mut pipeline = Pipeline::new(cfg);
        pipeline.start().unwrap();
        pipeline.process_segment(Bytes::from_static(b"a"), 2.0, "seg0.mp4");
        let rendered = pipeline.render_playlist().unwrap();
        assert!(rendered.contains("#EXT-X-PART-INF"));
    }
}
