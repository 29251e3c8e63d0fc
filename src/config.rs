//! Pipeline configuration: nested `serde`-backed structs with
//! defaults in the style of `StorageConfig`/`CameraConfig`,
//! plus a `validate()` that reports the first offending field.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Top-level pipeline configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    pub audio: AudioConfig,
    #[serde(default)]
    pub video: VideoConfig,
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub low_latency: Option<LowLatencyConfig>,
    #[serde(default)]
    pub destinations: Vec<Destination>,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AudioConfig {
    pub bitrate: u32,
    pub sample_rate: u32,
    pub channels: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VideoConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub frame_rate: f64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bitrate: 0,
            width: 0,
            height: 0,
            frame_rate: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Fmp4,
    Mpegts,
    Cmaf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SegmentationConfig {
    pub segment_duration: f64,
    #[serde(default = "default_container_format")]
    pub container_format: ContainerFormat,
}

fn default_container_format() -> ContainerFormat {
    ContainerFormat::Fmp4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type")]
pub enum PlaylistTypeConfig {
    SlidingWindow { window_size: usize },
    Event,
}

impl Default for PlaylistTypeConfig {
    fn default() -> Self {
        Self::SlidingWindow { window_size: 6 }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlaylistConfig {
    #[serde(default)]
    pub playlist_type: PlaylistTypeConfig,
    #[serde(default)]
    pub enable_dvr: bool,
    #[serde(default)]
    pub dvr_window_duration: f64,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            playlist_type: PlaylistTypeConfig::default(),
            enable_dvr: false,
            dvr_window_duration: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LowLatencyConfig {
    pub part_target_duration: f64,
    #[serde(default = "default_true")]
    pub enable_preload_hints: bool,
    #[serde(default = "default_true")]
    pub enable_delta_updates: bool,
    #[serde(default = "default_true")]
    pub enable_blocking_reload: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind")]
pub enum Destination {
    Http {
        url: String,
        #[serde(default)]
        headers: Vec<(String, String)>,
    },
    Local {
        directory: String,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    #[serde(default)]
    pub enable_recording: bool,
    #[serde(default)]
    pub recording_directory: Option<String>,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enable_recording: false,
            recording_directory: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetadataConfig {
    #[serde(default)]
    pub enable_program_date_time: bool,
    #[serde(default)]
    pub program_date_time_interval: f64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enable_program_date_time: false,
            program_date_time_interval: 0.0,
        }
    }
}

impl PipelineConfig {
    /// Parse from a TOML document (convenience for hosts that persist
    /// configuration, mirroring `Config::from_file`).
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)
            .map_err(|e| CoreError::InvalidConfiguration(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CoreError::InvalidConfiguration(format!("cannot serialize TOML: {e}")))
    }

    /// Validate and return the first offending field's explanation.
    pub fn validate(&self) -> Result<()> {
        if self.audio.bitrate == 0 {
            return Err(invalid("audioBitrate must be greater than 0"));
        }
        if self.audio.sample_rate == 0 {
            return Err(invalid("audioSampleRate must be greater than 0"));
        }
        if self.audio.channels == 0 {
            return Err(invalid("audioChannels must be at least 1"));
        }

        if self.video.enabled {
            if self.video.bitrate == 0 {
                return Err(invalid("videoBitrate must be greater than 0"));
            }
            if self.video.width == 0 {
                return Err(invalid("videoWidth must be greater than 0"));
            }
            if self.video.height == 0 {
                return Err(invalid("videoHeight must be greater than 0"));
            }
            if self.video.frame_rate <= 0.0 {
                return Err(invalid("videoFrameRate must be greater than 0"));
            }
        }

        if self.segmentation.segment_duration <= 0.0 {
            return Err(invalid("segmentDuration must be greater than 0"));
        }

        if self.playlist.enable_dvr {
            if !matches!(self.playlist.playlist_type, PlaylistTypeConfig::SlidingWindow { .. }) {
                return Err(invalid("enableDvr requires a SlidingWindow playlist type"));
            }
            if self.playlist.dvr_window_duration <= 0.0 {
                return Err(invalid("dvrWindowDuration must be greater than 0"));
            }
        }

        if let Some(ll) = &self.low_latency {
            if ll.part_target_duration <= 0.0 {
                return Err(invalid("partTargetDuration must be greater than 0"));
            }
            if ll.part_target_duration >= self.segmentation.segment_duration {
                return Err(invalid("partTargetDuration must be less than segmentDuration"));
            }
        }

        for destination in &self.destinations {
            match destination {
                Destination::Http { url, .. } if url.is_empty() => {
                    return Err(invalid("destination url must not be empty"));
                }
                Destination::Local { directory } if directory.is_empty() => {
                    return Err(invalid("destination directory must not be empty"));
                }
                _ => {}
            }
        }

        if self.recording.enable_recording && self.recording.recording_directory.is_none() {
            return Err(invalid("recordingDirectory is required when recording is enabled"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> CoreError {
    CoreError::InvalidConfiguration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> PipelineConfig {
        PipelineConfig {
            audio: AudioConfig {
                bitrate: 128_000,
                sample_rate: 48_000,
                channels: 2,
            },
            video: VideoConfig::default(),
            segmentation: SegmentationConfig {
                segment_duration: 6.0,
                container_format: ContainerFormat::Fmp4,
            },
            playlist: PlaylistConfig::default(),
            low_latency: None,
            destinations: Vec::new(),
            recording: RecordingConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn zero_segment_duration_rejected() {
        let mut config = base_config();
        config.segmentation.segment_duration = 0.0;
        let err = config.validate().unwrap_err();
        match err {
            CoreError::InvalidConfiguration(msg) => {
                assert_eq!(msg, "segmentDuration must be greater than 0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn low_latency_part_duration_must_be_smaller_than_segment() {
        let mut config = base_config();
        config.low_latency = Some(LowLatencyConfig {
            part_target_duration: 10.0,
            enable_preload_hints: true,
            enable_delta_updates: true,
            enable_blocking_reload: true,
        });
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }

    #[test]
    fn recording_enabled_without_directory_rejected() {
        let mut config = base_config();
        config.recording.enable_recording = true;
        let err = config.validate().unwrap_err();
        match err {
            CoreError::InvalidConfiguration(msg) => {
                assert_eq!(msg, "recordingDirectory is required when recording is enabled");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn toml_round_trip() {
        let config = base_config();
        let toml = config.to_toml_string().unwrap();
        let parsed = PipelineConfig::from_toml_str(&toml).unwrap();
        assert_eq!(parsed.audio.bitrate, config.audio.bitrate);
    }

    #[test]
    fn empty_destination_url_rejected() {
        let mut config = base_config();
        config.destinations.push(Destination::Http {
            url: String::new(),
            headers: Vec::new(),
        });
        let err = config.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }
}
