//! Partial-segment manager (C4): an append-only log of partial segments
//! grouped per segment, with retention eviction and preload-hint derivation.
//!
//! Mirrors `storage/index.rs`'s single-owner-over-a-log style (`SegmentIndex`'s
//! `BTreeMap` plus monotonic counter) but scoped to one stream's partials
//! instead of a cross-camera index.

use std::collections::VecDeque;

use crate::error::{CoreError, Result};
use crate::model::{ByteRange, PartialId, PartialSegment, PreloadHint};
use crate::playlist::render::PartialGroup;

/// Template for deriving a partial's URI when the caller doesn't supply one.
/// Recognizes `{segment}`, `{part}`, and `{ext}` placeholders.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    pattern: String,
}

impl UriTemplate {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    pub fn render(&self, segment_index: u64, partial_index: u32) -> String {
        self.pattern
            .replace("{segment}", &segment_index.to_string())
            .replace("{part}", &partial_index.to_string())
            .replace("{ext}", "mp4")
    }
}

impl Default for UriTemplate {
    fn default() -> Self {
        Self::new("seg{segment}.{part}.{ext}")
    }
}

/// One completed segment's retained partials.
#[derive(Debug, Clone, Default)]
struct CompletedGroup {
    segment_index: u64,
    partials: Vec<PartialSegment>,
}

/// Owns the partial-segment log for one stream.
pub struct PartialSegmentManager {
    part_target: f64,
    max_retained_segments: usize,
    uri_template: UriTemplate,
    completed: VecDeque<CompletedGroup>,
    active_segment_index: u64,
    current_partials: Vec<PartialSegment>,
    ended: bool,
}

impl PartialSegmentManager {
    pub fn new(part_target: f64, max_retained_segments: usize) -> Self {
        Self {
            part_target,
            max_retained_segments,
            uri_template: UriTemplate::default(),
            completed: VecDeque::new(),
            active_segment_index: 0,
            current_partials: Vec::new(),
            ended: false,
        }
    }

    pub fn with_uri_template(mut self, template: UriTemplate) -> Self {
        self.uri_template = template;
        self
    }

    /// Append a partial to the segment currently in progress.
    pub fn add_partial(
        &mut self,
        duration: f64,
        uri: Option<String>,
        is_independent: bool,
        is_gap: bool,
        byte_range: Option<ByteRange>,
    ) -> Result<PartialSegment> {
        if self.ended {
            return Err(CoreError::StreamAlreadyEnded);
        }
        if self.current_partials.is_empty() && !is_independent {
            return Err(CoreError::FirstPartialMustBeIndependent);
        }
        if duration > self.part_target * 1.01 {
            return Err(CoreError::PartialDurationExceedsTarget {
                actual: duration,
                target: self.part_target,
            });
        }

        let partial_index = self.current_partials.len() as u32;
        let id = PartialId {
            segment_index: self.active_segment_index,
            partial_index,
        };
        let uri = uri.unwrap_or_else(|| {
            self.uri_template
                .render(self.active_segment_index, partial_index)
        });

        let partial = PartialSegment {
            id,
            duration,
            uri,
            is_independent,
            is_gap,
            byte_range,
        };
        self.current_partials.push(partial.clone());
        Ok(partial)
    }

    /// Freeze the current group, advance to the next segment, and evict.
    /// Returns the partials that belonged to the segment just completed
    /// (may be empty if no partials were ever added to it).
    pub fn complete_segment(&mut self) -> Vec<PartialSegment> {
        let finished = std::mem::take(&mut self.current_partials);
        self.completed.push_back(CompletedGroup {
            segment_index: self.active_segment_index,
            partials: finished.clone(),
        });
        self.active_segment_index += 1;
        self.evict();
        finished
    }

    fn evict(&mut self) {
        while self.completed.len() > self.max_retained_segments {
            self.completed.pop_front();
        }
    }

    /// Retained completed groups plus the in-progress group, in rendering
    /// order.
    pub fn partials_for_rendering(&self) -> (Vec<PartialGroup>, Option<PartialGroup>) {
        let completed = self
            .completed
            .iter()
            .map(|g| PartialGroup {
                segment_index: g.segment_index,
                partials: g.partials.clone(),
            })
            .collect();
        let in_progress = if self.current_partials.is_empty() {
            None
        } else {
            Some(PartialGroup {
                segment_index: self.active_segment_index,
                partials: self.current_partials.clone(),
            })
        };
        (completed, in_progress)
    }

    /// The URI the *next* `add_partial` call would assign, as a preload
    /// hint. `None` once the stream has ended.
    pub fn current_preload_hint(&self) -> Option<PreloadHint> {
        if self.ended {
            return None;
        }
        let next_partial_index = self.current_partials.len() as u32;
        let uri = self
            .uri_template
            .render(self.active_segment_index, next_partial_index);
        Some(PreloadHint {
            uri,
            byte_range: None,
        })
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn active_segment_index(&self) -> u64 {
        self.active_segment_index
    }
}
