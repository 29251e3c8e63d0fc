//! Blocking-request coordinator (C8): parks LL-HLS client reload requests
//! until the segment/part they asked for has been announced, or a timeout
//! fires.
//!
//! Grounded on the design notes' `HashMap<request id, Waker>` plus
//! `AtomicU64` packed `(msn << 32 | part)` sketch — generalized to key
//! waiters by a monotonic id rather than the request itself, since two
//! distinct clients can legitimately park on the same `(msn, part)`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{CoreError, Result};

/// `_HLS_skip` values recognized on a blocking reload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipRequest {
    Yes,
    V2,
}

/// A parsed `_HLS_msn`/`_HLS_part`/`_HLS_skip` blocking reload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingRequest {
    pub media_sequence_number: u64,
    pub part_index: Option<u32>,
    pub skip_request: Option<SkipRequest>,
}

impl BlockingRequest {
    /// Parse query parameters. Returns `None` (not a blocking request, not
    /// an error) when `_HLS_msn` is absent.
    pub fn parse_query(params: &[(&str, &str)]) -> Option<Self> {
        let media_sequence_number: u64 = params
            .iter()
            .find(|(k, _)| *k == "_HLS_msn")
            .and_then(|(_, v)| v.parse().ok())?;
        let part_index = params
            .iter()
            .find(|(k, _)| *k == "_HLS_part")
            .and_then(|(_, v)| v.parse().ok());
        let skip_request = params
            .iter()
            .find(|(k, _)| *k == "_HLS_skip")
            .and_then(|(_, v)| match *v {
                "YES" => Some(SkipRequest::Yes),
                "v2" => Some(SkipRequest::V2),
                _ => None,
            });
        Some(Self {
            media_sequence_number,
            part_index,
            skip_request,
        })
    }
}

fn pack(segment_index: u64, part_index: u32) -> u64 {
    (segment_index << 32) | part_index as u64
}

/// Parks and wakes LL-HLS blocking reload requests.
pub struct BlockingCoordinator {
    latest_announced: AtomicU64,
    announced: AtomicBool,
    ended: AtomicBool,
    waiters: Mutex<HashMap<u64, Waker>>,
    next_id: AtomicU64,
}

impl BlockingCoordinator {
    pub fn new() -> Self {
        Self {
            latest_announced: AtomicU64::new(0),
            announced: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            waiters: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Announce that `(segment_index, part_index)` is now available and
    /// wake any parked requests that might now be satisfied.
    pub fn notify(&self, segment_index: u64, part_index: u32) {
        self.latest_announced
            .fetch_max(pack(segment_index, part_index), Ordering::AcqRel);
        self.announced.store(true, Ordering::Release);
        self.wake_all();
    }

    /// Announce that a completed segment (with no partials of interest) is
    /// available, equivalent to notifying the highest part index observed.
    pub fn notify_segment(&self, segment_index: u64) {
        self.notify(segment_index, u32::MAX);
    }

    pub fn notify_stream_ended(&self) {
        self.ended.store(true, Ordering::Release);
        self.wake_all();
    }

    fn wake_all(&self) {
        let waiters = self.waiters.lock();
        for waker in waiters.values() {
            waker.wake_by_ref();
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub fn is_request_satisfied(&self, req: &BlockingRequest) -> bool {
        if !self.announced.load(Ordering::Acquire) {
            return false;
        }
        let packed = self.latest_announced.load(Ordering::Acquire);
        let last_msn = packed >> 32;
        let last_part = packed & 0xFFFF_FFFF;
        let want_part = req.part_index.unwrap_or(0) as u64;
        (last_msn, last_part) >= (req.media_sequence_number, want_part)
    }

    pub fn pending_request_count(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Wait until `req` is satisfied, the stream ends, or `timeout` elapses.
    pub async fn await_playlist(&self, req: BlockingRequest, timeout: Duration) -> Result<()> {
        if self.is_ended() {
            return Err(CoreError::StreamAlreadyEnded);
        }
        if self.is_request_satisfied(&req) {
            return Ok(());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout_secs = timeout.as_secs_f64();
        let media_sequence = req.media_sequence_number;
        let part_index = req.part_index;

        let park = Park {
            coordinator: self,
            id,
            req,
        };

        match tokio::time::timeout(timeout, park).await {
            Ok(result) => result,
            Err(_) => {
                self.waiters.lock().remove(&id);
                Err(CoreError::RequestTimeout {
                    media_sequence,
                    part_index,
                    timeout: timeout_secs,
                })
            }
        }
    }
}

impl Default for BlockingCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

struct Park<'a> {
    coordinator: &'a BlockingCoordinator,
    id: u64,
    req: BlockingRequest,
}

impl Future for Park<'_> {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        // Register (or refresh) the waker before re-checking state, so a
        // `notify` that lands between our first check and this poll can't
        // be missed.
        this.coordinator
            .waiters
            .lock()
            .insert(this.id, cx.waker().clone());

        if this.coordinator.is_ended() {
            this.coordinator.waiters.lock().remove(&this.id);
            return Poll::Ready(Err(CoreError::StreamAlreadyEnded));
        }
        if this.coordinator.is_request_satisfied(&this.req) {
            this.coordinator.waiters.lock().remove(&this.id);
            return Poll::Ready(Ok(()));
        }

        Poll::Pending
    }
}

impl Drop for Park<'_> {
    fn drop(&mut self) {
        self.coordinator.waiters.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_without_msn_is_not_blocking() {
        assert!(BlockingRequest::parse_query(&[("_HLS_part", "1")]).is_none());
    }

    #[test]
    fn parse_query_reads_msn_part_and_skip() {
        let req = BlockingRequest::parse_query(&[
            ("_HLS_msn", "4"),
            ("_HLS_part", "2"),
            ("_HLS_skip", "v2"),
        ])
        .unwrap();
        assert_eq!(req.media_sequence_number, 4);
        assert_eq!(req.part_index, Some(2));
        assert_eq!(req.skip_request, Some(SkipRequest::V2));
    }

    #[test]
    fn newer_segment_satisfies_regardless_of_part() {
        let coord = BlockingCoordinator::new();
        coord.notify(5, 0);
        let req = BlockingRequest {
            media_sequence_number: 4,
            part_index: Some(9),
            skip_request: None,
        };
        assert!(coord.is_request_satisfied(&req));
    }

    #[test]
    fn same_segment_requires_part_at_least_as_new() {
        let coord = BlockingCoordinator::new();
        coord.notify(4, 1);
        let satisfied = BlockingRequest {
            media_sequence_number: 4,
            part_index: Some(1),
            skip_request: None,
        };
        let not_yet = BlockingRequest {
            media_sequence_number: 4,
            part_index: Some(2),
            skip_request: None,
        };
        assert!(coord.is_request_satisfied(&satisfied));
        assert!(!coord.is_request_satisfied(&not_yet));
    }

    #[tokio::test]
    async fn await_playlist_resolves_on_notify() {
        let coord = std::sync::Arc::new(BlockingCoordinator::new());
        let waiter = coord.clone();
        let handle = tokio::spawn(async move {
            waiter
                .await_playlist(
                    BlockingRequest {
                        media_sequence_number: 0,
                        part_index: Some(0),
                        skip_request: None,
                    },
                    Duration::from_secs(5),
                )
                .await
        });

        tokio::task::yield_now().await;
        assert_eq!(coord.pending_request_count(), 1);
        coord.notify(0, 0);

        let result = handle.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn await_playlist_times_out() {
        let coord = BlockingCoordinator::new();
        let req = BlockingRequest {
            media_sequence_number: 100,
            part_index: None,
            skip_request: None,
        };
        let err = coord
            .await_playlist(req, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::RequestTimeout { .. }));
    }

    #[tokio::test]
    async fn await_playlist_after_end_fails_immediately() {
        let coord = BlockingCoordinator::new();
        coord.notify_stream_ended();
        let req = BlockingRequest {
            media_sequence_number: 0,
            part_index: None,
            skip_request: None,
        };
        let err = coord
            .await_playlist(req, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::StreamAlreadyEnded));
    }
}
