//! Per-peer liveness bookkeeping: last heartbeat, pending heartbeats and round-trip samples.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// A peer silent for this long is considered gone.
pub const TIMEOUT_INTERVAL: Duration = Duration::from_millis(2500);
/// Period of the heartbeat scheduler.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);
/// Number of recent round-trip samples averaged by [LivenessRecord::mean_rtt].
pub const RTT_AVERAGE_NUM: usize = 10;

#[derive(Debug, Clone)]
pub struct LivenessRecord {
    last_heartbeat: Instant,
    /// Heartbeat sequence number -> send instant, for heartbeats not yet answered.
    heartbeat_send_times: BTreeMap<u64, Instant>,
    /// Most recent samples at the back, at most `window` of them.
    rtts: VecDeque<Duration>,
    window: usize,
}

/// Copy of a [LivenessRecord] handed out to callers outside the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct LivenessSnapshot {
    pub last_heartbeat: Instant,
    pub pending: usize,
    pub samples: usize,
    pub mean_rtt: Option<Duration>,
}

impl LivenessRecord {
    pub fn new(now: Instant, window: usize) -> Self {
        LivenessRecord {
            last_heartbeat: now,
            heartbeat_send_times: BTreeMap::new(),
            rtts: VecDeque::with_capacity(window),
            window: window.max(1),
        }
    }

    pub fn last_heartbeat(&self) -> Instant {
        self.last_heartbeat
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_heartbeat = now;
    }

    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_heartbeat) >= timeout
    }

    /// Records that heartbeat `seq` left at `now`.
    pub fn record_send(&mut self, seq: u64, now: Instant) {
        let _ = self.heartbeat_send_times.insert(seq, now);
    }

    /// Processes the reply to heartbeat `seq`, returning the measured round trip.
    ///
    /// Replies arrive in send order on a connection, so heartbeats older than `seq` that are
    /// still pending will never be answered and are dropped. A reply for an unknown sequence
    /// number refreshes the last-seen time but yields no sample.
    pub fn record_reply(&mut self, seq: u64, now: Instant) -> Option<Duration> {
        self.touch(now);
        let sent = self.heartbeat_send_times.remove(&seq)?;
        self.heartbeat_send_times = self.heartbeat_send_times.split_off(&seq);
        let rtt = now.saturating_duration_since(sent);
        self.push_sample(rtt);
        Some(rtt)
    }

    pub fn push_sample(&mut self, rtt: Duration) {
        if self.rtts.len() == self.window {
            let _ = self.rtts.pop_front();
        }
        self.rtts.push_back(rtt);
    }

    /// Mean of the most recent samples, or `None` when nothing was measured yet.
    pub fn mean_rtt(&self) -> Option<Duration> {
        let count = self.rtts.len().min(self.window);
        if count == 0 {
            return None;
        }
        let sum: Duration = self.rtts.iter().rev().take(count).sum();
        Some(sum / count as u32)
    }

    pub fn samples(&self) -> usize {
        self.rtts.len()
    }

    pub fn pending(&self) -> usize {
        self.heartbeat_send_times.len()
    }

    pub fn snapshot(&self) -> LivenessSnapshot {
        LivenessSnapshot {
            last_heartbeat: self.last_heartbeat,
            pending: self.pending(),
            samples: self.samples(),
            mean_rtt: self.mean_rtt(),
        }
    }
}
