//! Bounded scan log with an auto-follow heuristic.
//!
//! The buffer keeps the most recent N entries in arrival order. Whether a
//! new entry should scroll into view is decided by where the user left the
//! viewport, never by the append itself: someone reading history is never
//! yanked back to the bottom.

use std::collections::VecDeque;

use crate::models::LogEntry;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_FOLLOW_THRESHOLD_PX: f64 = 50.0;

/// Viewport measurements reported by the embedding UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub viewport_height: f64,
}

/// True when the view sits within `threshold_px` of the bottom. Content
/// that does not overflow the viewport yields a negative distance and so
/// always counts as "at the bottom".
pub fn at_bottom(metrics: ScrollMetrics, threshold_px: f64) -> bool {
    metrics.scroll_height - metrics.scroll_top - metrics.viewport_height < threshold_px
}

#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    threshold_px: f64,
    following: bool,
    scroll_requested: bool,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_FOLLOW_THRESHOLD_PX)
    }
}

impl LogBuffer {
    pub fn new(capacity: usize, threshold_px: f64) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
            threshold_px,
            // Never auto-scroll on initial load, even if a resync delivers
            // a large backlog in one event.
            following: false,
            scroll_requested: false,
        }
    }

    /// Append one entry, evicting from the front once over capacity. When
    /// the user is following the tail, a scroll-to-bottom is scheduled for
    /// the UI to drain via [`take_scroll_request`](Self::take_scroll_request).
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        if self.following {
            self.scroll_requested = true;
        }
    }

    /// Swap the entire buffer during a snapshot resync. Deliberately does
    /// not schedule a scroll and does not touch the follow flag; a scroll
    /// still pending from an earlier append is discarded with the entries
    /// it was scheduled for.
    pub fn replace_all(&mut self, entries: Vec<LogEntry>) {
        self.entries = entries.into();
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.scroll_requested = false;
    }

    /// Recalculate the follow flag from a user-initiated scroll.
    pub fn on_user_scroll(&mut self, metrics: ScrollMetrics) {
        self.following = at_bottom(metrics, self.threshold_px);
    }

    /// Run the same recalculation once after first layout, so a log that
    /// does not overflow the viewport starts out following.
    pub fn on_first_layout(&mut self, metrics: ScrollMetrics) {
        self.following = at_bottom(metrics, self.threshold_px);
    }

    /// Drain the pending scroll-to-bottom request, if any.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
    }

    fn metrics(scroll_height: f64, scroll_top: f64, viewport_height: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_height,
            scroll_top,
            viewport_height,
        }
    }

    #[test]
    fn buffer_is_bounded_fifo() {
        let mut buf = LogBuffer::default();
        for i in 0..=DEFAULT_CAPACITY {
            buf.append(entry(&format!("line {i}")));
        }
        assert_eq!(buf.len(), DEFAULT_CAPACITY);
        assert_eq!(buf.entries().next().unwrap().message, "line 1");
        assert_eq!(
            buf.entries().last().unwrap().message,
            format!("line {DEFAULT_CAPACITY}")
        );
    }

    #[test]
    fn appends_never_scroll_unless_following() {
        let mut buf = LogBuffer::default();
        buf.append(entry("one"));
        buf.append(entry("two"));
        assert!(!buf.take_scroll_request());

        // User scrolls to the bottom: appends now schedule a scroll.
        buf.on_user_scroll(metrics(1000.0, 600.0, 400.0));
        assert!(buf.is_following());
        buf.append(entry("three"));
        assert!(buf.take_scroll_request());
        // Drained until the next append.
        assert!(!buf.take_scroll_request());
    }

    #[test]
    fn scrolling_up_detaches_from_the_tail() {
        let mut buf = LogBuffer::default();
        buf.on_user_scroll(metrics(1000.0, 600.0, 400.0));
        assert!(buf.is_following());

        buf.on_user_scroll(metrics(1000.0, 100.0, 400.0));
        assert!(!buf.is_following());
        buf.append(entry("new while reading history"));
        assert!(!buf.take_scroll_request());
    }

    #[test]
    fn tolerance_band_counts_as_bottom() {
        // 49px from the bottom: within the default 50px threshold.
        assert!(at_bottom(metrics(1000.0, 551.0, 400.0), 50.0));
        // Exactly 50px away is not.
        assert!(!at_bottom(metrics(1000.0, 550.0, 400.0), 50.0));
    }

    #[test]
    fn non_overflowing_content_follows_after_first_layout() {
        let mut buf = LogBuffer::default();
        buf.on_first_layout(metrics(120.0, 0.0, 400.0));
        assert!(buf.is_following());
    }

    #[test]
    fn snapshot_replacement_schedules_no_scroll() {
        let mut buf = LogBuffer::default();
        let backlog = (0..37).map(|i| entry(&format!("old {i}"))).collect();
        buf.replace_all(backlog);

        assert_eq!(buf.len(), 37);
        assert!(!buf.is_following());
        assert!(!buf.take_scroll_request());
    }

    #[test]
    fn snapshot_replacement_discards_a_pending_scroll() {
        let mut buf = LogBuffer::default();
        buf.on_user_scroll(metrics(1000.0, 600.0, 400.0));
        buf.append(entry("live line"));

        let backlog = (0..5).map(|i| entry(&format!("old {i}"))).collect();
        buf.replace_all(backlog);
        assert!(!buf.take_scroll_request());
    }

    #[test]
    fn snapshot_replacement_respects_the_bound() {
        let mut buf = LogBuffer::new(10, DEFAULT_FOLLOW_THRESHOLD_PX);
        let backlog = (0..25).map(|i| entry(&format!("old {i}"))).collect();
        buf.replace_all(backlog);
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.entries().next().unwrap().message, "old 15");
    }
}
