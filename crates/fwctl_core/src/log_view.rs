use std::fmt;

use crate::effect::TimerId;
use crate::log_text::LogEntry;

/// Distance from the bottom, in pixels, that still counts as "at the bottom".
pub const SCROLL_BOTTOM_TOLERANCE_PX: f64 = 10.0;

/// Identifies one on-screen view of the device log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogViewId(pub u32);

impl LogViewId {
    /// The log panel on the main screen.
    pub const PRIMARY: LogViewId = LogViewId(0);
    /// The pop-up system log.
    pub const MODAL: LogViewId = LogViewId(1);
}

impl fmt::Display for LogViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LogViewId::PRIMARY => write!(f, "primary"),
            LogViewId::MODAL => write!(f, "modal"),
            LogViewId(other) => write!(f, "view-{other}"),
        }
    }
}

/// Scroll geometry of a view, in pixels. Content height is derived from the row count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub offset_px: f64,
    pub viewport_px: f64,
    pub row_height_px: f64,
}

impl ScrollMetrics {
    pub fn new(row_height_px: f64) -> Self {
        Self {
            offset_px: 0.0,
            viewport_px: 0.0,
            row_height_px,
        }
    }

    fn content_px(&self, rows: usize) -> f64 {
        rows as f64 * self.row_height_px
    }

    pub fn max_offset(&self, rows: usize) -> f64 {
        (self.content_px(rows) - self.viewport_px).max(0.0)
    }

    pub fn is_at_bottom(&self, rows: usize) -> bool {
        (self.max_offset(rows) - self.offset_px).abs() < SCROLL_BOTTOM_TOLERANCE_PX
    }
}

/// State of one log view. Timer and flags belong to this view alone.
#[derive(Debug, Clone, PartialEq)]
pub struct LogView {
    id: LogViewId,
    entries: Vec<LogEntry>,
    auto_refresh: bool,
    auto_scroll: bool,
    poll_timer: Option<TimerId>,
    scroll: ScrollMetrics,
}

impl LogView {
    pub fn new(id: LogViewId, row_height_px: f64) -> Self {
        Self {
            id,
            entries: Vec::new(),
            auto_refresh: false,
            auto_scroll: true,
            poll_timer: None,
            scroll: ScrollMetrics::new(row_height_px),
        }
    }

    pub fn id(&self) -> LogViewId {
        self.id
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn poll_timer(&self) -> Option<TimerId> {
        self.poll_timer
    }

    pub fn scroll(&self) -> ScrollMetrics {
        self.scroll
    }

    pub fn is_at_bottom(&self) -> bool {
        self.scroll.is_at_bottom(self.entries.len())
    }

    /// Replaces the entries wholesale. Follows the bottom only when auto-scroll
    /// is on and the view was already at the bottom before the update.
    /// Returns whether the view was pinned to the bottom.
    pub fn replace_entries(&mut self, entries: Vec<LogEntry>) -> bool {
        let was_at_bottom = self.is_at_bottom();
        self.entries = entries;
        let max = self.scroll.max_offset(self.entries.len());
        if self.auto_scroll && was_at_bottom {
            self.scroll.offset_px = max;
            true
        } else {
            self.scroll.offset_px = self.scroll.offset_px.min(max);
            false
        }
    }

    pub fn scroll_to(&mut self, offset_px: f64) {
        let max = self.scroll.max_offset(self.entries.len());
        self.scroll.offset_px = offset_px.clamp(0.0, max);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll.offset_px = self.scroll.max_offset(self.entries.len());
    }

    pub fn resize(&mut self, viewport_px: f64) {
        let follow = self.auto_scroll && self.is_at_bottom();
        self.scroll.viewport_px = viewport_px.max(0.0);
        if follow {
            self.scroll_to_bottom();
        } else {
            let offset = self.scroll.offset_px;
            self.scroll_to(offset);
        }
    }

    pub fn toggle_auto_scroll(&mut self) -> bool {
        self.auto_scroll = !self.auto_scroll;
        if self.auto_scroll {
            self.scroll_to_bottom();
        }
        self.auto_scroll
    }

    /// Installs a new poll timer, handing back the one it replaces.
    pub(crate) fn start_auto_refresh(&mut self, timer: TimerId) -> Option<TimerId> {
        self.auto_refresh = true;
        self.poll_timer.replace(timer)
    }

    /// Turns auto-refresh off, handing back the timer that must be stopped.
    pub(crate) fn stop_auto_refresh(&mut self) -> Option<TimerId> {
        self.auto_refresh = false;
        self.poll_timer.take()
    }
}
