// SPDX-License-Identifier: MIT
//
// Scrollback: per-pane message history with a movable view cursor.
//
// Messages form a doubly linked chain stored in an arena. Nodes are addressed
// by index, so the view cursor is just an index and moving it is O(1) in
// either direction. Slots released by retention trimming go on a free list
// and are reused by the next append.
//
// The view cursor names the newest message the viewport shows. While it sits
// on the tail (offset 0) it is *pinned* and follows every new message; once
// the user scrolls back it stays on its node and new arrivals only grow the
// offset, so the visible slice does not move under the reader.

use tracing::debug;

/// Node capacity while scrollback is disabled.
pub const DISABLED_CAPACITY: usize = 1;

/// How many messages a log keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    #[default]
    Unbounded,
    /// Keep only the newest `n` messages (a zero limit behaves as one).
    Latest(usize),
}

impl Retention {
    fn capacity(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::Latest(n) => Some(n.max(1)),
        }
    }
}

// ─── Node ────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Node {
    text: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// ─── ScrollbackLog ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ScrollbackLog {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    cursor: Option<usize>,
    /// Distance from the cursor to the tail.
    offset: usize,
    count: usize,
    /// Retention in effect right now.
    retention: Retention,
    /// Retention to restore when scrollback is re-enabled.
    configured: Retention,
    disabled: bool,
}

impl ScrollbackLog {
    /// An empty, enabled, unbounded log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty, enabled log with the given retention.
    #[must_use]
    pub fn with_retention(retention: Retention) -> Self {
        Self {
            retention,
            configured: retention,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// How many messages lie between the view cursor and the newest one.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the view follows new messages.
    #[inline]
    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.offset == 0
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.disabled
    }

    #[inline]
    #[must_use]
    pub const fn retention(&self) -> Retention {
        self.retention
    }

    /// Add a message at the tail.
    ///
    /// At capacity the oldest node is recycled as the new tail; with a
    /// capacity of one that is an overwrite in place.
    pub fn append(&mut self, text: impl Into<String>) {
        let text = text.into();
        let pinned = self.is_pinned();

        if let (Some(cap), Some(head)) = (self.retention.capacity(), self.head) {
            if self.count >= cap {
                if self.count == 1 {
                    self.nodes[head].text = text;
                    self.cursor = Some(head);
                    self.offset = 0;
                    return;
                }
                self.recycle_head(head);
                self.link_tail(head, text, pinned);
                return;
            }
        }

        let slot = self.alloc();
        self.count += 1;
        self.link_tail(slot, text, pinned);
    }

    /// Drop every message.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.cursor = None;
        self.offset = 0;
        self.count = 0;
    }

    /// Move the view one message toward the oldest. Returns whether it moved.
    pub fn scroll_up(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        match self.cursor.and_then(|c| self.nodes[c].prev) {
            Some(prev) => {
                self.cursor = Some(prev);
                self.offset += 1;
                true
            }
            None => false,
        }
    }

    /// Move the view one message toward the newest. Returns whether it moved.
    pub fn scroll_down(&mut self) -> bool {
        if self.disabled {
            return false;
        }
        match self.cursor.and_then(|c| self.nodes[c].next) {
            Some(next) => {
                self.cursor = Some(next);
                self.offset -= 1;
                true
            }
            None => false,
        }
    }

    /// Scroll up by at most `n` messages; returns how far it went.
    pub fn scroll_up_by(&mut self, n: usize) -> usize {
        (0..n).take_while(|_| self.scroll_up()).count()
    }

    /// Scroll down by at most `n` messages; returns how far it went.
    pub fn scroll_down_by(&mut self, n: usize) -> usize {
        (0..n).take_while(|_| self.scroll_down()).count()
    }

    pub fn scroll_to_top(&mut self) {
        if self.disabled || self.head.is_none() {
            return;
        }
        self.cursor = self.head;
        self.offset = self.count - 1;
    }

    pub fn scroll_to_bottom(&mut self) {
        if self.disabled {
            return;
        }
        self.cursor = self.tail;
        self.offset = 0;
    }

    /// Up to `max_n` messages ending at the view cursor, oldest first.
    #[must_use]
    pub fn visible(&self, max_n: usize) -> Vec<&str> {
        let mut out = Vec::with_capacity(max_n.min(self.count));
        let mut at = self.cursor.or(self.tail);
        while let Some(i) = at {
            if out.len() == max_n {
                break;
            }
            out.push(self.nodes[i].text.as_str());
            at = self.nodes[i].prev;
        }
        out.reverse();
        out
    }

    /// Switch between normal history and single-message mode.
    ///
    /// Disabling keeps only the newest message and pins the view to it.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.is_enabled() {
            return;
        }
        self.disabled = !enabled;
        if enabled {
            self.retention = self.configured;
            debug!(retention = ?self.retention, "scrollback enabled");
            return;
        }

        self.retention = Retention::Latest(DISABLED_CAPACITY);
        if let Some(tail) = self.tail {
            let mut at = self.nodes[tail].prev;
            while let Some(i) = at {
                at = self.nodes[i].prev;
                self.release(i);
            }
            self.nodes[tail].prev = None;
            self.head = Some(tail);
            self.cursor = Some(tail);
            self.offset = 0;
            self.count = 1;
        }
        debug!(kept = self.count, free = self.free.len(), "scrollback disabled");
    }

    // ── Chain maintenance ───────────────────────────────────────────────

    fn alloc(&mut self) -> usize {
        let node = Node {
            text: String::new(),
            prev: None,
            next: None,
        };
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, slot: usize) {
        let node = &mut self.nodes[slot];
        node.text = String::new();
        node.prev = None;
        node.next = None;
        self.free.push(slot);
    }

    /// Unlink the head so its slot can become the new tail. The count is
    /// unchanged because the caller relinks the slot immediately.
    fn recycle_head(&mut self, head: usize) {
        let new_head = self.nodes[head].next;
        self.head = new_head;
        if let Some(h) = new_head {
            self.nodes[h].prev = None;
        }
        if self.cursor == Some(head) {
            self.cursor = new_head;
            // The new head is one closer to the tail than the old one was.
            self.offset -= 1;
        }
        let node = &mut self.nodes[head];
        node.next = None;
        node.text.clear();
    }

    fn link_tail(&mut self, slot: usize, text: String, pinned: bool) {
        let old_tail = self.tail;
        {
            let node = &mut self.nodes[slot];
            node.text = text;
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => self.nodes[t].next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);

        if pinned || self.cursor.is_none() {
            self.cursor = Some(slot);
            self.offset = 0;
        } else {
            self.offset += 1;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
