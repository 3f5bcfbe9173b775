//! The single "currently displayed" content and its pointers
//!
//! Holds the current Shabad or Bani, the active line, and the two tracker
//! pointers (main line, next line). Every mutation reports which fields
//! changed in a [`ContentChanges`] so the caller can broadcast exactly those,
//! and appends to [`History`] whenever the active line changes.
//!
//! Invariants:
//! - the line pointer, when set, names a line of the current content
//! - both tracker pointers are `None` whenever there is no content
//! - tracker pointers set while opening content name lines of that content

use std::collections::HashMap;

use crate::corpus::{Content, ContentRef, Line, OrderRange};
use crate::history::{History, HistoryEntry};

/// Which parts of the state a mutation touched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentChanges {
    pub content: bool,
    pub line: bool,
    pub main_line: bool,
    pub next_line: bool,
    /// A history entry was stored
    pub history: bool,
}

impl ContentChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Current content, line and tracker
#[derive(Debug, Default)]
pub struct ContentState {
    content: Option<Content>,
    line_id: Option<String>,
    main_line_id: Option<String>,
    next_line_id: Option<String>,
    /// Position of each line id in the current content
    line_index: HashMap<String, usize>,
    /// Valid Shabad order ids, read once at startup
    order_range: Option<OrderRange>,
}

struct Snapshot {
    line_id: Option<String>,
    main_line_id: Option<String>,
    next_line_id: Option<String>,
}

impl ContentState {
    pub fn new(order_range: Option<OrderRange>) -> Self {
        Self {
            order_range,
            ..Default::default()
        }
    }

    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    pub fn line_id(&self) -> Option<&str> {
        self.line_id.as_deref()
    }

    pub fn main_line_id(&self) -> Option<&str> {
        self.main_line_id.as_deref()
    }

    pub fn next_line_id(&self) -> Option<&str> {
        self.next_line_id.as_deref()
    }

    pub fn order_range(&self) -> Option<OrderRange> {
        self.order_range
    }

    /// The current line, if any
    pub fn line(&self) -> Option<&Line> {
        let id = self.line_id.as_deref()?;
        self.lookup(id)
    }

    fn lines(&self) -> &[Line] {
        self.content.as_ref().map(Content::lines).unwrap_or_default()
    }

    fn contains(&self, line_id: &str) -> bool {
        self.line_index.contains_key(line_id)
    }

    fn lookup(&self, line_id: &str) -> Option<&Line> {
        let index = *self.line_index.get(line_id)?;
        self.lines().get(index)
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            line_id: self.line_id.clone(),
            main_line_id: self.main_line_id.clone(),
            next_line_id: self.next_line_id.clone(),
        }
    }

    /// Compare against `before`, recording a history entry if the line moved.
    fn finish(&self, before: Snapshot, content_changed: bool, history: &mut History) -> ContentChanges {
        let mut changes = ContentChanges {
            content: content_changed,
            line: before.line_id != self.line_id,
            main_line: before.main_line_id != self.main_line_id,
            next_line: before.next_line_id != self.next_line_id,
            history: false,
        };

        if changes.line || content_changed {
            if let Some(content) = &self.content {
                let entry = HistoryEntry::new(content.content_ref(), self.line(), content_changed)
                    .with_tracker(self.main_line_id.clone(), self.next_line_id.clone());
                changes.history = history.append(entry);
            }
        }

        changes
    }

    /// Shabad order id to open when moving `delta` Shabads from the current one.
    ///
    /// `None` without a current Shabad (Banis have no neighbours).
    pub fn neighbour_order_id(&self, delta: i64) -> Option<i64> {
        let order_id = self.content.as_ref()?.order_id()?;
        self.clamp_order_id(order_id + delta)
    }

    /// Clamp into the corpus' Shabad order range.
    pub fn clamp_order_id(&self, order_id: i64) -> Option<i64> {
        self.order_range.map(|range| range.clamp(order_id))
    }

    /// Replace the current content and seed the line and tracker pointers.
    ///
    /// Seeding precedence:
    /// 1. line: `line_id` if it belongs to the content, else the line of the
    ///    latest history entry for this content, else the first line
    /// 2. main line: the latest history entry's main line, else none
    /// 3. next line: the latest history entry's next line, else the line after
    ///    a requested `line_id` (none at the end), else the first line
    ///
    /// History values are only used when they still name a line of `content`.
    pub fn open(&mut self, content: Content, line_id: Option<&str>, history: &mut History) -> ContentChanges {
        let before = self.snapshot();
        let content_ref = content.content_ref();

        self.line_index = content
            .lines()
            .iter()
            .enumerate()
            .map(|(index, line)| (line.id.clone(), index))
            .collect();
        self.content = Some(content);
        self.main_line_id = None;
        self.next_line_id = None;

        let requested = match line_id {
            Some(id) if self.contains(id) => Some(id.to_string()),
            Some(id) => {
                tracing::warn!("Line {} is not part of {}, ignoring", id, content_ref);
                None
            }
            None => None,
        };

        let previous = history.latest_for(&content_ref);
        let remembered = |pick: Option<&String>| pick.filter(|id| self.contains(id)).cloned();
        let remembered_line = remembered(previous.and_then(|e| e.line.as_ref().map(|l| &l.id)));
        let remembered_main = remembered(previous.and_then(|e| e.main_line_id.as_ref()));
        let remembered_next = remembered(previous.and_then(|e| e.next_line_id.as_ref()));

        let first = self.lines().first().map(|l| l.id.clone());
        let after_requested = requested.as_deref().and_then(|id| {
            let index = self.line_index[id];
            self.lines().get(index + 1).map(|l| l.id.clone())
        });

        let next = match (remembered_next, &requested) {
            (Some(next), _) => Some(next),
            (None, Some(_)) => after_requested,
            (None, None) => first.clone(),
        };

        self.line_id = requested.or(remembered_line).or(first);
        self.main_line_id = remembered_main;
        self.next_line_id = next;

        tracing::info!("Opened {} at line {:?}", content_ref, self.line_id);
        self.finish(before, true, history)
    }

    /// Point at line `id`. Ids outside the current content are rejected.
    pub fn set_line(&mut self, id: &str, history: &mut History) -> ContentChanges {
        if !self.contains(id) {
            tracing::error!("Line ID {} not found in current content", id);
            return ContentChanges::default();
        }

        let before = self.snapshot();
        self.line_id = Some(id.to_string());
        tracing::info!("Set line ID to {}", id);
        self.finish(before, false, history)
    }

    /// Point at the line closest to `order_id`, clamped to the content's
    /// first and last lines.
    pub fn set_line_by_order_id(&mut self, order_id: i64, history: &mut History) -> ContentChanges {
        let lines = self.lines();
        let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
            tracing::error!("No lines to select order ID {} from", order_id);
            return ContentChanges::default();
        };

        let low = first.order_id.min(last.order_id);
        let high = first.order_id.max(last.order_id);
        let target = order_id.clamp(low, high);

        // Exact match, else nearest; ties go to the lower order id
        let Some(id) = lines
            .iter()
            .min_by_key(|line| ((line.order_id - target).abs(), line.order_id))
            .map(|line| line.id.clone())
        else {
            return ContentChanges::default();
        };

        self.set_line(&id, history)
    }

    /// Move the line pointer by `step` positions.
    fn step_line(&mut self, step: isize, history: &mut History) -> ContentChanges {
        let Some(current) = self.line_id.clone() else {
            tracing::debug!("No current line to move from");
            return ContentChanges::default();
        };
        let Some(&index) = self.line_index.get(&current) else {
            tracing::error!("Line ID {} not found in current content", current);
            return ContentChanges::default();
        };

        let target = index
            .checked_add_signed(step)
            .and_then(|i| self.lines().get(i))
            .map(|line| line.id.clone());

        match target {
            Some(id) => self.set_line(&id, history),
            None => {
                tracing::info!("Line ID {} is already at the boundary of the content", current);
                ContentChanges::default()
            }
        }
    }

    pub fn set_next_line(&mut self, history: &mut History) -> ContentChanges {
        self.step_line(1, history)
    }

    pub fn set_previous_line(&mut self, history: &mut History) -> ContentChanges {
        self.step_line(-1, history)
    }

    /// Unset the line pointer, keeping the content.
    pub fn clear_line(&mut self, history: &mut History) -> ContentChanges {
        let before = self.snapshot();
        self.line_id = None;
        tracing::info!("Cleared current line ID");
        self.finish(before, false, history)
    }

    /// Move the main tracker pointer.
    ///
    /// Tracker moves are not logged: history only records the tracker as it
    /// stood at each line change.
    pub fn set_tracker_main_line(&mut self, id: &str) -> ContentChanges {
        if self.content.is_none() {
            tracing::debug!("Ignoring main line {} without content", id);
            return ContentChanges::default();
        }

        let changed = self.main_line_id.as_deref() != Some(id);
        self.main_line_id = Some(id.to_string());
        tracing::info!("Set main line ID to {}", id);
        ContentChanges {
            main_line: changed,
            ..Default::default()
        }
    }

    pub fn set_tracker_next_line(&mut self, id: &str) -> ContentChanges {
        if self.content.is_none() {
            tracing::debug!("Ignoring next line {} without content", id);
            return ContentChanges::default();
        }

        let changed = self.next_line_id.as_deref() != Some(id);
        self.next_line_id = Some(id.to_string());
        tracing::info!("Set next line ID to {}", id);
        ContentChanges {
            next_line: changed,
            ..Default::default()
        }
    }

    /// Reference to the current content, if any
    pub fn content_ref(&self) -> Option<ContentRef> {
        self.content.as_ref().map(Content::content_ref)
    }
}
