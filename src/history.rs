//! Line history
//!
//! Every line shown is appended here. Opening a new Shabad or Bani is a
//! *transition*; the lines viewed after it are grouped under the transition's
//! timestamp until the next one.
//!
//! ```text
//! entries: [T1 a b c T2 d e]        groups: { T1: [T1 a b c], T2: [T2 d e] }
//! ```
//!
//! The in-memory log feeds the controller's history panel. Each entry is also
//! written as one CSV row to the run's history file by a background writer
//! thread, so appends never wait on disk.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::corpus::{language, ContentRef, Line};
use crate::Result;

/// Line ids viewed within one transition group, with the last time each was shown
pub type ViewedLines = BTreeMap<String, DateTime<Utc>>;

/// CSV header, written once when the history file is created
pub const CSV_HEADER: [&str; 9] = [
    "timestamp",
    "line.gurmukhi",
    "line.translation",
    "line.transliteration",
    "line.punjabi",
    "line.id",
    "line.shabadId",
    "content.id",
    "transition",
];

/// Snapshot of a line as recorded in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryLine {
    pub id: String,
    pub shabad_id: String,
    pub order_id: i64,
    pub gurmukhi: String,
    pub translation: Option<String>,
    pub transliteration: Option<String>,
    pub punjabi: Option<String>,
}

impl From<&Line> for HistoryLine {
    fn from(line: &Line) -> Self {
        Self {
            id: line.id.clone(),
            shabad_id: line.shabad_id.clone(),
            order_id: line.order_id,
            gurmukhi: line.gurmukhi.clone(),
            translation: line.translation_in(language::ENGLISH).map(str::to_string),
            transliteration: line.transliteration_in(language::ENGLISH).map(str::to_string),
            punjabi: line.translation_in(language::PUNJABI).map(str::to_string),
        }
    }
}

/// One history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub content: ContentRef,
    pub line: Option<HistoryLine>,
    pub main_line_id: Option<String>,
    pub next_line_id: Option<String>,
    pub is_transition: bool,
}

impl HistoryEntry {
    pub fn new(content: ContentRef, line: Option<&Line>, is_transition: bool) -> Self {
        Self {
            timestamp: Utc::now().trunc_subsecs(3),
            content,
            line: line.map(HistoryLine::from),
            main_line_id: None,
            next_line_id: None,
            is_transition,
        }
    }

    /// Attach the tracker pointers current at append time.
    pub fn with_tracker(mut self, main_line_id: Option<String>, next_line_id: Option<String>) -> Self {
        self.main_line_id = main_line_id;
        self.next_line_id = next_line_id;
        self
    }

    pub fn line_id(&self) -> Option<&str> {
        self.line.as_ref().map(|l| l.id.as_str())
    }

    fn csv_row(&self) -> [String; 9] {
        let line = self.line.as_ref();

        [
            group_key(&self.timestamp),
            line.map(|l| l.gurmukhi.clone()).unwrap_or_default(),
            line.and_then(|l| l.translation.clone()).unwrap_or_default(),
            line.and_then(|l| l.transliteration.clone()).unwrap_or_default(),
            line.and_then(|l| l.punjabi.clone()).unwrap_or_default(),
            line.map(|l| l.id.clone()).unwrap_or_default(),
            line.map(|l| l.shabad_id.clone()).unwrap_or_default(),
            self.content.id_string(),
            self.is_transition.to_string(),
        ]
    }
}

/// Wire key for a transition group: its timestamp, ISO-8601 with milliseconds
pub fn group_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Append-only history of viewed lines
#[derive(Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    /// Entry indices grouped under the transition that opened them
    groups: BTreeMap<DateTime<Utc>, Vec<usize>>,
    current_group: Option<DateTime<Utc>>,
    sink: Option<HistorySink>,
}

impl History {
    /// History that also persists every entry through `sink`.
    pub fn new(sink: Option<HistorySink>) -> Self {
        Self {
            sink,
            ..Default::default()
        }
    }

    /// History kept in memory only
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Append an entry. Returns `false` (and stores nothing) when its line is
    /// the same as the most recent entry's.
    pub fn append(&mut self, mut entry: HistoryEntry) -> bool {
        if let Some(last) = self.entries.last() {
            if last.line_id() == entry.line_id() {
                return false;
            }
            // Keep timestamps strictly increasing so group keys stay unique
            if entry.timestamp <= last.timestamp {
                entry.timestamp = last.timestamp + chrono::Duration::milliseconds(1);
            }
        }

        let index = self.entries.len();
        let group = match self.current_group {
            Some(group) if !entry.is_transition => group,
            _ => entry.timestamp,
        };
        self.current_group = Some(group);
        self.groups.entry(group).or_default().push(index);

        if let Some(sink) = &self.sink {
            sink.write(&entry);
        }
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Timestamp of the group new lines are currently added to
    pub fn current_group(&self) -> Option<DateTime<Utc>> {
        self.current_group
    }

    /// Transitions that landed on a line: what was opened, and when
    pub fn transitions(&self) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_transition && e.line.is_some())
            .cloned()
            .collect()
    }

    /// For each transition group, the last entry that had a line
    pub fn latest_lines(&self) -> BTreeMap<String, HistoryEntry> {
        self.groups
            .iter()
            .filter_map(|(group, indices)| {
                indices
                    .iter()
                    .rev()
                    .map(|i| &self.entries[*i])
                    .find(|e| e.line.is_some())
                    .map(|e| (group_key(group), e.clone()))
            })
            .collect()
    }

    /// Distinct lines viewed in the group started at `timestamp`
    pub fn viewed_lines_at(&self, timestamp: &DateTime<Utc>) -> ViewedLines {
        let mut viewed = ViewedLines::new();
        if let Some(indices) = self.groups.get(timestamp) {
            for entry in indices.iter().map(|i| &self.entries[*i]) {
                if let Some(line_id) = entry.line_id() {
                    viewed.insert(line_id.to_string(), entry.timestamp);
                }
            }
        }
        viewed
    }

    /// Distinct lines viewed in the current group
    pub fn current_viewed_lines(&self) -> ViewedLines {
        self.current_group
            .map(|group| self.viewed_lines_at(&group))
            .unwrap_or_default()
    }

    /// Most recent entry with a line for `content`
    pub fn latest_for(&self, content: &ContentRef) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| &e.content == content && e.line.is_some())
    }

    /// Forget everything in memory. The history file is left alone.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.groups.clear();
        self.current_group = None;
        tracing::info!("Cleared history");
    }
}

/// Writes history rows to a CSV file, creating it on first use
pub struct CsvHistoryWriter {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
}

impl CsvHistoryWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, entry: &HistoryEntry) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(self.open()?);
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(entry.csv_row())?;
            writer.flush()?;
        }
        Ok(())
    }

    fn open(&self) -> Result<csv::Writer<File>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::Writer::from_writer(file);
        if is_new {
            writer.write_record(CSV_HEADER)?;
        }
        tracing::debug!("Writing history to {}", self.path.display());
        Ok(writer)
    }
}

/// Handle to the background history writer
pub struct HistorySink {
    tx: mpsc::Sender<HistoryEntry>,
}

impl HistorySink {
    /// Start a writer thread appending to `path`.
    pub fn spawn(path: impl Into<PathBuf>) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<HistoryEntry>();
        let mut writer = CsvHistoryWriter::new(path);

        std::thread::Builder::new()
            .name("history-writer".to_string())
            .spawn(move || {
                for entry in rx {
                    if let Err(e) = writer.write(&entry) {
                        tracing::error!("Failed to write {}: {}", writer.path().display(), e);
                    }
                }
            })?;

        Ok(Self { tx })
    }

    fn write(&self, entry: &HistoryEntry) {
        if self.tx.send(entry.clone()).is_err() {
            tracing::warn!("History writer has stopped; entry not persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str) -> Line {
        Line {
            id: id.to_string(),
            shabad_id: "S1".to_string(),
            order_id: 1,
            gurmukhi: format!("gurmukhi {}", id),
            type_id: None,
            first_letters: String::new(),
            source_page: None,
            translations: Vec::new(),
            transliterations: Vec::new(),
            citation: None,
        }
    }

    fn shabad(id: &str) -> ContentRef {
        ContentRef::Shabad { id: id.to_string() }
    }

    #[test]
    fn test_repeated_line_is_stored_once() {
        let mut history = History::in_memory();
        assert!(history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), true)));
        assert!(!history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), false)));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_cleared_line_after_cleared_line_is_deduplicated() {
        let mut history = History::in_memory();
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), true));
        assert!(history.append(HistoryEntry::new(shabad("S1"), None, false)));
        assert!(!history.append(HistoryEntry::new(shabad("S1"), None, false)));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_transitions_only_include_entries_with_lines() {
        let mut history = History::in_memory();
        history.append(HistoryEntry::new(shabad("S1"), None, true));
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), false));
        history.append(HistoryEntry::new(shabad("S2"), Some(&line("L5")), true));

        let transitions = history.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].line_id(), Some("L5"));
    }

    #[test]
    fn test_groups_track_latest_and_viewed_lines() {
        let mut history = History::in_memory();
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), true));
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L2")), false));
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), false));
        let first_group = history.current_group().unwrap();

        history.append(HistoryEntry::new(shabad("S2"), Some(&line("L9")), true));

        let latest = history.latest_lines();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[&group_key(&first_group)].line_id(), Some("L1"));

        let viewed = history.viewed_lines_at(&first_group);
        assert_eq!(viewed.keys().collect::<Vec<_>>(), vec!["L1", "L2"]);
        assert_eq!(history.current_viewed_lines().len(), 1);
    }

    #[test]
    fn test_latest_for_finds_most_recent_entry_of_content() {
        let mut history = History::in_memory();
        history.append(
            HistoryEntry::new(shabad("S1"), Some(&line("L1")), true)
                .with_tracker(Some("L1".to_string()), Some("L2".to_string())),
        );
        history.append(HistoryEntry::new(shabad("S2"), Some(&line("L9")), true));

        let entry = history.latest_for(&shabad("S1")).unwrap();
        assert_eq!(entry.next_line_id.as_deref(), Some("L2"));
        assert!(history.latest_for(&ContentRef::Bani { id: 1 }).is_none());
    }

    #[test]
    fn test_timestamps_are_strictly_increasing() {
        let mut history = History::in_memory();
        for id in ["A", "B", "C"] {
            history.append(HistoryEntry::new(shabad("S1"), Some(&line(id)), true));
        }
        let stamps: Vec<_> = history.entries().iter().map(|e| e.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(history.latest_lines().len(), 3);
    }

    #[test]
    fn test_clear_empties_memory() {
        let mut history = History::in_memory();
        history.append(HistoryEntry::new(shabad("S1"), Some(&line("L1")), true));
        history.clear();
        assert!(history.is_empty());
        assert!(history.latest_lines().is_empty());
        assert!(history.current_group().is_none());
    }

    #[test]
    fn test_csv_writer_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("run.csv");
        let mut writer = CsvHistoryWriter::new(&path);
        assert!(!path.exists());

        writer.write(&HistoryEntry::new(shabad("S1"), Some(&line("L1")), true)).unwrap();
        writer.write(&HistoryEntry::new(shabad("S1"), Some(&line("L2")), false)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], CSV_HEADER.join(","));
        assert!(rows[1].ends_with(",L1,S1,S1,true"));
        assert!(rows[2].ends_with(",L2,S1,S1,false"));
    }
}
