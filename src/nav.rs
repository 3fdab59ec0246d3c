//! File navigation: a background directory poller plus a cursor state
//! machine over the sorted file list.
//!
//! The poller republishes the listing every few tens of milliseconds,
//! decoupled from the render cadence. A file only becomes eligible once
//! its modification time is at least one settling period old, which keeps
//! the newest, still-growing file out of the selectable range.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crate::log_debug;

/// Whether the cursor auto-follows the newest file or holds a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavMode {
    Streaming,
    Navigation,
    Beginning,
}

/// Navigation requests routed from key handlers to the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    NextFile,
    PrevFile,
    /// Relative jump, in files.
    Skip(i64),
    ToBeginning,
    /// Resume streaming from the newest file.
    ToEnd,
}

/// Cursor over a sorted file list. Positions are 1-based and always kept
/// inside `[1, file_count]` by `validate`.
#[derive(Debug, Clone, Copy)]
pub struct NavCursor {
    position: usize,
    mode: NavMode,
}

impl Default for NavCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl NavCursor {
    pub fn new() -> Self {
        Self {
            position: 1,
            mode: NavMode::Streaming,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    /// Clamps the position into `[1, file_count]`.
    pub fn validate(&mut self, file_count: usize) {
        self.position = self.position.clamp(1, file_count.max(1));
    }

    /// Any explicit move switches to navigation mode; out-of-range
    /// deltas clamp at the list edges.
    pub fn move_cursor(&mut self, delta: i64, file_count: usize) {
        self.mode = NavMode::Navigation;
        let target = self.position as i64 + delta;
        self.position = target.clamp(1, file_count.max(1) as i64) as usize;
    }

    pub fn move_to_beginning(&mut self) {
        self.position = 1;
        self.mode = NavMode::Beginning;
    }

    pub fn move_to_end(&mut self, file_count: usize) {
        self.position = file_count.max(1);
        self.mode = NavMode::Streaming;
    }

    /// Resolves the file this cursor points at. Streaming mode tracks the
    /// newest eligible file and keeps the position pinned to it; other
    /// modes return the file at the (validated) cursor without advancing.
    pub fn next_file(&mut self, files: &[PathBuf]) -> Option<PathBuf> {
        if files.is_empty() {
            return None;
        }
        match self.mode {
            NavMode::Streaming => {
                self.position = files.len();
                files.last().cloned()
            }
            NavMode::Navigation | NavMode::Beginning => {
                self.validate(files.len());
                files.get(self.position - 1).cloned()
            }
        }
    }

    pub fn apply(&mut self, action: NavAction, file_count: usize) {
        match action {
            NavAction::NextFile => self.move_cursor(1, file_count),
            NavAction::PrevFile => self.move_cursor(-1, file_count),
            NavAction::Skip(delta) => self.move_cursor(delta, file_count),
            NavAction::ToBeginning => self.move_to_beginning(),
            NavAction::ToEnd => self.move_to_end(file_count),
        }
    }
}

/// Sorted listing of data files whose mtime is at least `settle` old.
pub fn eligible_files(source: &Path, settle: Duration) -> Vec<PathBuf> {
    let entries = match fs::read_dir(source) {
        Ok(entries) => entries,
        Err(err) => {
            log_debug(&format!("poll {}: {err}", source.display()));
            return Vec::new();
        }
    };
    let now = SystemTime::now();
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .filter(|path| {
            fs::metadata(path)
                .and_then(|meta| meta.modified())
                .map(|mtime| {
                    now.duration_since(mtime)
                        .map(|age| age >= settle)
                        .unwrap_or(false)
                })
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

/// Owns the poller thread and the navigation cursor.
pub struct FileNavigator {
    files: Arc<Mutex<Vec<PathBuf>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    cursor: NavCursor,
    current: Option<PathBuf>,
}

impl FileNavigator {
    /// Starts polling `source` every `poll_interval`, publishing files
    /// whose mtime is at least `settle` old.
    pub fn new(source: PathBuf, settle: Duration, poll_interval: Duration) -> Self {
        let files = Arc::new(Mutex::new(eligible_files(&source, settle)));
        let stop = Arc::new(AtomicBool::new(false));
        let shared = Arc::clone(&files);
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                let listing = eligible_files(&source, settle);
                if let Ok(mut guard) = shared.lock() {
                    *guard = listing;
                }
                thread::sleep(poll_interval);
            }
        });
        Self {
            files,
            stop,
            handle: Some(handle),
            cursor: NavCursor::new(),
            current: None,
        }
    }

    /// Snapshot of the last published listing.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn mode(&self) -> NavMode {
        self.cursor.mode()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn apply(&mut self, action: NavAction) {
        let count = self.file_count();
        self.cursor.apply(action, count);
    }

    /// The file to render this cycle, plus whether it is the same file as
    /// the previous cycle (the "viewing same file" indicator).
    pub fn next_file(&mut self) -> (Option<PathBuf>, bool) {
        let files = self.files();
        let file = self.cursor.next_file(&files);
        let same = file.is_some() && file == self.current;
        self.current = file.clone();
        (file, same)
    }

    /// Signals the poller to stop and joins it.
    pub fn close(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log_debug("file poller panicked during shutdown");
            }
        }
    }
}

impl Drop for FileNavigator {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn streaming_returns_newest_eligible_file() {
        // The growing newest file has already been filtered out of the
        // eligible list by the settling rule.
        let files = paths(&["1000.txt", "1010.txt"]);
        let mut cursor = NavCursor::new();
        assert_eq!(
            cursor.next_file(&files),
            Some(PathBuf::from("1010.txt"))
        );
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn move_cursor_always_yields_navigation_and_clamps() {
        let mut cursor = NavCursor::new();
        for delta in [-100i64, -1, 0, 1, 5, 100] {
            cursor.move_cursor(delta, 3);
            assert_eq!(cursor.mode(), NavMode::Navigation);
            assert!((1..=3).contains(&cursor.position()));
        }
        cursor.move_cursor(100, 3);
        assert_eq!(cursor.position(), 3);
        cursor.move_cursor(-100, 3);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn navigation_mode_does_not_advance() {
        let files = paths(&["a.txt", "b.txt", "c.txt"]);
        let mut cursor = NavCursor::new();
        cursor.move_cursor(-1, files.len());
        let first = cursor.next_file(&files);
        let second = cursor.next_file(&files);
        assert_eq!(first, second);
    }

    #[test]
    fn move_to_end_resumes_streaming() {
        let mut cursor = NavCursor::new();
        cursor.move_cursor(-2, 5);
        assert_eq!(cursor.mode(), NavMode::Navigation);
        cursor.move_to_end(5);
        assert_eq!(cursor.mode(), NavMode::Streaming);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn move_to_beginning_sets_mode_and_position() {
        let mut cursor = NavCursor::new();
        cursor.move_cursor(3, 10);
        cursor.move_to_beginning();
        assert_eq!(cursor.mode(), NavMode::Beginning);
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn empty_list_yields_no_file() {
        let mut cursor = NavCursor::new();
        assert_eq!(cursor.next_file(&[]), None);
    }

    #[test]
    fn validate_clamps_into_range() {
        let mut cursor = NavCursor::new();
        cursor.move_cursor(50, 100);
        cursor.validate(4);
        assert_eq!(cursor.position(), 4);
        cursor.validate(0);
        assert_eq!(cursor.position(), 1);
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "specterm_nav_{tag}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn settling_rule_excludes_fresh_files() {
        let dir = scratch_dir("settle");
        for name in ["1000.txt", "1010.txt"] {
            let mut file = File::create(dir.join(name)).unwrap();
            writeln!(file, "0.1,0.2").unwrap();
        }
        thread::sleep(Duration::from_millis(200));
        let mut fresh = File::create(dir.join("1020.txt")).unwrap();
        writeln!(fresh, "0.3,0.4").unwrap();

        let eligible = eligible_files(&dir, Duration::from_millis(150));
        let names: Vec<_> = eligible
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["1000.txt", "1010.txt"]);

        let all = eligible_files(&dir, Duration::ZERO);
        assert_eq!(all.len(), 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn navigator_polls_and_closes_cleanly() {
        let dir = scratch_dir("poll");
        let mut file = File::create(dir.join("1000.txt")).unwrap();
        writeln!(file, "0.0").unwrap();

        let mut nav = FileNavigator::new(
            dir.clone(),
            Duration::ZERO,
            Duration::from_millis(10),
        );
        thread::sleep(Duration::from_millis(50));
        assert_eq!(nav.file_count(), 1);
        let (file, same) = nav.next_file();
        assert!(file.is_some());
        assert!(!same);
        let (_, same) = nav.next_file();
        assert!(same, "same file reported on the second cycle");
        nav.close();
        let _ = fs::remove_dir_all(&dir);
    }
}
