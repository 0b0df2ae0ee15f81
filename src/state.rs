use std::path::{Path, PathBuf};

use rowsieve::data::loader;
use rowsieve::engine::{ApplySummary, FilterEngine};
use rowsieve::Format;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Message shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded data, staged filters and the filtered result.
    pub engine: FilterEngine,

    /// Format picked in the selector before opening a file.
    pub load_format: Format,

    /// File the current dataset came from.
    pub source: Option<PathBuf>,

    /// Text in the filter entry box.
    pub filter_input: String,

    /// Row counts from the last successful apply.
    pub last_apply: Option<ApplySummary>,

    /// Status / error message shown in the UI.
    pub status: Option<Status>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            engine: FilterEngine::default(),
            load_format: Format::Csv,
            source: None,
            filter_input: String::new(),
            last_apply: None,
            status: None,
        }
    }
}

impl AppState {
    /// Load `path` using the selected format.
    pub fn open_file(&mut self, path: &Path) {
        match loader::load_file(&mut self.engine, path, Some(self.load_format)) {
            Ok(_) => {
                self.source = Some(path.to_path_buf());
                self.last_apply = None;
                let rows = self.engine.original().map_or(0, |ds| ds.len());
                self.status = Some(Status::Info(format!(
                    "Loaded {rows} rows from {}",
                    path.display()
                )));
            }
            Err(e) => self.fail("Failed to load file", e),
        }
    }

    /// Stage the text in the entry box as a filter.
    pub fn add_filter(&mut self) {
        match self.engine.add_filter(&self.filter_input) {
            Ok(()) => {
                self.filter_input.clear();
                self.status = None;
            }
            Err(e) => self.fail("Cannot add filter", e.into()),
        }
    }

    pub fn remove_filter(&mut self, index: usize) {
        if let Err(e) = self.engine.remove_filter(index) {
            self.fail("Cannot remove filter", e.into());
        }
    }

    pub fn clear_filters(&mut self) {
        self.engine.clear_filters();
    }

    pub fn apply_filters(&mut self) {
        match self.engine.apply_filters() {
            Ok(summary) => {
                let mut message = format!(
                    "Filters applied: {} of {} rows kept",
                    summary.kept_rows, summary.total_rows
                );
                let mismatched = summary.mismatched_rows();
                if mismatched > 0 {
                    message.push_str(&format!(" ({mismatched} excluded by type mismatch)"));
                }
                self.status = Some(Status::Info(message));
                self.last_apply = Some(summary);
            }
            Err(e) => self.fail("Failed to apply filters", e.into()),
        }
    }

    /// Write the filtered result; the format follows the chosen extension.
    pub fn save_file(&mut self, path: &Path) {
        match loader::save_file(&self.engine, path, None) {
            Ok(format) => {
                self.status = Some(Status::Info(format!(
                    "Saved {format} file: {}",
                    path.display()
                )));
            }
            Err(e) => self.fail("Failed to save file", e),
        }
    }

    fn fail(&mut self, what: &str, e: anyhow::Error) {
        log::error!("{what}: {e:#}");
        self.status = Some(Status::Error(format!("{what}: {e:#}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn csv_file(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_open_add_apply() {
        let file = csv_file("age,name\n30,A\n15,B\n");
        let mut state = AppState::default();
        state.open_file(file.path());
        assert!(matches!(state.status, Some(Status::Info(_))));

        state.filter_input = "age >= 18".into();
        state.add_filter();
        assert!(state.filter_input.is_empty());

        state.apply_filters();
        assert_eq!(state.last_apply.as_ref().map(|s| s.kept_rows), Some(1));
    }

    #[test]
    fn test_wrong_format_selection_reports_error() {
        let file = csv_file("a\n1\n");
        let mut state = AppState {
            load_format: Format::Json,
            ..Default::default()
        };
        state.open_file(file.path());
        assert!(matches!(state.status, Some(Status::Error(_))));
        assert!(state.engine.original().is_none());
    }

    #[test]
    fn test_save_without_apply_reports_error() {
        let file = csv_file("a\n1\n");
        let mut state = AppState::default();
        state.open_file(file.path());

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.json");
        state.save_file(&target);
        assert!(matches!(state.status, Some(Status::Error(ref m)) if m.contains("apply filters")));
        assert!(!target.exists());
    }
}
