//! Append-only log of statements sent to the database

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends every statement the SQL backend runs to a text file
#[derive(Debug, Clone)]
pub struct TransactionJournal {
    path: PathBuf,
}

impl TransactionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped entry
    ///
    /// A journal that cannot be written is logged and otherwise ignored.
    pub fn record(&self, entry: &str) {
        if let Err(e) = self.append(entry) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write transaction journal");
        }
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), entry.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TransactionJournal::new(dir.path().join("transactions.txt"));

        journal.record("SELECT 1");
        journal.record("\nEXEC sp_helptext spExport\n");

        let text = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] SELECT 1"));
        assert!(lines[1].ends_with("] EXEC sp_helptext spExport"));
    }

    #[test]
    fn unwritable_journal_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let journal = TransactionJournal::new(dir.path().join("missing").join("transactions.txt"));
        journal.record("SELECT 1");
        assert!(!journal.path().exists());
    }
}
